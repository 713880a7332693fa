//! Evaluation context exported to JavaScript. A web worker forwards each
//! `postMessage` payload to [`WasmEvaluationContext::handle_message`] and
//! posts back every returned envelope, transferring the buffers.

use std::sync::Arc;

use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use weft_graph_core::ComponentRegistry;
use weft_worker_core::{EvaluationContext, Message, WorkerConfig};

#[wasm_bindgen]
pub struct WasmEvaluationContext {
    context: EvaluationContext,
    components: Arc<ComponentRegistry>,
}

impl Default for WasmEvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl WasmEvaluationContext {
    fn with_config_inner(config: WorkerConfig) -> Self {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();
        let components = Arc::new(ComponentRegistry::with_builtins());
        Self {
            context: EvaluationContext::new(config, Arc::clone(&components)),
            components,
        }
    }

    /// Envelopes as JSON text plus the buffers of all of them, in order.
    fn respond(&mut self, json: &str) -> Result<(Vec<String>, Vec<Vec<u8>>), String> {
        let message = Message::from_json(json, Vec::new()).map_err(|e| e.to_string())?;
        let mut envelopes = Vec::new();
        let mut transfer = Vec::new();
        for reply in self.context.handle(message) {
            envelopes.push(reply.to_json().map_err(|e| e.to_string())?);
            transfer.extend(reply.transfer.into_iter().map(|b| b.into_bytes()));
        }
        Ok((envelopes, transfer))
    }
}

#[wasm_bindgen]
impl WasmEvaluationContext {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEvaluationContext {
        Self::with_config_inner(WorkerConfig::default())
    }

    /// Construct with a `WorkerConfig`-shaped object.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config: JsValue) -> Result<WasmEvaluationContext, JsValue> {
        let config: WorkerConfig = serde_wasm_bindgen::from_value(config)?;
        Ok(Self::with_config_inner(config))
    }

    /// Handle one request envelope. Returns
    /// `{ envelopes: string[], transfer: ArrayBuffer[] }`.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let (envelopes, buffers) = self.respond(json).map_err(|e| JsValue::from_str(&e))?;

        let envelope_array = Array::new();
        for text in envelopes {
            envelope_array.push(&JsValue::from_str(&text));
        }
        let transfer_array = Array::new();
        for bytes in buffers {
            transfer_array.push(&Uint8Array::from(bytes.as_slice()).buffer());
        }

        let out = Object::new();
        Reflect::set(&out, &JsValue::from_str("envelopes"), &envelope_array)?;
        Reflect::set(&out, &JsValue::from_str("transfer"), &transfer_array)?;
        Ok(out.into())
    }

    /// Registered component keys, sorted.
    #[wasm_bindgen(js_name = componentNames)]
    pub fn component_names(&self) -> Array {
        self.components
            .keys()
            .into_iter()
            .map(JsValue::from_str)
            .collect()
    }
}
