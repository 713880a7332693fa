use serde::{Deserialize, Serialize};
use weft_graph_core::EngineConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Name given to the evaluation thread by [`crate::WorkerHost::spawn`].
    pub thread_name: String,
    /// Cap on `logs` entries returned with one evaluate response.
    pub max_buffered_logs: usize,
    pub engine: EngineConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: "weft-worker".to_string(),
            max_buffered_logs: 200,
            engine: EngineConfig::default(),
        }
    }
}
