//! Engine configuration.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Build the display payload and hand it to the renderer after each run.
    pub display_enabled: bool,
    /// Upper bound on diagnostics buffered per evaluation; extra entries are
    /// counted and summarised in one trailing warning.
    pub max_diagnostics: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            display_enabled: true,
            max_diagnostics: 256,
        }
    }
}
