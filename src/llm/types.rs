use serde::{Deserialize, Serialize};

/// Sampling parameters forwarded with every generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_length: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_length: 256,
        }
    }
}
