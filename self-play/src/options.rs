use anyhow::Result;
use common::Config;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelfPlayOptions {
    /// Number of opening plies played at temperature 1; everything after is
    /// played greedily at temperature 0.
    pub temp_threshold: usize,
}

impl Config for SelfPlayOptions {
    fn load(config: &common::ConfigLoader) -> Result<Self> {
        Ok(Self {
            temp_threshold: config
                .get("temp_threshold")
                .and_then(|v| v.as_usize())
                .unwrap_or(15),
        })
    }
}
