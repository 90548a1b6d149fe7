use std::time::Duration;

use mainbus::BusConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_buses")]
    pub buses: Vec<BusConfig>,
    /// Items produced on every bus.
    #[serde(default = "default_items")]
    pub items: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Pause between the last produce and closing the buses.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_buses() -> Vec<BusConfig> {
    vec![
        BusConfig::new("iron").lanes(4).capacity(20),
        BusConfig::new("copper").lanes(2).capacity(20),
    ]
}

fn default_items() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    100
}

fn default_settle_ms() -> u64 {
    1000
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            buses: default_buses(),
            items: default_items(),
            interval_ms: default_interval_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl DemoConfig {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_yaml::from_slice(&bytes)?)
    }

    /// Production interval; tokio intervals reject a zero period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
