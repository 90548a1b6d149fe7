use serde::Deserialize;

/// Declarative description of a [`ResourceBus`](crate::ResourceBus).
///
/// Missing fields fall back to two lanes of twenty items each and an
/// entropy-seeded random source.
///
/// # Examples
///
/// ```
/// use mainbus::BusConfig;
///
/// let config = BusConfig::new("iron").lanes(4).capacity(20).seed(7);
///
/// assert_eq!(config.resource, "iron");
/// assert_eq!(config.lanes, 4);
/// assert_eq!(config.seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusConfig {
    pub resource: String,
    /// Requested lane count; rounded up to the next even number.
    #[serde(default = "default_lanes")]
    pub lanes: usize,
    /// Items each lane buffers before producers suspend.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seed for lane selection. Unset means entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_lanes() -> usize {
    2
}

fn default_capacity() -> usize {
    20
}

impl BusConfig {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            lanes: default_lanes(),
            capacity: default_capacity(),
            seed: None,
        }
    }

    pub fn lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
