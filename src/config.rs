//! Pool configuration options

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which idle objects of one key are handed back out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReuseOrder {
    /// Oldest checked-in object first
    #[default]
    Fifo,

    /// Most recently checked-in object first
    Lifo,
}

/// Configuration for keyed pool behavior
///
/// # Examples
///
/// ```
/// use keyed_objectpool::{PoolConfiguration, ReuseOrder};
///
/// let config = PoolConfiguration::new()
///     .with_name("buffers")
///     .with_reuse_order(ReuseOrder::Lifo)
///     .with_metrics(false);
///
/// assert_eq!(config.name, "buffers");
/// assert_eq!(config.reuse_order, ReuseOrder::Lifo);
/// assert!(!config.track_metrics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Name used in log events and metric labels
    pub name: String,

    /// Which idle object a check-out takes from a bucket
    pub reuse_order: ReuseOrder,

    /// Whether to maintain check-out/check-in counters
    pub track_metrics: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            reuse_order: ReuseOrder::Fifo,
            track_metrics: true,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the reuse order
    pub fn with_reuse_order(mut self, order: ReuseOrder) -> Self {
        self.reuse_order = order;
        self
    }

    /// Enable or disable metric counters
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.track_metrics = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();

        assert_eq!(config.name, "default");
        assert_eq!(config.reuse_order, ReuseOrder::Fifo);
        assert!(config.track_metrics);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: PoolConfiguration =
            serde_json::from_str(r#"{"reuse_order":"Lifo"}"#).unwrap();

        assert_eq!(config.reuse_order, ReuseOrder::Lifo);
        assert_eq!(config.name, "default");
    }
}
