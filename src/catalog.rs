//! Product catalog lookup for cycle times.

use std::collections::HashMap;

use chrono::Duration;

/// Read-only source of per-product cycle times.
pub trait ProductCatalog: Send + Sync {
    /// Seconds to produce one unit, if the product has a timed cycle.
    fn cycle_time_seconds(&self, product_ref: &str) -> Option<f64>;

    /// Cycle time in whole milliseconds. `None` for products without a
    /// positive cycle, which the simulator leaves alone.
    fn cycle_time(&self, product_ref: &str) -> Option<Duration> {
        let secs = self.cycle_time_seconds(product_ref)?;
        if !secs.is_finite() || secs <= 0.0 {
            return None;
        }
        let millis = (secs * 1000.0).round() as i64;
        (millis > 0).then(|| Duration::milliseconds(millis))
    }
}

/// Catalog backed by a product → seconds map, usually from `floorline.toml`.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    cycles: HashMap<String, f64>,
}

impl StaticCatalog {
    pub fn new(cycles: HashMap<String, f64>) -> Self {
        Self { cycles }
    }

    pub fn with_product(mut self, product_ref: impl Into<String>, cycle_secs: f64) -> Self {
        self.cycles.insert(product_ref.into(), cycle_secs);
        self
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl ProductCatalog for StaticCatalog {
    fn cycle_time_seconds(&self, product_ref: &str) -> Option<f64> {
        self.cycles.get(product_ref).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_millis() {
        let catalog = StaticCatalog::default().with_product("CAP-28", 12.5);
        assert_eq!(catalog.cycle_time("CAP-28"), Some(Duration::milliseconds(12_500)));
    }

    #[test]
    fn missing_or_non_positive_is_inert() {
        let catalog = StaticCatalog::default()
            .with_product("ZERO", 0.0)
            .with_product("NEG", -3.0)
            .with_product("NAN", f64::NAN);
        assert!(catalog.cycle_time("ZERO").is_none());
        assert!(catalog.cycle_time("NEG").is_none());
        assert!(catalog.cycle_time("NAN").is_none());
        assert!(catalog.cycle_time("UNKNOWN").is_none());
    }
}
