//! Sparse parameter maps for the mode-parameter surface.
//!
//! External control reaches engines as a sparse key/value map. Values
//! are never trusted verbatim: engines clamp every value they read, and
//! unknown keys are silently ignored rather than treated as errors.

use std::collections::HashMap;

/// Sparse, string-keyed parameter map.
#[derive(Debug, Clone, Default)]
pub struct ParamMap {
    values: HashMap<String, f32>,
}

impl ParamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: &str, value: f32) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), value);
    }

    /// Read a raw value.
    pub fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    /// Read a value clamped to `[min, max]`. Non-finite values are
    /// dropped entirely — a NaN from outside must never reach a filter
    /// coefficient.
    pub fn get_clamped(&self, key: &str, min: f32, max: f32) -> Option<f32> {
        self.get(key)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(min, max))
    }

    /// Whether the map carries no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f32)> for ParamMap {
    fn from_iter<T: IntoIterator<Item = (String, f32)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let p = ParamMap::new().with("density", 7.5);
        assert_eq!(p.get_clamped("density", 0.0, 1.0), Some(1.0));
    }

    #[test]
    fn drops_non_finite_values() {
        let p = ParamMap::new()
            .with("a", f32::NAN)
            .with("b", f32::INFINITY);
        assert_eq!(p.get_clamped("a", 0.0, 1.0), None);
        assert_eq!(p.get_clamped("b", 0.0, 1.0), None);
    }

    #[test]
    fn unknown_keys_read_as_none() {
        let p = ParamMap::new().with("known", 1.0);
        assert_eq!(p.get("unknown"), None);
    }
}
