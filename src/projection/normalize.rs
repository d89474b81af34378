//! Percentage to distance conversion

use serde::{Deserialize, Serialize};

/// Linear range used to rescale a percentage into millimetres.
///
/// `min` may be larger than `max`; the axis is then flipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRange {
    pub min: f64,
    pub max: f64,
}

impl CoordinateRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Convert a percentage along this range to a distance
    pub fn to_distance(&self, percent: f64) -> f64 {
        normalize(percent, self.min, self.max)
    }
}

/// Convert a percentage to a distance between `min` and `max`.
///
/// No clamping: values outside [0, 100] extrapolate linearly.
pub fn normalize(percent: f64, min: f64, max: f64) -> f64 {
    percent / 100.0 * (max - min) + min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(normalize(0.0, 3.0, 17.0), 3.0);
        assert_eq!(normalize(100.0, 3.0, 17.0), 17.0);
        assert_eq!(normalize(50.0, 0.0, 10.0), 5.0);
    }

    #[test]
    fn test_flipped_range() {
        let range = CoordinateRange::new(24.6, 0.0);
        assert_eq!(range.to_distance(0.0), 24.6);
        assert_eq!(range.to_distance(100.0), 0.0);
    }

    #[test]
    fn test_no_clamping() {
        assert_eq!(normalize(150.0, 0.0, 10.0), 15.0);
        assert_eq!(normalize(-10.0, 0.0, 10.0), -1.0);
    }
}
