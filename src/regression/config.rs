// Tolerance configuration for regression checks

use serde::{Deserialize, Serialize};

/// How far a fresh evaluation may stray and how often it may be retried
///
/// # Example
/// ```
/// use trust_random::regression::ToleranceConfig;
///
/// let config = ToleranceConfig::default();
/// assert_eq!(config.acceptable_st_devs, 2.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Symmetric band half-width in standard deviations
    ///
    /// With Gaussian outputs, 2.5 passes about 98.8% of honest evaluations
    /// per field; see [`crate::regression::failure_probabilities`] for the
    /// suite-wide picture.
    pub acceptable_st_devs: f64,

    /// Extra evaluation attempts before a grid point is declared failing
    pub allowed_retries: u32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            acceptable_st_devs: 2.5,
            allowed_retries: 5,
        }
    }
}

impl ToleranceConfig {
    /// Total attempts a check may make
    pub fn max_attempts(&self) -> u32 {
        self.allowed_retries.saturating_add(1)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.acceptable_st_devs.is_finite() || self.acceptable_st_devs < 0.0 {
            return Err(format!(
                "acceptable_st_devs must be a non-negative number, got {}",
                self.acceptable_st_devs
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToleranceConfig::default();
        assert_eq!(config.acceptable_st_devs, 2.5);
        assert_eq!(config.allowed_retries, 5);
        assert_eq!(config.max_attempts(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_st_devs_is_valid() {
        let config = ToleranceConfig {
            acceptable_st_devs: 0.0,
            allowed_retries: 0,
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn test_invalid_st_devs() {
        for bad in [-0.5, f64::NAN, f64::INFINITY] {
            let config = ToleranceConfig {
                acceptable_st_devs: bad,
                allowed_retries: 0,
            };
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }
    }
}
