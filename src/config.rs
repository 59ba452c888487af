//! Engine configuration. Constructed explicitly and passed in at engine
//! creation; there is no process-wide mutable configuration state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CatError, CatResult};
use crate::model::ModelType;

/// Newton-Raphson search parameters for the ability estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorParams {
    /// Starting ability before any responses are observed.
    pub prior_theta: f64,
    /// Standard error reported before any information is available.
    pub prior_se: f64,
    /// Stop when the update falls below this magnitude.
    pub step_tolerance: f64,
    pub max_iterations: usize,
    /// Largest single Newton step, in logits. Guards against divergence on
    /// all-correct / all-incorrect response patterns.
    pub max_step: f64,
    /// Theta is clamped to this closed interval.
    pub theta_bounds: (f64, f64),
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            prior_theta: 0.0,
            prior_se: 1.0,
            step_tolerance: 1e-4,
            max_iterations: 25,
            max_step: 1.0,
            theta_bounds: (-4.0, 4.0),
        }
    }
}

/// Stopping-rule parameters for the termination policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoppingParams {
    /// Floor preventing premature stops on an accidental early run of
    /// matching responses.
    pub min_items: usize,
    /// Hard ceiling on administered items.
    pub max_items: usize,
    /// Precision target on the ability standard error.
    pub se_threshold: f64,
}

impl Default for StoppingParams {
    fn default() -> Self {
        Self {
            min_items: 5,
            max_items: 30,
            se_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatConfig {
    pub model_type: ModelType,
    pub estimator: EstimatorParams,
    pub stopping: StoppingParams,
    /// Lifetime cap on how often a single item may be administered across
    /// all sessions. Items at or above the cap become ineligible.
    pub exposure_cap: Option<u32>,
    /// Per-session maximum administrations per content tag. Untagged items
    /// and unlisted tags are unconstrained.
    pub content_quotas: HashMap<String, usize>,
}

impl CatConfig {
    pub fn validate(&self) -> CatResult<()> {
        let est = &self.estimator;
        let stop = &self.stopping;
        if stop.max_items == 0 {
            return Err(CatError::InvalidConfig("max_items must be >= 1".into()));
        }
        if stop.min_items > stop.max_items {
            return Err(CatError::InvalidConfig(format!(
                "min_items {} exceeds max_items {}",
                stop.min_items, stop.max_items
            )));
        }
        if !(stop.se_threshold > 0.0) {
            return Err(CatError::InvalidConfig(
                "se_threshold must be positive".into(),
            ));
        }
        if !(est.step_tolerance > 0.0) {
            return Err(CatError::InvalidConfig(
                "step_tolerance must be positive".into(),
            ));
        }
        if est.max_iterations == 0 {
            return Err(CatError::InvalidConfig(
                "max_iterations must be >= 1".into(),
            ));
        }
        if !(est.max_step > 0.0) {
            return Err(CatError::InvalidConfig("max_step must be positive".into()));
        }
        if !(est.prior_se > 0.0) {
            return Err(CatError::InvalidConfig("prior_se must be positive".into()));
        }
        let (lo, hi) = est.theta_bounds;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(CatError::InvalidConfig(format!(
                "theta_bounds ({lo}, {hi}) must be a finite non-empty interval"
            )));
        }
        if !(lo..=hi).contains(&est.prior_theta) {
            return Err(CatError::InvalidConfig(format!(
                "prior_theta {} lies outside theta_bounds ({lo}, {hi})",
                est.prior_theta
            )));
        }
        if self.exposure_cap == Some(0) {
            return Err(CatError::InvalidConfig(
                "exposure_cap of 0 would make every item ineligible".into(),
            ));
        }
        Ok(())
    }

    /// Default configuration with environment overrides for the commonly
    /// tuned stopping parameters.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CAT_MIN_ITEMS") {
            if let Ok(parsed) = val.parse() {
                config.stopping.min_items = parsed;
            }
        }
        if let Ok(val) = std::env::var("CAT_MAX_ITEMS") {
            if let Ok(parsed) = val.parse() {
                config.stopping.max_items = parsed;
            }
        }
        if let Ok(val) = std::env::var("CAT_SE_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                config.stopping.se_threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("CAT_EXPOSURE_CAP") {
            if let Ok(parsed) = val.parse() {
                config.exposure_cap = Some(parsed);
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_min_items_above_max_items() {
        let mut config = CatConfig::default();
        config.stopping.min_items = 31;
        config.stopping.max_items = 30;
        assert!(matches!(
            config.validate(),
            Err(CatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_inverted_theta_bounds() {
        let mut config = CatConfig::default();
        config.estimator.theta_bounds = (2.0, -2.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_prior_outside_bounds() {
        let mut config = CatConfig::default();
        config.estimator.prior_theta = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_exposure_cap() {
        let config = CatConfig {
            exposure_cap: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_overrides_stopping_params() {
        std::env::set_var("CAT_MAX_ITEMS", "12");
        let config = CatConfig::from_env();
        assert_eq!(config.stopping.max_items, 12);
        std::env::remove_var("CAT_MAX_ITEMS");
    }
}
