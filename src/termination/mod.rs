//! Stopping rules, evaluated after every new ability estimate.
//!
//! Order matters and the first match wins:
//! 1. hard ceiling on administered items
//! 2. precision target, gated on the minimum item count and on estimator
//!    convergence
//! 3. bank exhaustion (detected by the selector, mapped here by the session)

use crate::config::StoppingParams;
use crate::types::{AbilityEstimate, TerminationReason};

#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    params: StoppingParams,
}

impl TerminationPolicy {
    pub fn new(params: StoppingParams) -> Self {
        Self { params }
    }

    /// Checks the estimate-driven stopping conditions (1 and 2). Bank
    /// exhaustion is reported separately by the item selector.
    pub fn check(&self, administered: usize, estimate: &AbilityEstimate) -> Option<TerminationReason> {
        if administered >= self.params.max_items {
            return Some(TerminationReason::MaxItemsReached);
        }
        if administered >= self.params.min_items
            && estimate.se <= self.params.se_threshold
            && estimate.converged
        {
            return Some(TerminationReason::PrecisionReached);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StoppingParams {
        StoppingParams {
            min_items: 5,
            max_items: 30,
            se_threshold: 0.3,
        }
    }

    fn estimate(se: f64, converged: bool) -> AbilityEstimate {
        AbilityEstimate {
            theta: 0.0,
            se,
            converged,
        }
    }

    #[test]
    fn test_max_items_fires_first() {
        let policy = TerminationPolicy::new(params());
        // Precision is also met, but the ceiling wins.
        assert_eq!(
            policy.check(30, &estimate(0.1, true)),
            Some(TerminationReason::MaxItemsReached)
        );
    }

    #[test]
    fn test_precision_requires_min_items() {
        let policy = TerminationPolicy::new(params());
        assert_eq!(policy.check(4, &estimate(0.1, true)), None);
        assert_eq!(
            policy.check(5, &estimate(0.1, true)),
            Some(TerminationReason::PrecisionReached)
        );
    }

    #[test]
    fn test_precision_blocked_without_convergence() {
        let policy = TerminationPolicy::new(params());
        assert_eq!(policy.check(10, &estimate(0.1, false)), None);
    }

    #[test]
    fn test_precision_blocked_above_threshold() {
        let policy = TerminationPolicy::new(params());
        assert_eq!(policy.check(10, &estimate(0.31, true)), None);
        assert_eq!(
            policy.check(10, &estimate(0.3, true)),
            Some(TerminationReason::PrecisionReached)
        );
    }

    #[test]
    fn test_continue_when_nothing_fires() {
        let policy = TerminationPolicy::new(params());
        assert_eq!(policy.check(10, &estimate(0.8, true)), None);
    }
}
