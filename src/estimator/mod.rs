//! Maximum-likelihood ability estimation.
//!
//! Newton-Raphson search on theta over the administered (item, response)
//! pairs:
//! - gradient of the log-likelihood: Σ a_i (u_i - p_i)
//! - observed information: Σ I_i(theta)
//! - update: theta <- theta + gradient / information
//!
//! The iteration is a bounded synchronous loop. Each step is clamped to
//! `max_step` logits and theta to `theta_bounds`; without the clamp an
//! all-correct or all-incorrect history has no interior maximum and the
//! search diverges. The standard error of the final estimate is
//! 1 / sqrt(total information), falling back to the prior standard error
//! when total information is numerically zero.

use crate::config::EstimatorParams;
use crate::model::{information, probability, ModelType};
use crate::types::{AbilityEstimate, Item, Response, MIN_INFORMATION};

#[derive(Debug, Clone)]
pub struct AbilityEstimator {
    model: ModelType,
    params: EstimatorParams,
}

impl AbilityEstimator {
    pub fn new(model: ModelType, params: EstimatorParams) -> Self {
        Self { model, params }
    }

    /// The cold-start estimate returned before any responses exist.
    pub fn prior(&self) -> AbilityEstimate {
        AbilityEstimate {
            theta: self.params.prior_theta,
            se: self.params.prior_se,
            converged: false,
        }
    }

    /// Estimates ability from the full administered history. `items` and
    /// `responses` are index-aligned; an empty history yields the prior.
    pub fn estimate(&self, items: &[Item], responses: &[Response]) -> AbilityEstimate {
        debug_assert_eq!(items.len(), responses.len());
        if items.is_empty() {
            return self.prior();
        }

        let (lo, hi) = self.params.theta_bounds;
        let mut theta = self.params.prior_theta.clamp(lo, hi);
        let mut converged = false;

        for _ in 0..self.params.max_iterations {
            let (gradient, info) = self.score_and_information(items, responses, theta);
            if info < MIN_INFORMATION {
                break;
            }
            let raw_step = gradient / info;
            let next = (theta + raw_step.clamp(-self.params.max_step, self.params.max_step))
                .clamp(lo, hi);
            let moved = next - theta;
            theta = next;

            if raw_step.abs() < self.params.step_tolerance {
                converged = true;
                break;
            }
            // A tiny realized step with a large proposed one means the
            // clamp, not the likelihood, stopped the search.
            if moved.abs() < self.params.step_tolerance {
                break;
            }
        }

        let (_, total_information) = self.score_and_information(items, responses, theta);
        if total_information < MIN_INFORMATION {
            return AbilityEstimate {
                theta,
                se: self.params.prior_se,
                converged: false,
            };
        }

        AbilityEstimate {
            theta,
            se: 1.0 / total_information.sqrt(),
            converged,
        }
    }

    fn score_and_information(
        &self,
        items: &[Item],
        responses: &[Response],
        theta: f64,
    ) -> (f64, f64) {
        let mut gradient = 0.0;
        let mut total_information = 0.0;
        for (item, response) in items.iter().zip(responses) {
            let (a, b, c) = self.model.constrain(item.a, item.b, item.c);
            let p = probability(theta, a, b, c);
            gradient += a * (response.outcome.score() - p);
            total_information += information(theta, a, b, c);
        }
        (gradient, total_information)
    }
}
