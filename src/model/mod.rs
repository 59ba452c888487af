//! Logistic IRT response model.
//!
//! Mathematical formulas:
//! - Response probability (3PL): P = c + (1 - c) / (1 + exp(-a (theta - b)))
//!   - a: discrimination, b: difficulty, c: pseudo-guessing
//!   - 2PL fixes c = 0; 1PL additionally fixes a = 1
//! - Fisher information: I = a^2 (P - c)^2 (1 - P) / ((1 - c)^2 P)
//!   - peaks near theta = b when c = 0
//!
//! Both functions are pure and total over validated item parameters. The
//! probability is clamped away from 0 and 1 before it enters any ratio or
//! logarithm.
//!
//! References:
//! - Lord, F. M. (1980). Applications of item response theory.
//! - van der Linden, W. J., & Glas, C. A. W. (2010). Elements of adaptive testing.

use serde::{Deserialize, Serialize};

/// Clamp bound keeping probabilities inside the open unit interval.
pub const PROB_EPS: f64 = 1e-6;

/// Which logistic model evaluates the bank's a/b/c parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Rasch form: a fixed to 1, c fixed to 0.
    OnePl,
    /// a free, c fixed to 0.
    #[default]
    TwoPl,
    /// a, b and c all free.
    ThreePl,
}

impl ModelType {
    /// Effective (a, b, c) triple for evaluation under this model.
    pub fn constrain(&self, a: f64, b: f64, c: f64) -> (f64, f64, f64) {
        match self {
            ModelType::OnePl => (1.0, b, 0.0),
            ModelType::TwoPl => (a, b, 0.0),
            ModelType::ThreePl => (a, b, c),
        }
    }
}

/// Probability of a correct response at `theta` under the 3PL form,
/// clamped to (PROB_EPS, 1 - PROB_EPS).
pub fn probability(theta: f64, a: f64, b: f64, c: f64) -> f64 {
    let p = c + (1.0 - c) / (1.0 + (-a * (theta - b)).exp());
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Fisher information of the item at `theta`, using the clamped probability.
/// Reduces to a^2 p (1 - p) when c = 0.
pub fn information(theta: f64, a: f64, b: f64, c: f64) -> f64 {
    let p = probability(theta, a, b, c);
    a * a * (p - c).powi(2) * (1.0 - p) / ((1.0 - c).powi(2) * p)
}
