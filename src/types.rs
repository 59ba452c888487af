//! Shared data types: items, the item bank, responses, ability estimates and
//! session-level result records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CatError, CatResult};

/// Total information below this level is treated as numerically zero; the
/// estimator then falls back to the prior standard error.
pub const MIN_INFORMATION: f64 = 1e-10;

pub type ItemId = u64;

/// A calibrated test item. Immutable during a session; only the shared
/// exposure counters (kept outside the bank) change across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Discrimination (a). Must be > 0.
    pub a: f64,
    /// Difficulty (b), on the theta scale.
    pub b: f64,
    /// Pseudo-guessing (c). Must lie in [0, 1); 0 for 1PL/2PL items.
    #[serde(default)]
    pub c: f64,
    /// Optional content tag used by per-session content balancing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Item {
    pub fn new(id: ItemId, a: f64, b: f64) -> Self {
        Self {
            id,
            a,
            b,
            c: 0.0,
            tag: None,
        }
    }

    pub fn with_guessing(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Rejects malformed calibration data. Checked at bank load, never
    /// silently skipped.
    pub fn validate(&self) -> CatResult<()> {
        if !self.a.is_finite() || !self.b.is_finite() || !self.c.is_finite() {
            return Err(CatError::InvalidItemParameters {
                id: self.id,
                reason: "non-finite parameter".to_string(),
            });
        }
        if self.a <= 0.0 {
            return Err(CatError::InvalidItemParameters {
                id: self.id,
                reason: format!("discrimination a = {} must be > 0", self.a),
            });
        }
        if !(0.0..1.0).contains(&self.c) {
            return Err(CatError::InvalidItemParameters {
                id: self.id,
                reason: format!("guessing c = {} must lie in [0, 1)", self.c),
            });
        }
        Ok(())
    }
}

/// An ordered, validated collection of items. Construction rejects malformed
/// entries and duplicate identifiers; after that the bank is read-only and
/// safely shared across sessions.
#[derive(Debug, Clone, Serialize)]
pub struct ItemBank {
    items: Vec<Item>,
}

impl ItemBank {
    pub fn new(items: Vec<Item>) -> CatResult<Self> {
        if items.is_empty() {
            return Err(CatError::EmptyItemBank);
        }
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            item.validate()?;
            if !seen.insert(item.id) {
                return Err(CatError::InvalidItemParameters {
                    id: item.id,
                    reason: "duplicate item identifier".to_string(),
                });
            }
        }
        Ok(Self { items })
    }

    /// Loads a bank from a JSON array of item records.
    pub fn from_json(json: &str) -> CatResult<Self> {
        let items: Vec<Item> = serde_json::from_str(json)?;
        Self::new(items)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of one item administration. `Partial` carries a fractional score
/// strictly between 0 and 1 for graded response formats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Partial(f64),
}

impl Outcome {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }

    /// Score u in [0, 1] as used by the likelihood gradient.
    pub fn score(&self) -> f64 {
        match self {
            Outcome::Correct => 1.0,
            Outcome::Incorrect => 0.0,
            Outcome::Partial(score) => *score,
        }
    }

    pub fn validate(&self) -> CatResult<()> {
        if let Outcome::Partial(score) = self {
            if !score.is_finite() || *score <= 0.0 || *score >= 1.0 {
                return Err(CatError::InvalidOutcome { score: *score });
            }
        }
        Ok(())
    }
}

/// Immutable record of one administration. Appended to session history,
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub item_id: ItemId,
    pub outcome: Outcome,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Point estimate of ability with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityEstimate {
    pub theta: f64,
    pub se: f64,
    /// True iff the Newton-Raphson iteration stopped by tolerance rather
    /// than by the iteration cap or a clamped final step.
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Why a completed session stopped. First matching condition wins; see the
/// termination policy for the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxItemsReached,
    PrecisionReached,
    BankExhausted,
}
