use uuid::Uuid;

use crate::types::ItemId;

/// Errors surfaced by the engine. Each is local to a single session's
/// operation; none of them leaves shared state (item bank, exposure
/// counters, other sessions) in an inconsistent condition.
#[derive(Debug, thiserror::Error)]
pub enum CatError {
    /// Item with a <= 0, c outside [0, 1), a non-finite parameter, or a
    /// duplicated identifier. Raised at bank load, before any session starts.
    #[error("invalid parameters for item {id}: {reason}")]
    InvalidItemParameters { id: ItemId, reason: String },

    #[error("item bank contains no items")]
    EmptyItemBank,

    #[error("item bank parse error: {0}")]
    BankParse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Partial-credit scores must lie strictly between 0 and 1.
    #[error("invalid outcome score {score}: partial credit must lie in (0, 1)")]
    InvalidOutcome { score: f64 },

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("session {0} is already completed")]
    SessionAlreadyCompleted(Uuid),

    /// `session_result` is only available once the session has completed.
    #[error("session {0} is still in progress")]
    SessionInProgress(Uuid),

    /// The submitted item is not the one currently issued. Recoverable:
    /// session state is unchanged, the caller resubmits for the right item.
    #[error("out-of-order response: expected item {expected}, got {got}")]
    OutOfOrderResponse { expected: ItemId, got: ItemId },

    /// No item in the bank is eligible for a fresh session (exposure caps
    /// may have excluded everything).
    #[error("no eligible items available to start a session")]
    NoEligibleItems,
}

pub type CatResult<T> = Result<T, CatError>;
