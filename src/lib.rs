//! # cat-engine - Computerized Adaptive Testing core
//!
//! Pure Rust implementation of an IRT-based adaptive testing engine:
//!
//! - **IRT model** - 1PL/2PL/3PL logistic response probability and Fisher
//!   information
//! - **Ability estimator** - bounded Newton-Raphson maximum-likelihood
//!   search on theta with standard-error reporting
//! - **Item selector** - maximum-information selection with deterministic
//!   tie-breaking, content balancing and exposure control
//! - **Termination policy** - item-budget, precision and bank-exhaustion
//!   stopping rules
//! - **Session state machine** - per-examinee orchestration of the above
//!
//! ## Design
//!
//! - The item bank and configuration are injected at engine construction;
//!   there is no process-wide mutable state.
//! - All core computation is synchronous, bounded arithmetic with no I/O;
//!   callers impose deadlines and transport.
//! - Sessions are single-writer (per-session mutex) and mutually
//!   independent; the bank is shared read-only, exposure counters are
//!   atomic.
//!
//! ## Module structure
//!
//! - [`model`] - logistic response probability and item information
//! - [`estimator`] - maximum-likelihood ability estimation
//! - [`selector`] - item eligibility and maximum-information selection
//! - [`termination`] - stopping rules
//! - [`session`] - per-examinee session state machine
//! - [`engine`] - transport-agnostic facade with the session registry
//! - [`simulate`] - seeded whole-session simulation harness
//! - [`types`] - items, banks, responses, estimates
//! - [`config`] - engine configuration
//!
//! ## Usage
//!
//! ```rust
//! use cat_engine::{CatConfig, CatEngine, Item, ItemBank, Outcome};
//!
//! let bank = ItemBank::new(vec![
//!     Item::new(1, 1.0, -1.0),
//!     Item::new(2, 1.2, 0.0),
//!     Item::new(3, 0.8, 1.0),
//! ])
//! .unwrap();
//! let engine = CatEngine::new(bank, CatConfig::default()).unwrap();
//!
//! let start = engine.start_session("examinee-1").unwrap();
//! let step = engine
//!     .submit_response(start.session_id, start.first_item.id, Outcome::Correct)
//!     .unwrap();
//! assert!(step.next_item.is_some() || step.termination_reason.is_some());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod model;
pub mod selector;
pub mod session;
pub mod simulate;
pub mod termination;
pub mod types;

pub use config::{CatConfig, EstimatorParams, StoppingParams};
pub use engine::CatEngine;
pub use error::{CatError, CatResult};
pub use estimator::AbilityEstimator;
pub use model::{information, probability, ModelType};
pub use selector::{ExposureLedger, ItemSelector, SelectionContext};
pub use session::{Session, SessionResult, SessionStart, SubmitResult};
pub use simulate::{simulate_batch, simulate_session, SimulatedSession};
pub use termination::TerminationPolicy;
pub use types::{
    AbilityEstimate, Item, ItemBank, ItemId, Outcome, Response, SessionStatus, TerminationReason,
};
