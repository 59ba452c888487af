//! Transport-agnostic engine facade.
//!
//! Owns the shared read-only item bank, the configuration, the cross-session
//! exposure ledger and the session registry. Each session sits behind its
//! own mutex, so submissions for one session are serialized while distinct
//! sessions proceed in parallel. No I/O happens here; callers wrap these
//! operations in whatever transport and deadline policy they need.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::CatConfig;
use crate::error::{CatError, CatResult};
use crate::selector::ExposureLedger;
use crate::session::{Session, SessionResult, SessionStart, SubmitResult};
use crate::types::{ItemBank, ItemId, Outcome, SessionStatus};

pub struct CatEngine {
    bank: Arc<ItemBank>,
    config: Arc<CatConfig>,
    ledger: Arc<ExposureLedger>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl CatEngine {
    /// Builds an engine around a validated bank and configuration. Both are
    /// injected here; the engine keeps no process-wide mutable state.
    pub fn new(bank: ItemBank, config: CatConfig) -> CatResult<Self> {
        config.validate()?;
        let bank = Arc::new(bank);
        let ledger = Arc::new(ExposureLedger::new(&bank));
        Ok(Self {
            bank,
            config: Arc::new(config),
            ledger,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn bank(&self) -> &ItemBank {
        &self.bank
    }

    pub fn exposure_count(&self, item_id: ItemId) -> u32 {
        self.ledger.count(item_id)
    }

    /// Creates a session and issues its first item.
    pub fn start_session(&self, examinee_id: &str) -> CatResult<SessionStart> {
        let session = Session::start(
            examinee_id,
            Arc::clone(&self.bank),
            Arc::clone(&self.config),
            Arc::clone(&self.ledger),
        )?;
        let start = SessionStart {
            session_id: session.id(),
            first_item: session
                .pending_item()
                .cloned()
                .ok_or(CatError::NoEligibleItems)?,
            estimate: session.estimate(),
        };
        tracing::info!(
            session_id = %start.session_id,
            examinee_id,
            first_item = start.first_item.id,
            "session started"
        );
        self.sessions
            .write()
            .insert(start.session_id, Arc::new(Mutex::new(session)));
        Ok(start)
    }

    /// Records a response for the session's currently issued item. Calls for
    /// the same session are serialized by the per-session mutex.
    pub fn submit_response(
        &self,
        session_id: Uuid,
        item_id: ItemId,
        outcome: Outcome,
    ) -> CatResult<SubmitResult> {
        let session = self.session_handle(session_id)?;
        let mut session = session.lock();
        let result = session.record_response(item_id, outcome);
        match &result {
            Ok(submit) if submit.status == SessionStatus::Completed => {
                tracing::info!(
                    session_id = %session_id,
                    administered = session.administered().len(),
                    theta = submit.estimate.theta,
                    se = submit.estimate.se,
                    reason = ?submit.termination_reason,
                    "session completed"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "response rejected");
            }
        }
        result
    }

    /// Frozen result of a completed session. Idempotent: repeated calls
    /// return identical output.
    pub fn session_result(&self, session_id: Uuid) -> CatResult<SessionResult> {
        let session = self.session_handle(session_id)?;
        let session = session.lock();
        session.result()
    }

    pub fn session_status(&self, session_id: Uuid) -> CatResult<SessionStatus> {
        let session = self.session_handle(session_id)?;
        let status = session.lock().status();
        Ok(status)
    }

    fn session_handle(&self, session_id: Uuid) -> CatResult<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .get(&session_id)
            .cloned()
            .ok_or(CatError::SessionNotFound(session_id))
    }
}
