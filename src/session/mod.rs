//! Per-examinee session state machine.
//!
//! A session owns the administered history and current estimate and
//! orchestrates the estimator, selector and termination policy on every
//! response. States are `InProgress` and `Completed`; `Completed` is final
//! and freezes the estimate as the final score.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CatConfig;
use crate::error::{CatError, CatResult};
use crate::estimator::AbilityEstimator;
use crate::selector::{ExposureLedger, ItemSelector, SelectionContext};
use crate::termination::TerminationPolicy;
use crate::types::{
    AbilityEstimate, Item, ItemBank, ItemId, Outcome, Response, SessionStatus, TerminationReason,
};

/// Result of starting a session: the first item is issued immediately.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub first_item: Item,
    pub estimate: AbilityEstimate,
}

/// Result of recording one response.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub status: SessionStatus,
    /// Present iff the session continues.
    pub next_item: Option<Item>,
    pub estimate: AbilityEstimate,
    /// Present iff the session completed on this response.
    pub termination_reason: Option<TerminationReason>,
}

/// Frozen view of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub examinee_id: String,
    pub estimate: AbilityEstimate,
    pub administered: Vec<Item>,
    pub responses: Vec<Response>,
    pub termination_reason: TerminationReason,
}

pub struct Session {
    id: Uuid,
    examinee_id: String,
    bank: Arc<ItemBank>,
    config: Arc<CatConfig>,
    ledger: Arc<ExposureLedger>,
    estimator: AbilityEstimator,
    selector: ItemSelector,
    policy: TerminationPolicy,
    /// Answered items, index-aligned with `responses`.
    administered: Vec<Item>,
    responses: Vec<Response>,
    /// Every issued identifier, including the pending one; the selector's
    /// exclusion set.
    issued: Vec<ItemId>,
    tag_counts: HashMap<String, usize>,
    /// The currently issued, not yet answered item. `None` only once
    /// completed.
    pending: Option<Item>,
    estimate: AbilityEstimate,
    status: SessionStatus,
    reason: Option<TerminationReason>,
}

impl Session {
    /// Creates a session with the cold-start estimate and issues the first
    /// item. Fails with `NoEligibleItems` when nothing in the bank may be
    /// administered (for instance, everything is at its exposure cap).
    pub fn start(
        examinee_id: impl Into<String>,
        bank: Arc<ItemBank>,
        config: Arc<CatConfig>,
        ledger: Arc<ExposureLedger>,
    ) -> CatResult<Self> {
        let estimator = AbilityEstimator::new(config.model_type, config.estimator.clone());
        let estimate = estimator.prior();
        let mut session = Self {
            id: Uuid::new_v4(),
            examinee_id: examinee_id.into(),
            selector: ItemSelector::new(config.model_type),
            policy: TerminationPolicy::new(config.stopping.clone()),
            estimator,
            bank,
            config,
            ledger,
            administered: Vec::new(),
            responses: Vec::new(),
            issued: Vec::new(),
            tag_counts: HashMap::new(),
            pending: None,
            estimate,
            status: SessionStatus::InProgress,
            reason: None,
        };
        if session.issue_next().is_none() {
            return Err(CatError::NoEligibleItems);
        }
        Ok(session)
    }

    /// Records the answer to the currently issued item, re-estimates
    /// ability, and either completes the session or issues the next item.
    ///
    /// Out-of-order submissions and submissions to a completed session are
    /// rejected without mutating any state.
    pub fn record_response(&mut self, item_id: ItemId, outcome: Outcome) -> CatResult<SubmitResult> {
        if self.status == SessionStatus::Completed {
            return Err(CatError::SessionAlreadyCompleted(self.id));
        }
        let expected = self
            .pending
            .as_ref()
            .map(|item| item.id)
            .ok_or(CatError::SessionAlreadyCompleted(self.id))?;
        if expected != item_id {
            return Err(CatError::OutOfOrderResponse {
                expected,
                got: item_id,
            });
        }
        outcome.validate()?;

        let answered = self
            .pending
            .take()
            .ok_or(CatError::SessionAlreadyCompleted(self.id))?;
        self.administered.push(answered);
        self.responses.push(Response {
            item_id,
            outcome,
            timestamp_ms: Utc::now().timestamp_millis(),
        });

        self.estimate = self
            .estimator
            .estimate(&self.administered, &self.responses);

        if let Some(reason) = self.policy.check(self.administered.len(), &self.estimate) {
            return Ok(self.complete(reason));
        }

        match self.issue_next() {
            Some(item) => Ok(SubmitResult {
                status: SessionStatus::InProgress,
                next_item: Some(item),
                estimate: self.estimate,
                termination_reason: None,
            }),
            None => Ok(self.complete(TerminationReason::BankExhausted)),
        }
    }

    /// Selects, books and returns the next item at the current estimate.
    fn issue_next(&mut self) -> Option<Item> {
        let ctx = SelectionContext {
            administered: &self.issued,
            tag_counts: &self.tag_counts,
            quotas: &self.config.content_quotas,
            exposure: self
                .config
                .exposure_cap
                .map(|cap| (self.ledger.as_ref(), cap)),
        };
        let item = self
            .selector
            .select(self.estimate.theta, &self.bank, &ctx)?
            .clone();

        self.issued.push(item.id);
        if let Some(tag) = &item.tag {
            *self.tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
        self.ledger.record(item.id);
        self.pending = Some(item.clone());
        Some(item)
    }

    fn complete(&mut self, reason: TerminationReason) -> SubmitResult {
        self.status = SessionStatus::Completed;
        self.reason = Some(reason);
        self.pending = None;
        SubmitResult {
            status: SessionStatus::Completed,
            next_item: None,
            estimate: self.estimate,
            termination_reason: Some(reason),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn examinee_id(&self) -> &str {
        &self.examinee_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn estimate(&self) -> AbilityEstimate {
        self.estimate
    }

    pub fn pending_item(&self) -> Option<&Item> {
        self.pending.as_ref()
    }

    pub fn administered(&self) -> &[Item] {
        &self.administered
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.reason
    }

    /// Frozen result, only available once completed.
    pub fn result(&self) -> CatResult<SessionResult> {
        match self.reason {
            Some(reason) if self.status == SessionStatus::Completed => Ok(SessionResult {
                session_id: self.id,
                examinee_id: self.examinee_id.clone(),
                estimate: self.estimate,
                administered: self.administered.clone(),
                responses: self.responses.clone(),
                termination_reason: reason,
            }),
            _ => Err(CatError::SessionInProgress(self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_item_bank() -> Arc<ItemBank> {
        Arc::new(
            ItemBank::new(vec![
                Item::new(1, 1.0, -1.0),
                Item::new(2, 1.2, 0.0),
                Item::new(3, 0.8, 1.0),
            ])
            .unwrap(),
        )
    }

    fn session_with(bank: Arc<ItemBank>, config: CatConfig) -> Session {
        let ledger = Arc::new(ExposureLedger::new(&bank));
        Session::start("examinee-1", bank, Arc::new(config), ledger).unwrap()
    }

    fn short_config() -> CatConfig {
        let mut config = CatConfig::default();
        config.stopping.min_items = 2;
        config.stopping.max_items = 3;
        config.stopping.se_threshold = 0.5;
        config
    }

    #[test]
    fn test_first_item_maximizes_information_at_prior() {
        let session = session_with(three_item_bank(), short_config());
        assert_eq!(session.pending_item().unwrap().id, 2);
        assert!(!session.estimate().converged);
        assert_eq!(session.estimate().theta, 0.0);
    }

    #[test]
    fn test_all_correct_run_terminates_at_max_items() {
        let mut session = session_with(three_item_bank(), short_config());
        let mut issued = session.pending_item().unwrap().id;
        let mut last = None;
        for _ in 0..3 {
            let result = session.record_response(issued, Outcome::Correct).unwrap();
            if let Some(next) = &result.next_item {
                issued = next.id;
            }
            last = Some(result);
        }
        let last = last.unwrap();
        assert_eq!(last.status, SessionStatus::Completed);
        assert_eq!(last.termination_reason, Some(TerminationReason::MaxItemsReached));
        assert_eq!(session.administered().len(), 3);
        // All-correct never converges; theta sits at the upper bound.
        assert!(!last.estimate.converged);
        assert!(last.estimate.theta > 3.9);
    }

    #[test]
    fn test_all_incorrect_exhausts_bank_without_looping() {
        let mut config = short_config();
        config.stopping.max_items = 10;
        let mut session = session_with(three_item_bank(), config);
        let mut issued = session.pending_item().unwrap().id;
        let mut submissions = 0;
        loop {
            let result = session.record_response(issued, Outcome::Incorrect).unwrap();
            submissions += 1;
            assert!(submissions <= 3, "session must not outlive the bank");
            match result.next_item {
                Some(next) => issued = next.id,
                None => {
                    assert_eq!(result.termination_reason, Some(TerminationReason::BankExhausted));
                    assert!(!result.estimate.converged);
                    break;
                }
            }
        }
        assert_eq!(session.administered().len(), 3);
    }

    #[test]
    fn test_precision_reached_on_balanced_responses() {
        // Identical high-discrimination items: theta stays interior and the
        // SE crosses the threshold after four balanced responses.
        let bank = Arc::new(
            ItemBank::new((1..=10).map(|id| Item::new(id, 2.0, 0.0)).collect()).unwrap(),
        );
        let mut config = CatConfig::default();
        config.stopping.min_items = 2;
        config.stopping.max_items = 10;
        config.stopping.se_threshold = 0.6;
        let mut session = session_with(bank, config);

        let mut correct = true;
        let mut completed = None;
        while completed.is_none() {
            let issued = session.pending_item().unwrap().id;
            let result = session
                .record_response(issued, Outcome::from_correct(correct))
                .unwrap();
            correct = !correct;
            if result.status == SessionStatus::Completed {
                completed = Some(result);
            }
        }
        let result = completed.unwrap();
        assert_eq!(result.termination_reason, Some(TerminationReason::PrecisionReached));
        assert_eq!(session.administered().len(), 4);
        assert!(result.estimate.converged);
        assert!(result.estimate.se <= 0.6);
        assert!(result.estimate.theta.abs() < 1e-6);
    }

    #[test]
    fn test_out_of_order_response_leaves_state_unchanged() {
        let mut session = session_with(three_item_bank(), short_config());
        let issued = session.pending_item().unwrap().id;
        let wrong = if issued == 1 { 3 } else { 1 };

        let err = session.record_response(wrong, Outcome::Correct).unwrap_err();
        match err {
            CatError::OutOfOrderResponse { expected, got } => {
                assert_eq!(expected, issued);
                assert_eq!(got, wrong);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.administered().len(), 0);
        assert_eq!(session.estimate().theta, 0.0);
        assert_eq!(session.status(), SessionStatus::InProgress);

        // The correct item is still accepted afterwards.
        assert!(session.record_response(issued, Outcome::Correct).is_ok());
    }

    #[test]
    fn test_completed_session_rejects_further_responses() {
        let mut session = session_with(three_item_bank(), short_config());
        let mut issued = session.pending_item().unwrap().id;
        loop {
            let result = session.record_response(issued, Outcome::Correct).unwrap();
            match result.next_item {
                Some(next) => issued = next.id,
                None => break,
            }
        }
        let err = session.record_response(issued, Outcome::Correct).unwrap_err();
        assert!(matches!(err, CatError::SessionAlreadyCompleted(_)));
    }

    #[test]
    fn test_result_unavailable_while_in_progress() {
        let session = session_with(three_item_bank(), short_config());
        assert!(matches!(
            session.result(),
            Err(CatError::SessionInProgress(_))
        ));
    }

    #[test]
    fn test_content_quota_limits_tagged_administrations() {
        let bank = Arc::new(
            ItemBank::new(vec![
                Item::new(1, 1.2, 0.0).with_tag("algebra"),
                Item::new(2, 1.0, 0.0).with_tag("algebra"),
                Item::new(3, 0.8, 0.0).with_tag("geometry"),
            ])
            .unwrap(),
        );
        let mut config = CatConfig::default();
        config.stopping.max_items = 10;
        config.content_quotas.insert("algebra".to_string(), 1);
        let mut session = session_with(bank, config);

        assert_eq!(session.pending_item().unwrap().id, 1);
        let result = session.record_response(1, Outcome::Correct).unwrap();
        // The second algebra item is blocked by the quota.
        assert_eq!(result.next_item.unwrap().id, 3);
        let result = session.record_response(3, Outcome::Correct).unwrap();
        assert_eq!(result.termination_reason, Some(TerminationReason::BankExhausted));
        let ids: Vec<_> = session.administered().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_graded_outcome_is_accepted() {
        let mut session = session_with(three_item_bank(), short_config());
        let issued = session.pending_item().unwrap().id;
        let result = session.record_response(issued, Outcome::Partial(0.5)).unwrap();
        assert_eq!(result.status, SessionStatus::InProgress);

        let err = session
            .record_response(result.next_item.unwrap().id, Outcome::Partial(1.5))
            .unwrap_err();
        assert!(matches!(err, CatError::InvalidOutcome { .. }));
    }
}
