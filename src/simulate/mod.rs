//! Session simulation against a known true ability.
//!
//! Each administered item is answered correctly with the model probability
//! at `true_theta`, drawn from a seeded RNG so runs are reproducible.
//! Useful for item-bank evaluation (how many items a bank needs to reach a
//! precision target) and for exercising the full engine loop in tests.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::CatConfig;
use crate::error::CatResult;
use crate::model::probability;
use crate::selector::ExposureLedger;
use crate::session::Session;
use crate::types::{AbilityEstimate, ItemBank, ItemId, Outcome, SessionStatus, TerminationReason};

#[derive(Debug, Clone, Serialize)]
pub struct SimulatedSession {
    pub true_theta: f64,
    pub final_estimate: AbilityEstimate,
    pub administered: Vec<ItemId>,
    pub outcomes: Vec<bool>,
    pub termination_reason: TerminationReason,
}

/// Runs one simulated session to completion. The exposure ledger is local
/// to this call, so simulation never perturbs production exposure counts.
pub fn simulate_session(
    bank: &ItemBank,
    config: &CatConfig,
    true_theta: f64,
    seed: u64,
) -> CatResult<SimulatedSession> {
    let bank = Arc::new(bank.clone());
    let ledger = Arc::new(ExposureLedger::new(&bank));
    let mut session = Session::start("simulated", Arc::clone(&bank), Arc::new(config.clone()), ledger)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut administered = Vec::new();
    let mut outcomes = Vec::new();
    let mut reason = None;

    while session.status() == SessionStatus::InProgress {
        let item = match session.pending_item() {
            Some(item) => item.clone(),
            None => break,
        };
        let (a, b, c) = config.model_type.constrain(item.a, item.b, item.c);
        let p = probability(true_theta, a, b, c);
        let correct = rng.gen::<f64>() < p;

        administered.push(item.id);
        outcomes.push(correct);
        let result = session.record_response(item.id, Outcome::from_correct(correct))?;
        reason = result.termination_reason;
    }

    Ok(SimulatedSession {
        true_theta,
        final_estimate: session.estimate(),
        administered,
        outcomes,
        // A started session only leaves the loop by completing.
        termination_reason: reason.unwrap_or(TerminationReason::BankExhausted),
    })
}

/// Simulates one session per (true theta, replication) pair in parallel.
/// Seeds are derived per task, so the batch is reproducible as a whole.
pub fn simulate_batch(
    bank: &ItemBank,
    config: &CatConfig,
    true_thetas: &[f64],
    replications: usize,
    seed: u64,
) -> CatResult<Vec<SimulatedSession>> {
    let tasks: Vec<(usize, usize)> = (0..true_thetas.len())
        .flat_map(|t| (0..replications).map(move |r| (t, r)))
        .collect();

    tasks
        .par_iter()
        .map(|&(theta_idx, rep)| {
            let task_seed = seed
                .wrapping_add(theta_idx as u64 * 1000)
                .wrapping_add(rep as u64);
            simulate_session(bank, config, true_thetas[theta_idx], task_seed)
        })
        .collect()
}
