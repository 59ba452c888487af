//! Maximum-information item selection with exposure and content-balancing
//! constraints.
//!
//! Eligibility filters run first (already administered, per-tag session
//! quotas, lifetime exposure cap), then the Fisher information of every
//! surviving item is evaluated at the current ability estimate. The bank
//! scan is parallel; the reduction is a strict total order (information,
//! then lowest identifier) so the winner is deterministic regardless of
//! split points.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use rayon::prelude::*;

use crate::model::{information, ModelType};
use crate::types::{Item, ItemBank, ItemId};

/// Per-item administration counters shared across sessions. Increments are
/// atomic; no cross-session locking is required beyond them.
#[derive(Debug)]
pub struct ExposureLedger {
    counts: HashMap<ItemId, AtomicU32>,
}

impl ExposureLedger {
    pub fn new(bank: &ItemBank) -> Self {
        Self {
            counts: bank
                .items()
                .iter()
                .map(|item| (item.id, AtomicU32::new(0)))
                .collect(),
        }
    }

    pub fn count(&self, id: ItemId) -> u32 {
        self.counts
            .get(&id)
            .map(|counter| counter.load(AtomicOrdering::Relaxed))
            .unwrap_or(0)
    }

    /// Records one administration of the item.
    pub fn record(&self, id: ItemId) {
        if let Some(counter) = self.counts.get(&id) {
            counter.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }
}

/// Session-local view the selector needs to judge eligibility.
pub struct SelectionContext<'a> {
    /// Identifiers already issued this session (including the pending item).
    pub administered: &'a [ItemId],
    /// Administrations per content tag this session.
    pub tag_counts: &'a HashMap<String, usize>,
    /// Per-tag session quotas; unlisted tags are unconstrained.
    pub quotas: &'a HashMap<String, usize>,
    /// Lifetime exposure ledger and cap, when exposure control is active.
    pub exposure: Option<(&'a ExposureLedger, u32)>,
}

#[derive(Debug, Clone)]
pub struct ItemSelector {
    model: ModelType,
}

impl ItemSelector {
    pub fn new(model: ModelType) -> Self {
        Self { model }
    }

    /// Returns the eligible item with maximum information at `theta`, ties
    /// broken by lowest identifier, or `None` when the bank is exhausted.
    pub fn select<'a>(
        &self,
        theta: f64,
        bank: &'a ItemBank,
        ctx: &SelectionContext<'_>,
    ) -> Option<&'a Item> {
        bank.items()
            .par_iter()
            .filter(|item| self.eligible(item, ctx))
            .map(|item| {
                let (a, b, c) = self.model.constrain(item.a, item.b, item.c);
                (information(theta, a, b, c), item)
            })
            .reduce_with(|best, candidate| match best.0.partial_cmp(&candidate.0) {
                Some(Ordering::Less) => candidate,
                Some(Ordering::Greater) => best,
                _ => {
                    if candidate.1.id < best.1.id {
                        candidate
                    } else {
                        best
                    }
                }
            })
            .map(|(_, item)| item)
    }

    fn eligible(&self, item: &Item, ctx: &SelectionContext<'_>) -> bool {
        if ctx.administered.contains(&item.id) {
            return false;
        }
        if let Some(tag) = &item.tag {
            if let Some(&quota) = ctx.quotas.get(tag) {
                if ctx.tag_counts.get(tag).copied().unwrap_or(0) >= quota {
                    return false;
                }
            }
        }
        if let Some((ledger, cap)) = ctx.exposure {
            if ledger.count(item.id) >= cap {
                return false;
            }
        }
        true
    }
}
