//! Engine state persistence.
//!
//! `StateStore` is the seam between the pipeline and whatever storage
//! the host application provides. `MemoryStore` is the in-process
//! implementation used by the engine directly and by tests; hosts with a
//! database implement the trait over their own tables.
//!
//! Budget records are keyed by (user, day). Day rollover needs no timer:
//! the next day's first access simply finds no record and creates a fresh
//! one with zeroed counters.

use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::TemporalPreferences;
use crate::types::{Commitment, InterruptBudget, NotificationOutcome};

/// Storage operations the engine needs. All methods are infallible from
/// the engine's point of view; an implementation backed by fallible I/O
/// should handle its own errors and degrade to empty reads.
pub trait StateStore: Send + Sync {
    /// Budget record for (user, day), if one exists.
    fn budget(&self, user_id: &str, date: NaiveDate) -> Option<InterruptBudget>;
    fn put_budget(&self, budget: InterruptBudget);

    /// Preferences for a user, if any were ever stored.
    fn preferences(&self, user_id: &str) -> Option<TemporalPreferences>;
    fn put_preferences(&self, prefs: TemporalPreferences);

    fn commitment(&self, id: &str) -> Option<Commitment>;
    fn put_commitment(&self, commitment: Commitment);
    fn delete_commitment(&self, id: &str);
    /// All stored commitments for a user, in insertion order.
    fn commitments_for_user(&self, user_id: &str) -> Vec<Commitment>;

    /// Append one outcome to the per-user log. The log is append-only.
    fn append_outcome(&self, outcome: NotificationOutcome);
    fn outcomes_for_user(&self, user_id: &str) -> Vec<NotificationOutcome>;
}

/// In-memory store. Interior mutability via `RwLock` so the engine can
/// hold it behind a shared reference.
#[derive(Default)]
pub struct MemoryStore {
    budgets: RwLock<HashMap<(String, NaiveDate), InterruptBudget>>,
    preferences: RwLock<HashMap<String, TemporalPreferences>>,
    commitments: RwLock<Vec<Commitment>>,
    outcomes: RwLock<Vec<NotificationOutcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state. Test convenience.
    pub fn reset(&self) {
        self.budgets.write().clear();
        self.preferences.write().clear();
        self.commitments.write().clear();
        self.outcomes.write().clear();
    }
}

impl StateStore for MemoryStore {
    fn budget(&self, user_id: &str, date: NaiveDate) -> Option<InterruptBudget> {
        self.budgets
            .read()
            .get(&(user_id.to_string(), date))
            .cloned()
    }

    fn put_budget(&self, budget: InterruptBudget) {
        self.budgets
            .write()
            .insert((budget.user_id.clone(), budget.date), budget);
    }

    fn preferences(&self, user_id: &str) -> Option<TemporalPreferences> {
        self.preferences.read().get(user_id).cloned()
    }

    fn put_preferences(&self, prefs: TemporalPreferences) {
        self.preferences.write().insert(prefs.user_id.clone(), prefs);
    }

    fn commitment(&self, id: &str) -> Option<Commitment> {
        self.commitments
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn put_commitment(&self, commitment: Commitment) {
        let mut all = self.commitments.write();
        match all.iter_mut().find(|c| c.id == commitment.id) {
            Some(existing) => *existing = commitment,
            None => all.push(commitment),
        }
    }

    fn delete_commitment(&self, id: &str) {
        let mut all = self.commitments.write();
        let before = all.len();
        all.retain(|c| c.id != id);
        if all.len() < before {
            debug!(commitment_id = %id, "commitment deleted");
        }
    }

    fn commitments_for_user(&self, user_id: &str) -> Vec<Commitment> {
        self.commitments
            .read()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    fn append_outcome(&self, outcome: NotificationOutcome) {
        self.outcomes.write().push(outcome);
    }

    fn outcomes_for_user(&self, user_id: &str) -> Vec<NotificationOutcome> {
        self.outcomes
            .read()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }
}

/// Fetch or create the budget record for (user, day). The stored cap is
/// the configured base; tolerance adjustments are applied at dispatch
/// time so a learned preference change takes effect mid-day.
pub fn budget_for_day(
    store: &dyn StateStore,
    prefs: &TemporalPreferences,
    config: &crate::config::EngineConfig,
    date: NaiveDate,
) -> InterruptBudget {
    if let Some(existing) = store.budget(&prefs.user_id, date) {
        return existing;
    }
    let budget = InterruptBudget::new(&prefs.user_id, date, config.realtime_interrupt_max);
    debug!(user_id = %prefs.user_id, %date, "created fresh interrupt budget");
    budget
}
