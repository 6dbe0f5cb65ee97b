//! The engine facade: wires classification, extraction, validation,
//! scoring, budgeting, digests, dependencies, and learning over a
//! `StateStore`.
//!
//! Each public method is one pipeline entry point. The engine itself is
//! stateless between calls; everything durable lives in the store, so a
//! host can hold one engine per process and call it from anywhere.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::budget;
use crate::classify::{classify_source, SourceType};
use crate::config::{EngineConfig, QuietHours, TemporalPreferences};
use crate::deps;
use crate::digest;
use crate::error::EngineError;
use crate::extract;
use crate::learning;
use crate::score;
use crate::store::{budget_for_day, StateStore};
use crate::types::{
    Category, Commitment, DailyDigest, EngagementKind, ExplicitFeedback, IngestionTrigger,
    InterruptAction, InterruptDecision, PriorityScore,
};
use crate::validate;

/// Hook for checking an extracted commitment against the user's known
/// context (calendar, contacts, prior commitments). The lookup itself is
/// the host's business; the engine only consumes the boolean.
pub trait GroundingProvider: Send + Sync {
    fn is_grounded(&self, commitment: &Commitment) -> bool;
}

/// Default provider: nothing is ever grounded. Composite confidence
/// still works, just with the lower grounding signal.
pub struct NoGrounding;

impl GroundingProvider for NoGrounding {
    fn is_grounded(&self, _commitment: &Commitment) -> bool {
        false
    }
}

pub struct TemporalEngine<S: StateStore> {
    store: S,
    config: EngineConfig,
    grounding: Box<dyn GroundingProvider>,
}

impl<S: StateStore> TemporalEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            grounding: Box::new(NoGrounding),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_grounding(mut self, grounding: Box<dyn GroundingProvider>) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stored preferences, or fresh defaults for a user never seen.
    pub fn preferences(&self, user_id: &str) -> TemporalPreferences {
        self.store
            .preferences(user_id)
            .unwrap_or_else(|| TemporalPreferences::new(user_id))
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Run one content blob through classify → extract → validate and
    /// persist the survivors. Returns the stored commitments.
    #[instrument(skip(self, trigger), fields(user_id = %trigger.user_id, source_id = %trigger.source_id))]
    pub fn ingest(&self, trigger: &IngestionTrigger) -> Result<Vec<Commitment>, EngineError> {
        trigger.validate()?;

        // A concrete source hint is trusted; the generic document
        // fallback triggers content classification.
        let hinted = (trigger.source_type != SourceType::Document).then_some(trigger.source_type);
        let mut classification = classify_source(&trigger.content, hinted);

        // An untrusted guess degrades to the document fallback; extraction
        // always runs, only per-candidate confidence gates what survives.
        if classification.confidence < classification.source_type.acceptance_threshold() {
            debug!(
                source_type = classification.source_type.label(),
                confidence = classification.confidence,
                "classification below acceptance threshold; treating as document"
            );
            classification.source_type = SourceType::Document;
        }

        let candidates = extract::extract_commitments(
            &trigger.user_id,
            &trigger.content,
            &classification,
            &trigger.source_id,
            trigger.received_at,
            &self.config,
        );

        let today = trigger.received_at.date_naive();
        let mut stored = Vec::new();

        for mut commitment in candidates {
            let verdict = validate::validate(&commitment);
            if !verdict.is_actionable {
                continue;
            }

            let grounded = self.grounding.is_grounded(&commitment);
            let composite = validate::composite_confidence(&commitment, &verdict, grounded);
            if composite < self.config.min_extraction_confidence {
                debug!(
                    commitment_id = %commitment.id,
                    composite,
                    "dropping commitment below composite confidence floor"
                );
                continue;
            }

            commitment.confidence = composite;
            commitment.validated = true;
            commitment.category = Some(score::infer_category(&commitment));
            commitment.dependencies = deps::infer_dependencies(&commitment, today);

            self.store.put_commitment(commitment.clone());
            stored.push(commitment);
        }

        info!(count = stored.len(), "ingestion complete");
        Ok(stored)
    }

    // =========================================================================
    // Evaluation & dispatch
    // =========================================================================

    /// Score every stored commitment for a user at `now`.
    pub fn score_all(&self, user_id: &str, now: DateTime<Utc>) -> Vec<(Commitment, PriorityScore)> {
        let prefs = self.preferences(user_id);
        self.store
            .commitments_for_user(user_id)
            .into_iter()
            .filter(|c| c.validated)
            .map(|c| {
                let s = score::score_commitment(&c, &prefs, now);
                (c, s)
            })
            .collect()
    }

    /// Run the interrupt-budget pass over the user's queue and persist
    /// the mutated budget record. Preferences are snapshotted once at
    /// batch start; a concurrent settings change applies next batch.
    pub fn evaluate_queue(&self, user_id: &str, now: DateTime<Utc>) -> Vec<InterruptDecision> {
        let prefs = self.preferences(user_id);
        let scored = self.score_all(user_id, now);
        let scores: Vec<PriorityScore> = scored.iter().map(|(_, s)| s.clone()).collect();

        let mut budget_record = budget_for_day(&self.store, &prefs, &self.config, now.date_naive());
        let decisions = budget::process_queue(&scores, &prefs, &self.config, &mut budget_record, now);
        self.store.put_budget(budget_record);
        decisions
    }

    // =========================================================================
    // Digests
    // =========================================================================

    /// Morning digest for a user, if due. Persists the budget record on
    /// send so the pass is idempotent per day.
    pub fn morning_digest(&self, user_id: &str, now: DateTime<Utc>) -> Option<DailyDigest> {
        let prefs = self.preferences(user_id);
        let scored = self.score_all(user_id, now);
        let mut budget_record = budget_for_day(&self.store, &prefs, &self.config, now.date_naive());

        let out =
            digest::generate_morning_digest(&scored, &prefs, &self.config, &mut budget_record, now);
        self.store.put_budget(budget_record);
        out
    }

    /// Evening review: morning-digest items with no engaged outcome
    /// today. One-shot per day, gated by the user's evening flag.
    pub fn evening_review(&self, user_id: &str, now: DateTime<Utc>) -> Option<DailyDigest> {
        let prefs = self.preferences(user_id);
        let mut budget_record = budget_for_day(&self.store, &prefs, &self.config, now.date_naive());

        let acted: std::collections::HashSet<String> = self
            .store
            .outcomes_for_user(user_id)
            .into_iter()
            .filter(|o| o.engaged && o.occurred_at.date_naive() == now.date_naive())
            .map(|o| o.commitment_id)
            .collect();

        let unacted: Vec<Commitment> = budget_record
            .morning_digest_items
            .iter()
            .filter(|id| !acted.contains(*id))
            .filter_map(|id| self.store.commitment(id))
            .collect();

        let out = digest::generate_evening_review(&unacted, &prefs, &mut budget_record);
        self.store.put_budget(budget_record);
        out
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    /// Mark one inferred dependency completed. Returns false if the
    /// commitment or index is unknown.
    pub fn complete_dependency(&self, commitment_id: &str, index: usize) -> bool {
        self.mutate_chain(commitment_id, |chain| chain.complete_dependency(index))
    }

    /// Mark one inferred dependency dismissed.
    pub fn dismiss_dependency(&self, commitment_id: &str, index: usize) -> bool {
        self.mutate_chain(commitment_id, |chain| chain.dismiss_dependency(index))
    }

    fn mutate_chain(
        &self,
        commitment_id: &str,
        f: impl FnOnce(&mut crate::types::DependencyChain) -> bool,
    ) -> bool {
        let Some(mut commitment) = self.store.commitment(commitment_id) else {
            return false;
        };
        let Some(chain) = commitment.dependencies.as_mut() else {
            return false;
        };
        let changed = f(chain);
        if changed {
            self.store.put_commitment(commitment);
        }
        changed
    }

    // =========================================================================
    // Outcomes & learning
    // =========================================================================

    /// Record an engagement with a surfaced notification.
    pub fn record_engagement(
        &self,
        user_id: &str,
        commitment_id: &str,
        action: InterruptAction,
        kind: EngagementKind,
        time_to_engagement_secs: Option<i64>,
        now: DateTime<Utc>,
    ) {
        let category = self.category_of(commitment_id);
        learning::record_engaged(
            &self.store,
            user_id,
            commitment_id,
            action,
            kind,
            time_to_engagement_secs,
            category,
            now,
        );
    }

    /// Record a dismissal (or silent expiry, with `dismissed = false`).
    pub fn record_dismissal(
        &self,
        user_id: &str,
        commitment_id: &str,
        action: InterruptAction,
        dismissed: bool,
        now: DateTime<Utc>,
    ) {
        let category = self.category_of(commitment_id);
        learning::record_unengaged(
            &self.store,
            user_id,
            commitment_id,
            action,
            dismissed,
            category,
            now,
        );
    }

    /// Record explicit feedback on a surfaced commitment.
    pub fn record_feedback(
        &self,
        user_id: &str,
        commitment_id: &str,
        feedback: ExplicitFeedback,
        now: DateTime<Utc>,
    ) {
        let category = self.category_of(commitment_id);
        learning::record_feedback(&self.store, user_id, commitment_id, feedback, category, now);
    }

    fn category_of(&self, commitment_id: &str) -> Option<Category> {
        self.store.commitment(commitment_id).and_then(|c| c.category)
    }

    /// One learning pass: adjust and persist the user's preferences from
    /// the recent outcome window.
    pub fn apply_learning(&self, user_id: &str, now: DateTime<Utc>) -> TemporalPreferences {
        let prefs = self.preferences(user_id);
        let adjusted = learning::adjust_preferences(&self.store, &prefs, &self.config, now);
        self.store.put_preferences(adjusted.clone());
        adjusted
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn set_quiet_hours(&self, user_id: &str, quiet_hours: Option<QuietHours>) {
        self.update_prefs(user_id, |p| p.quiet_hours = quiet_hours);
    }

    pub fn set_focus_mode(&self, user_id: &str, enabled: bool) {
        self.update_prefs(user_id, |p| p.focus_mode = enabled);
    }

    pub fn set_timezone(&self, user_id: &str, timezone: &str) {
        self.update_prefs(user_id, |p| p.timezone = timezone.to_string());
    }

    pub fn set_critical_categories(&self, user_id: &str, categories: Vec<Category>) {
        self.update_prefs(user_id, |p| p.critical_categories = categories);
    }

    pub fn set_evening_review(&self, user_id: &str, enabled: bool) {
        self.update_prefs(user_id, |p| p.evening_review_enabled = enabled);
    }

    fn update_prefs(&self, user_id: &str, f: impl FnOnce(&mut TemporalPreferences)) {
        let mut prefs = self.preferences(user_id);
        f(&mut prefs);
        self.store.put_preferences(prefs);
    }
}
