//! Core data model for the commitment pipeline.
//!
//! Everything that crosses a stage boundary lives here: commitments and
//! their temporal references, priority scores, per-day interrupt budgets,
//! dependency chains, and the wire-facing dispatch/digest types the
//! notification layer consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::SourceType;

// =============================================================================
// Commitments
// =============================================================================

/// Coarse due-time classification used when no exact date is resolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyBucket {
    Today,
    Tomorrow,
    ThisWeek,
    ThisMonth,
    Later,
}

/// A temporal reference as extracted from text.
///
/// If `resolved_date` is present it takes precedence over `bucket` for
/// urgency computation. A reference is vague when no absolute date could
/// be resolved from the raw text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalReference {
    /// Raw temporal text as it appeared in the sentence ("by Friday").
    pub raw: String,
    pub resolved_date: Option<NaiveDate>,
    pub is_vague: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<UrgencyBucket>,
}

/// Inferred commitment category, used for importance and affinity lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Financial,
    Legal,
    Family,
    Health,
    WorkClient,
    WorkInternal,
    Social,
    Personal,
    Unknown,
}

impl Category {
    /// Human-readable label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Legal => "legal",
            Self::Family => "family",
            Self::Health => "health",
            Self::WorkClient => "work_client",
            Self::WorkInternal => "work_internal",
            Self::Social => "social",
            Self::Personal => "personal",
            Self::Unknown => "unknown",
        }
    }
}

/// An extracted promise or obligation with a responsible party, an action,
/// and a due-time reference.
///
/// `what` must be non-empty and at least 5 characters to be actionable;
/// a past-framed commitment is never actionable regardless of confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub id: String,
    pub user_id: String,
    /// Verbatim source sentence the commitment was extracted from.
    pub sentence: String,
    /// Responsible party: "user", "user + others", or a named person.
    pub who: String,
    /// The extracted action, free text.
    pub what: String,
    pub when: TemporalReference,
    pub source_type: SourceType,
    pub source_id: String,
    pub extracted_at: DateTime<Utc>,
    /// Confidence in [0, 1]; composite after validation.
    pub confidence: f64,
    /// Free-text trace of how the extraction was made.
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub validated: bool,
    /// Set once the scorer has inferred a category, so outcomes can be
    /// attributed per category for affinity learning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyChain>,
}

// =============================================================================
// Priority
// =============================================================================

/// A normalized priority for one commitment at one evaluation instant.
///
/// `total` is the fixed weighted sum of the four components
/// (0.4 urgency + 0.3 importance + 0.2 decay + 0.1 affinity). Scores are
/// recomputed on demand and never cached past a single scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityScore {
    pub commitment_id: String,
    pub total: f64,
    pub urgency: f64,
    pub importance: f64,
    pub decay: f64,
    pub user_affinity: f64,
    pub computed_at: DateTime<Utc>,
}

// =============================================================================
// Interrupt budget & dispatch
// =============================================================================

/// Per-(user, day) interrupt budget record.
///
/// Created lazily on first access for a given user+day key; day rollover is
/// implicit because the next day uses a new key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptBudget {
    pub user_id: String,
    pub date: NaiveDate,
    pub morning_digest_sent: bool,
    pub morning_digest_items: Vec<String>,
    pub realtime_interrupts_used: u32,
    pub realtime_interrupt_max: u32,
    pub evening_review_sent: bool,
    /// Commitment ids surfaced past an exhausted budget (forced or bundled).
    pub forced_surfaced: Vec<String>,
}

impl InterruptBudget {
    pub fn new(user_id: &str, date: NaiveDate, realtime_max: u32) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            morning_digest_sent: false,
            morning_digest_items: Vec::new(),
            realtime_interrupts_used: 0,
            realtime_interrupt_max: realtime_max,
            evening_review_sent: false,
            forced_surfaced: Vec::new(),
        }
    }

    /// Remaining real-time slots against the configured max.
    pub fn realtime_remaining(&self) -> u32 {
        self.realtime_interrupt_max
            .saturating_sub(self.realtime_interrupts_used)
    }
}

/// The action enum the notification layer switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterruptAction {
    RealtimeInterrupt,
    ForcedInterrupt,
    BundledUrgent,
    SuggestOneTap,
    BubbleNotification,
    StoreSilent,
}

/// One dispatch decision emitted to the notification layer.
///
/// For `BUNDLED_URGENT` the `commitment_id` carries all bundled ids joined
/// with commas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptDecision {
    pub commitment_id: String,
    pub action: InterruptAction,
    pub reason: String,
}

// =============================================================================
// Digest
// =============================================================================

/// A single digest entry with a heuristically chosen call to action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleSuggestion {
    pub commitment_id: String,
    pub title: String,
    pub call_to_action: String,
    pub dismiss_action: String,
}

/// Batched summary of top-priority unsurfaced commitments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDigest {
    pub user_id: String,
    pub date: NaiveDate,
    pub items: Vec<BubbleSuggestion>,
    pub summary: String,
}

// =============================================================================
// Dependencies
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Pending,
    Completed,
    Dismissed,
}

/// One inferred preparatory sub-action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub action: String,
    pub confidence: f64,
    /// Event date minus lead time; suppressed when it would land in the past.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_deadline: Option<NaiveDate>,
    pub status: DependencyStatus,
}

/// The set of preparatory sub-actions a commitment implies.
///
/// Created once via pattern match; mutated only through explicit
/// completion/dismissal calls; never auto-expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyChain {
    pub primary_event: String,
    pub dependencies: Vec<Dependency>,
}

impl DependencyChain {
    /// Mark one dependency completed. Siblings are untouched.
    /// Returns false if the index is out of range.
    pub fn complete_dependency(&mut self, index: usize) -> bool {
        match self.dependencies.get_mut(index) {
            Some(dep) => {
                dep.status = DependencyStatus::Completed;
                true
            }
            None => false,
        }
    }

    /// Mark one dependency dismissed. Siblings are untouched.
    pub fn dismiss_dependency(&mut self, index: usize) -> bool {
        match self.dependencies.get_mut(index) {
            Some(dep) => {
                dep.status = DependencyStatus::Dismissed;
                true
            }
            None => false,
        }
    }

    /// Dependencies still pending, in chain order.
    pub fn pending(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.status == DependencyStatus::Pending)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Tapped,
    Dismissed,
    Snoozed,
    Acted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplicitFeedback {
    MoreLikeThis,
    StopThisType,
}

/// One surfacing event and how the user responded to it. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
    pub user_id: String,
    pub commitment_id: String,
    pub action: InterruptAction,
    pub occurred_at: DateTime<Utc>,
    pub engaged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_engagement_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<ExplicitFeedback>,
    /// Category of the surfaced commitment, for per-category affinity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

// =============================================================================
// Ingestion
// =============================================================================

/// Ingestion trigger from a content source.
///
/// If `source_type` is anything other than the generic `Document` fallback
/// it is trusted outright; otherwise the classifier runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionTrigger {
    pub user_id: String,
    pub source_type: SourceType,
    pub content: String,
    pub source_id: String,
    pub received_at: DateTime<Utc>,
}

impl IngestionTrigger {
    /// Fail fast on missing required fields rather than producing a
    /// garbage commitment downstream.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        use crate::error::EngineError;
        if self.user_id.trim().is_empty() {
            return Err(EngineError::MissingField("userId"));
        }
        if self.content.trim().is_empty() {
            return Err(EngineError::MissingField("content"));
        }
        if self.source_id.trim().is_empty() {
            return Err(EngineError::MissingField("sourceId"));
        }
        Ok(())
    }
}
