//! Multi-factor priority scoring.
//!
//! Combines urgency, inferred category importance, detection-age decay,
//! and learned user affinity into one normalized score per commitment.
//! The weights are fixed and part of the documented contract. Scoring is
//! pure and order-independent; downstream sorts break ties by stable
//! input order.

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::TemporalPreferences;
use crate::types::{Category, Commitment, PriorityScore, UrgencyBucket};

pub const URGENCY_WEIGHT: f64 = 0.4;
pub const IMPORTANCE_WEIGHT: f64 = 0.3;
pub const DECAY_WEIGHT: f64 = 0.2;
pub const AFFINITY_WEIGHT: f64 = 0.1;

/// Neutral affinity when no engagement history exists for a category.
const NEUTRAL_AFFINITY: f64 = 0.5;

// Ordered keyword table for category inference; first match wins.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Financial,
        &[
            "invoice", "payment", "pay ", "bill", "budget", "tax", "bank", "salary", "refund",
            "expense",
        ],
    ),
    (
        Category::Legal,
        &[
            "contract", "legal", "lawyer", "attorney", "compliance", "nda", "lawsuit", "notarize",
        ],
    ),
    (
        Category::Family,
        &[
            "mom", "dad", "family", "kids", "son", "daughter", "wife", "husband", "parents",
            "grandma", "grandpa",
        ],
    ),
    (
        Category::Health,
        &[
            "doctor", "dentist", "prescription", "therapy", "gym", "medical", "checkup",
            "appointment",
        ],
    ),
    (
        Category::WorkClient,
        &[
            "client", "customer", "account", "proposal", "demo", "renewal", "stakeholder",
        ],
    ),
    (
        Category::WorkInternal,
        &[
            "team", "standup", "report", "meeting", "review", "deadline", "project", "slides",
            "presentation", "sprint",
        ],
    ),
    (
        Category::Social,
        &[
            "party", "dinner", "drinks", "wedding", "birthday", "lunch with", "catch up",
        ],
    ),
    (
        Category::Personal,
        &[
            "errand", "groceries", "car", "house", "apartment", "passport", "book", "trip",
        ],
    ),
];

/// Infer a category from the commitment's action text and sentence.
pub fn infer_category(commitment: &Commitment) -> Category {
    let haystack = format!(
        "{} {}",
        commitment.what.to_lowercase(),
        commitment.sentence.to_lowercase()
    );
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| haystack.contains(k)) {
            return *category;
        }
    }
    Category::Unknown
}

/// Default importance when the user has no learned weight for a category.
pub fn default_importance(category: Category) -> f64 {
    match category {
        Category::Financial | Category::Legal | Category::Family | Category::Health => 1.0,
        Category::WorkClient => 0.7,
        Category::WorkInternal => 0.6,
        Category::Social | Category::Personal => 0.4,
        Category::Unknown => 0.3,
    }
}

/// Urgency from a resolved date: monotonic step function of days until due.
pub fn urgency_from_date(due: NaiveDate, today: NaiveDate) -> f64 {
    let days = (due - today).num_days();
    if days <= 0 {
        1.0
    } else if days <= 1 {
        0.95
    } else if days <= 3 {
        0.8
    } else if days <= 7 {
        0.65
    } else if days <= 14 {
        0.5
    } else if days <= 30 {
        0.35
    } else {
        0.1
    }
}

/// Urgency from the coarse bucket when no date resolved.
pub fn urgency_from_bucket(bucket: Option<UrgencyBucket>) -> f64 {
    match bucket {
        Some(UrgencyBucket::Today) => 1.0,
        Some(UrgencyBucket::Tomorrow) => 0.85,
        Some(UrgencyBucket::ThisWeek) => 0.7,
        Some(UrgencyBucket::ThisMonth) => 0.4,
        Some(UrgencyBucket::Later) => 0.1,
        None => 0.3,
    }
}

/// Detection-age decay: rewards freshly noticed items and suppresses
/// stale, never-acted-on ones so they don't dominate forever.
pub fn decay_factor(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days();
    if days < 1 {
        1.0
    } else if days < 3 {
        0.7
    } else if days < 7 {
        0.4
    } else {
        0.1
    }
}

/// Score one commitment at one evaluation instant.
///
/// A resolved date takes precedence over the bucket for urgency. Critical
/// categories force importance to 1.0; otherwise a learned per-category
/// weight applies if present, falling back to the default table.
pub fn score_commitment(
    commitment: &Commitment,
    prefs: &TemporalPreferences,
    now: DateTime<Utc>,
) -> PriorityScore {
    let today = now.date_naive();

    let urgency = match commitment.when.resolved_date {
        Some(due) => urgency_from_date(due, today),
        None => urgency_from_bucket(commitment.when.bucket),
    };

    let category = commitment.category.unwrap_or_else(|| infer_category(commitment));

    let importance = if prefs.critical_categories.contains(&category) {
        1.0
    } else {
        prefs
            .category_weights
            .get(&category)
            .copied()
            .unwrap_or_else(|| default_importance(category))
    };

    let decay = decay_factor(commitment.created_at, now);

    let user_affinity = prefs
        .category_affinity
        .get(&category)
        .copied()
        .unwrap_or(NEUTRAL_AFFINITY);

    let total = URGENCY_WEIGHT * urgency
        + IMPORTANCE_WEIGHT * importance
        + DECAY_WEIGHT * decay
        + AFFINITY_WEIGHT * user_affinity;

    PriorityScore {
        commitment_id: commitment.id.clone(),
        total,
        urgency,
        importance,
        decay,
        user_affinity,
        computed_at: now,
    }
}
