//! Morning digest and evening review generation.
//!
//! Batches the top-N unsurfaced commitments into a single daily summary.
//! Sending is gated on the user-local clock and the per-day budget record,
//! and is idempotent: a second call the same day is a no-op. The evening
//! review re-surfaces only morning items the user never acted on.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, info};

use crate::config::{EngineConfig, TemporalPreferences};
use crate::types::{BubbleSuggestion, Commitment, DailyDigest, InterruptBudget, PriorityScore};

fn re_deadline_language() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:by|due|deadline|before)\b").unwrap())
}

fn re_communication_action() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:call|email|send|reply|text|message|follow\s+up|ping)\b").unwrap()
    })
}

/// Heuristic call-to-action for one commitment.
fn call_to_action(commitment: &Commitment) -> &'static str {
    if commitment.when.resolved_date.is_some() {
        "Add to calendar"
    } else if re_deadline_language().is_match(&commitment.sentence) {
        "Set deadline reminder"
    } else if re_communication_action().is_match(&commitment.what) {
        "Set reminder"
    } else {
        "Review and plan"
    }
}

fn suggestion_for(commitment: &Commitment) -> BubbleSuggestion {
    BubbleSuggestion {
        commitment_id: commitment.id.clone(),
        title: commitment.what.clone(),
        call_to_action: call_to_action(commitment).to_string(),
        dismiss_action: format!("dismiss:{}", commitment.id),
    }
}

/// Build the morning digest from scored candidates.
///
/// Returns `None` before the configured digest time (user-local) and on
/// any repeat call the same day. On send, marks the budget record and
/// stores the included ids so later passes can compute what went
/// undigested. The caller persists the budget.
pub fn generate_morning_digest(
    candidates: &[(Commitment, PriorityScore)],
    prefs: &TemporalPreferences,
    config: &EngineConfig,
    budget: &mut InterruptBudget,
    now: DateTime<Utc>,
) -> Option<DailyDigest> {
    let local = now.with_timezone(&prefs.tz());
    if local.time() < config.digest_time {
        debug!(user_id = %prefs.user_id, "digest time not reached yet");
        return None;
    }
    if budget.morning_digest_sent {
        debug!(user_id = %prefs.user_id, "morning digest already sent today");
        return None;
    }

    let mut ranked: Vec<&(Commitment, PriorityScore)> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        b.1.total
            .partial_cmp(&a.1.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let items: Vec<BubbleSuggestion> = ranked
        .iter()
        .take(config.digest_max_items)
        .map(|(c, _)| suggestion_for(c))
        .collect();

    budget.morning_digest_sent = true;
    budget.morning_digest_items = items.iter().map(|i| i.commitment_id.clone()).collect();

    let summary = match items.len() {
        0 => "Nothing needs your attention this morning.".to_string(),
        1 => format!("1 commitment needs your attention: {}", items[0].title),
        n => format!(
            "{n} commitments need your attention, starting with: {}",
            items[0].title
        ),
    };

    info!(user_id = %prefs.user_id, count = items.len(), "morning digest generated");

    Some(DailyDigest {
        user_id: prefs.user_id.clone(),
        date: budget.date,
        items,
        summary,
    })
}

/// Commitments not included in today's morning digest.
pub fn undigested<'a>(
    candidates: &'a [(Commitment, PriorityScore)],
    budget: &InterruptBudget,
) -> Vec<&'a Commitment> {
    let digested: HashSet<&str> = budget
        .morning_digest_items
        .iter()
        .map(String::as_str)
        .collect();
    candidates
        .iter()
        .map(|(c, _)| c)
        .filter(|c| !digested.contains(c.id.as_str()))
        .collect()
}

/// Build the evening review: morning-digest items never acted on.
///
/// Gated by the per-user evening-review flag, read live so a same-day
/// settings change takes effect, and one-shot per day. `unacted` is the
/// already-filtered list of morning items with no engaged outcome; the
/// caller computes it from the outcome log.
pub fn generate_evening_review(
    unacted: &[Commitment],
    prefs: &TemporalPreferences,
    budget: &mut InterruptBudget,
) -> Option<DailyDigest> {
    if !prefs.evening_review_enabled {
        return None;
    }
    if budget.evening_review_sent {
        debug!(user_id = %prefs.user_id, "evening review already sent today");
        return None;
    }
    if unacted.is_empty() {
        return None;
    }

    let items: Vec<BubbleSuggestion> = unacted.iter().map(suggestion_for).collect();
    budget.evening_review_sent = true;

    let summary = format!(
        "{} item(s) from this morning still waiting on you",
        items.len()
    );

    info!(user_id = %prefs.user_id, count = items.len(), "evening review generated");

    Some(DailyDigest {
        user_id: prefs.user_id.clone(),
        date: budget.date,
        items,
        summary,
    })
}
