//! Outcome recording and preference learning.
//!
//! Every surfacing event gets an outcome row: did the user engage, how,
//! and how fast. A periodic learning pass reads the recent window and
//! nudges the user's preferences: realtime tolerance with hysteresis,
//! per-category affinity from engagement rates, and per-category weights
//! from explicit feedback. Adjustments are deliberately small; the loop
//! converges over weeks, not hours.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::config::{EngineConfig, TemporalPreferences};
use crate::store::StateStore;
use crate::types::{
    Category, EngagementKind, ExplicitFeedback, InterruptAction, NotificationOutcome,
};

/// Tolerance moves in steps of 0.1 down, 0.05 up, clamped to [0.2, 0.8].
const TOLERANCE_FLOOR: f64 = 0.2;
const TOLERANCE_CEIL: f64 = 0.8;
const TOLERANCE_STEP_DOWN: f64 = 0.1;
const TOLERANCE_STEP_UP: f64 = 0.05;

/// Dismissal-rate hysteresis band. Above the high mark tolerance drops;
/// below the low mark it creeps back up; in between nothing moves.
const DISMISSAL_HIGH: f64 = 0.5;
const DISMISSAL_LOW: f64 = 0.2;

/// Minimum per-category samples before affinity moves off neutral.
const MIN_CATEGORY_SAMPLES: usize = 3;

/// Explicit feedback steps for category weights.
const WEIGHT_BOOST: f64 = 0.1;
const WEIGHT_SUPPRESS: f64 = 0.2;
const WEIGHT_FLOOR: f64 = 0.1;

/// Record that a surfaced notification was dismissed or ignored.
pub fn record_unengaged(
    store: &dyn StateStore,
    user_id: &str,
    commitment_id: &str,
    action: InterruptAction,
    dismissed: bool,
    category: Option<Category>,
    now: DateTime<Utc>,
) {
    store.append_outcome(NotificationOutcome {
        user_id: user_id.to_string(),
        commitment_id: commitment_id.to_string(),
        action,
        occurred_at: now,
        engaged: false,
        engagement: dismissed.then_some(EngagementKind::Dismissed),
        time_to_engagement_secs: None,
        feedback: None,
        category,
    });
}

/// Record that the user engaged with a surfaced notification.
pub fn record_engaged(
    store: &dyn StateStore,
    user_id: &str,
    commitment_id: &str,
    action: InterruptAction,
    kind: EngagementKind,
    time_to_engagement_secs: Option<i64>,
    category: Option<Category>,
    now: DateTime<Utc>,
) {
    store.append_outcome(NotificationOutcome {
        user_id: user_id.to_string(),
        commitment_id: commitment_id.to_string(),
        action,
        occurred_at: now,
        engaged: true,
        engagement: Some(kind),
        time_to_engagement_secs,
        feedback: None,
        category,
    });
}

/// Record an explicit "more like this" / "stop this type" signal.
pub fn record_feedback(
    store: &dyn StateStore,
    user_id: &str,
    commitment_id: &str,
    feedback: ExplicitFeedback,
    category: Option<Category>,
    now: DateTime<Utc>,
) {
    store.append_outcome(NotificationOutcome {
        user_id: user_id.to_string(),
        commitment_id: commitment_id.to_string(),
        action: InterruptAction::StoreSilent,
        occurred_at: now,
        engaged: true,
        engagement: None,
        time_to_engagement_secs: None,
        feedback: Some(feedback),
        category,
    });
}

/// Aggregate view over a window of outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeStats {
    pub total: usize,
    pub engagement_rate: f64,
    pub dismissal_rate: f64,
    pub mean_time_to_engagement_secs: Option<f64>,
    pub more_like_this: usize,
    pub stop_this_type: usize,
}

pub fn outcome_stats(outcomes: &[NotificationOutcome]) -> OutcomeStats {
    let total = outcomes.len();
    if total == 0 {
        return OutcomeStats {
            total: 0,
            engagement_rate: 0.0,
            dismissal_rate: 0.0,
            mean_time_to_engagement_secs: None,
            more_like_this: 0,
            stop_this_type: 0,
        };
    }

    let engaged = outcomes.iter().filter(|o| o.engaged).count();
    let dismissed = outcomes
        .iter()
        .filter(|o| o.engagement == Some(EngagementKind::Dismissed))
        .count();

    let times: Vec<i64> = outcomes
        .iter()
        .filter_map(|o| o.time_to_engagement_secs)
        .collect();
    let mean_time = if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<i64>() as f64 / times.len() as f64)
    };

    let more_like_this = outcomes
        .iter()
        .filter(|o| o.feedback == Some(ExplicitFeedback::MoreLikeThis))
        .count();
    let stop_this_type = outcomes
        .iter()
        .filter(|o| o.feedback == Some(ExplicitFeedback::StopThisType))
        .count();

    OutcomeStats {
        total,
        engagement_rate: engaged as f64 / total as f64,
        dismissal_rate: dismissed as f64 / total as f64,
        mean_time_to_engagement_secs: mean_time,
        more_like_this,
        stop_this_type,
    }
}

/// One learning pass over the recent outcome window.
///
/// No-op below the minimum sample size. Returns the adjusted preferences;
/// the caller persists them.
pub fn adjust_preferences(
    store: &dyn StateStore,
    prefs: &TemporalPreferences,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> TemporalPreferences {
    let cutoff = now - Duration::days(config.learning_window_days);
    let window: Vec<NotificationOutcome> = store
        .outcomes_for_user(&prefs.user_id)
        .into_iter()
        .filter(|o| o.occurred_at >= cutoff)
        .collect();

    let mut adjusted = prefs.clone();

    if window.len() < config.learning_min_samples {
        debug!(
            user_id = %prefs.user_id,
            samples = window.len(),
            needed = config.learning_min_samples,
            "too few outcomes to learn from"
        );
        return adjusted;
    }

    let stats = outcome_stats(&window);

    if stats.dismissal_rate > DISMISSAL_HIGH {
        adjusted.realtime_tolerance =
            (adjusted.realtime_tolerance - TOLERANCE_STEP_DOWN).max(TOLERANCE_FLOOR);
    } else if stats.dismissal_rate < DISMISSAL_LOW {
        adjusted.realtime_tolerance =
            (adjusted.realtime_tolerance + TOLERANCE_STEP_UP).min(TOLERANCE_CEIL);
    }

    recompute_affinity(&mut adjusted, &window);
    apply_feedback(&mut adjusted, &window);

    if (adjusted.realtime_tolerance - prefs.realtime_tolerance).abs() > f64::EPSILON {
        info!(
            user_id = %prefs.user_id,
            dismissal_rate = stats.dismissal_rate,
            tolerance = adjusted.realtime_tolerance,
            "realtime tolerance adjusted"
        );
    }

    adjusted
}

/// Per-category engagement rate becomes the affinity value, once a
/// category has enough samples. Categories never seen keep whatever
/// affinity they had.
fn recompute_affinity(prefs: &mut TemporalPreferences, window: &[NotificationOutcome]) {
    use std::collections::HashMap;
    let mut counts: HashMap<Category, (usize, usize)> = HashMap::new();
    for o in window {
        if let Some(cat) = o.category {
            let entry = counts.entry(cat).or_insert((0, 0));
            entry.0 += 1;
            if o.engaged {
                entry.1 += 1;
            }
        }
    }
    for (cat, (total, engaged)) in counts {
        if total >= MIN_CATEGORY_SAMPLES {
            prefs
                .category_affinity
                .insert(cat, engaged as f64 / total as f64);
        }
    }
}

/// Explicit feedback moves category weights immediately; it is a much
/// stronger signal than passive engagement.
fn apply_feedback(prefs: &mut TemporalPreferences, window: &[NotificationOutcome]) {
    for o in window {
        let (Some(feedback), Some(cat)) = (o.feedback, o.category) else {
            continue;
        };
        let current = prefs
            .category_weights
            .get(&cat)
            .copied()
            .unwrap_or_else(|| crate::score::default_importance(cat));
        let next = match feedback {
            ExplicitFeedback::MoreLikeThis => (current + WEIGHT_BOOST).min(1.0),
            ExplicitFeedback::StopThisType => (current - WEIGHT_SUPPRESS).max(WEIGHT_FLOOR),
        };
        prefs.category_weights.insert(cat, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
    }

    fn seed_outcomes(store: &MemoryStore, engaged: usize, dismissed: usize, ignored: usize) {
        let t = now() - Duration::days(2);
        let mut i = 0;
        for _ in 0..engaged {
            record_engaged(
                store,
                "u1",
                &format!("c{i}"),
                InterruptAction::BubbleNotification,
                EngagementKind::Tapped,
                Some(120),
                Some(Category::WorkInternal),
                t,
            );
            i += 1;
        }
        for _ in 0..dismissed {
            record_unengaged(
                store,
                "u1",
                &format!("c{i}"),
                InterruptAction::RealtimeInterrupt,
                true,
                Some(Category::Social),
                t,
            );
            i += 1;
        }
        for _ in 0..ignored {
            record_unengaged(
                store,
                "u1",
                &format!("c{i}"),
                InterruptAction::BubbleNotification,
                false,
                None,
                t,
            );
            i += 1;
        }
    }

    #[test]
    fn no_adjustment_below_min_samples() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 1, 3, 0);
        let prefs = TemporalPreferences::new("u1");
        let out = adjust_preferences(&store, &prefs, &EngineConfig::default(), now());
        assert!((out.realtime_tolerance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn high_dismissal_lowers_tolerance_to_floor() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 1, 7, 0);
        let config = EngineConfig::default();
        let mut prefs = TemporalPreferences::new("u1");

        prefs = adjust_preferences(&store, &prefs, &config, now());
        assert!((prefs.realtime_tolerance - 0.4).abs() < 1e-9);

        // Repeated passes bottom out at the floor, never below
        for _ in 0..5 {
            prefs = adjust_preferences(&store, &prefs, &config, now());
        }
        assert!((prefs.realtime_tolerance - TOLERANCE_FLOOR).abs() < 1e-9);
    }

    #[test]
    fn low_dismissal_raises_tolerance_slowly() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 7, 1, 0);
        let config = EngineConfig::default();
        let prefs = TemporalPreferences::new("u1");

        let out = adjust_preferences(&store, &prefs, &config, now());
        // 1/8 dismissal is under the low mark; up-step is half the down-step
        assert!((out.realtime_tolerance - 0.55).abs() < 1e-9);
    }

    #[test]
    fn mid_band_dismissal_leaves_tolerance_alone() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 4, 3, 3);
        let out = adjust_preferences(
            &store,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        assert!((out.realtime_tolerance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn old_outcomes_fall_out_of_the_window() {
        let store = MemoryStore::new();
        let stale = now() - Duration::days(20);
        for i in 0..8 {
            record_unengaged(
                &store,
                "u1",
                &format!("c{i}"),
                InterruptAction::RealtimeInterrupt,
                true,
                None,
                stale,
            );
        }
        let out = adjust_preferences(
            &store,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        assert!((out.realtime_tolerance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn affinity_tracks_per_category_engagement() {
        let store = MemoryStore::new();
        // 4 engaged work_internal, 3 dismissed social
        seed_outcomes(&store, 4, 3, 0);
        let out = adjust_preferences(
            &store,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        assert!((out.category_affinity[&Category::WorkInternal] - 1.0).abs() < f64::EPSILON);
        assert!((out.category_affinity[&Category::Social] - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sparse_categories_keep_neutral_affinity() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 4, 2, 0);
        let out = adjust_preferences(
            &store,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        // Only 2 social samples, below the per-category minimum
        assert!(!out.category_affinity.contains_key(&Category::Social));
    }

    #[test]
    fn explicit_feedback_moves_category_weight() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 3, 2, 0);
        record_feedback(
            &store,
            "u1",
            "c99",
            ExplicitFeedback::StopThisType,
            Some(Category::Social),
            now() - Duration::days(1),
        );
        let out = adjust_preferences(
            &store,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        // Social default 0.4, suppressed by 0.2
        assert!((out.category_weights[&Category::Social] - 0.2).abs() < 1e-9);

        let store2 = MemoryStore::new();
        seed_outcomes(&store2, 3, 2, 0);
        record_feedback(
            &store2,
            "u1",
            "c99",
            ExplicitFeedback::MoreLikeThis,
            Some(Category::WorkInternal),
            now() - Duration::days(1),
        );
        let out2 = adjust_preferences(
            &store2,
            &TemporalPreferences::new("u1"),
            &EngineConfig::default(),
            now(),
        );
        // WorkInternal default 0.6, boosted by 0.1
        assert!((out2.category_weights[&Category::WorkInternal] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn stats_report_rates_and_mean_latency() {
        let store = MemoryStore::new();
        seed_outcomes(&store, 2, 1, 1);
        let stats = outcome_stats(&store.outcomes_for_user("u1"));
        assert_eq!(stats.total, 4);
        assert!((stats.engagement_rate - 0.5).abs() < f64::EPSILON);
        assert!((stats.dismissal_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(stats.mean_time_to_engagement_secs, Some(120.0));
        assert_eq!(stats.more_like_this, 0);

        record_feedback(
            &store,
            "u1",
            "c9",
            ExplicitFeedback::MoreLikeThis,
            None,
            now(),
        );
        let stats = outcome_stats(&store.outcomes_for_user("u1"));
        assert_eq!(stats.more_like_this, 1);
        assert_eq!(stats.stop_this_type, 0);
    }
}
