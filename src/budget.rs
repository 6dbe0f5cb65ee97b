//! Per-user, per-day interrupt budgeting.
//!
//! Given a ranked batch of priority scores, decides an interrupt action
//! for each commitment under quiet-hours gating and a hard daily cap on
//! real-time interruptions. Sufficiently urgent items past the cap become
//! forced interrupts, a safety valve logged separately from normal spend,
//! and three or more forced items in one pass collapse into a single
//! bundled decision to avoid notification storms. Budget mutation happens
//! once per processed batch; the caller persists the record.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{EngineConfig, TemporalPreferences};
use crate::types::{InterruptAction, InterruptBudget, InterruptDecision, PriorityScore};

/// The critical predicate: items allowed through quiet hours when the
/// critical exception is configured.
pub fn is_critical(score: &PriorityScore, config: &EngineConfig) -> bool {
    score.total >= config.critical_score_min && score.urgency >= config.critical_urgency_min
}

/// Effective daily real-time cap after the learned tolerance adjustment.
///
/// High tolerance earns one extra slot, low tolerance gives one up; the
/// floor is a single slot so truly urgent items always have a path.
pub fn effective_realtime_max(budget: &InterruptBudget, prefs: &TemporalPreferences) -> u32 {
    if prefs.realtime_tolerance >= 0.7 {
        budget.realtime_interrupt_max + 1
    } else if prefs.realtime_tolerance <= 0.3 {
        budget.realtime_interrupt_max.saturating_sub(1).max(1)
    } else {
        budget.realtime_interrupt_max
    }
}

/// Process one ranked batch of scores into interrupt decisions.
///
/// Quiet-hours gating runs first (focus mode counts as all-day quiet hours
/// with the critical exception enabled). Remaining items are sorted by
/// score descending and walked against the budget. The budget record is
/// mutated once at the end of the batch.
pub fn process_queue(
    scores: &[PriorityScore],
    prefs: &TemporalPreferences,
    config: &EngineConfig,
    budget: &mut InterruptBudget,
    now: DateTime<Utc>,
) -> Vec<InterruptDecision> {
    let local_time = now.with_timezone(&prefs.tz()).time();

    let quiet_active = prefs.focus_mode
        || prefs
            .quiet_hours
            .as_ref()
            .is_some_and(|q| q.contains(local_time));
    let allow_critical = prefs.focus_mode
        || prefs
            .quiet_hours
            .as_ref()
            .is_some_and(|q| q.allow_critical);

    let mut decisions = Vec::with_capacity(scores.len());
    let mut eligible: Vec<&PriorityScore> = Vec::with_capacity(scores.len());

    if quiet_active && !allow_critical {
        // No exception configured: everything is stored silently.
        return scores
            .iter()
            .map(|s| InterruptDecision {
                commitment_id: s.commitment_id.clone(),
                action: InterruptAction::StoreSilent,
                reason: "quiet hours active".to_string(),
            })
            .collect();
    }

    if quiet_active {
        for score in scores {
            if is_critical(score, config) {
                eligible.push(score);
            } else {
                decisions.push(InterruptDecision {
                    commitment_id: score.commitment_id.clone(),
                    action: InterruptAction::StoreSilent,
                    reason: "quiet hours active; below critical threshold".to_string(),
                });
            }
        }
    } else {
        eligible.extend(scores.iter());
    }

    // Highest priority first; ties keep stable input order.
    eligible.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let cap = effective_realtime_max(budget, prefs);
    let mut used = budget.realtime_interrupts_used;
    let mut consumed = 0u32;
    let mut forced: Vec<String> = Vec::new();

    for score in eligible {
        let urgent_enough =
            score.total >= config.realtime_score_min && score.urgency >= config.realtime_urgency_min;

        if urgent_enough && used < cap {
            used += 1;
            consumed += 1;
            decisions.push(InterruptDecision {
                commitment_id: score.commitment_id.clone(),
                action: InterruptAction::RealtimeInterrupt,
                reason: format!(
                    "score {:.2} with urgency {:.2}; realtime slot {used} of {cap}",
                    score.total, score.urgency
                ),
            });
        } else if urgent_enough {
            // Cap exhausted: safety valve, bundled below if it storms.
            forced.push(score.commitment_id.clone());
        } else if score.total >= config.suggest_threshold {
            decisions.push(InterruptDecision {
                commitment_id: score.commitment_id.clone(),
                action: InterruptAction::SuggestOneTap,
                reason: format!("score {:.2} above suggest threshold", score.total),
            });
        } else if score.total >= config.bubble_threshold {
            decisions.push(InterruptDecision {
                commitment_id: score.commitment_id.clone(),
                action: InterruptAction::BubbleNotification,
                reason: format!("score {:.2} above bubble threshold", score.total),
            });
        } else {
            decisions.push(InterruptDecision {
                commitment_id: score.commitment_id.clone(),
                action: InterruptAction::StoreSilent,
                reason: format!("score {:.2} below all surfacing thresholds", score.total),
            });
        }
    }

    if forced.len() > config.forced_bundle_threshold {
        info!(
            count = forced.len(),
            user_id = %budget.user_id,
            "bundling forced interrupts to avoid a notification storm"
        );
        decisions.push(InterruptDecision {
            commitment_id: forced.join(","),
            action: InterruptAction::BundledUrgent,
            reason: format!(
                "{} urgent items past the exhausted realtime budget; bundled",
                forced.len()
            ),
        });
        budget.forced_surfaced.extend(forced);
    } else {
        for id in forced {
            debug!(commitment_id = %id, "forced interrupt past exhausted budget");
            decisions.push(InterruptDecision {
                commitment_id: id.clone(),
                action: InterruptAction::ForcedInterrupt,
                reason: "urgent past the exhausted realtime budget; forced through".to_string(),
            });
            budget.forced_surfaced.push(id);
        }
    }

    // Single batched mutation of the spend counter.
    budget.realtime_interrupts_used += consumed;

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuietHours;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
    }

    fn night() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 23, 0, 0).unwrap()
    }

    fn budget() -> InterruptBudget {
        InterruptBudget::new("u1", NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(), 2)
    }

    fn score(id: &str, total: f64, urgency: f64) -> PriorityScore {
        PriorityScore {
            commitment_id: id.to_string(),
            total,
            urgency,
            importance: 0.5,
            decay: 1.0,
            user_affinity: 0.5,
            computed_at: noon(),
        }
    }

    fn quiet_prefs(allow_critical: bool) -> TemporalPreferences {
        let mut prefs = TemporalPreferences::new("u1");
        prefs.quiet_hours = Some(QuietHours {
            start: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            allow_critical,
        });
        prefs
    }

    #[test]
    fn action_ladder_assigns_by_thresholds() {
        let prefs = TemporalPreferences::new("u1");
        let config = EngineConfig::default();
        let mut b = budget();
        let scores = vec![
            score("urgent", 0.9, 0.95),
            score("suggest", 0.75, 0.5),
            score("bubble", 0.55, 0.3),
            score("silent", 0.2, 0.1),
        ];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, noon());
        let action_of = |id: &str| {
            decisions
                .iter()
                .find(|d| d.commitment_id == id)
                .unwrap()
                .action
        };
        assert_eq!(action_of("urgent"), InterruptAction::RealtimeInterrupt);
        assert_eq!(action_of("suggest"), InterruptAction::SuggestOneTap);
        assert_eq!(action_of("bubble"), InterruptAction::BubbleNotification);
        assert_eq!(action_of("silent"), InterruptAction::StoreSilent);
        assert_eq!(b.realtime_interrupts_used, 1);
    }

    #[test]
    fn realtime_cap_never_exceeded_in_one_pass() {
        let prefs = TemporalPreferences::new("u1");
        let config = EngineConfig::default();
        let mut b = budget();
        let scores: Vec<PriorityScore> = (0..5)
            .map(|i| score(&format!("c{i}"), 0.95, 1.0))
            .collect();
        let decisions = process_queue(&scores, &prefs, &config, &mut b, noon());

        let realtime = decisions
            .iter()
            .filter(|d| d.action == InterruptAction::RealtimeInterrupt)
            .count();
        assert_eq!(realtime, 2);
        assert_eq!(b.realtime_interrupts_used, 2);
        // The 3 overflow items bundled into one decision
        let bundled: Vec<_> = decisions
            .iter()
            .filter(|d| d.action == InterruptAction::BundledUrgent)
            .collect();
        assert_eq!(bundled.len(), 1);
        assert_eq!(b.forced_surfaced.len(), 3);
    }

    #[test]
    fn exhausted_cap_with_three_urgent_bundles_into_one() {
        let prefs = TemporalPreferences::new("u1");
        let config = EngineConfig::default();
        let mut b = budget();
        b.realtime_interrupts_used = 2; // cap already spent

        let scores = vec![
            score("a", 0.95, 1.0),
            score("b", 0.92, 0.98),
            score("c", 0.90, 0.97),
        ];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, noon());
        assert_eq!(decisions.len(), 1);
        let d = &decisions[0];
        assert_eq!(d.action, InterruptAction::BundledUrgent);
        assert_eq!(d.commitment_id, "a,b,c");
        assert!(d.reason.contains("3 urgent"));
    }

    #[test]
    fn two_forced_stay_unbundled() {
        let prefs = TemporalPreferences::new("u1");
        let config = EngineConfig::default();
        let mut b = budget();
        b.realtime_interrupts_used = 2;

        let scores = vec![score("a", 0.95, 1.0), score("b", 0.92, 0.98)];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, noon());
        assert_eq!(decisions.len(), 2);
        assert!(decisions
            .iter()
            .all(|d| d.action == InterruptAction::ForcedInterrupt));
        assert_eq!(b.forced_surfaced, vec!["a".to_string(), "b".to_string()]);
        // Forced surfacing never spends normal budget
        assert_eq!(b.realtime_interrupts_used, 2);
    }

    #[test]
    fn quiet_hours_without_exception_stores_everything() {
        let prefs = quiet_prefs(false);
        let config = EngineConfig::default();
        let mut b = budget();
        let scores = vec![score("a", 0.99, 1.0), score("b", 0.6, 0.5)];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, night());
        assert_eq!(decisions.len(), 2);
        assert!(decisions
            .iter()
            .all(|d| d.action == InterruptAction::StoreSilent));
        assert_eq!(b.realtime_interrupts_used, 0);
    }

    #[test]
    fn quiet_hours_critical_exception_lets_critical_through() {
        let prefs = quiet_prefs(true);
        let config = EngineConfig::default();
        let mut b = budget();
        let scores = vec![score("critical", 0.95, 1.0), score("normal", 0.8, 0.9)];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, night());
        let action_of = |id: &str| {
            decisions
                .iter()
                .find(|d| d.commitment_id == id)
                .unwrap()
                .action
        };
        assert_eq!(action_of("critical"), InterruptAction::RealtimeInterrupt);
        assert_eq!(action_of("normal"), InterruptAction::StoreSilent);
    }

    #[test]
    fn quiet_hours_respect_user_timezone() {
        // 23:00 UTC is 18:00 in New York, not quiet there
        let mut prefs = quiet_prefs(false);
        prefs.timezone = "America/New_York".to_string();
        let config = EngineConfig::default();
        let mut b = budget();
        let scores = vec![score("a", 0.95, 1.0)];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, night());
        assert_eq!(decisions[0].action, InterruptAction::RealtimeInterrupt);
    }

    #[test]
    fn focus_mode_only_surfaces_critical() {
        let mut prefs = TemporalPreferences::new("u1");
        prefs.focus_mode = true;
        let config = EngineConfig::default();
        let mut b = budget();
        let scores = vec![score("critical", 0.95, 1.0), score("normal", 0.75, 0.6)];
        let decisions = process_queue(&scores, &prefs, &config, &mut b, noon());
        let action_of = |id: &str| {
            decisions
                .iter()
                .find(|d| d.commitment_id == id)
                .unwrap()
                .action
        };
        assert_eq!(action_of("critical"), InterruptAction::RealtimeInterrupt);
        assert_eq!(action_of("normal"), InterruptAction::StoreSilent);
    }

    #[test]
    fn tolerance_adjusts_effective_cap() {
        let b = budget();
        let mut prefs = TemporalPreferences::new("u1");
        assert_eq!(effective_realtime_max(&b, &prefs), 2);
        prefs.realtime_tolerance = 0.8;
        assert_eq!(effective_realtime_max(&b, &prefs), 3);
        prefs.realtime_tolerance = 0.2;
        assert_eq!(effective_realtime_max(&b, &prefs), 1);
    }
}
