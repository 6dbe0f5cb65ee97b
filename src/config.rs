//! Engine configuration and per-user preferences.
//!
//! `EngineConfig` holds the global tunables (thresholds, caps, digest
//! timing, learning window). There is no hidden global state: a default
//! instance is built once at startup and passed explicitly into each
//! component call, overridable per call.
//!
//! `TemporalPreferences` holds per-user tunables: quiet hours, critical
//! categories, focus mode, timezone, and the values outcome learning
//! adjusts over time (realtime tolerance, category weights/affinities).

use std::collections::HashMap;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Global tunables, read by every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Minimum total score for a real-time interrupt.
    #[serde(default = "default_realtime_score_min")]
    pub realtime_score_min: f64,
    /// Minimum urgency component for a real-time interrupt.
    #[serde(default = "default_realtime_urgency_min")]
    pub realtime_urgency_min: f64,
    /// Daily cap on real-time interruptions.
    #[serde(default = "default_realtime_interrupt_max")]
    pub realtime_interrupt_max: u32,
    /// Minimum total score for a one-tap suggestion.
    #[serde(default = "default_suggest_threshold")]
    pub suggest_threshold: f64,
    /// Minimum total score for a passive bubble notification.
    #[serde(default = "default_bubble_threshold")]
    pub bubble_threshold: f64,
    /// Critical predicate: total score floor.
    #[serde(default = "default_critical_score_min")]
    pub critical_score_min: f64,
    /// Critical predicate: urgency component floor.
    #[serde(default = "default_critical_urgency_min")]
    pub critical_urgency_min: f64,
    /// Extractions below this confidence are silently discarded.
    #[serde(default = "default_min_extraction_confidence")]
    pub min_extraction_confidence: f64,
    /// More than this many forced interrupts in one pass get bundled.
    #[serde(default = "default_forced_bundle_threshold")]
    pub forced_bundle_threshold: usize,
    /// Morning digest size.
    #[serde(default = "default_digest_max_items")]
    pub digest_max_items: usize,
    /// Morning digest send time (user-local).
    #[serde(default = "default_digest_time")]
    pub digest_time: NaiveTime,
    /// Lookback window for preference adjustment, in days.
    #[serde(default = "default_learning_window_days")]
    pub learning_window_days: i64,
    /// Minimum outcome sample size before learning acts.
    #[serde(default = "default_learning_min_samples")]
    pub learning_min_samples: usize,
}

fn default_realtime_score_min() -> f64 {
    0.85
}
fn default_realtime_urgency_min() -> f64 {
    0.95
}
fn default_realtime_interrupt_max() -> u32 {
    2
}
fn default_suggest_threshold() -> f64 {
    0.70
}
fn default_bubble_threshold() -> f64 {
    0.50
}
fn default_critical_score_min() -> f64 {
    0.9
}
fn default_critical_urgency_min() -> f64 {
    0.95
}
fn default_min_extraction_confidence() -> f64 {
    0.3
}
fn default_forced_bundle_threshold() -> usize {
    2
}
fn default_digest_max_items() -> usize {
    5
}
fn default_digest_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("valid digest time")
}
fn default_learning_window_days() -> i64 {
    14
}
fn default_learning_min_samples() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            realtime_score_min: default_realtime_score_min(),
            realtime_urgency_min: default_realtime_urgency_min(),
            realtime_interrupt_max: default_realtime_interrupt_max(),
            suggest_threshold: default_suggest_threshold(),
            bubble_threshold: default_bubble_threshold(),
            critical_score_min: default_critical_score_min(),
            critical_urgency_min: default_critical_urgency_min(),
            min_extraction_confidence: default_min_extraction_confidence(),
            forced_bundle_threshold: default_forced_bundle_threshold(),
            digest_max_items: default_digest_max_items(),
            digest_time: default_digest_time(),
            learning_window_days: default_learning_window_days(),
            learning_min_samples: default_learning_min_samples(),
        }
    }
}

/// A quiet window in user-local time. Supports overnight wraparound
/// (e.g. 21:00–07:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Whether sufficiently critical items may still interrupt.
    #[serde(default)]
    pub allow_critical: bool,
}

impl QuietHours {
    /// True if `t` falls inside the quiet window.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            t >= self.start && t < self.end
        } else {
            // Overnight wraparound: active from start to midnight, and
            // from midnight to end.
            t >= self.start || t < self.end
        }
    }
}

/// Per-user tunables. Written by explicit settings calls and by outcome
/// learning; read by the scorer, budget manager, and digest generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPreferences {
    pub user_id: String,
    /// IANA timezone name; falls back to UTC if unparseable.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
    /// Categories whose importance is forced to 1.0.
    #[serde(default)]
    pub critical_categories: Vec<Category>,
    /// Focus mode: only critical items surface, all day.
    #[serde(default)]
    pub focus_mode: bool,
    #[serde(default)]
    pub evening_review_enabled: bool,
    /// Learned tolerance for real-time interruptions, in [0.2, 0.8].
    #[serde(default = "default_realtime_tolerance")]
    pub realtime_tolerance: f64,
    /// Learned per-category importance overrides.
    #[serde(default)]
    pub category_weights: HashMap<Category, f64>,
    /// Learned per-category engagement rates (affinity).
    #[serde(default)]
    pub category_affinity: HashMap<Category, f64>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_realtime_tolerance() -> f64 {
    0.5
}

impl TemporalPreferences {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            timezone: default_timezone(),
            quiet_hours: None,
            critical_categories: Vec::new(),
            focus_mode: false,
            evening_review_enabled: false,
            realtime_tolerance: default_realtime_tolerance(),
            category_weights: HashMap::new(),
            category_affinity: HashMap::new(),
        }
    }

    /// Parsed timezone, falling back to UTC on a bad name rather than
    /// failing the evaluation.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn quiet_hours_same_day_window() {
        let q = QuietHours {
            start: t(13, 0),
            end: t(14, 0),
            allow_critical: false,
        };
        assert!(q.contains(t(13, 30)));
        assert!(!q.contains(t(14, 0)));
        assert!(!q.contains(t(12, 59)));
    }

    #[test]
    fn quiet_hours_overnight_wraparound() {
        let q = QuietHours {
            start: t(21, 0),
            end: t(7, 0),
            allow_critical: false,
        };
        assert!(q.contains(t(23, 0)));
        assert!(q.contains(t(2, 0)));
        assert!(q.contains(t(21, 0)));
        assert!(!q.contains(t(7, 0)));
        assert!(!q.contains(t(12, 0)));
    }

    #[test]
    fn bad_timezone_falls_back_to_utc() {
        let mut p = TemporalPreferences::new("u1");
        p.timezone = "Not/AZone".to_string();
        assert_eq!(p.tz(), chrono_tz::UTC);
    }

    #[test]
    fn config_defaults_match_documented_contract() {
        let c = EngineConfig::default();
        assert_eq!(c.realtime_interrupt_max, 2);
        assert!((c.suggest_threshold - 0.70).abs() < f64::EPSILON);
        assert!((c.bubble_threshold - 0.50).abs() < f64::EPSILON);
        assert_eq!(c.digest_max_items, 5);
        assert_eq!(c.learning_window_days, 14);
        assert_eq!(c.learning_min_samples, 5);
    }
}
