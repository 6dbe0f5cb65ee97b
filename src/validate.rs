//! Second-pass commitment validation.
//!
//! A stricter look at each extraction: classifies the temporal framing
//! (past / hypothetical / future), rejects non-actionable candidates, and
//! blends four independent signals into a composite confidence. All
//! arithmetic is deliberately simple and auditable: the weights are part
//! of the documented contract, not implementation detail.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Commitment;

/// Temporal framing of a commitment sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFraming {
    Past,
    Hypothetical,
    Future,
}

/// Validation verdict for one commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub is_actionable: bool,
    pub time_reference: TimeFraming,
    pub adjusted_confidence: f64,
    pub reasoning: String,
}

/// Minimum extractor confidence for a hypothetical commitment to stay
/// actionable.
const HYPOTHETICAL_CONFIDENCE_FLOOR: f64 = 0.7;

/// Equal weight for each composite-confidence signal.
const SIGNAL_WEIGHT: f64 = 0.25;

/// Grounding signal values: found vs. not found.
const GROUNDED_SCORE: f64 = 0.85;
const UNGROUNDED_SCORE: f64 = 0.40;

fn re_past() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:sent|did|went|finished|completed|delivered|paid|handled|wrapped\s+up|already|yesterday|last\s+(?:week|month|year|night))\b",
        )
        .unwrap()
    })
}

fn re_hypothetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:might|maybe|perhaps|possibly|could|would|if\s+i|if\s+we|thinking\s+about|considering)\b",
        )
        .unwrap()
    })
}

/// Hedge terms the extractor writes into its own reasoning trace when it
/// was unsure. Each one found lowers the self-doubt signal.
const HEDGE_TERMS: &[&str] = &[
    "unclear",
    "ambiguous",
    "guess",
    "uncertain",
    "assumed",
    "weak",
    "unresolved",
    "no temporal reference",
];

/// Classify temporal framing and decide actionability.
///
/// Past-framed commitments are never actionable regardless of confidence.
/// Hypothetical framing needs extractor confidence of at least 0.7.
pub fn validate(commitment: &Commitment) -> Validation {
    let framing = classify_framing(&commitment.sentence);

    let is_actionable = commitment.what.len() >= 5
        && match framing {
            TimeFraming::Past => false,
            TimeFraming::Hypothetical => commitment.confidence >= HYPOTHETICAL_CONFIDENCE_FLOOR,
            TimeFraming::Future => true,
        };

    let adjusted_confidence = match framing {
        TimeFraming::Past => commitment.confidence * 0.1,
        TimeFraming::Hypothetical => commitment.confidence * 0.7,
        TimeFraming::Future => {
            if commitment.when.resolved_date.is_some() && !commitment.when.is_vague {
                (commitment.confidence * 1.2).min(1.0)
            } else {
                commitment.confidence
            }
        }
    };

    let reasoning = match framing {
        TimeFraming::Past => "past-tense framing; not actionable".to_string(),
        TimeFraming::Hypothetical => {
            if is_actionable {
                "hypothetical framing; confidence high enough to keep".to_string()
            } else {
                "hypothetical framing with low confidence; rejected".to_string()
            }
        }
        TimeFraming::Future => "future framing".to_string(),
    };

    if !is_actionable {
        debug!(
            commitment_id = %commitment.id,
            framing = ?framing,
            "commitment rejected as non-actionable"
        );
    }

    Validation {
        is_actionable,
        time_reference: framing,
        adjusted_confidence,
        reasoning,
    }
}

fn classify_framing(sentence: &str) -> TimeFraming {
    if re_past().is_match(sentence) {
        TimeFraming::Past
    } else if re_hypothetical().is_match(sentence) {
        TimeFraming::Hypothetical
    } else {
        TimeFraming::Future
    }
}

/// Blend four independent signals with equal weight:
/// hedging-language self-doubt from the extractor's reasoning trace,
/// schema completeness, retrieval grounding (the lookup itself is an
/// external collaborator; we only see whether a match was found), and the
/// adjusted judge confidence.
pub fn composite_confidence(
    commitment: &Commitment,
    validation: &Validation,
    grounded: bool,
) -> f64 {
    let hedging = hedging_score(&commitment.reasoning);
    let completeness = schema_completeness(commitment);
    let grounding = if grounded {
        GROUNDED_SCORE
    } else {
        UNGROUNDED_SCORE
    };
    let judge = validation.adjusted_confidence;

    SIGNAL_WEIGHT * (hedging + completeness + grounding + judge)
}

/// Fewer hedges in the extractor's own trace means more self-trust.
fn hedging_score(reasoning: &str) -> f64 {
    let lower = reasoning.to_lowercase();
    let hedges = HEDGE_TERMS.iter().filter(|t| lower.contains(*t)).count();
    (0.9 - 0.15 * hedges as f64).clamp(0.2, 0.9)
}

/// Fraction of {who, what, temporal text, resolved non-vague date} present.
fn schema_completeness(commitment: &Commitment) -> f64 {
    let mut present = 0u32;
    if !commitment.who.is_empty() {
        present += 1;
    }
    if commitment.what.len() >= 5 {
        present += 1;
    }
    if !commitment.when.raw.is_empty() {
        present += 1;
    }
    if commitment.when.resolved_date.is_some() && !commitment.when.is_vague {
        present += 1;
    }
    f64::from(present) / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_source, SourceType};
    use crate::config::EngineConfig;
    use crate::extract::extract_commitments;
    use chrono::{DateTime, TimeZone, Utc};

    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
    }

    fn one(content: &str) -> Commitment {
        let source = classify_source("", Some(SourceType::Email));
        let mut out = extract_commitments(
            "u1",
            content,
            &source,
            "msg-1",
            wednesday(),
            &EngineConfig::default(),
        );
        assert_eq!(out.len(), 1, "expected one extraction from {content:?}");
        out.remove(0)
    }

    #[test]
    fn future_commitment_is_actionable() {
        let c = one("I'll send the report by Friday.");
        let v = validate(&c);
        assert!(v.is_actionable);
        assert_eq!(v.time_reference, TimeFraming::Future);
    }

    #[test]
    fn past_framing_is_never_actionable() {
        let c = one("I already sent the report, must have been by Friday.");
        let v = validate(&c);
        assert!(!v.is_actionable);
        assert_eq!(v.time_reference, TimeFraming::Past);
        // Past framing crushes confidence
        assert!(v.adjusted_confidence <= c.confidence * 0.1 + f64::EPSILON);
    }

    #[test]
    fn hypothetical_needs_high_confidence() {
        let mut c = one("I might send the proposal by Friday.");
        let v = validate(&c);
        assert_eq!(v.time_reference, TimeFraming::Hypothetical);
        // This extraction is strong (dated deadline), so it survives
        assert!(c.confidence >= 0.7);
        assert!(v.is_actionable);

        c.confidence = 0.5;
        let v2 = validate(&c);
        assert!(!v2.is_actionable);
    }

    #[test]
    fn dated_future_commitment_gets_boost() {
        let mut c = one("I'll send the report by Friday.");
        c.confidence = 0.6;
        let v = validate(&c);
        assert!((v.adjusted_confidence - 0.72).abs() < 1e-9);
    }

    #[test]
    fn boost_caps_at_one() {
        let c = one("I'll send the report by Friday.");
        assert!((c.confidence - 1.0).abs() < f64::EPSILON);
        let v = validate(&c);
        assert!(v.adjusted_confidence <= 1.0);
    }

    #[test]
    fn composite_blends_four_signals_equally() {
        let c = one("I'll send the report by Friday.");
        let v = validate(&c);
        // hedging 0.9 (clean trace), completeness 1.0, grounded 0.85, judge 1.0
        let expected = 0.25 * (0.9 + 1.0 + 0.85 + 1.0);
        assert!((composite_confidence(&c, &v, true) - expected).abs() < 1e-9);

        // Ungrounded drops the grounding signal to 0.40
        let expected_ungrounded = 0.25 * (0.9 + 1.0 + 0.40 + 1.0);
        assert!((composite_confidence(&c, &v, false) - expected_ungrounded).abs() < 1e-9);
    }

    #[test]
    fn hedged_trace_lowers_composite() {
        let c = one("I'll circle back on this soon.");
        assert!(c.reasoning.contains("unresolved"));
        let v = validate(&c);
        let hedged = composite_confidence(&c, &v, false);

        let clean = one("I'll send the report by Friday.");
        let vc = validate(&clean);
        let unhedged = composite_confidence(&clean, &vc, false);
        assert!(hedged < unhedged);
    }

    #[test]
    fn completeness_counts_schema_fields() {
        let c = one("I need to update the slides.");
        // who + what present, no temporal text, no resolved date
        assert!((schema_completeness(&c) - 0.5).abs() < f64::EPSILON);
    }
}
