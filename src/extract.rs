//! Commitment extraction from raw text.
//!
//! Splits content into sentences and tests each against an ordered set of
//! commitment-language patterns; first match wins, explicit precedence.
//! A match yields who is responsible, what the action is, and a temporal
//! reference. Candidates that are too short or too uncertain are dropped
//! silently; a missed commitment is absence, not an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::classify::SourceClassification;
use crate::config::EngineConfig;
use crate::temporal;
use crate::types::Commitment;

/// Near-duplicate threshold for the fuzzy merge pass (Jaro-Winkler on
/// the action text, same responsible party).
const NEAR_DUPLICATE_SIMILARITY: f64 = 0.92;

/// Actions shorter than this are never actionable.
const MIN_WHAT_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Pattern table
// ---------------------------------------------------------------------------

/// One commitment-language pattern. `strips_prefix` means the match is a
/// leading commitment phrase ("I'll ", "remind me to ") that gets removed
/// from the action text; `unambiguous` earns a confidence bonus.
struct CommitmentPattern {
    name: &'static str,
    regex: fn() -> &'static Regex,
    strips_prefix: bool,
    unambiguous: bool,
}

// Evaluated top to bottom; first match wins.
const PATTERNS: &[CommitmentPattern] = &[
    CommitmentPattern {
        name: "first-person future intent",
        regex: re_future_intent,
        strips_prefix: true,
        unambiguous: true,
    },
    CommitmentPattern {
        name: "deadline phrasing",
        regex: re_deadline,
        strips_prefix: false,
        unambiguous: true,
    },
    CommitmentPattern {
        name: "obligation phrasing",
        regex: re_obligation,
        strips_prefix: true,
        unambiguous: false,
    },
    CommitmentPattern {
        name: "scheduled event",
        regex: re_scheduled,
        strips_prefix: false,
        unambiguous: false,
    },
    CommitmentPattern {
        name: "reminder phrasing",
        regex: re_reminder,
        strips_prefix: true,
        unambiguous: true,
    },
    CommitmentPattern {
        name: "collective intent",
        regex: re_collective,
        strips_prefix: true,
        unambiguous: false,
    },
];

// Compile-once regex patterns via OnceLock.
fn re_future_intent() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:i['’]ll|i\s+will|i['’]m\s+going\s+to|i\s+am\s+going\s+to|i\s+plan\s+to|i\s+intend\s+to|we['’]ll|we\s+will|we['’]re\s+going\s+to|we\s+are\s+going\s+to)\s+",
        )
        .unwrap()
    })
}

fn re_deadline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:by|before|due)\s+\S+").unwrap())
}

fn re_obligation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\b(?:i|we|you)\s+)?\b(?:needs?\s+to|ha(?:ve|s)\s+to|must|should)\s+")
            .unwrap()
    })
}

fn re_scheduled() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:meeting|appointment|call|interview|session|wedding|conference)\b.*\b(?:on|at)\b",
        )
        .unwrap()
    })
}

fn re_reminder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:remind\s+me\s+to|don['’]t\s+forget\s+to|remember\s+to)\s+").unwrap()
    })
}

fn re_collective() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blet['’]s\s+").unwrap())
}

// First-person-plural subject forms only; object pronouns ("us", "our")
// inside the action don't change who is responsible.
fn re_plural_party() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:we['’](?:ll|re)|we\s+(?:will|are|need|should|must|have\s+to|plan|intend)|let['’]s)\b",
        )
        .unwrap()
    })
}

fn re_named_subject() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^([A-Z][a-z]+)\s+(?:will|is\s+going\s+to|needs?\s+to|has\s+to|must|should|promised\s+to)\b",
        )
        .unwrap()
    })
}

fn re_deadline_capture() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:by|before|due)\s+([^,.;]+)").unwrap())
}

fn re_temporal_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(tomorrow|today|tonight|next\s+(?:week|month|monday|tuesday|wednesday|thursday|friday|saturday|sunday)|this\s+(?:week|month|weekend)|in\s+\d{1,3}\s+(?:days?|weeks?|months?)|(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?|\d{4}-\d{2}-\d{2}|soon|eventually|someday|sometime)\b",
        )
        .unwrap()
    })
}

fn re_trailing_temporal() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[,\s]+(?:(?:by|before|due|on|at)\s+[^,.;]{1,40}|tomorrow|today|tonight|next\s+\w+|this\s+\w+|in\s+\d{1,3}\s+\w+|soon|eventually)\s*$",
        )
        .unwrap()
    })
}

// Pronouns that look like named subjects but aren't.
const SUBJECT_PRONOUNS: &[&str] = &["I", "We", "He", "She", "They", "It", "You", "The", "This"];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract commitments from a content blob.
///
/// Candidates with an action under 5 characters or confidence below the
/// configured floor are dropped (logged at debug for pattern-table
/// telemetry, never stored). The result is deduplicated.
pub fn extract_commitments(
    user_id: &str,
    content: &str,
    source: &SourceClassification,
    source_id: &str,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<Commitment> {
    let mut out = Vec::new();

    for sentence in split_sentences(content) {
        let Some(candidate) = extract_from_sentence(user_id, sentence, source, source_id, now)
        else {
            continue;
        };

        if candidate.what.len() < MIN_WHAT_LEN {
            debug!(sentence, "discarding extraction: action too short");
            continue;
        }
        if candidate.confidence < config.min_extraction_confidence {
            debug!(
                sentence,
                confidence = candidate.confidence,
                "discarding low-confidence extraction"
            );
            continue;
        }
        out.push(candidate);
    }

    merge_commitments(out)
}

/// Test one sentence against the pattern table; first match wins.
fn extract_from_sentence(
    user_id: &str,
    sentence: &str,
    source: &SourceClassification,
    source_id: &str,
    now: DateTime<Utc>,
) -> Option<Commitment> {
    let pattern = PATTERNS.iter().find(|p| (p.regex)().is_match(sentence))?;

    let who = extract_who(sentence);
    let what = extract_what(sentence, pattern);
    let raw_temporal = extract_temporal_text(sentence);
    let when = temporal::reference_from(&raw_temporal, now);

    let confidence = compute_confidence(&who, &what, &when, pattern.unambiguous);
    let reasoning = build_reasoning(pattern.name, &who, &when);

    Some(Commitment {
        id: format!("cmt-{}", Uuid::new_v4()),
        user_id: user_id.to_string(),
        sentence: sentence.to_string(),
        who,
        what,
        when,
        source_type: source.source_type,
        source_id: source_id.to_string(),
        extracted_at: now,
        confidence,
        reasoning,
        created_at: now,
        validated: false,
        category: None,
        dependencies: None,
    })
}

fn split_sentences(content: &str) -> impl Iterator<Item = &str> {
    content
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.len() >= MIN_WHAT_LEN)
}

/// Responsible party: a first-person-plural subject → "user + others", a
/// capitalized name subject → that name, otherwise "user".
fn extract_who(sentence: &str) -> String {
    if re_plural_party().is_match(sentence) {
        return "user + others".to_string();
    }
    if let Some(caps) = re_named_subject().captures(sentence) {
        let name = &caps[1];
        if !SUBJECT_PRONOUNS.contains(&name) {
            return name.to_string();
        }
    }
    "user".to_string()
}

/// Action text: strip the matched commitment prefix (when the pattern is a
/// leading phrase) and any trailing temporal clause.
fn extract_what(sentence: &str, pattern: &CommitmentPattern) -> String {
    let mut what = if pattern.strips_prefix {
        match (pattern.regex)().find(sentence) {
            Some(m) => sentence[m.end()..].to_string(),
            None => sentence.to_string(),
        }
    } else {
        sentence.to_string()
    };

    what = re_trailing_temporal().replace(&what, "").to_string();
    what.trim().trim_end_matches([',', ';']).trim().to_string()
}

/// First temporal phrase in the sentence; deadline clauses win.
fn extract_temporal_text(sentence: &str) -> String {
    if let Some(caps) = re_deadline_capture().captures(sentence) {
        return caps[1].trim().to_string();
    }
    if let Some(m) = re_temporal_phrase().find(sentence) {
        return m.as_str().trim().to_string();
    }
    String::new()
}

/// Confidence from presence/length of who, what, and temporal text, plus
/// bonuses for a resolved non-vague date and unambiguous commitment
/// language. Capped at 1.0.
fn compute_confidence(
    who: &str,
    what: &str,
    when: &crate::types::TemporalReference,
    unambiguous: bool,
) -> f64 {
    let mut conf: f64 = 0.0;
    if !who.is_empty() {
        conf += 0.2;
    }
    if what.len() >= MIN_WHAT_LEN {
        conf += 0.25;
        if what.len() >= 15 {
            conf += 0.05;
        }
    }
    if !when.raw.is_empty() {
        conf += 0.2;
    }
    if when.resolved_date.is_some() && !when.is_vague {
        conf += 0.15;
    }
    if unambiguous {
        conf += 0.15;
    }
    conf.min(1.0)
}

/// The reasoning trace doubles as the validator's hedging-signal input, so
/// uncertainty gets named explicitly here.
fn build_reasoning(pattern_name: &str, who: &str, when: &crate::types::TemporalReference) -> String {
    let mut reasoning = format!("matched {pattern_name} pattern; who={who}");
    if when.raw.is_empty() {
        reasoning.push_str("; no temporal reference found");
    } else if when.resolved_date.is_none() {
        reasoning.push_str(&format!(
            "; temporal \"{}\" unresolved, urgency is a guess",
            when.raw
        ));
    } else {
        reasoning.push_str(&format!("; temporal \"{}\" resolved to a date", when.raw));
    }
    reasoning
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Dedup fingerprint: responsible party plus the first 20 characters of
/// the action, case-insensitive.
pub fn fingerprint(who: &str, what: &str) -> String {
    let what_lower = what.to_lowercase();
    let prefix: String = what_lower.chars().take(20).collect();
    let mut hasher = Sha256::new();
    hasher.update(who.to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(prefix.as_bytes());
    hex::encode(hasher.finalize())
}

/// Merge near-identical commitments, keeping the higher-confidence record.
///
/// Exact pass: identical fingerprint (who + first 20 chars of what).
/// Fuzzy pass: identical who and Jaro-Winkler similarity on the action
/// text at or above the threshold, which catches reworded duplicates
/// across sources.
pub fn merge_commitments(commitments: Vec<Commitment>) -> Vec<Commitment> {
    let mut by_fingerprint: HashMap<String, Commitment> = HashMap::new();
    for c in commitments {
        let fp = fingerprint(&c.who, &c.what);
        match by_fingerprint.get(&fp) {
            Some(existing) if existing.confidence >= c.confidence => {}
            _ => {
                by_fingerprint.insert(fp, c);
            }
        }
    }

    let mut survivors: Vec<Commitment> = by_fingerprint.into_values().collect();
    survivors.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut merged: Vec<Commitment> = Vec::with_capacity(survivors.len());
    for c in survivors {
        let duplicate = merged.iter().any(|kept| {
            kept.who.eq_ignore_ascii_case(&c.who)
                && strsim::jaro_winkler(&kept.what.to_lowercase(), &c.what.to_lowercase())
                    >= NEAR_DUPLICATE_SIMILARITY
        });
        if duplicate {
            debug!(what = %c.what, "merging near-duplicate commitment");
        } else {
            merged.push(c);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify_source, SourceType};
    use chrono::TimeZone;

    // Wednesday, 2026-03-04.
    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
    }

    fn source() -> SourceClassification {
        classify_source("", Some(SourceType::Email))
    }

    fn extract(content: &str) -> Vec<Commitment> {
        extract_commitments(
            "u1",
            content,
            &source(),
            "msg-1",
            wednesday(),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn first_person_deadline_sentence() {
        let out = extract("I'll send the report by Friday.");
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.who, "user");
        assert_eq!(c.what, "send the report");
        assert_eq!(c.when.raw, "Friday");
        assert!(!c.when.is_vague);
        assert_eq!(
            c.when.bucket,
            Some(crate::types::UrgencyBucket::ThisWeek)
        );
        assert!(c.confidence > 0.3);
    }

    #[test]
    fn collective_phrasing_extracts_shared_party() {
        let out = extract("Let's review the budget proposal next week.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].who, "user + others");
        assert!(out[0].what.starts_with("review the budget"));
    }

    #[test]
    fn plural_object_pronoun_keeps_singular_party() {
        let out = extract("I'll send our report by Friday.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].who, "user");
        assert_eq!(out[0].what, "send our report");
    }

    #[test]
    fn named_subject_is_extracted() {
        let out = extract("Sarah needs to send the updated contract tomorrow.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].who, "Sarah");
        assert_eq!(out[0].what, "send the updated contract");
    }

    #[test]
    fn obligation_phrasing_matches() {
        let out = extract("I need to renew my passport before June 1st.");
        assert_eq!(out.len(), 1);
        assert!(out[0].what.contains("renew my passport"));
        assert!(out[0].when.resolved_date.is_some());
    }

    #[test]
    fn reminder_phrasing_matches() {
        let out = extract("Remind me to call the dentist tomorrow.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].what, "call the dentist");
        assert_eq!(
            out[0].when.bucket,
            Some(crate::types::UrgencyBucket::Tomorrow)
        );
    }

    #[test]
    fn plain_statement_extracts_nothing() {
        let out = extract("The weather was nice this past weekend in the mountains.");
        assert!(out.is_empty());
    }

    #[tracing_test::traced_test]
    #[test]
    fn short_action_is_discarded_with_telemetry() {
        let out = extract("I'll go.");
        assert!(out.is_empty());
        assert!(logs_contain("action too short"));
    }

    #[test]
    fn duplicate_commitments_merge_keeping_higher_confidence() {
        let out = extract(
            "I'll send the quarterly report by Friday. I will send the quarterly report soon.",
        );
        assert_eq!(out.len(), 1);
        // The dated variant carries the resolved-date bonus
        assert!(out[0].when.resolved_date.is_some());
    }

    #[test]
    fn fingerprint_is_case_insensitive_and_prefix_bound() {
        let a = fingerprint("user", "Send the quarterly report to finance");
        let b = fingerprint("USER", "send the quarterly REPORT immediately");
        // First 20 chars of the action match case-insensitively
        assert_eq!(a, b);

        let c = fingerprint("user", "completely different action");
        assert_ne!(a, c);
    }

    #[test]
    fn merge_keeps_higher_confidence_record() {
        let mut low = extract("I'll send the quarterly report soon.").remove(0);
        low.confidence = 0.4;
        let mut high = extract("I'll send the quarterly report by Friday.").remove(0);
        high.confidence = 0.9;

        let merged = merge_commitments(vec![low, high]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn near_duplicates_merge_via_similarity() {
        let a = extract("I'll book the flights to Austin tomorrow.").remove(0);
        let b = extract("I'll book the flight to Austin tomorrow.").remove(0);
        // Different fingerprints (prefix differs within 20 chars) but
        // nearly identical actions for the same party
        assert_ne!(fingerprint(&a.who, &a.what), fingerprint(&b.who, &b.what));
        let merged = merge_commitments(vec![a, b]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn multiple_distinct_commitments_survive() {
        let out = extract(
            "I'll send the report by Friday. I need to book a dentist appointment. Let's plan the offsite next month.",
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn reasoning_names_unresolved_temporal() {
        let out = extract("I'll circle back on this soon.");
        assert_eq!(out.len(), 1);
        assert!(out[0].reasoning.contains("unresolved"));
    }
}
