//! Pattern-based source classification for incoming text.
//!
//! Guesses the provenance of a raw text blob (calendar, email, text
//! message, voice transcript, document, manual) with a confidence score.
//! No AI involved, just ordered marker checks against known conventions,
//! most specific first. The guess only picks threshold sensitivity
//! downstream; a wrong guess degrades confidence, never correctness.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Provenance of an ingested text blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Calendar,
    Email,
    Text,
    Voice,
    Document,
    Manual,
}

impl SourceType {
    /// Human-readable label for this source.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Email => "email",
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Manual => "manual",
        }
    }

    /// Fixed acceptance threshold callers use to decide whether to trust
    /// a classification of this type.
    pub fn acceptance_threshold(&self) -> f64 {
        match self {
            Self::Calendar => 0.9,
            Self::Manual => 0.95,
            Self::Email => 0.7,
            Self::Voice => 0.8,
            Self::Text => 0.75,
            Self::Document => 0.6,
        }
    }
}

/// Classification result with the reasoning that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceClassification {
    pub source_type: SourceType,
    pub confidence: f64,
    pub reasoning: String,
}

const CALENDAR_MARKERS: &[&str] = &[
    "begin:vcalendar",
    "dtstart",
    "organizer:",
    "calendar invitation",
    "invited you to",
    "accepted:",
    "event details",
];

const VOICE_MARKERS: &[&str] = &[
    "um,",
    " uh,",
    "you know,",
    "i mean,",
    "[inaudible]",
    "[transcript]",
    "transcribed by",
];

const TEXT_MESSAGE_MARKERS: &[&str] = &[
    "lol", "omg", "btw", "gonna", "wanna", "gtg", "thx", "pls", "np ", "u up",
];

const EMAIL_HEADERS: &[&str] = &["from:", "to:", "subject:", "cc:", "date:", "reply-to:"];

/// Classify a raw text blob.
///
/// If the caller already asserted a source type, classification is skipped
/// and confidence is 1.0. Otherwise ordered marker checks run from most to
/// least specific, defaulting to `document` at low confidence.
pub fn classify_source(content: &str, hinted: Option<SourceType>) -> SourceClassification {
    if let Some(source_type) = hinted {
        return SourceClassification {
            source_type,
            confidence: 1.0,
            reasoning: "source type asserted by caller".to_string(),
        };
    }

    let lower = content.to_lowercase();

    // Calendar markers are the most specific convention we recognize.
    if let Some(marker) = CALENDAR_MARKERS.iter().find(|m| lower.contains(*m)) {
        return SourceClassification {
            source_type: SourceType::Calendar,
            confidence: 0.9,
            reasoning: format!("calendar marker \"{marker}\" found"),
        };
    }

    // Voice transcripts betray themselves through filler words; one filler
    // can appear anywhere, two is a pattern.
    let filler_count = VOICE_MARKERS.iter().filter(|m| lower.contains(*m)).count();
    if filler_count >= 2 {
        return SourceClassification {
            source_type: SourceType::Voice,
            confidence: 0.8,
            reasoning: format!("{filler_count} voice-transcript fillers found"),
        };
    }

    // Text messages: short and full of chat abbreviations.
    if lower.len() < 300 {
        let abbrev_count = TEXT_MESSAGE_MARKERS
            .iter()
            .filter(|m| lower.contains(*m))
            .count();
        if abbrev_count >= 1 {
            return SourceClassification {
                source_type: SourceType::Text,
                confidence: 0.75,
                reasoning: format!("short message with {abbrev_count} chat abbreviation(s)"),
            };
        }
    }

    // Email headers at line starts; two or more is high confidence,
    // exactly one is a weaker signal.
    let header_count = lower
        .lines()
        .map(str::trim_start)
        .filter(|line| EMAIL_HEADERS.iter().any(|h| line.starts_with(h)))
        .count();
    if header_count >= 2 {
        return SourceClassification {
            source_type: SourceType::Email,
            confidence: 0.85,
            reasoning: format!("{header_count} email headers found"),
        };
    }
    if header_count == 1 {
        return SourceClassification {
            source_type: SourceType::Email,
            confidence: 0.6,
            reasoning: "single email header found".to_string(),
        };
    }

    debug!(len = content.len(), "no source markers matched; defaulting to document");
    SourceClassification {
        source_type: SourceType::Document,
        confidence: 0.5,
        reasoning: "no source markers matched; defaulting to document".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hinted_type_skips_classification() {
        let c = classify_source("anything at all", Some(SourceType::Manual));
        assert_eq!(c.source_type, SourceType::Manual);
        assert!((c.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn calendar_invite_detected() {
        let c = classify_source(
            "BEGIN:VCALENDAR\nDTSTART:20260315T100000Z\nSUMMARY:Planning",
            None,
        );
        assert_eq!(c.source_type, SourceType::Calendar);
        assert!((c.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn voice_transcript_needs_two_fillers() {
        let c = classify_source(
            "So um, I was thinking, you know, we should probably ship this week.",
            None,
        );
        assert_eq!(c.source_type, SourceType::Voice);

        // A single filler is not enough
        let c2 = classify_source("So um, let me get back to you about that thing tomorrow because the plan is not final yet and I want to check the numbers first before committing to anything specific here.", None);
        assert_ne!(c2.source_type, SourceType::Voice);
    }

    #[test]
    fn short_chatty_message_is_text() {
        let c = classify_source("btw gonna be late, can u send the doc?", None);
        assert_eq!(c.source_type, SourceType::Text);
        assert!((c.confidence - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn two_headers_mean_email_high_confidence() {
        let c = classify_source(
            "From: alice@example.com\nSubject: Q2 numbers\n\nNumbers attached.",
            None,
        );
        assert_eq!(c.source_type, SourceType::Email);
        assert!((c.confidence - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn one_header_means_email_medium_confidence() {
        let c = classify_source(
            "Subject: reminder about the thing we discussed in the meeting earlier this week and the follow-ups it needs from both teams before the end of the quarter deadline arrives",
            None,
        );
        assert_eq!(c.source_type, SourceType::Email);
        assert!((c.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn plain_prose_defaults_to_document() {
        let c = classify_source(
            "The quarterly planning document outlines our goals for the next cycle.",
            None,
        );
        assert_eq!(c.source_type, SourceType::Document);
        assert!(c.confidence < SourceType::Document.acceptance_threshold());
    }

    #[test]
    fn acceptance_thresholds_match_contract() {
        assert!((SourceType::Calendar.acceptance_threshold() - 0.9).abs() < f64::EPSILON);
        assert!((SourceType::Manual.acceptance_threshold() - 0.95).abs() < f64::EPSILON);
        assert!((SourceType::Email.acceptance_threshold() - 0.7).abs() < f64::EPSILON);
        assert!((SourceType::Voice.acceptance_threshold() - 0.8).abs() < f64::EPSILON);
        assert!((SourceType::Text.acceptance_threshold() - 0.75).abs() < f64::EPSILON);
        assert!((SourceType::Document.acceptance_threshold() - 0.6).abs() < f64::EPSILON);
    }
}
