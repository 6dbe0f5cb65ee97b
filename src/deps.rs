//! Dependency inference for event-type commitments.
//!
//! A commitment like "attend Sarah's wedding next month" implies
//! preparatory sub-actions (book travel, buy a gift) that the user never
//! said out loud. Inference is a static archetype table keyed on event
//! keywords; first match wins. Chains are created once per commitment and
//! only ever mutated through explicit completion or dismissal.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::types::{Commitment, Dependency, DependencyChain, DependencyStatus};

struct Archetype {
    name: &'static str,
    keywords: &'static [&'static str],
    /// (action, confidence, lead-time days before the event)
    steps: &'static [(&'static str, f64, i64)],
}

// Ordered; first keyword hit wins. More specific event types first so
// e.g. "wedding trip" infers wedding prep, not generic vacation prep.
const ARCHETYPES: &[Archetype] = &[
    Archetype {
        name: "wedding",
        keywords: &["wedding"],
        steps: &[
            ("Book travel", 0.8, 30),
            ("Book accommodation", 0.8, 30),
            ("Buy gift", 0.7, 14),
            ("Get outfit ready", 0.6, 7),
            ("RSVP", 0.9, 21),
        ],
    },
    Archetype {
        name: "conference",
        keywords: &["conference", "summit", "convention"],
        steps: &[
            ("Register", 0.9, 30),
            ("Book travel", 0.8, 21),
            ("Book hotel", 0.8, 21),
            ("Prepare materials", 0.6, 7),
        ],
    },
    Archetype {
        name: "interview",
        keywords: &["interview"],
        steps: &[
            ("Research the company", 0.8, 3),
            ("Prepare answers to likely questions", 0.7, 2),
            ("Plan the route or test the video link", 0.6, 1),
        ],
    },
    Archetype {
        name: "exam",
        keywords: &["exam", "test", "certification"],
        steps: &[
            ("Build a study plan", 0.8, 21),
            ("Review practice questions", 0.7, 7),
            ("Confirm logistics", 0.6, 2),
        ],
    },
    Archetype {
        name: "medical",
        keywords: &["surgery", "procedure", "operation"],
        steps: &[
            ("Complete pre-op requirements", 0.8, 7),
            ("Arrange a ride", 0.7, 3),
            ("Arrange time off", 0.7, 7),
        ],
    },
    Archetype {
        name: "medical-appointment",
        keywords: &["appointment", "doctor", "dentist", "checkup"],
        steps: &[
            ("Confirm the appointment", 0.8, 2),
            ("Gather referrals and records", 0.6, 3),
            ("Arrange time off", 0.6, 7),
        ],
    },
    Archetype {
        name: "moving",
        keywords: &["moving", "move out", "relocation", "relocating"],
        steps: &[
            ("Book movers", 0.8, 30),
            ("Pack non-essentials", 0.7, 14),
            ("Update address records", 0.7, 7),
            ("Transfer utilities", 0.8, 14),
        ],
    },
    Archetype {
        name: "presentation",
        keywords: &["presentation", "keynote", "talk"],
        steps: &[
            ("Draft the slides", 0.8, 7),
            ("Rehearse", 0.7, 2),
            ("Check equipment and room", 0.5, 1),
        ],
    },
    Archetype {
        name: "vacation",
        keywords: &["vacation", "holiday", "trip"],
        steps: &[
            ("Book flights", 0.8, 30),
            ("Book accommodation", 0.8, 30),
            ("Arrange coverage at work", 0.7, 14),
            ("Check passport validity", 0.6, 30),
        ],
    },
    Archetype {
        name: "deadline",
        keywords: &["submit", "submission", "application", "file taxes", "filing"],
        steps: &[
            ("Gather required documents", 0.7, 7),
            ("Draft and review", 0.7, 3),
        ],
    },
];

/// Suggested deadline: event date minus lead time. Suppressed entirely
/// when it would land in the past; a deadline of today stays.
fn suggested_deadline(event_date: Option<NaiveDate>, lead_days: i64, today: NaiveDate) -> Option<NaiveDate> {
    let event = event_date?;
    let deadline = event - Duration::days(lead_days);
    if deadline < today {
        None
    } else {
        Some(deadline)
    }
}

/// Infer the preparatory chain for a commitment, if its text matches a
/// known event archetype.
///
/// A dated commitment with no archetype match still gets a minimal
/// generic chain so the digest can nudge preparation; undated unmatched
/// commitments get none.
pub fn infer_dependencies(commitment: &Commitment, today: NaiveDate) -> Option<DependencyChain> {
    let haystack = format!(
        "{} {}",
        commitment.what.to_lowercase(),
        commitment.sentence.to_lowercase()
    );

    for archetype in ARCHETYPES {
        if archetype.keywords.iter().any(|k| haystack.contains(k)) {
            debug!(
                commitment_id = %commitment.id,
                archetype = archetype.name,
                "dependency chain inferred"
            );
            let dependencies = archetype
                .steps
                .iter()
                .map(|&(action, confidence, lead)| Dependency {
                    action: action.to_string(),
                    confidence,
                    suggested_deadline: suggested_deadline(
                        commitment.when.resolved_date,
                        lead,
                        today,
                    ),
                    status: DependencyStatus::Pending,
                })
                .collect();
            return Some(DependencyChain {
                primary_event: commitment.what.clone(),
                dependencies,
            });
        }
    }

    if commitment.when.resolved_date.is_some() {
        return Some(DependencyChain {
            primary_event: commitment.what.clone(),
            dependencies: vec![Dependency {
                action: "Prepare for this".to_string(),
                confidence: 0.4,
                suggested_deadline: suggested_deadline(commitment.when.resolved_date, 1, today),
                status: DependencyStatus::Pending,
            }],
        });
    }

    None
}
