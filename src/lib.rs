//! Temporal commitment intelligence engine.
//!
//! Turns raw content streams (email, chat, voice transcripts, calendar
//! items) into tracked commitments with due dates, then decides when and
//! how hard to interrupt the user about them. The pipeline:
//!
//! 1. [`classify`]: what kind of content is this?
//! 2. [`extract`]: pattern-table commitment extraction with temporal
//!    resolution ([`temporal`]) and near-duplicate merging.
//! 3. [`validate`]: second-pass framing check and composite confidence.
//! 4. [`score`]: urgency / importance / decay / affinity priority.
//! 5. [`budget`]: quiet-hours gating and the daily interrupt budget.
//! 6. [`digest`]: morning digest and evening review batching.
//! 7. [`deps`]: inferred preparatory sub-actions for event commitments.
//! 8. [`learning`]: outcome recording and preference adjustment.
//!
//! [`engine::TemporalEngine`] is the facade over all of it, backed by a
//! [`store::StateStore`].

pub mod budget;
pub mod classify;
pub mod config;
pub mod deps;
pub mod digest;
pub mod engine;
pub mod error;
pub mod extract;
pub mod learning;
pub mod score;
pub mod store;
pub mod temporal;
pub mod types;
pub mod validate;

pub use config::{EngineConfig, QuietHours, TemporalPreferences};
pub use engine::{GroundingProvider, NoGrounding, TemporalEngine};
pub use error::EngineError;
pub use store::{MemoryStore, StateStore};
pub use types::{
    Commitment, DailyDigest, IngestionTrigger, InterruptAction, InterruptBudget,
    InterruptDecision, NotificationOutcome, PriorityScore,
};
