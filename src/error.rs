//! Error types for the commitment engine.
//!
//! Almost everything in this engine degrades instead of failing: extraction
//! misses, low-confidence rejections, and unparseable dates are all normal
//! control flow (absence, not exception). The only raised error is a
//! malformed ingestion trigger, which fails fast so garbage never enters
//! the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ingestion trigger missing required field: {0}")]
    MissingField(&'static str),
}

impl EngineError {
    /// True if the caller can fix this by correcting its input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, EngineError::MissingField(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = EngineError::MissingField("userId");
        assert!(err.to_string().contains("userId"));
        assert!(err.is_caller_error());
    }
}
