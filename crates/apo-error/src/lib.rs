//! Unified error taxonomy with stable error codes for the article pipeline.
//!
//! Every pipeline error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`PipelineError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Stage execution failures, critical or advisory.
    Stage,
    /// Merge/link validation failures (Stage 10).
    Validation,
    /// Quality-gate and quality-monitor conditions.
    Quality,
    /// Workflow-level conditions (cancellation, terminal state).
    Workflow,
    /// Registry / stage-factory configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stage => "stage",
            Self::Validation => "validation",
            Self::Quality => "quality",
            Self::Workflow => "workflow",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases. The set mirrors the
/// failure taxonomy: critical stage failures terminate a job, advisory
/// failures are recorded and tolerated, and quality/cancel conditions are
/// handled by the workflow engine without ever raising a Rust panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Stage --
    /// Exception in a stage marked critical (0, 2, 10, 11). Terminates the job.
    CriticalStageFailure,
    /// Exception in a non-critical or parallel stage. Recorded, not fatal.
    AdvisoryStageFailure,
    /// An external-call stage exceeded its configured timeout.
    StageTimeout,

    // -- Validation (Stage 10) --
    /// A required `validated_article` field was empty after merge.
    ValidationMissingField,
    /// A citation URL failed syntax validation (scheme/authority).
    ValidationMalformedUrl,

    // -- Quality --
    /// `aeo_score` fell below the gate threshold.
    QualityUnderflow,

    // -- Workflow --
    /// An external cancellation signal was honored.
    CancelRequested,

    // -- Config --
    /// Two stages registered under the same stage id.
    ConfigDuplicateStageId,
    /// A critical stage id has no registered implementation.
    ConfigMissingCriticalStage,
    /// The registry configuration references an id outside the canonical pipeline.
    ConfigUnknownStageId,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CriticalStageFailure | Self::AdvisoryStageFailure | Self::StageTimeout => {
                ErrorCategory::Stage
            }
            Self::ValidationMissingField | Self::ValidationMalformedUrl => {
                ErrorCategory::Validation
            }
            Self::QualityUnderflow => ErrorCategory::Quality,
            Self::CancelRequested => ErrorCategory::Workflow,
            Self::ConfigDuplicateStageId
            | Self::ConfigMissingCriticalStage
            | Self::ConfigUnknownStageId => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// `true` for error codes that must terminate the job (§7 taxonomy).
    #[must_use]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::CriticalStageFailure
                | Self::ValidationMissingField
                | Self::ValidationMalformedUrl
                | Self::CancelRequested
                | Self::ConfigDuplicateStageId
                | Self::ConfigMissingCriticalStage
                | Self::ConfigUnknownStageId
        )
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"CRITICAL_STAGE_FAILURE"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalStageFailure => "CRITICAL_STAGE_FAILURE",
            Self::AdvisoryStageFailure => "ADVISORY_STAGE_FAILURE",
            Self::StageTimeout => "STAGE_TIMEOUT",
            Self::ValidationMissingField => "VALIDATION_MISSING_FIELD",
            Self::ValidationMalformedUrl => "VALIDATION_MALFORMED_URL",
            Self::QualityUnderflow => "QUALITY_UNDERFLOW",
            Self::CancelRequested => "CANCEL_REQUESTED",
            Self::ConfigDuplicateStageId => "CONFIG_DUPLICATE_STAGE_ID",
            Self::ConfigMissingCriticalStage => "CONFIG_MISSING_CRITICAL_STAGE",
            Self::ConfigUnknownStageId => "CONFIG_UNKNOWN_STAGE_ID",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Unified pipeline error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use apo_error::{PipelineError, ErrorCode};
///
/// let err = PipelineError::new(ErrorCode::StageTimeout, "llm call timed out after 120s")
///     .with_context("stage_id", 2)
///     .with_context("attempt", 1);
/// ```
pub struct PipelineError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl PipelineError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("PipelineError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`PipelineError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&PipelineError> for PipelineErrorDto {
    fn from(err: &PipelineError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<PipelineErrorDto> for PipelineError {
    fn from(dto: PipelineErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::CriticalStageFailure,
        ErrorCode::AdvisoryStageFailure,
        ErrorCode::StageTimeout,
        ErrorCode::ValidationMissingField,
        ErrorCode::ValidationMalformedUrl,
        ErrorCode::QualityUnderflow,
        ErrorCode::CancelRequested,
        ErrorCode::ConfigDuplicateStageId,
        ErrorCode::ConfigMissingCriticalStage,
        ErrorCode::ConfigUnknownStageId,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = PipelineError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = PipelineError::new(ErrorCode::AdvisoryStageFailure, "image timeout");
        assert_eq!(err.to_string(), "[ADVISORY_STAGE_FAILURE] image timeout");
    }

    #[test]
    fn display_with_context() {
        let err = PipelineError::new(ErrorCode::StageTimeout, "timed out")
            .with_context("timeout_ms", 120_000);
        let s = err.to_string();
        assert!(s.starts_with("[STAGE_TIMEOUT] timed out"));
        assert!(s.contains("timeout_ms"));
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = PipelineError::new(ErrorCode::Internal, "init failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("file missing"));
    }

    #[test]
    fn stage_codes_categorised() {
        assert_eq!(ErrorCode::CriticalStageFailure.category(), ErrorCategory::Stage);
        assert_eq!(ErrorCode::AdvisoryStageFailure.category(), ErrorCategory::Stage);
        assert_eq!(ErrorCode::StageTimeout.category(), ErrorCategory::Stage);
    }

    #[test]
    fn validation_codes_categorised() {
        assert_eq!(
            ErrorCode::ValidationMissingField.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ErrorCode::ValidationMalformedUrl.category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn criticality_matches_taxonomy() {
        assert!(ErrorCode::CriticalStageFailure.is_critical());
        assert!(ErrorCode::ValidationMissingField.is_critical());
        assert!(ErrorCode::CancelRequested.is_critical());
        assert!(!ErrorCode::AdvisoryStageFailure.is_critical());
        assert!(!ErrorCode::QualityUnderflow.is_critical());
    }

    #[test]
    fn builder_with_context_multiple_keys() {
        let err = PipelineError::new(ErrorCode::StageTimeout, "timeout")
            .with_context("stage_id", 2)
            .with_context("attempt", 1);
        assert_eq!(err.context.len(), 2);
        assert_eq!(err.context["stage_id"], serde_json::json!(2));
    }

    #[test]
    fn category_shorthand() {
        let err = PipelineError::new(ErrorCode::QualityUnderflow, "aeo too low");
        assert_eq!(err.category(), ErrorCategory::Quality);
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let code = ErrorCode::CriticalStageFailure;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#""CRITICAL_STAGE_FAILURE""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn dto_roundtrip_with_source() {
        let src = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let err = PipelineError::new(ErrorCode::Internal, "crash").with_source(src);
        let dto: PipelineErrorDto = (&err).into();
        assert_eq!(dto.source_message.as_deref(), Some("pipe broke"));
        let json = serde_json::to_string(&dto).unwrap();
        let back: PipelineErrorDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto, back);
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = PipelineError::new(ErrorCode::Internal, "staging").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()));
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn all_codes_display_matches_as_str() {
        for code in ALL_CODES {
            assert_eq!(code.to_string(), code.as_str());
        }
    }
}
