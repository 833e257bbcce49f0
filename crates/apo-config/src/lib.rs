//! apo-config
//!
//! Configuration loading, validation, and merging for the pipeline
//! orchestrator engine (§6 "Configuration (environment)"). Collaborator
//! credentials are read by the collaborators themselves, not the engine —
//! this crate only covers engine-level tunables.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `parallel_stage_limit` is unset — parallel stages run fully unbounded.
    UnboundedParallelism,
    /// A collaborator timeout is unusually large.
    LargeTimeout {
        /// Collaborator name.
        collaborator: String,
        /// Timeout value in seconds.
        secs: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UnboundedParallelism => {
                write!(f, "parallel_stage_limit is unset; enrichment stages will run fully unbounded")
            }
            ConfigWarning::LargeTimeout { collaborator, secs } => {
                write!(f, "collaborator '{collaborator}' has a large timeout ({secs}s)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Per-collaborator call timeouts (§5), each independently overridable.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct CollaboratorTimeouts {
    /// `LlmClient::generate` timeout in seconds. Default `120`.
    #[serde(default = "default_llm_timeout")]
    pub llm_secs: u64,
    /// `EmbeddingClient::embed` timeout in seconds. Default `30`.
    #[serde(default = "default_embedding_timeout")]
    pub embedding_secs: u64,
    /// `UrlValidator::head` timeout in seconds. Default `10`.
    #[serde(default = "default_url_validate_timeout")]
    pub url_validate_secs: u64,
    /// `ImageBackend::generate` timeout in seconds. Default `180`.
    #[serde(default = "default_image_timeout")]
    pub image_secs: u64,
}

fn default_llm_timeout() -> u64 {
    120
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_url_validate_timeout() -> u64 {
    10
}
fn default_image_timeout() -> u64 {
    180
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        Self {
            llm_secs: default_llm_timeout(),
            embedding_secs: default_embedding_timeout(),
            url_validate_secs: default_url_validate_timeout(),
            image_secs: default_image_timeout(),
        }
    }
}

/// Top-level runtime configuration for the pipeline engine (§6).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PipelineConfig {
    /// Maximum regeneration attempts before the quality gate gives up and
    /// proceeds with the best attempt seen. Default `3`.
    #[serde(default = "default_max_regeneration_attempts")]
    pub max_regeneration_attempts: u32,
    /// AEO score below which the quality gate triggers regeneration.
    /// Default `80`.
    #[serde(default = "default_aeo_gate_threshold")]
    pub aeo_gate_threshold: f64,
    /// Maximum number of entries retained in a batch's similarity memory.
    /// Default `100`.
    #[serde(default = "default_batch_memory_capacity")]
    pub batch_memory_capacity: usize,
    /// Maximum number of parallel enrichment stages run concurrently.
    /// `None` means unbounded (the default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_stage_limit: Option<usize>,
    /// Default per-stage timeout in seconds, applied when a stage does not
    /// declare its own.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_default_secs: u64,
    /// Per-collaborator call timeouts.
    #[serde(default)]
    pub collaborator_timeouts: CollaboratorTimeouts,
}

fn default_max_regeneration_attempts() -> u32 {
    3
}
fn default_aeo_gate_threshold() -> f64 {
    80.0
}
fn default_batch_memory_capacity() -> usize {
    100
}
fn default_stage_timeout() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_regeneration_attempts: default_max_regeneration_attempts(),
            aeo_gate_threshold: default_aeo_gate_threshold(),
            batch_memory_capacity: default_batch_memory_capacity(),
            parallel_stage_limit: None,
            stage_timeout_default_secs: default_stage_timeout(),
            collaborator_timeouts: CollaboratorTimeouts::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Threshold above which a collaborator timeout generates a warning.
const LARGE_TIMEOUT_THRESHOLD_SECS: u64 = 600;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`PipelineConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`PipelineConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => PipelineConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`PipelineConfig`].
pub fn parse_toml(content: &str) -> Result<PipelineConfig, ConfigError> {
    toml::from_str::<PipelineConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (§6).
///
/// Recognised variables: `MAX_REGENERATION_ATTEMPTS`, `AEO_GATE_THRESHOLD`,
/// `BATCH_MEMORY_CAPACITY`, `PARALLEL_STAGE_LIMIT`, `STAGE_TIMEOUT_DEFAULT`.
/// Malformed values are ignored, leaving the prior setting in place.
pub fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Ok(val) = std::env::var("MAX_REGENERATION_ATTEMPTS")
        && let Ok(parsed) = val.parse()
    {
        config.max_regeneration_attempts = parsed;
    }
    if let Ok(val) = std::env::var("AEO_GATE_THRESHOLD")
        && let Ok(parsed) = val.parse()
    {
        config.aeo_gate_threshold = parsed;
    }
    if let Ok(val) = std::env::var("BATCH_MEMORY_CAPACITY")
        && let Ok(parsed) = val.parse()
    {
        config.batch_memory_capacity = parsed;
    }
    if let Ok(val) = std::env::var("PARALLEL_STAGE_LIMIT")
        && let Ok(parsed) = val.parse()
    {
        config.parallel_stage_limit = Some(parsed);
    }
    if let Ok(val) = std::env::var("STAGE_TIMEOUT_DEFAULT")
        && let Ok(parsed) = val.parse()
    {
        config.stage_timeout_default_secs = parsed;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (zero attempts, out-of-range thresholds) are returned as a
/// [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &PipelineConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if config.max_regeneration_attempts == 0 {
        errors.push("max_regeneration_attempts must be at least 1".into());
    }
    if !(0.0..=100.0).contains(&config.aeo_gate_threshold) {
        errors.push(format!(
            "aeo_gate_threshold {} out of range [0, 100]",
            config.aeo_gate_threshold
        ));
    }
    if config.batch_memory_capacity == 0 {
        errors.push("batch_memory_capacity must be at least 1".into());
    }
    if let Some(0) = config.parallel_stage_limit {
        errors.push("parallel_stage_limit must be at least 1 when set".into());
    }
    if config.stage_timeout_default_secs == 0 {
        errors.push("stage_timeout_default_secs must be at least 1".into());
    }

    if config.parallel_stage_limit.is_none() {
        warnings.push(ConfigWarning::UnboundedParallelism);
    }

    let t = &config.collaborator_timeouts;
    for (name, secs) in [
        ("llm", t.llm_secs),
        ("embedding", t.embedding_secs),
        ("url_validate", t.url_validate_secs),
        ("image", t.image_secs),
    ] {
        if secs > LARGE_TIMEOUT_THRESHOLD_SECS {
            warnings.push(ConfigWarning::LargeTimeout {
                collaborator: name.to_string(),
                secs,
            });
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. `overlay` always wins — this config has no
/// "unset means inherit" sentinel fields, so merging is simply a full
/// replacement of scalar fields by the overlay's values.
#[must_use]
pub fn merge_configs(_base: PipelineConfig, overlay: PipelineConfig) -> PipelineConfig {
    overlay
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
