//! Deep validation tests for `apo-config`.

use apo_config::{
    CollaboratorTimeouts, ConfigError, ConfigWarning, PipelineConfig, merge_configs, parse_toml,
    validate_config,
};

/// Fully-specified config with no validation warnings.
fn fully_valid_config() -> PipelineConfig {
    PipelineConfig {
        parallel_stage_limit: Some(4),
        ..Default::default()
    }
}

/// Extract error reasons from a `ConfigError::ValidationError`.
fn validation_reasons(err: ConfigError) -> Vec<String> {
    match err {
        ConfigError::ValidationError { reasons } => reasons,
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

// ===========================================================================
// 1. Valid configs pass validation with no warnings
// ===========================================================================

#[test]
fn fully_specified_config_has_no_warnings() {
    let warnings = validate_config(&fully_valid_config()).unwrap();
    assert!(warnings.is_empty(), "expected zero warnings: {warnings:?}");
}

#[test]
fn boundary_threshold_values_are_valid() {
    for threshold in [0.0, 50.0, 100.0] {
        let cfg = PipelineConfig {
            aeo_gate_threshold: threshold,
            ..fully_valid_config()
        };
        validate_config(&cfg)
            .unwrap_or_else(|e| panic!("threshold {threshold} should be valid: {e}"));
    }
}

#[test]
fn single_attempt_is_valid() {
    let cfg = PipelineConfig {
        max_regeneration_attempts: 1,
        ..fully_valid_config()
    };
    validate_config(&cfg).unwrap();
}

#[test]
fn single_capacity_entry_is_valid() {
    let cfg = PipelineConfig {
        batch_memory_capacity: 1,
        ..fully_valid_config()
    };
    validate_config(&cfg).unwrap();
}

#[test]
fn parallel_limit_of_one_is_valid() {
    let cfg = PipelineConfig {
        parallel_stage_limit: Some(1),
        ..fully_valid_config()
    };
    validate_config(&cfg).unwrap();
}

// ===========================================================================
// 2. Zero attempts is a hard error
// ===========================================================================

#[test]
fn zero_attempts_is_error() {
    let cfg = PipelineConfig {
        max_regeneration_attempts: 0,
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(
        reasons
            .iter()
            .any(|r| r.contains("max_regeneration_attempts"))
    );
}

// ===========================================================================
// 3. Out-of-range threshold is a hard error
// ===========================================================================

#[test]
fn negative_threshold_is_error() {
    let cfg = PipelineConfig {
        aeo_gate_threshold: -1.0,
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(reasons.iter().any(|r| r.contains("out of range")));
}

#[test]
fn threshold_over_100_is_error() {
    let cfg = PipelineConfig {
        aeo_gate_threshold: 100.1,
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(reasons.iter().any(|r| r.contains("out of range")));
}

// ===========================================================================
// 4. Zero capacity / zero timeout / zero parallel limit are hard errors
// ===========================================================================

#[test]
fn zero_batch_memory_capacity_is_error() {
    let cfg = PipelineConfig {
        batch_memory_capacity: 0,
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(reasons.iter().any(|r| r.contains("batch_memory_capacity")));
}

#[test]
fn zero_stage_timeout_is_error() {
    let cfg = PipelineConfig {
        stage_timeout_default_secs: 0,
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(
        reasons
            .iter()
            .any(|r| r.contains("stage_timeout_default_secs"))
    );
}

#[test]
fn zero_parallel_limit_is_error() {
    let cfg = PipelineConfig {
        parallel_stage_limit: Some(0),
        ..fully_valid_config()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(reasons.iter().any(|r| r.contains("parallel_stage_limit")));
}

// ===========================================================================
// 5. Multiple validation errors can be collected
// ===========================================================================

#[test]
fn multiple_errors_collected() {
    let cfg = PipelineConfig {
        max_regeneration_attempts: 0,
        aeo_gate_threshold: 200.0,
        batch_memory_capacity: 0,
        parallel_stage_limit: Some(0),
        stage_timeout_default_secs: 0,
        ..Default::default()
    };
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(
        reasons.len() >= 5,
        "expected >= 5 errors, got {}: {reasons:?}",
        reasons.len()
    );
}

// ===========================================================================
// 6. Unbounded-parallelism warning
// ===========================================================================

#[test]
fn unset_parallel_limit_warns() {
    let cfg = PipelineConfig {
        parallel_stage_limit: None,
        ..Default::default()
    };
    let warnings = validate_config(&cfg).unwrap();
    assert!(warnings.contains(&ConfigWarning::UnboundedParallelism));
}

#[test]
fn set_parallel_limit_removes_warning() {
    let cfg = fully_valid_config();
    let warnings = validate_config(&cfg).unwrap();
    assert!(!warnings.contains(&ConfigWarning::UnboundedParallelism));
}

// ===========================================================================
// 7. Large collaborator timeout warnings
// ===========================================================================

#[test]
fn large_timeout_warning_threshold() {
    let cfg = PipelineConfig {
        collaborator_timeouts: CollaboratorTimeouts {
            image_secs: 601,
            ..Default::default()
        },
        ..fully_valid_config()
    };
    let warnings = validate_config(&cfg).unwrap();
    assert!(warnings.iter().any(
        |w| matches!(w, ConfigWarning::LargeTimeout { collaborator, secs } if collaborator == "image" && *secs == 601)
    ));
}

#[test]
fn exactly_at_threshold_no_large_timeout_warning() {
    let cfg = PipelineConfig {
        collaborator_timeouts: CollaboratorTimeouts {
            image_secs: 600,
            ..Default::default()
        },
        ..fully_valid_config()
    };
    let warnings = validate_config(&cfg).unwrap();
    assert!(
        !warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::LargeTimeout { .. }))
    );
}

#[test]
fn all_four_collaborator_timeouts_can_warn_independently() {
    let cfg = PipelineConfig {
        collaborator_timeouts: CollaboratorTimeouts {
            llm_secs: 700,
            embedding_secs: 700,
            url_validate_secs: 700,
            image_secs: 700,
        },
        ..fully_valid_config()
    };
    let warnings = validate_config(&cfg).unwrap();
    let count = warnings
        .iter()
        .filter(|w| matches!(w, ConfigWarning::LargeTimeout { .. }))
        .count();
    assert_eq!(count, 4);
}

// ===========================================================================
// 8. Merged config validation (merge is full overlay replacement)
// ===========================================================================

#[test]
fn merged_valid_configs_still_valid() {
    let base = fully_valid_config();
    let overlay = PipelineConfig {
        max_regeneration_attempts: 5,
        ..fully_valid_config()
    };
    let merged = merge_configs(base, overlay);
    validate_config(&merged).unwrap();
    assert_eq!(merged.max_regeneration_attempts, 5);
}

#[test]
fn merge_introduces_invalid_config() {
    let base = fully_valid_config();
    let overlay = PipelineConfig {
        max_regeneration_attempts: 0,
        ..Default::default()
    };
    let merged = merge_configs(base, overlay);
    let reasons = validation_reasons(validate_config(&merged).unwrap_err());
    assert!(
        reasons
            .iter()
            .any(|r| r.contains("max_regeneration_attempts"))
    );
}

// ===========================================================================
// 9. Schema conformance and roundtrips
// ===========================================================================

#[test]
fn valid_config_serializes_to_json() {
    let cfg = fully_valid_config();
    validate_config(&cfg).unwrap();
    let json = serde_json::to_string_pretty(&cfg).unwrap();
    assert!(json.contains("\"max_regeneration_attempts\""));
    assert!(json.contains("\"parallel_stage_limit\""));
}

#[test]
fn valid_config_roundtrips_via_json() {
    let cfg = fully_valid_config();
    let json = serde_json::to_string(&cfg).unwrap();
    let back: PipelineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(cfg, back);
}

#[test]
fn default_config_roundtrips_via_json() {
    let cfg = PipelineConfig::default();
    let json = serde_json::to_string(&cfg).unwrap();
    let back: PipelineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(cfg, back);
}

#[test]
fn toml_roundtrip_preserves_validity() {
    let cfg = fully_valid_config();
    validate_config(&cfg).unwrap();
    let toml_str = toml::to_string(&cfg).unwrap();
    let back = parse_toml(&toml_str).unwrap();
    let warnings = validate_config(&back).unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn json_schema_can_be_generated() {
    let schema = schemars::schema_for!(PipelineConfig);
    let json = serde_json::to_string_pretty(&schema).unwrap();
    assert!(json.contains("PipelineConfig"));
}

// ===========================================================================
// 10. Validation idempotency (validate twice = same result)
// ===========================================================================

#[test]
fn idempotent_valid_config() {
    let cfg = fully_valid_config();
    let w1 = validate_config(&cfg).unwrap();
    let w2 = validate_config(&cfg).unwrap();
    assert_eq!(w1, w2);
}

#[test]
fn idempotent_default_config() {
    let cfg = PipelineConfig::default();
    let w1 = validate_config(&cfg).unwrap();
    let w2 = validate_config(&cfg).unwrap();
    assert_eq!(w1, w2);
}

#[test]
fn idempotent_invalid_config() {
    let cfg = PipelineConfig {
        max_regeneration_attempts: 0,
        ..fully_valid_config()
    };
    let r1 = validation_reasons(validate_config(&cfg).unwrap_err());
    let r2 = validation_reasons(validate_config(&cfg).unwrap_err());
    assert_eq!(r1, r2);
}

// ===========================================================================
// 11. Parse failures
// ===========================================================================

#[test]
fn parse_toml_with_wrong_type_fails() {
    let toml = r#"max_regeneration_attempts = "three""#;
    assert!(parse_toml(toml).is_err());
}

#[test]
fn config_warning_display_for_large_timeout() {
    let w = ConfigWarning::LargeTimeout {
        collaborator: "llm".into(),
        secs: 900,
    };
    let s = w.to_string();
    assert!(s.contains("llm"));
    assert!(s.contains("900"));
}

#[test]
fn validation_error_display_contains_all_reasons() {
    let err = ConfigError::ValidationError {
        reasons: vec!["reason one".into(), "reason two".into()],
    };
    let s = err.to_string();
    assert!(s.contains("reason one"));
    assert!(s.contains("reason two"));
}
