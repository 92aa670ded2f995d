//! Scene configuration – reads `scenephys.toml`.
//!
//! ```toml
//! background_label = "table"
//! debug = false
//!
//! [evaluation]
//! settle_ticks = 30
//! tick_chunk = 10
//!
//! [support]
//! incremental = true
//! edge_weight = { policy = "decay", factor = 0.5 }
//!
//! [feedback]
//! force_magnitude_per_point = 0.05
//! max_point_distance = 0.02
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::fs;
use std::path::Path;

use scenephys_perception::FeedbackForceConfig;
use scenephys_types::{DEFAULT_BACKGROUND_LABEL, SceneError};
use serde::{Deserialize, Serialize};

use crate::support_graph::EdgeWeightPolicy;

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Simulation budget and plausibility thresholds used to score hypotheses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Total ticks each candidate is simulated for.
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u32,
    /// Ticks per chunk; feedback forces are recomputed between chunks.
    #[serde(default = "default_tick_chunk")]
    pub tick_chunk: u32,
    /// Largest positional drift (metres) of a plausible hypothesis.
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f32,
    /// Largest angular drift (radians) of a plausible hypothesis.
    #[serde(default = "default_angle_tolerance")]
    pub angle_tolerance: f32,
    /// Positional drift at which the stability factor falls to `1/e`.
    #[serde(default = "default_drift_scale")]
    pub drift_scale: f32,
    /// Angular drift at which the stability factor falls to `1/e`.
    #[serde(default = "default_angle_scale")]
    pub angle_scale: f32,
    /// Inlier distance (metres) of the built-in recognition scorer.
    #[serde(default = "default_inlier_distance")]
    pub inlier_distance: f32,
}

/// How the support graph is maintained between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Update only dirty labels and their descendants instead of rebuilding.
    #[serde(default = "default_true")]
    pub incremental: bool,
    #[serde(default)]
    pub edge_weight: EdgeWeightPolicy,
}

/// Tolerances under which two canonicalised poses count as one symmetry class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryToleranceConfig {
    #[serde(default = "default_symmetry_position")]
    pub position: f32,
    #[serde(default = "default_symmetry_angle")]
    pub angle: f32,
}

fn default_settle_ticks() -> u32 {
    30
}
fn default_tick_chunk() -> u32 {
    10
}
fn default_position_tolerance() -> f32 {
    0.02
}
fn default_angle_tolerance() -> f32 {
    0.1
}
fn default_drift_scale() -> f32 {
    0.05
}
fn default_angle_scale() -> f32 {
    0.5
}
fn default_inlier_distance() -> f32 {
    0.01
}
fn default_symmetry_position() -> f32 {
    1e-3
}
fn default_symmetry_angle() -> f32 {
    1e-3
}
fn default_true() -> bool {
    true
}
fn default_background_label() -> String {
    DEFAULT_BACKGROUND_LABEL.to_string()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            settle_ticks: default_settle_ticks(),
            tick_chunk: default_tick_chunk(),
            position_tolerance: default_position_tolerance(),
            angle_tolerance: default_angle_tolerance(),
            drift_scale: default_drift_scale(),
            angle_scale: default_angle_scale(),
            inlier_distance: default_inlier_distance(),
        }
    }
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            incremental: true,
            edge_weight: EdgeWeightPolicy::default(),
        }
    }
}

impl Default for SymmetryToleranceConfig {
    fn default() -> Self {
        Self {
            position: default_symmetry_position(),
            angle: default_symmetry_angle(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SceneConfig
// ────────────────────────────────────────────────────────────────────────────

/// Complete configuration of a [`SceneOrchestrator`][crate::scene::SceneOrchestrator].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_background_label")]
    pub background_label: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub support: SupportConfig,
    #[serde(default)]
    pub symmetry_tolerance: SymmetryToleranceConfig,
    /// Feedback forces are disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackForceConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background_label: default_background_label(),
            debug: false,
            evaluation: EvaluationConfig::default(),
            support: SupportConfig::default(),
            symmetry_tolerance: SymmetryToleranceConfig::default(),
            feedback: None,
        }
    }
}

impl SceneConfig {
    /// Parse, apply environment overrides and validate.
    pub fn from_toml_str(raw: &str) -> Result<Self, SceneError> {
        let mut cfg: SceneConfig = toml::from_str(raw)
            .map_err(|e| SceneError::InvalidConfig(format!("failed to parse config: {e}")))?;
        apply_env_overrides(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] when the file cannot be read or parsed,
    /// or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SceneError::InvalidConfig(format!("failed to read config at {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, SceneError> {
        toml::to_string_pretty(self)
            .map_err(|e| SceneError::InvalidConfig(format!("failed to serialize config: {e}")))
    }

    /// Reject non-positive tolerances, scales and tick counts.
    pub fn validate(&self) -> Result<(), SceneError> {
        let e = &self.evaluation;
        if e.settle_ticks == 0 || e.tick_chunk == 0 {
            return Err(SceneError::InvalidConfig(
                "settle_ticks and tick_chunk must be > 0".to_string(),
            ));
        }
        let positive = [
            ("position_tolerance", e.position_tolerance),
            ("angle_tolerance", e.angle_tolerance),
            ("drift_scale", e.drift_scale),
            ("angle_scale", e.angle_scale),
            ("inlier_distance", e.inlier_distance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SceneError::InvalidConfig(format!(
                    "evaluation.{name} must be finite and > 0, got {value}"
                )));
            }
        }
        let s = &self.symmetry_tolerance;
        if !(s.position >= 0.0 && s.angle >= 0.0) {
            return Err(SceneError::InvalidConfig(
                "symmetry tolerances must be >= 0".to_string(),
            ));
        }
        if self.background_label.is_empty() {
            return Err(SceneError::InvalidConfig(
                "background_label must not be empty".to_string(),
            ));
        }
        self.support.edge_weight.validate()?;
        if let Some(feedback) = &self.feedback {
            feedback.validate()?;
        }
        Ok(())
    }
}

/// Apply `SCENEPHYS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SCENEPHYS_SETTLE_TICKS` | `evaluation.settle_ticks` |
/// | `SCENEPHYS_DEBUG` | `debug` (`1`/`true` enable) |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut SceneConfig) {
    if let Ok(v) = std::env::var("SCENEPHYS_SETTLE_TICKS")
        && let Ok(ticks) = v.parse::<u32>()
    {
        cfg.evaluation.settle_ticks = ticks;
    }
    if let Ok(v) = std::env::var("SCENEPHYS_DEBUG") {
        match v.as_str() {
            "1" | "true" => cfg.debug = true,
            "0" | "false" => cfg.debug = false,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = SceneConfig::from_toml_str("").expect("parse");
        assert_eq!(cfg.background_label, "background");
        assert!(cfg.support.incremental);
        assert_eq!(cfg.support.edge_weight, EdgeWeightPolicy::Replace);
        assert!(cfg.feedback.is_none());
    }

    #[test]
    fn sections_and_policy_parse() {
        let raw = r#"
            background_label = "table"

            [evaluation]
            position_tolerance = 0.05

            [support]
            incremental = false
            edge_weight = { policy = "decay", factor = 0.25 }

            [feedback]
            force_magnitude_per_point = 0.1
            max_point_distance = 0.02
        "#;
        let cfg = SceneConfig::from_toml_str(raw).expect("parse");
        assert_eq!(cfg.background_label, "table");
        assert!((cfg.evaluation.position_tolerance - 0.05).abs() < 1e-6);
        assert_eq!(cfg.evaluation.tick_chunk, 10);
        assert!(!cfg.support.incremental);
        assert_eq!(cfg.support.edge_weight, EdgeWeightPolicy::Decay { factor: 0.25 });
        let feedback = cfg.feedback.expect("feedback section");
        assert!((feedback.max_point_distance - 0.02).abs() < 1e-6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SceneConfig::from_toml_str("[evaluation]\ntick_chunk = 0").is_err());
        assert!(SceneConfig::from_toml_str("[evaluation]\ndrift_scale = -1.0").is_err());
        assert!(SceneConfig::from_toml_str("background_label = \"\"").is_err());
        assert!(
            SceneConfig::from_toml_str(
                "[support]\nedge_weight = { policy = \"decay\", factor = 2.0 }"
            )
            .is_err()
        );
        assert!(
            SceneConfig::from_toml_str(
                "[feedback]\nforce_magnitude_per_point = 1.0\nmax_point_distance = 0.0"
            )
            .is_err()
        );
        assert!(SceneConfig::from_toml_str("not = [valid").is_err());
    }

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scenephys.toml");
        let mut cfg = SceneConfig::default();
        cfg.background_label = "bin".to_string();
        cfg.feedback = Some(FeedbackForceConfig::new(0.2, 0.03).unwrap());
        std::fs::write(&path, cfg.to_toml_string().unwrap()).unwrap();

        let loaded = SceneConfig::load(&path).expect("load");
        assert_eq!(loaded.background_label, "bin");
        assert_eq!(loaded.feedback, cfg.feedback);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = SceneConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SceneError::InvalidConfig(_)));
    }

    #[test]
    fn env_override_settle_ticks() {
        let mut cfg = SceneConfig::default();
        // SAFETY: test-only; no other test asserts on the overridden fields.
        unsafe { std::env::set_var("SCENEPHYS_SETTLE_TICKS", "90") };
        apply_env_overrides(&mut cfg);
        unsafe { std::env::set_var("SCENEPHYS_SETTLE_TICKS", "lots") };
        apply_env_overrides(&mut cfg);
        unsafe { std::env::remove_var("SCENEPHYS_SETTLE_TICKS") };
        assert_eq!(cfg.evaluation.settle_ticks, 90);
    }

    #[test]
    fn env_override_debug() {
        let mut cfg = SceneConfig::default();
        unsafe { std::env::set_var("SCENEPHYS_DEBUG", "1") };
        apply_env_overrides(&mut cfg);
        unsafe { std::env::remove_var("SCENEPHYS_DEBUG") };
        assert!(cfg.debug);
    }
}
