//! `scenephys-types` – shared data model for the scene hypothesis engine.
//!
//! Every other crate in the workspace speaks in these types: poses and point
//! clouds, per-label object hypotheses, symmetry descriptors, and the single
//! [`SceneError`] taxonomy.

pub mod geometry;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use geometry::{Pose, Quaternion, Vec3};

/// Label reserved for the static background (table plane, bin floor).
pub const DEFAULT_BACKGROUND_LABEL: &str = "background";

/// An unordered set of 3-D points in the scene frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Vec3>,
}

impl PointCloud {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append every point of `other`.
    pub fn extend(&mut self, other: &PointCloud) {
        self.points.extend_from_slice(&other.points);
    }

    /// Mean point, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Vec3> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self.points.iter().fold(Vec3::zero(), |acc, p| acc.add(*p));
        Some(sum.scale(1.0 / self.points.len() as f32))
    }

    /// Points lying within `radius` of `centre`.
    pub fn within_radius(&self, centre: Vec3, radius: f32) -> PointCloud {
        PointCloud::new(
            self.points
                .iter()
                .copied()
                .filter(|p| p.distance(centre) <= radius)
                .collect(),
        )
    }

    /// Apply `pose` to every point.
    pub fn transformed(&self, pose: &Pose) -> PointCloud {
        PointCloud::new(self.points.iter().map(|p| pose.transform_point(*p)).collect())
    }
}

/// A newly detected object instance reported by the recognition front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectWithId {
    /// Unique scene label, e.g. `"crayola_0"`.
    pub label: String,
    /// Name of the reference model the detection was matched against.
    pub model_name: String,
    pub pose: Pose,
}

/// Candidate poses for one label, in recognition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectHypotheses {
    pub model_name: String,
    pub poses: Vec<Pose>,
}

impl ObjectHypotheses {
    pub fn new(model_name: impl Into<String>, poses: Vec<Pose>) -> Self {
        Self {
            model_name: model_name.into(),
            poses,
        }
    }
}

/// Declared symmetry of a reference model, expressed in its body frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectSymmetry {
    /// No symmetry: every distinct pose is distinguishable.
    #[default]
    None,
    /// Invariant under rotations of `360° / order` about `axis`.
    Rotational { axis: Vec3, order: u32 },
    /// Invariant under any rotation about `axis` (cylinders, bowls).
    Continuous { axis: Vec3 },
}

/// A 3-D point with a persistent identity across perception cycles, as
/// reported by a multi-frame tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub id: u64,
    pub position: Vec3,
}

/// How an accepted object is held up in the current interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupportStatus {
    /// Supported by the background, directly or through other objects.
    Supported,
    /// The simulation never found a support path to the background.
    Unsupported,
    /// Every candidate conflicted with the existing support graph.
    Uncertain,
}

/// Summary of one `evaluate_all_object_hypothesis_probability` cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Labels whose pose was (re)committed this cycle, in evaluation order.
    pub evaluated: Vec<String>,
    /// Labels that were pending but had no usable hypothesis entry.
    pub skipped: BTreeSet<String>,
    /// Labels where at least one candidate was rejected by the cycle guard.
    pub conflicts: BTreeSet<String>,
    /// Labels committed without a support edge because every candidate
    /// conflicted.
    pub uncertain: BTreeSet<String>,
    /// True when the support graph was rebuilt from scratch.
    pub full_rebuild: bool,
}

impl EvaluationReport {
    pub fn new(full_rebuild: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            evaluated: Vec::new(),
            skipped: BTreeSet::new(),
            conflicts: BTreeSet::new(),
            uncertain: BTreeSet::new(),
            full_rebuild,
        }
    }
}

/// Error taxonomy for every scenephys operation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneError {
    #[error("Not Ready: no physics engine attached")]
    NotReady,

    #[error("Model Load Failure for {model}: {details}")]
    ModelLoad { model: String, details: String },

    #[error("Unknown Hypothesis Label: {0}")]
    UnknownHypothesisLabel(String),

    #[error("Support Cycle: {supporter} -> {supported} would close a cycle")]
    SupportCycle { supporter: String, supported: String },

    #[error("Invalid Configuration: {0}")]
    InvalidConfig(String),

    #[error("Physics Engine Fault: {details}")]
    Physics { details: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry_serialization_roundtrip() {
        let sym = ObjectSymmetry::Rotational {
            axis: Vec3::unit_z(),
            order: 4,
        };
        let json = serde_json::to_string(&sym).unwrap();
        assert!(json.contains("\"kind\":\"rotational\""));
        let back: ObjectSymmetry = serde_json::from_str(&json).unwrap();
        assert_eq!(sym, back);
    }

    #[test]
    fn hypotheses_roundtrip() {
        let hyp = ObjectHypotheses::new("box", vec![Pose::from_translation(0.0, 0.0, 0.05)]);
        let json = serde_json::to_string(&hyp).unwrap();
        let back: ObjectHypotheses = serde_json::from_str(&json).unwrap();
        assert_eq!(hyp, back);
    }

    #[test]
    fn point_cloud_helpers() {
        let cloud = PointCloud::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        ]);
        let c = cloud.centroid().unwrap();
        assert!((c.x - 4.0).abs() < 1e-6);
        assert_eq!(cloud.within_radius(Vec3::zero(), 2.5).len(), 2);
        assert!(PointCloud::default().centroid().is_none());

        let moved = cloud.transformed(&Pose::from_translation(0.0, 1.0, 0.0));
        assert!((moved.points[0].y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn evaluation_report_starts_empty() {
        let report = EvaluationReport::new(true);
        assert!(report.full_rebuild);
        assert!(report.evaluated.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn scene_error_display() {
        assert!(SceneError::NotReady.to_string().contains("Not Ready"));
        let err = SceneError::SupportCycle {
            supporter: "a".into(),
            supported: "b".into(),
        };
        assert!(err.to_string().contains("a -> b"));
        let err = SceneError::ModelLoad {
            model: "mug".into(),
            details: "missing".into(),
        };
        assert!(err.to_string().contains("mug"));
    }
}
