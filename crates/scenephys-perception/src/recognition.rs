//! Recognition-fit scoring of a model placed at a candidate pose.
//!
//! The recognition matcher that proposes poses lives outside this workspace;
//! the evaluator only needs a number in `[0, 1]` saying how well the model
//! explains the observed points.  [`RecognitionScorer`] is that seam.
//! [`PointFitScorer`] is the built-in implementation.

use scenephys_physics::ObjectModel;
use scenephys_types::{PointCloud, Pose};

use crate::octree::Octree;

/// Scores how well `model` at `pose` explains `cloud`.
pub trait RecognitionScorer: Send + Sync {
    /// Returns a value in `[0, 1]`; higher is a better fit.
    fn score(&self, model: &ObjectModel, pose: &Pose, cloud: &PointCloud) -> f64;
}

/// Inlier ratio: the fraction of transformed model points that have a scene
/// point within `inlier_distance`.
#[derive(Debug, Clone, Copy)]
pub struct PointFitScorer {
    pub inlier_distance: f32,
}

impl Default for PointFitScorer {
    fn default() -> Self {
        Self {
            inlier_distance: 0.01,
        }
    }
}

impl RecognitionScorer for PointFitScorer {
    fn score(&self, model: &ObjectModel, pose: &Pose, cloud: &PointCloud) -> f64 {
        if model.cloud.is_empty() || cloud.is_empty() {
            return 0.0;
        }
        let index = Octree::from_cloud(cloud, 16);
        let inliers = model
            .cloud
            .points
            .iter()
            .filter(|&&p| {
                index
                    .nearest_within(pose.transform_point(p), self.inlier_distance)
                    .is_some()
            })
            .count();
        inliers as f64 / model.cloud.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenephys_types::Vec3;

    fn cube() -> ObjectModel {
        ObjectModel::box_model("cube", Vec3::new(0.05, 0.05, 0.05), 0.02)
    }

    #[test]
    fn perfect_fit_scores_one() {
        let model = cube();
        let pose = Pose::from_translation(0.2, 0.0, 0.05);
        let scene = model.cloud.transformed(&pose);
        let score = PointFitScorer::default().score(&model, &pose, &scene);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn displaced_pose_scores_lower() {
        let model = cube();
        let truth = Pose::from_translation(0.0, 0.0, 0.05);
        let scene = model.cloud.transformed(&truth);
        let scorer = PointFitScorer::default();
        let good = scorer.score(&model, &truth, &scene);
        let bad = scorer.score(&model, &Pose::from_translation(0.0, 0.0, 1.0), &scene);
        assert!(bad < good);
        assert!(bad.abs() < 1e-9);
    }

    #[test]
    fn empty_scene_scores_zero() {
        let score = PointFitScorer::default().score(&cube(), &Pose::identity(), &PointCloud::default());
        assert_eq!(score, 0.0);
    }
}
