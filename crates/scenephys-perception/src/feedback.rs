//! Data feedback forces: nudging a simulated body towards observed evidence.
//!
//! During settling, each candidate body is pulled towards the points the
//! sensor actually saw.  Every model point (transformed by the current pose)
//! is paired with its nearest observed point; pairs farther apart than
//! [`FeedbackForceConfig::max_point_distance`] are dropped, and each surviving
//! pair contributes a force of fixed magnitude pointing from the model point
//! to the observation.
//!
//! # Example
//!
//! ```rust
//! use scenephys_perception::feedback::{FeedbackForceConfig, FeedbackForceGenerator};
//! use scenephys_types::{PointCloud, Pose, Vec3};
//!
//! let config = FeedbackForceConfig::new(0.5, 0.1).unwrap();
//! let observed = PointCloud::new(vec![Vec3::new(0.05, 0.0, 0.0)]);
//! let generator = FeedbackForceGenerator::new(config, &observed);
//!
//! let model = PointCloud::new(vec![Vec3::zero()]);
//! let forces = generator.generate(&model, &Pose::identity());
//! assert_eq!(forces.len(), 1);
//! assert!((forces[0].force.x - 0.5).abs() < 1e-6);
//! ```

use scenephys_physics::AppliedForce;
use scenephys_types::{PointCloud, Pose, SceneError};
use serde::{Deserialize, Serialize};

use crate::octree::Octree;

/// Leaf capacity of the octree built over the observed segment.
const OCTREE_CAPACITY: usize = 16;

/// Named feedback-force parameters.
///
/// Construct through [`FeedbackForceConfig::new`] so that both values are
/// validated; deserialised values are checked by
/// [`FeedbackForceConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackForceConfig {
    /// Force (newtons) contributed by each surviving correspondence.
    pub force_magnitude_per_point: f32,
    /// Correspondences farther apart than this (metres) are ignored.
    pub max_point_distance: f32,
}

impl FeedbackForceConfig {
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidConfig`] unless the magnitude is finite
    /// and non-negative and the distance threshold is finite and positive.
    pub fn new(force_magnitude_per_point: f32, max_point_distance: f32) -> Result<Self, SceneError> {
        let config = Self {
            force_magnitude_per_point,
            max_point_distance,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        if !self.force_magnitude_per_point.is_finite() || self.force_magnitude_per_point < 0.0 {
            return Err(SceneError::InvalidConfig(format!(
                "feedback force magnitude must be finite and >= 0, got {}",
                self.force_magnitude_per_point
            )));
        }
        if !self.max_point_distance.is_finite() || self.max_point_distance <= 0.0 {
            return Err(SceneError::InvalidConfig(format!(
                "feedback max point distance must be finite and > 0, got {}",
                self.max_point_distance
            )));
        }
        Ok(())
    }
}

/// Turns point correspondences into [`AppliedForce`]s for one observed
/// segment.
///
/// The observed cloud is indexed once at construction; [`generate`] can then
/// be called for every settling chunk as the body moves.
///
/// [`generate`]: FeedbackForceGenerator::generate
#[derive(Debug)]
pub struct FeedbackForceGenerator {
    config: FeedbackForceConfig,
    observed: Octree,
}

impl FeedbackForceGenerator {
    pub fn new(config: FeedbackForceConfig, observed: &PointCloud) -> Self {
        Self {
            config,
            observed: Octree::from_cloud(observed, OCTREE_CAPACITY),
        }
    }

    pub fn config(&self) -> &FeedbackForceConfig {
        &self.config
    }

    /// Forces pulling `model_cloud` (body frame), placed at `pose`, towards
    /// the observed segment.
    ///
    /// Points that coincide exactly with their observation have no defined
    /// direction and contribute nothing.
    pub fn generate(&self, model_cloud: &PointCloud, pose: &Pose) -> Vec<AppliedForce> {
        if self.observed.is_empty() || self.config.force_magnitude_per_point == 0.0 {
            return Vec::new();
        }
        model_cloud
            .points
            .iter()
            .filter_map(|&local| {
                let point = pose.transform_point(local);
                let (target, _) = self
                    .observed
                    .nearest_within(point, self.config.max_point_distance)?;
                let direction = target.sub(point).normalized()?;
                Some(AppliedForce {
                    point,
                    force: direction.scale(self.config.force_magnitude_per_point),
                })
            })
            .collect()
    }
}
