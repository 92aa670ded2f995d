//! Generic `PhysicsEngine` trait: the boundary to the rigid-body simulator.
//!
//! The scene hypothesis engine only ever talks to this trait, so a Bullet,
//! Rapier or in-process engine can be swapped in without touching the
//! evaluation logic.  The core never constructs collision shapes itself;
//! shapes are handed over through [`PhysicsEngine::register_model`] when
//! models are loaded.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use scenephys_types::{PointCloud, Pose, SceneError, Vec3};

use crate::model::ObjectModel;

/// How a body participates in the next [`PhysicsEngine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Immovable; acts only as a support for other bodies.
    Fixed,
    /// Simulated under gravity, contact and applied forces.
    Dynamic {
        /// Zero the body's velocity and drop cached contacts on placement.
        reset_velocity: bool,
    },
}

/// A force (newtons) applied at a world-frame point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedForce {
    pub point: Vec3,
    pub force: Vec3,
}

/// A rigid-body simulator used as a physical-consistency oracle.
///
/// Implementations are single-threaded and non-reentrant; share one across
/// threads through [`SharedEngine`].
pub trait PhysicsEngine: Send {
    /// Register the collision shape of a reference model.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ModelLoad`] if the engine cannot build a shape
    /// for the model.
    fn register_model(&mut self, model: &ObjectModel) -> Result<(), SceneError>;

    /// Forget the shape registered under `name`; unknown names are ignored.
    fn unregister_model(&mut self, name: &str);

    /// Replace the static background with one fitted to `cloud`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Physics`] if no background can be fitted (e.g.
    /// the cloud is empty).
    fn set_background(&mut self, label: &str, cloud: &PointCloud) -> Result<(), SceneError>;

    /// Remove the static background; bodies then have nothing to rest on.
    fn clear_background(&mut self);

    /// Remove every non-background body.
    fn clear_bodies(&mut self);

    /// Place a new body or move an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Physics`] if `model_name` was never registered.
    fn place_body(
        &mut self,
        label: &str,
        model_name: &str,
        pose: Pose,
        motion: Motion,
    ) -> Result<(), SceneError>;

    /// Queue forces on `label` for the duration of the next `step` call.
    fn apply_forces(&mut self, label: &str, forces: &[AppliedForce]);

    /// Advance the simulation by `ticks` fixed time steps.
    fn step(&mut self, ticks: u32);

    /// Labels currently in contact with `label` (background included).
    fn contacts(&self, label: &str) -> BTreeSet<String>;

    /// Current pose of `label`, or `None` if no such body exists.
    fn settled_pose(&self, label: &str) -> Option<Pose>;
}

/// A physics engine shared between the caller and the scene orchestrator.
///
/// The caller creates and owns the engine; the orchestrator only borrows the
/// handle and locks it for the duration of an evaluation.
pub type SharedEngine = Arc<Mutex<dyn PhysicsEngine>>;

/// Wrap a concrete engine into a [`SharedEngine`] handle.
pub fn shared<E: PhysicsEngine + 'static>(engine: E) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal engine that only records placements.
    #[derive(Default)]
    struct RecordingEngine {
        placed: Vec<(String, Pose)>,
        ticks: u32,
    }

    impl PhysicsEngine for RecordingEngine {
        fn register_model(&mut self, _model: &ObjectModel) -> Result<(), SceneError> {
            Ok(())
        }

        fn unregister_model(&mut self, _name: &str) {}

        fn set_background(&mut self, _label: &str, _cloud: &PointCloud) -> Result<(), SceneError> {
            Ok(())
        }

        fn clear_background(&mut self) {}

        fn clear_bodies(&mut self) {
            self.placed.clear();
        }

        fn place_body(
            &mut self,
            label: &str,
            _model_name: &str,
            pose: Pose,
            _motion: Motion,
        ) -> Result<(), SceneError> {
            self.placed.push((label.to_string(), pose));
            Ok(())
        }

        fn apply_forces(&mut self, _label: &str, _forces: &[AppliedForce]) {}

        fn step(&mut self, ticks: u32) {
            self.ticks += ticks;
        }

        fn contacts(&self, _label: &str) -> BTreeSet<String> {
            BTreeSet::new()
        }

        fn settled_pose(&self, label: &str) -> Option<Pose> {
            self.placed.iter().find(|(l, _)| l == label).map(|(_, p)| *p)
        }
    }

    #[test]
    fn shared_handle_coerces_to_trait_object() {
        let engine: SharedEngine = shared(RecordingEngine::default());
        {
            let mut guard = engine.lock();
            guard
                .place_body("a", "box", Pose::identity(), Motion::Fixed)
                .unwrap();
            guard.step(5);
        }
        assert_eq!(engine.lock().settled_pose("a"), Some(Pose::identity()));
        engine.lock().clear_bodies();
        assert!(engine.lock().settled_pose("a").is_none());
    }
}
