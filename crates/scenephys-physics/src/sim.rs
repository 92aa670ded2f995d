//! In-process box-stacking engine for headless tests and CI.
//!
//! [`SimPhysicsEngine`] implements [`PhysicsEngine`] without any external
//! simulator so the whole hypothesis pipeline can run in unit tests.  It is a
//! small model of the world:
//!
//! | Aspect | Behaviour |
//! |---|---|
//! | Shapes | Every body is the world-aligned bounding box of its rotated model box. |
//! | Background | A horizontal plane at the mean height of the background cloud. |
//! | Dynamics | Semi-implicit Euler under gravity plus queued forces. |
//! | Contact | A body rests on the highest plane or lower body under its footprint; penetrating bodies are pushed up. |
//! | Orientation | Never changes; there is no tipping. |
//!
//! # Example
//!
//! ```rust
//! use scenephys_physics::model::ObjectModel;
//! use scenephys_physics::sim::SimPhysicsEngine;
//! use scenephys_physics::{Motion, PhysicsEngine};
//! use scenephys_types::{PointCloud, Pose, Vec3};
//!
//! let mut engine = SimPhysicsEngine::new();
//! engine.register_model(&ObjectModel::box_model("cube", Vec3::new(0.05, 0.05, 0.05), 0.02)).unwrap();
//! engine.set_background("background", &PointCloud::new(vec![Vec3::zero()])).unwrap();
//! engine
//!     .place_body("a", "cube", Pose::from_translation(0.0, 0.0, 1.0), Motion::Dynamic { reset_velocity: true })
//!     .unwrap();
//! engine.step(240);
//!
//! let settled = engine.settled_pose("a").unwrap();
//! assert!((settled.translation.z - 0.05).abs() < 1e-3);
//! assert!(engine.contacts("a").contains("background"));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use scenephys_types::{PointCloud, Pose, SceneError, Vec3};

use crate::engine::{AppliedForce, Motion, PhysicsEngine};
use crate::model::ObjectModel;

/// Default simulation step (seconds).
const DEFAULT_DT: f32 = 1.0 / 120.0;
/// Default gravitational acceleration (m/s²), acting along −Z.
const DEFAULT_GRAVITY: f32 = 9.81;
/// Default gap (metres) under which two faces count as touching.
const DEFAULT_CONTACT_TOLERANCE: f32 = 2e-3;
/// Fraction of horizontal velocity kept per tick while resting on a support.
const RESTING_FRICTION: f32 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimBody {
    pose: Pose,
    /// Half extents of the world-aligned bounding box.
    half: Vec3,
    velocity: Vec3,
    fixed: bool,
    pending_force: Vec3,
}

impl SimBody {
    fn bottom(&self) -> f32 {
        self.pose.translation.z - self.half.z
    }

    fn top(&self) -> f32 {
        self.pose.translation.z + self.half.z
    }

    fn footprint_overlaps(&self, centre: Vec3, other: &SimBody) -> bool {
        (centre.x - other.pose.translation.x).abs() < self.half.x + other.half.x
            && (centre.y - other.pose.translation.y).abs() < self.half.y + other.half.y
    }
}

/// Half extents of the world-aligned box enclosing a rotated body box.
fn world_half_extents(pose: &Pose, h: Vec3) -> Vec3 {
    let ex = pose.rotation.rotate(Vec3::new(1.0, 0.0, 0.0));
    let ey = pose.rotation.rotate(Vec3::new(0.0, 1.0, 0.0));
    let ez = pose.rotation.rotate(Vec3::new(0.0, 0.0, 1.0));
    Vec3::new(
        ex.x.abs() * h.x + ey.x.abs() * h.y + ez.x.abs() * h.z,
        ex.y.abs() * h.x + ey.y.abs() * h.y + ez.y.abs() * h.z,
        ex.z.abs() * h.x + ey.z.abs() * h.y + ez.z.abs() * h.z,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// SimPhysicsEngine
// ────────────────────────────────────────────────────────────────────────────

/// A deterministic in-process [`PhysicsEngine`].
#[derive(Debug)]
pub struct SimPhysicsEngine {
    dt: f32,
    gravity: f32,
    contact_tolerance: f32,
    mass: f32,
    models: HashMap<String, Vec3>,
    background: Option<(String, f32)>,
    bodies: BTreeMap<String, SimBody>,
}

impl Default for SimPhysicsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPhysicsEngine {
    /// Create an engine with default step, gravity and unit body mass.
    pub fn new() -> Self {
        Self {
            dt: DEFAULT_DT,
            gravity: DEFAULT_GRAVITY,
            contact_tolerance: DEFAULT_CONTACT_TOLERANCE,
            mass: 1.0,
            models: HashMap::new(),
            background: None,
            bodies: BTreeMap::new(),
        }
    }

    /// Override the fixed time step.
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt.max(1e-5);
        self
    }

    /// Height of the background plane, if one has been set.
    pub fn background_height(&self) -> Option<f32> {
        self.background.as_ref().map(|(_, h)| *h)
    }

    /// Highest support surface under `label` if it were centred at `centre`.
    fn support_height(&self, label: &str, body: &SimBody, centre: Vec3) -> f32 {
        let mut height = self.background_height().unwrap_or(f32::NEG_INFINITY);
        for (other_label, other) in &self.bodies {
            if other_label == label || other.pose.translation.z >= body.pose.translation.z {
                continue;
            }
            if body.footprint_overlaps(centre, other) {
                height = height.max(other.top());
            }
        }
        height
    }

    fn tick(&mut self) {
        // Settle lower bodies first so stacks resolve bottom-up within a tick.
        let mut order: Vec<(String, f32)> = self
            .bodies
            .iter()
            .filter(|(_, b)| !b.fixed)
            .map(|(l, b)| (l.clone(), b.bottom()))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (label, _) in order {
            let Some(mut body) = self.bodies.get(&label).cloned() else {
                continue;
            };
            let accel = body
                .pending_force
                .scale(1.0 / self.mass)
                .sub(Vec3::new(0.0, 0.0, self.gravity));
            body.velocity = body.velocity.add(accel.scale(self.dt));
            let mut next = body.pose.translation.add(body.velocity.scale(self.dt));

            let support = self.support_height(&label, &body, next);
            if next.z - body.half.z <= support {
                next.z = support + body.half.z;
                body.velocity = Vec3::new(
                    body.velocity.x * RESTING_FRICTION,
                    body.velocity.y * RESTING_FRICTION,
                    0.0,
                );
            }
            body.pose.translation = next;
            self.bodies.insert(label, body);
        }
    }
}

impl PhysicsEngine for SimPhysicsEngine {
    fn register_model(&mut self, model: &ObjectModel) -> Result<(), SceneError> {
        let h = model.half_extents;
        if !(h.x > 0.0 && h.y > 0.0 && h.z > 0.0) {
            return Err(SceneError::ModelLoad {
                model: model.name.clone(),
                details: "box half extents must be positive".to_string(),
            });
        }
        self.models.insert(model.name.clone(), h);
        Ok(())
    }

    fn unregister_model(&mut self, name: &str) {
        self.models.remove(name);
    }

    fn set_background(&mut self, label: &str, cloud: &PointCloud) -> Result<(), SceneError> {
        let centroid = cloud.centroid().ok_or_else(|| SceneError::Physics {
            details: "cannot fit a background plane to an empty cloud".to_string(),
        })?;
        self.background = Some((label.to_string(), centroid.z));
        Ok(())
    }

    fn clear_background(&mut self) {
        self.background = None;
    }

    fn clear_bodies(&mut self) {
        self.bodies.clear();
    }

    fn place_body(
        &mut self,
        label: &str,
        model_name: &str,
        pose: Pose,
        motion: Motion,
    ) -> Result<(), SceneError> {
        let h = *self.models.get(model_name).ok_or_else(|| SceneError::Physics {
            details: format!("model '{model_name}' is not registered"),
        })?;
        let velocity = match (motion, self.bodies.get(label)) {
            (Motion::Dynamic { reset_velocity: false }, Some(existing)) => existing.velocity,
            _ => Vec3::zero(),
        };
        self.bodies.insert(
            label.to_string(),
            SimBody {
                pose,
                half: world_half_extents(&pose, h),
                velocity,
                fixed: motion == Motion::Fixed,
                pending_force: Vec3::zero(),
            },
        );
        Ok(())
    }

    fn apply_forces(&mut self, label: &str, forces: &[AppliedForce]) {
        if let Some(body) = self.bodies.get_mut(label) {
            body.pending_force = forces
                .iter()
                .fold(body.pending_force, |acc, f| acc.add(f.force));
        }
    }

    fn step(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
        for body in self.bodies.values_mut() {
            body.pending_force = Vec3::zero();
        }
    }

    fn contacts(&self, label: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Some(body) = self.bodies.get(label) else {
            return out;
        };
        let tol = self.contact_tolerance;
        if let Some((bg_label, height)) = &self.background
            && (body.bottom() - height).abs() <= tol
        {
            out.insert(bg_label.clone());
        }
        for (other_label, other) in &self.bodies {
            if other_label == label || !body.footprint_overlaps(body.pose.translation, other) {
                continue;
            }
            if (body.bottom() - other.top()).abs() <= tol
                || (body.top() - other.bottom()).abs() <= tol
            {
                out.insert(other_label.clone());
            }
        }
        out
    }

    fn settled_pose(&self, label: &str) -> Option<Pose> {
        self.bodies.get(label).map(|b| b.pose)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scenephys_types::Quaternion;

    const H: f32 = 0.05;

    fn table_engine() -> SimPhysicsEngine {
        let mut engine = SimPhysicsEngine::new();
        engine
            .register_model(&ObjectModel::box_model("cube", Vec3::new(H, H, H), 0.02))
            .unwrap();
        engine
            .set_background(
                "background",
                &PointCloud::new(vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]),
            )
            .unwrap();
        engine
    }

    fn dynamic() -> Motion {
        Motion::Dynamic {
            reset_velocity: true,
        }
    }

    #[test]
    fn resting_box_stays_put() {
        let mut engine = table_engine();
        let pose = Pose::from_translation(0.0, 0.0, H);
        engine.place_body("a", "cube", pose, dynamic()).unwrap();
        engine.step(120);
        let settled = engine.settled_pose("a").unwrap();
        assert!(settled.translation_distance(&pose) < 1e-4);
        assert_eq!(
            engine.contacts("a"),
            BTreeSet::from(["background".to_string()])
        );
    }

    #[test]
    fn floating_box_falls_onto_plane() {
        let mut engine = table_engine();
        engine
            .place_body("a", "cube", Pose::from_translation(0.0, 0.0, 1.0), dynamic())
            .unwrap();
        engine.step(240);
        let z = engine.settled_pose("a").unwrap().translation.z;
        assert!((z - H).abs() < 1e-3, "z={z}");
    }

    #[test]
    fn floating_box_without_enough_ticks_keeps_falling() {
        let mut engine = table_engine();
        engine
            .place_body("a", "cube", Pose::from_translation(0.0, 0.0, 1.0), dynamic())
            .unwrap();
        engine.step(10);
        assert!(engine.contacts("a").is_empty());
    }

    #[test]
    fn penetrating_box_is_pushed_out() {
        let mut engine = table_engine();
        engine
            .place_body("a", "cube", Pose::from_translation(0.0, 0.0, 0.0), dynamic())
            .unwrap();
        engine.step(1);
        let z = engine.settled_pose("a").unwrap().translation.z;
        assert!((z - H).abs() < 1e-4);
    }

    #[test]
    fn stacked_boxes_touch_each_other() {
        let mut engine = table_engine();
        engine
            .place_body("bottom", "cube", Pose::from_translation(0.0, 0.0, H), Motion::Fixed)
            .unwrap();
        engine
            .place_body("top", "cube", Pose::from_translation(0.01, 0.0, 3.0 * H + 0.2), dynamic())
            .unwrap();
        engine.step(240);

        let top = engine.settled_pose("top").unwrap();
        assert!((top.translation.z - 3.0 * H).abs() < 1e-3);
        let contacts = engine.contacts("top");
        assert!(contacts.contains("bottom"));
        assert!(!contacts.contains("background"));
        assert!(engine.contacts("bottom").contains("top"));
    }

    #[test]
    fn fixed_body_never_moves() {
        let mut engine = table_engine();
        let pose = Pose::from_translation(0.0, 0.0, 0.5);
        engine.place_body("shelf", "cube", pose, Motion::Fixed).unwrap();
        engine.step(100);
        assert_eq!(engine.settled_pose("shelf"), Some(pose));
    }

    #[test]
    fn queued_forces_push_body_then_expire() {
        let mut engine = table_engine();
        engine
            .place_body("a", "cube", Pose::from_translation(0.0, 0.0, H), dynamic())
            .unwrap();
        engine.apply_forces(
            "a",
            &[AppliedForce {
                point: Vec3::new(0.0, 0.0, H),
                force: Vec3::new(50.0, 0.0, 0.0),
            }],
        );
        engine.step(10);
        let x_after_push = engine.settled_pose("a").unwrap().translation.x;
        assert!(x_after_push > 0.0);

        engine.step(50);
        let x_later = engine.settled_pose("a").unwrap().translation.x;
        // Friction bleeds off the remaining velocity once the force expires.
        assert!(x_later - x_after_push < x_after_push);
    }

    #[test]
    fn rotated_box_uses_enclosing_extents() {
        let mut engine = SimPhysicsEngine::new();
        engine
            .register_model(&ObjectModel::box_model(
                "plank",
                Vec3::new(0.2, 0.05, 0.01),
                0.05,
            ))
            .unwrap();
        engine
            .set_background("background", &PointCloud::new(vec![Vec3::zero()]))
            .unwrap();
        // Standing the plank on end: its long axis now points up.
        let upright = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), std::f32::consts::FRAC_PI_2);
        engine
            .place_body("p", "plank", Pose::new(Vec3::new(0.0, 0.0, 1.0), upright), dynamic())
            .unwrap();
        engine.step(240);
        let z = engine.settled_pose("p").unwrap().translation.z;
        assert!((z - 0.2).abs() < 1e-3, "z={z}");
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut engine = table_engine();
        let err = engine
            .place_body("a", "ghost", Pose::identity(), dynamic())
            .unwrap_err();
        assert!(matches!(err, SceneError::Physics { .. }));
    }

    #[test]
    fn cleared_background_no_longer_supports() {
        let mut engine = table_engine();
        engine.clear_background();
        assert_eq!(engine.background_height(), None);
        engine
            .place_body("a", "cube", Pose::from_translation(0.0, 0.0, H), dynamic())
            .unwrap();
        engine.step(30);
        assert!(engine.settled_pose("a").unwrap().translation.z < 0.0);
        assert!(engine.contacts("a").is_empty());
    }

    #[test]
    fn unregistered_model_can_no_longer_be_placed() {
        let mut engine = table_engine();
        engine.unregister_model("cube");
        engine.unregister_model("never-registered");
        let err = engine
            .place_body("a", "cube", Pose::identity(), dynamic())
            .unwrap_err();
        assert!(matches!(err, SceneError::Physics { .. }));
    }

    #[test]
    fn empty_background_is_rejected() {
        let mut engine = SimPhysicsEngine::new();
        assert!(engine.set_background("bg", &PointCloud::default()).is_err());
    }
}
