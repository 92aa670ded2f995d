//! Hypothesis evaluation: one candidate pose through the physics oracle.
//!
//! [`simulate`] drops a candidate into the engine next to the objects that
//! are already accepted, lets it settle for a bounded number of ticks and
//! reports what happened as a [`SimulationResult`].  [`combine_score`] then
//! folds the recognition-fit score and the simulation outcome into one
//! scalar with a hard guarantee:
//!
//! | Outcome | Score range |
//! |---|---|
//! | plausible (supported, drift within tolerance) | `[0.5, 1.0]` |
//! | implausible | `[0.0, 0.5)` |
//!
//! so a hypothesis the simulation rules out never beats a plausible one,
//! whatever its recognition score.

use std::collections::{BTreeMap, BTreeSet};

use scenephys_perception::FeedbackForceGenerator;
use scenephys_physics::{Motion, ObjectModel, PhysicsEngine};
use scenephys_types::{Pose, SceneError};

use crate::config::EvaluationConfig;

/// Relative gap kept between the best implausible and worst plausible score.
const IMPLAUSIBLE_MARGIN: f64 = 1e-3;

/// An object already committed this session, as the simulator sees it.
#[derive(Debug, Clone)]
pub struct AcceptedBody {
    pub model_name: String,
    pub settled_pose: Pose,
    /// True when this body itself has a support path to the background.
    pub supported: bool,
}

/// Outcome of simulating one candidate pose.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub settled_pose: Pose,
    /// Every body (background included) touching the candidate at the end.
    pub contacts: BTreeSet<String>,
    /// Contacts lying below the candidate along the up axis.
    pub supporters: BTreeSet<String>,
    /// Metres between hypothesis and settled translation.
    pub position_drift: f32,
    /// Radians between hypothesis and settled rotation.
    pub angular_drift: f32,
    /// The background is in the downward contact closure, directly or via
    /// supported accepted objects.
    pub supported: bool,
}

impl SimulationResult {
    pub fn is_plausible(&self, config: &EvaluationConfig) -> bool {
        self.supported
            && self.position_drift <= config.position_tolerance
            && self.angular_drift <= config.angle_tolerance
    }

    /// `exp(−d/σ_d) · exp(−θ/σ_θ)` in `(0, 1]`.
    pub fn stability_factor(&self, config: &EvaluationConfig) -> f64 {
        let d = f64::from(self.position_drift) / f64::from(config.drift_scale);
        let theta = f64::from(self.angular_drift) / f64::from(config.angle_scale);
        (-d).exp() * (-theta).exp()
    }
}

/// Combine a recognition score (clamped to `[0, 1]`) with a simulation
/// outcome.
pub fn combine_score(recognition: f64, result: &SimulationResult, config: &EvaluationConfig) -> f64 {
    let r = if recognition.is_finite() {
        recognition.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let rs = r * result.stability_factor(config);
    if result.is_plausible(config) {
        0.5 + 0.5 * rs
    } else {
        0.5 * rs * (1.0 - IMPLAUSIBLE_MARGIN)
    }
}

/// Everything [`simulate`] needs besides the candidate itself.
pub struct SimulationContext<'a> {
    pub background_label: &'a str,
    /// Accepted objects to hold fixed; the candidate's own label is skipped.
    pub accepted: &'a BTreeMap<String, AcceptedBody>,
    pub config: &'a EvaluationConfig,
    pub feedback: Option<&'a FeedbackForceGenerator>,
}

/// Simulate `label` (model `model`) starting at `hypothesis`.
///
/// Clears every dynamic body, places the accepted objects fixed at their
/// settled poses, drops the candidate in with zeroed velocity and steps
/// `settle_ticks` ticks in `tick_chunk` chunks, recomputing feedback forces
/// before each chunk.
///
/// # Errors
///
/// [`SceneError::Physics`] when the engine rejects a placement or loses the
/// candidate body.
pub fn simulate(
    engine: &mut dyn PhysicsEngine,
    ctx: &SimulationContext<'_>,
    label: &str,
    model: &ObjectModel,
    hypothesis: &Pose,
) -> Result<SimulationResult, SceneError> {
    engine.clear_bodies();
    for (other, body) in ctx.accepted {
        if other != label {
            engine.place_body(other, &body.model_name, body.settled_pose, Motion::Fixed)?;
        }
    }
    engine.place_body(
        label,
        &model.name,
        *hypothesis,
        Motion::Dynamic {
            reset_velocity: true,
        },
    )?;

    let chunk = ctx.config.tick_chunk.max(1);
    let mut remaining = ctx.config.settle_ticks;
    while remaining > 0 {
        let ticks = remaining.min(chunk);
        if let Some(feedback) = ctx.feedback
            && let Some(current) = engine.settled_pose(label)
        {
            let forces = feedback.generate(&model.cloud, &current);
            engine.apply_forces(label, &forces);
        }
        engine.step(ticks);
        remaining -= ticks;
    }

    let settled_pose = engine.settled_pose(label).ok_or_else(|| SceneError::Physics {
        details: format!("body '{label}' vanished during simulation"),
    })?;
    let contacts = engine.contacts(label);
    let supporters: BTreeSet<String> = contacts
        .iter()
        .filter(|c| {
            c.as_str() == ctx.background_label
                || ctx.accepted.get(c.as_str()).is_some_and(|b| {
                    c.as_str() != label
                        && b.settled_pose.translation.z < settled_pose.translation.z
                })
        })
        .cloned()
        .collect();
    let supported = supporters.iter().any(|s| {
        s.as_str() == ctx.background_label || ctx.accepted.get(s.as_str()).is_some_and(|b| b.supported)
    });

    Ok(SimulationResult {
        settled_pose,
        position_drift: hypothesis.translation_distance(&settled_pose),
        angular_drift: hypothesis.rotation_distance(&settled_pose),
        contacts,
        supporters,
        supported,
    })
}
