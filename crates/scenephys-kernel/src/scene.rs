//! [`SceneOrchestrator`] – the session-scoped scene hypothesis engine.
//!
//! Holds every input (clouds, hypotheses, symmetries, models), the accepted
//! objects and the [`SupportGraph`] behind one `parking_lot` mutex.  The only
//! state transition that commits poses is
//! [`evaluate_all_object_hypothesis_probability`]; everything else either
//! records input or reads results.
//!
//! # Evaluation cycle
//!
//! 1. Pick the labels to (re)evaluate: every label on a full rebuild, or the
//!    dirty labels plus their support-graph descendants on an incremental
//!    update.
//! 2. Order them bottom-up by the height of their first candidate.
//! 3. Per label: fold symmetric duplicates, simulate and score each class
//!    against the objects already accepted, and commit the best candidate
//!    whose support edges keep the graph acyclic.
//!
//! Work happens on copies of the objects and the graph; a failing cycle
//! leaves the session exactly as it was.
//!
//! [`evaluate_all_object_hypothesis_probability`]: SceneOrchestrator::evaluate_all_object_hypothesis_probability
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::path::Path;
//!
//! use scenephys_kernel::{SceneConfig, SceneOrchestrator};
//! use scenephys_physics::{SimPhysicsEngine, shared};
//! use scenephys_types::{ObjectHypotheses, PointCloud, Pose, Vec3};
//!
//! let scene = SceneOrchestrator::new(SceneConfig::default()).unwrap();
//! scene.set_physics_engine(shared(SimPhysicsEngine::new())).unwrap();
//! scene.load_object_models(Path::new("models"), &["cube".to_string()]).unwrap();
//! scene.add_background(PointCloud::new(vec![Vec3::zero()]), Default::default());
//!
//! let mut hypotheses = BTreeMap::new();
//! hypotheses.insert(
//!     "cube_0".to_string(),
//!     ObjectHypotheses::new("cube", vec![Pose::from_translation(0.0, 0.0, 0.05)]),
//! );
//! scene.set_object_hypotheses_map(hypotheses);
//!
//! let report = scene.evaluate_all_object_hypothesis_probability().unwrap();
//! assert_eq!(report.evaluated, vec!["cube_0".to_string()]);
//! let poses = scene.corrected_object_transforms_from_scene_graph();
//! println!("{:?}", poses["cube_0"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use parking_lot::Mutex;
use scenephys_perception::{
    FeedbackForceConfig, FeedbackForceGenerator, PointFitScorer, RecognitionScorer,
    SymmetryFolder, TrackedPoints,
};
use scenephys_physics::{ObjectModel, PhysicsEngine, SharedEngine};
use scenephys_types::{
    EvaluationReport, ObjectHypotheses, ObjectSymmetry, ObjectWithId, PointCloud, Pose,
    SceneError, SupportStatus, TrackedPoint,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SceneConfig;
use crate::evaluator::{AcceptedBody, SimulationContext, SimulationResult, combine_score, simulate};
use crate::support_graph::SupportGraph;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// How [`SceneOrchestrator::add_background`] treats the existing background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    #[default]
    Replace,
    Merge,
}

/// An accepted object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    pub label: String,
    pub model_name: String,
    /// The winning hypothesis, as supplied by the caller.
    pub pose: Pose,
    /// Where the winning hypothesis came to rest in simulation.
    pub settled_pose: Pose,
    pub score: f64,
    /// The winning hypothesis was supported and stayed within tolerance.
    pub plausible: bool,
    pub status: SupportStatus,
    pub symmetry: ObjectSymmetry,
    /// Observed points attributed to the object when it was scored.
    pub segment: PointCloud,
}

// ────────────────────────────────────────────────────────────────────────────
// Internal state
// ────────────────────────────────────────────────────────────────────────────

/// One symmetry class of a label's candidates, simulated and scored.
#[derive(Debug, Clone)]
struct RankedCandidate {
    /// Earliest input index in the class.
    input_index: usize,
    pose: Pose,
    canonical: Pose,
    segment: PointCloud,
    result: SimulationResult,
    score: f64,
}

struct SceneState {
    config: SceneConfig,
    engine: Option<SharedEngine>,
    models: BTreeMap<String, ObjectModel>,
    background: PointCloud,
    scene: PointCloud,
    tracked: TrackedPoints,
    hypotheses: BTreeMap<String, ObjectHypotheses>,
    symmetry: BTreeMap<String, ObjectSymmetry>,
    feedback: Option<FeedbackForceConfig>,
    debug: bool,
    objects: BTreeMap<String, ObjectState>,
    graph: SupportGraph,
    dirty: BTreeSet<String>,
    /// A full rebuild has completed since construction or `reset`.
    built: bool,
}

impl SceneState {
    fn new(config: SceneConfig) -> Self {
        Self {
            engine: None,
            models: BTreeMap::new(),
            background: PointCloud::default(),
            scene: PointCloud::default(),
            tracked: TrackedPoints::new(),
            hypotheses: BTreeMap::new(),
            symmetry: BTreeMap::new(),
            feedback: config.feedback,
            debug: config.debug,
            objects: BTreeMap::new(),
            graph: SupportGraph::new(config.background_label.clone(), config.support.edge_weight),
            dirty: BTreeSet::new(),
            built: false,
            config,
        }
    }

    fn mark_all_dirty(&mut self) {
        self.dirty.extend(self.hypotheses.keys().cloned());
    }

    /// Symmetry of `label`, falling back to an entry keyed by its model name.
    fn symmetry_for(&self, label: &str, model_name: &str) -> ObjectSymmetry {
        self.symmetry
            .get(label)
            .or_else(|| self.symmetry.get(model_name))
            .copied()
            .unwrap_or_default()
    }

    /// Scene and tracked points within the model's bounding radius of `pose`.
    fn segment_for(&self, model: &ObjectModel, pose: &Pose) -> PointCloud {
        let radius = model.bounding_radius();
        let mut segment = self.scene.within_radius(pose.translation, radius);
        segment.extend(&self.tracked.within_radius(pose.translation, radius));
        segment
    }

    /// The usable hypotheses and model of `label`.
    fn usable(&self, label: &str) -> Result<(&ObjectHypotheses, &ObjectModel), SceneError> {
        let unknown = || SceneError::UnknownHypothesisLabel(label.to_string());
        let hypotheses = self
            .hypotheses
            .get(label)
            .filter(|h| !h.poses.is_empty())
            .ok_or_else(unknown)?;
        let model = self.models.get(&hypotheses.model_name).ok_or_else(unknown)?;
        Ok((hypotheses, model))
    }

    /// Re-evaluate every label with hypotheses against an empty graph.
    fn rebuild_support_graph(
        &self,
        engine: &mut dyn PhysicsEngine,
        scorer: &dyn RecognitionScorer,
    ) -> Result<Committed, SceneError> {
        let pending: BTreeSet<String> = self.hypotheses.keys().chain(self.dirty.iter()).cloned().collect();
        let mut graph = self.graph.clone();
        graph.clear();
        self.run_cycle(engine, scorer, pending, graph, true)
    }

    /// Re-evaluate dirty labels and everything they may disturb, keeping the
    /// rest of the graph.
    fn update_support_graph(
        &self,
        engine: &mut dyn PhysicsEngine,
        scorer: &dyn RecognitionScorer,
    ) -> Result<Committed, SceneError> {
        let pending = self.affected_labels();
        self.run_cycle(engine, scorer, pending, self.graph.clone(), false)
    }

    /// Dirty labels, closed under two relations: support-graph descendants,
    /// and accepted objects whose footprint overlaps a pending candidate and
    /// that were seen above it or failed to settle where they were seen.
    fn affected_labels(&self) -> BTreeSet<String> {
        let mut pending = BTreeSet::new();
        let mut frontier: Vec<String> = self.dirty.iter().cloned().collect();
        while let Some(label) = frontier.pop() {
            if !pending.insert(label.clone()) {
                continue;
            }
            frontier.extend(self.graph.descendants(&label));
            let Ok((hypotheses, model)) = self.usable(&label) else {
                continue;
            };
            for (other, object) in &self.objects {
                if pending.contains(other) {
                    continue;
                }
                let Some(other_model) = self.models.get(&object.model_name) else {
                    continue;
                };
                let reach = model.bounding_radius() + other_model.bounding_radius();
                let disturbed = hypotheses.poses.iter().any(|candidate| {
                    [object.pose, object.settled_pose].iter().any(|seen| {
                        horizontal_distance(candidate, seen) < reach
                            && (seen.translation.z > candidate.translation.z || !object.plausible)
                    })
                });
                if disturbed {
                    debug!(label = %other, by = %label, "re-queued by overlapping candidate");
                    frontier.push(other.clone());
                }
            }
        }
        pending
    }

    fn run_cycle(
        &self,
        engine: &mut dyn PhysicsEngine,
        scorer: &dyn RecognitionScorer,
        pending: BTreeSet<String>,
        mut graph: SupportGraph,
        full_rebuild: bool,
    ) -> Result<Committed, SceneError> {
        let mut report = EvaluationReport::new(full_rebuild);
        let mut objects = self.objects.clone();

        if self.background.is_empty() {
            engine.clear_background();
        } else {
            engine.set_background(&self.config.background_label, &self.background)?;
        }

        let mut queue: Vec<(f32, String)> = Vec::new();
        for label in pending {
            match self.usable(&label).map(|(h, _)| h.poses[0].translation.z) {
                Ok(z) => queue.push((z, label)),
                Err(e) => {
                    warn!(label = %label, error = %e, "skipping label without usable hypotheses");
                    report.skipped.insert(label);
                }
            }
        }
        queue.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let mut waiting: BTreeSet<String> = queue.iter().map(|(_, l)| l.clone()).collect();
        for label in &waiting {
            graph.clear_incoming(label);
        }

        for (_, label) in queue {
            let accepted: BTreeMap<String, AcceptedBody> = objects
                .iter()
                .filter(|(l, _)| !waiting.contains(*l))
                .map(|(l, o)| {
                    (
                        l.clone(),
                        AcceptedBody {
                            model_name: o.model_name.clone(),
                            settled_pose: o.settled_pose,
                            supported: o.status == SupportStatus::Supported,
                        },
                    )
                })
                .collect();

            let ranked = self.evaluate_object_probability(engine, scorer, &label, &accepted)?;
            let (best, status) = commit_best(&mut graph, &label, &ranked, &mut report)?;
            let (hypotheses, _) = self.usable(&label)?;

            // Carry the simulated motion over to the caller's orientation,
            // which may differ from the canonical one by a symmetry.
            let settled = best.result.settled_pose;
            let delta = settled.rotation.mul(best.canonical.rotation.conjugate());
            let settled_pose = Pose::new(settled.translation, delta.mul(best.pose.rotation).normalized());

            objects.insert(
                label.clone(),
                ObjectState {
                    label: label.clone(),
                    model_name: hypotheses.model_name.clone(),
                    pose: best.pose,
                    settled_pose,
                    score: best.score,
                    plausible: best.result.is_plausible(&self.config.evaluation),
                    status,
                    symmetry: self.symmetry_for(&label, &hypotheses.model_name),
                    segment: best.segment.clone(),
                },
            );
            waiting.remove(&label);
            report.evaluated.push(label);
        }

        Ok(Committed {
            objects,
            graph,
            report,
        })
    }

    /// Fold, simulate and score every candidate of `label`; best first, ties
    /// broken by the earlier input index.
    fn evaluate_object_probability(
        &self,
        engine: &mut dyn PhysicsEngine,
        scorer: &dyn RecognitionScorer,
        label: &str,
        accepted: &BTreeMap<String, AcceptedBody>,
    ) -> Result<Vec<RankedCandidate>, SceneError> {
        let (hypotheses, model) = self.usable(label)?;
        let symmetry = self.symmetry_for(label, &hypotheses.model_name);
        let tolerance = self.config.symmetry_tolerance;
        let folder = SymmetryFolder::new(tolerance.position, tolerance.angle);

        let mut ranked = Vec::new();
        for class in folder.fold(&hypotheses.poses, &symmetry) {
            let input_index = class.first_index();
            let (result, segment, score) =
                self.evaluate_scene_on_object_hypothesis(engine, scorer, label, model, &class.pose, accepted)?;
            if self.debug {
                info!(label = %label, candidate = input_index, members = class.members.len(), score, supported = result.supported, drift = result.position_drift, "scored candidate");
            } else {
                debug!(label = %label, candidate = input_index, members = class.members.len(), score, supported = result.supported, drift = result.position_drift, "scored candidate");
            }
            ranked.push(RankedCandidate {
                input_index,
                pose: hypotheses.poses[input_index],
                canonical: class.pose,
                segment,
                result,
                score,
            });
        }
        // Stable: equal scores keep input order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }

    /// Simulate one candidate and score it.
    fn evaluate_scene_on_object_hypothesis(
        &self,
        engine: &mut dyn PhysicsEngine,
        scorer: &dyn RecognitionScorer,
        label: &str,
        model: &ObjectModel,
        pose: &Pose,
        accepted: &BTreeMap<String, AcceptedBody>,
    ) -> Result<(SimulationResult, PointCloud, f64), SceneError> {
        let segment = self.segment_for(model, pose);
        let feedback = self
            .feedback
            .map(|config| FeedbackForceGenerator::new(config, &segment));
        let ctx = SimulationContext {
            background_label: &self.config.background_label,
            accepted,
            config: &self.config.evaluation,
            feedback: feedback.as_ref(),
        };
        let result = simulate(engine, &ctx, label, model, pose)?;
        let recognition = scorer.score(model, pose, &segment);
        let score = combine_score(recognition, &result, &self.config.evaluation);
        Ok((result, segment, score))
    }
}

fn horizontal_distance(a: &Pose, b: &Pose) -> f32 {
    let dx = a.translation.x - b.translation.x;
    let dy = a.translation.y - b.translation.y;
    (dx * dx + dy * dy).sqrt()
}

/// Register `models` with `engine`, all or none.
///
/// On failure every name registered by this call is withdrawn again, or
/// restored to its definition in `known` when it replaced one.
fn register_models<'a>(
    engine: &mut dyn PhysicsEngine,
    models: impl IntoIterator<Item = &'a ObjectModel>,
    known: &BTreeMap<String, ObjectModel>,
) -> Result<(), SceneError> {
    let mut registered: Vec<&str> = Vec::new();
    for model in models {
        if let Err(e) = engine.register_model(model) {
            for name in registered {
                match known.get(name) {
                    Some(previous) => {
                        if let Err(restore) = engine.register_model(previous) {
                            warn!(model = %name, error = %restore, "failed to restore model");
                        }
                    }
                    None => engine.unregister_model(name),
                }
            }
            return Err(e);
        }
        registered.push(&model.name);
    }
    Ok(())
}

/// Output of a successful cycle, swapped into the state in one step.
struct Committed {
    objects: BTreeMap<String, ObjectState>,
    graph: SupportGraph,
    report: EvaluationReport,
}

/// Commit the best candidate whose support edges keep `graph` acyclic.
///
/// When every candidate closes a cycle, the best one is committed without
/// incoming edges and marked [`SupportStatus::Uncertain`].
fn commit_best<'a>(
    graph: &mut SupportGraph,
    label: &str,
    ranked: &'a [RankedCandidate],
    report: &mut EvaluationReport,
) -> Result<(&'a RankedCandidate, SupportStatus), SceneError> {
    let best = ranked
        .first()
        .ok_or_else(|| SceneError::UnknownHypothesisLabel(label.to_string()))?;
    graph.add_vertex(label);

    for candidate in ranked {
        let conflict = candidate
            .result
            .supporters
            .iter()
            .find_map(|s| graph.check_edge(s, label).err());
        if let Some(err) = conflict {
            warn!(label = %label, candidate = candidate.input_index, error = %err, "candidate rejected by support cycle guard");
            report.conflicts.insert(label.to_string());
            continue;
        }
        for supporter in &candidate.result.supporters {
            graph.add_edge(supporter, label, candidate.score)?;
        }
        let status = if candidate.result.supported {
            SupportStatus::Supported
        } else {
            SupportStatus::Unsupported
        };
        return Ok((candidate, status));
    }

    warn!(label = %label, "every candidate conflicts with the support graph; committing without support");
    report.uncertain.insert(label.to_string());
    Ok((best, SupportStatus::Uncertain))
}

// ────────────────────────────────────────────────────────────────────────────
// SceneOrchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Physics-grounded scene hypothesis engine.
///
/// Every method takes `&self`; share one orchestrator between threads with
/// an `Arc`.
pub struct SceneOrchestrator {
    state: Mutex<SceneState>,
    scorer: Box<dyn RecognitionScorer>,
}

impl Default for SceneOrchestrator {
    fn default() -> Self {
        Self::with_valid_config(SceneConfig::default())
    }
}

impl SceneOrchestrator {
    /// # Errors
    ///
    /// [`SceneError::InvalidConfig`] when `config` fails validation.
    pub fn new(config: SceneConfig) -> Result<Self, SceneError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    /// Construct with an initial scene and background cloud.
    pub fn with_clouds(config: SceneConfig, scene: PointCloud, background: PointCloud) -> Result<Self, SceneError> {
        let orchestrator = Self::new(config)?;
        {
            let mut state = orchestrator.state.lock();
            state.scene = scene;
            state.background = background;
        }
        Ok(orchestrator)
    }

    fn with_valid_config(config: SceneConfig) -> Self {
        let scorer = PointFitScorer {
            inlier_distance: config.evaluation.inlier_distance,
        };
        Self {
            state: Mutex::new(SceneState::new(config)),
            scorer: Box::new(scorer),
        }
    }

    /// Replace the recognition scorer.
    pub fn with_scorer(mut self, scorer: impl RecognitionScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn config(&self) -> SceneConfig {
        self.state.lock().config.clone()
    }

    // ── inputs ─────────────────────────────────────────────────────────────

    /// Attach the physics engine and register every loaded model with it.
    ///
    /// # Errors
    ///
    /// Propagates the engine's registration failure; the engine is not
    /// attached in that case and keeps none of the models.
    pub fn set_physics_engine(&self, engine: SharedEngine) -> Result<(), SceneError> {
        let mut state = self.state.lock();
        register_models(&mut *engine.lock(), state.models.values(), &BTreeMap::new())?;
        state.engine = Some(engine);
        state.mark_all_dirty();
        info!(models = state.models.len(), "physics engine attached");
        Ok(())
    }

    /// Load `<dir>/<name>.json` for every name.  All-or-nothing: on error no
    /// model is registered, neither here nor with the attached engine.
    pub fn load_object_models(&self, dir: &Path, names: &[String]) -> Result<usize, SceneError> {
        let models = scenephys_physics::load_object_models(dir, names)?;
        let mut state = self.state.lock();
        if let Some(engine) = &state.engine {
            register_models(&mut *engine.lock(), models.values(), &state.models)?;
        }
        let loaded = models.len();
        state.models.extend(models);
        let affected: Vec<String> = state
            .hypotheses
            .iter()
            .filter(|(_, h)| names.contains(&h.model_name))
            .map(|(l, _)| l.clone())
            .collect();
        state.dirty.extend(affected);
        Ok(loaded)
    }

    /// Append each detection's pose to its label's candidate list.
    pub fn add_new_object_transforms(&self, objects: &[ObjectWithId]) {
        let mut state = self.state.lock();
        for object in objects {
            let entry = state
                .hypotheses
                .entry(object.label.clone())
                .or_insert_with(|| ObjectHypotheses::new(object.model_name.clone(), Vec::new()));
            if entry.model_name != object.model_name {
                debug!(label = %object.label, from = %entry.model_name, to = %object.model_name, "model reassigned");
                entry.model_name = object.model_name.clone();
            }
            entry.poses.push(object.pose);
            state.dirty.insert(object.label.clone());
        }
    }

    /// Replace the hypotheses of the given labels; other labels keep theirs.
    pub fn set_object_hypotheses_map(&self, map: BTreeMap<String, ObjectHypotheses>) {
        let mut state = self.state.lock();
        for (label, hypotheses) in map {
            state.dirty.insert(label.clone());
            state.hypotheses.insert(label, hypotheses);
        }
    }

    /// Declare symmetries, keyed by label or by model name.
    pub fn set_object_symmetry_map(&self, map: BTreeMap<String, ObjectSymmetry>) {
        let mut state = self.state.lock();
        state.symmetry.extend(map);
        state.mark_all_dirty();
    }

    pub fn set_data_feedback_forces_parameters(&self, config: FeedbackForceConfig) {
        let mut state = self.state.lock();
        state.feedback = Some(config);
        state.mark_all_dirty();
    }

    /// Raise per-candidate logging from `debug` to `info`.
    pub fn set_debug_mode(&self, debug: bool) {
        self.state.lock().debug = debug;
    }

    pub fn add_background(&self, cloud: PointCloud, mode: BackgroundMode) {
        let mut state = self.state.lock();
        match mode {
            BackgroundMode::Replace => state.background = cloud,
            BackgroundMode::Merge => state.background.extend(&cloud),
        }
        state.mark_all_dirty();
    }

    /// Replace the observed scene cloud.
    pub fn add_scene_point_cloud(&self, cloud: PointCloud) {
        let mut state = self.state.lock();
        state.scene = cloud;
        state.mark_all_dirty();
    }

    pub fn add_tracked_points(&self, points: &[TrackedPoint]) {
        self.state.lock().tracked.update(points);
    }

    // ── evaluation ─────────────────────────────────────────────────────────

    /// Score every pending hypothesis and commit the best pose per label.
    ///
    /// The first call after construction or [`reset`](Self::reset) rebuilds
    /// the support graph; later calls update it incrementally unless the
    /// configuration disables that.
    ///
    /// # Errors
    ///
    /// - [`SceneError::NotReady`] without an attached engine.
    /// - [`SceneError::Physics`] when the engine fails.
    ///
    /// Either way no state is changed.
    pub fn evaluate_all_object_hypothesis_probability(&self) -> Result<EvaluationReport, SceneError> {
        let mut state = self.state.lock();
        let handle = state.engine.clone().ok_or(SceneError::NotReady)?;
        let mut engine = handle.lock();

        let full_rebuild = !state.built || !state.config.support.incremental;
        let committed = if full_rebuild {
            state.rebuild_support_graph(&mut *engine, self.scorer.as_ref())?
        } else {
            state.update_support_graph(&mut *engine, self.scorer.as_ref())?
        };

        state.objects = committed.objects;
        state.graph = committed.graph;
        state.dirty.clear();
        state.built = true;

        let report = committed.report;
        info!(
            cycle = %report.id,
            full_rebuild,
            evaluated = report.evaluated.len(),
            skipped = report.skipped.len(),
            conflicts = report.conflicts.len(),
            uncertain = report.uncertain.len(),
            edges = state.graph.edge_count(),
            "evaluation cycle complete"
        );
        Ok(report)
    }

    // ── readers ────────────────────────────────────────────────────────────

    /// Best-scoring pose per label.
    pub fn corrected_object_transforms(&self) -> BTreeMap<String, Pose> {
        let state = self.state.lock();
        state.objects.iter().map(|(l, o)| (l.clone(), o.pose)).collect()
    }

    /// Settled pose per label where a support edge was established, the
    /// best-scoring pose otherwise.
    pub fn corrected_object_transforms_from_scene_graph(&self) -> BTreeMap<String, Pose> {
        let state = self.state.lock();
        state
            .objects
            .iter()
            .map(|(l, o)| {
                let pose = if state.graph.supporters(l).is_empty() {
                    o.pose
                } else {
                    o.settled_pose
                };
                (l.clone(), pose)
            })
            .collect()
    }

    pub fn support_graph(&self) -> SupportGraph {
        self.state.lock().graph.clone()
    }

    pub fn object(&self, label: &str) -> Option<ObjectState> {
        self.state.lock().objects.get(label).cloned()
    }

    pub fn hypotheses(&self, label: &str) -> Option<ObjectHypotheses> {
        self.state.lock().hypotheses.get(label).cloned()
    }

    pub fn background(&self) -> PointCloud {
        self.state.lock().background.clone()
    }

    pub fn tracked_point_count(&self) -> usize {
        self.state.lock().tracked.len()
    }

    /// Forget every hypothesis, accepted object and support edge.  Models,
    /// the engine, the background and the configuration are kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.hypotheses.clear();
        state.objects.clear();
        state.dirty.clear();
        state.scene = PointCloud::default();
        state.tracked.clear();
        state.graph.reset();
        state.built = false;
        info!("scene reset");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
