//! [`SceneLoop`] – feeds a [`SceneOrchestrator`] from producer tasks.
//!
//! Perception front-ends (segmenter, recognition matcher, point tracker)
//! push [`SceneInput`]s through a [`SceneLoopHandle`].  The loop applies
//! them in arrival order.  A [`SceneInput::Evaluate`] runs the blocking
//! evaluation on Tokio's blocking pool and broadcasts the outcome to every
//! subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use scenephys_kernel::SceneOrchestrator;
//! use scenephys_runtime::scene_loop::{SceneInput, SceneLoop};
//!
//! # async fn demo() {
//! let scene = Arc::new(SceneOrchestrator::default());
//! let (scene_loop, handle) = SceneLoop::new(scene, 64);
//! let mut reports = handle.subscribe();
//! tokio::spawn(scene_loop.run());
//!
//! handle.send(SceneInput::Evaluate).await.unwrap();
//! let outcome = reports.recv().await.unwrap();
//! println!("{outcome:?}");
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use scenephys_kernel::{BackgroundMode, SceneOrchestrator};
use scenephys_perception::FeedbackForceConfig;
use scenephys_types::{
    EvaluationReport, ObjectHypotheses, ObjectSymmetry, ObjectWithId, PointCloud, SceneError,
    TrackedPoint,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Result of one evaluation request, as broadcast to subscribers.
pub type EvaluationOutcome = Result<EvaluationReport, SceneError>;

/// One unit of work for the loop.
#[derive(Debug, Clone)]
pub enum SceneInput {
    ScenePointCloud(PointCloud),
    Background { cloud: PointCloud, mode: BackgroundMode },
    NewObjects(Vec<ObjectWithId>),
    Hypotheses(BTreeMap<String, ObjectHypotheses>),
    Symmetries(BTreeMap<String, ObjectSymmetry>),
    TrackedPoints(Vec<TrackedPoint>),
    FeedbackParameters(FeedbackForceConfig),
    /// Run `evaluate_all_object_hypothesis_probability`.
    Evaluate,
}

/// Cloneable producer side of a [`SceneLoop`].
#[derive(Clone)]
pub struct SceneLoopHandle {
    inputs: mpsc::Sender<SceneInput>,
    outcomes: broadcast::Sender<EvaluationOutcome>,
}

impl SceneLoopHandle {
    /// Queue `input`, waiting while the channel is full.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotReady`] once the loop has stopped.
    pub async fn send(&self, input: SceneInput) -> Result<(), SceneError> {
        self.inputs.send(input).await.map_err(|_| SceneError::NotReady)
    }

    /// Receive every evaluation outcome produced after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EvaluationOutcome> {
        self.outcomes.subscribe()
    }
}

/// Consumer side: owns the orchestrator handle and the input queue.
pub struct SceneLoop {
    scene: Arc<SceneOrchestrator>,
    inputs: mpsc::Receiver<SceneInput>,
    outcomes: broadcast::Sender<EvaluationOutcome>,
}

impl SceneLoop {
    /// Create a loop with room for `capacity` queued inputs.
    pub fn new(scene: Arc<SceneOrchestrator>, capacity: usize) -> (Self, SceneLoopHandle) {
        let (input_tx, input_rx) = mpsc::channel(capacity.max(1));
        let (outcome_tx, _) = broadcast::channel(capacity.max(1));
        let handle = SceneLoopHandle {
            inputs: input_tx,
            outcomes: outcome_tx.clone(),
        };
        let scene_loop = Self {
            scene,
            inputs: input_rx,
            outcomes: outcome_tx,
        };
        (scene_loop, handle)
    }

    pub fn scene(&self) -> &Arc<SceneOrchestrator> {
        &self.scene
    }

    /// Apply a non-evaluating input directly.  Returns `true` when `input`
    /// asks for an evaluation instead.
    pub fn apply(&self, input: SceneInput) -> bool {
        match input {
            SceneInput::ScenePointCloud(cloud) => self.scene.add_scene_point_cloud(cloud),
            SceneInput::Background { cloud, mode } => self.scene.add_background(cloud, mode),
            SceneInput::NewObjects(objects) => self.scene.add_new_object_transforms(&objects),
            SceneInput::Hypotheses(map) => self.scene.set_object_hypotheses_map(map),
            SceneInput::Symmetries(map) => self.scene.set_object_symmetry_map(map),
            SceneInput::TrackedPoints(points) => self.scene.add_tracked_points(&points),
            SceneInput::FeedbackParameters(config) => {
                self.scene.set_data_feedback_forces_parameters(config)
            }
            SceneInput::Evaluate => return true,
        }
        false
    }

    /// Wait for one input and process it.
    ///
    /// Returns `None` once every handle has been dropped, `Some(None)` for a
    /// plain input and `Some(Some(outcome))` after an evaluation.
    pub async fn tick(&mut self) -> Option<Option<EvaluationOutcome>> {
        let input = self.inputs.recv().await?;
        if !self.apply(input) {
            return Some(None);
        }

        let scene = Arc::clone(&self.scene);
        let outcome = tokio::task::spawn_blocking(move || scene.evaluate_all_object_hypothesis_probability())
            .await
            .unwrap_or_else(|e| {
                Err(SceneError::Physics {
                    details: format!("evaluation task failed: {e}"),
                })
            });
        match &outcome {
            Ok(report) => debug!(cycle = %report.id, evaluated = report.evaluated.len(), "evaluation broadcast"),
            Err(e) => warn!(error = %e, "evaluation failed"),
        }
        // No subscribers is not an error.
        let _ = self.outcomes.send(outcome.clone());
        Some(Some(outcome))
    }

    /// Process inputs until every handle is dropped.
    pub async fn run(mut self) {
        info!("scene loop started");
        while self.tick().await.is_some() {}
        info!("scene loop stopped");
    }
}
