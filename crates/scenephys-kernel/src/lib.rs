//! `scenephys-kernel` – hypothesis selection and support reasoning.
//!
//! Resolves per-object pose candidates into one physically consistent scene
//! interpretation, using the physics engine as an oracle.
//!
//! # Modules
//!
//! - [`scene`] – [`SceneOrchestrator`][scene::SceneOrchestrator]: the
//!   session state, input mutators, the evaluation cycle and the
//!   corrected-pose readers.
//! - [`evaluator`] – [`simulate`][evaluator::simulate] and
//!   [`combine_score`][evaluator::combine_score]: one candidate through the
//!   engine, and the plausibility-aware score.
//! - [`support_graph`] – [`SupportGraph`][support_graph::SupportGraph]:
//!   acyclic supporter → supported graph rooted at the background.
//! - [`config`] – [`SceneConfig`][config::SceneConfig]: TOML configuration
//!   with `SCENEPHYS_*` environment overrides.

pub mod config;
pub mod evaluator;
pub mod scene;
pub mod support_graph;

pub use config::{EvaluationConfig, SceneConfig, SupportConfig, SymmetryToleranceConfig};
pub use evaluator::{SimulationResult, combine_score};
pub use scene::{BackgroundMode, ObjectState, SceneOrchestrator};
pub use support_graph::{EdgeWeightPolicy, SupportGraph};
