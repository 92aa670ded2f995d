//! `scenephys-runtime` – process plumbing around the scene engine.
//!
//! # Modules
//!
//! - [`scene_loop`] – [`SceneLoop`][scene_loop::SceneLoop]: applies inputs
//!   pushed by producer tasks to a shared
//!   [`SceneOrchestrator`][scenephys_kernel::SceneOrchestrator] and runs
//!   evaluations on the blocking pool.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber, with optional OTLP span export when
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

pub mod scene_loop;
pub mod telemetry;

pub use scene_loop::{EvaluationOutcome, SceneInput, SceneLoop, SceneLoopHandle};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
