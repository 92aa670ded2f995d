//! `scenephys-physics` – the physics collaborator boundary.
//!
//! The hypothesis engine uses a rigid-body simulator as a consistency
//! oracle but never implements dynamics itself.  This crate defines the
//! boundary and what travels across it.
//!
//! # Modules
//!
//! - [`engine`] – [`PhysicsEngine`][engine::PhysicsEngine]: the trait every
//!   simulator backend implements (place bodies, step, query contacts and
//!   settled poses), plus the [`SharedEngine`][engine::SharedEngine] handle.
//! - [`model`] – [`ObjectModel`][model::ObjectModel] and the all-or-nothing
//!   [`load_object_models`][model::load_object_models] directory loader.
//! - [`sim`] – [`SimPhysicsEngine`][sim::SimPhysicsEngine]: a deterministic
//!   box-stacking engine for headless tests.

pub mod engine;
pub mod model;
pub mod sim;

pub use engine::{AppliedForce, Motion, PhysicsEngine, SharedEngine, shared};
pub use model::{ObjectModel, load_object_models};
pub use sim::SimPhysicsEngine;
