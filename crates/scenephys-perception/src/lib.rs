//! `scenephys-perception` – evidence handling around the physics oracle.
//!
//! Everything here turns observed points and declared object properties
//! into something the hypothesis evaluator can use: fewer candidates to
//! simulate, forces that pull bodies towards what the sensor saw, and a
//! recognition-fit score.
//!
//! # Modules
//!
//! - [`symmetry`] – [`SymmetryFolder`][symmetry::SymmetryFolder]: merges pose
//!   hypotheses that are indistinguishable under an object's symmetry.
//! - [`feedback`] – [`FeedbackForceGenerator`][feedback::FeedbackForceGenerator]:
//!   per-point forces from model/scene correspondences.
//! - [`tracker`] – [`TrackedPoints`][tracker::TrackedPoints]: bounded store of
//!   tracked points with persistent ids.
//! - [`recognition`] – [`RecognitionScorer`][recognition::RecognitionScorer]
//!   and the inlier-ratio [`PointFitScorer`][recognition::PointFitScorer].
//! - [`octree`] – [`Octree`][octree::Octree]: nearest-neighbour index over a
//!   point cloud.

pub mod feedback;
pub mod octree;
pub mod recognition;
pub mod symmetry;
pub mod tracker;

pub use feedback::{FeedbackForceConfig, FeedbackForceGenerator};
pub use recognition::{PointFitScorer, RecognitionScorer};
pub use symmetry::{FoldedPose, SymmetryFolder};
pub use tracker::TrackedPoints;
