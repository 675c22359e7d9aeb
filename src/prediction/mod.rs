//! Client-side prediction and reconciliation
//!
//! Gives the controlling client immediate feedback for movement and
//! projectile actions while the authoritative simulation confirms or
//! corrects them later, with correction smoothness adapting to measured
//! network quality.

pub mod controller;
pub mod latency;
pub mod movement;
pub mod projectile;

pub use controller::{Effect, InputEvent, PredictionController};
pub use latency::LatencyEstimator;
pub use movement::{MovementPredictor, PendingInput, Reconciliation};
pub use projectile::{ConfirmOutcome, ThrowController, ThrowOutcome};
