//! Client-side prediction and adaptive scoring for a target-shooting arena.
//!
//! The crate splits into two halves. The prediction half
//! ([`prediction`], [`engine`]) runs on the controlling client: it applies
//! movement inputs immediately, spawns speculative projectiles, and
//! reconciles against authoritative server state with smoothing that adapts
//! to measured latency. The scoring half ([`game`]) runs wherever the
//! authority lives: it turns confirmed hits into scores with combo and
//! multi-hit bonuses and drives the round lifecycle.
//!
//! All simulation cores are synchronous and deterministic; the only async
//! surface is the session task in [`game::session`].

pub mod config;
pub mod engine;
pub mod game;
pub mod math;
pub mod prediction;
pub mod protocol;
pub mod util;

use thiserror::Error;

/// Errors surfaced by the prediction and session layers
#[derive(Debug, Error)]
pub enum GameError {
    /// The host engine handed us no world reference at construction
    #[error("world reference unavailable at controller construction")]
    MissingWorld,
    /// The session's input mailbox is gone; the session task has stopped
    #[error("session is no longer running")]
    SessionClosed,
    /// A wire message failed to decode
    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),
}

pub use config::{PredictionConfig, ScoringConfig, ThrowConfig};
pub use engine::{EngineAdapter, EngineWorld, EntityId};
pub use game::{GameSession, HitDescriptor, MovementPattern, ScoreBoard, SessionHandle};
pub use math::Vec3;
pub use prediction::{Effect, InputEvent, PredictionController};
