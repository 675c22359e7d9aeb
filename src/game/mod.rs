//! Game logic modules

pub mod scoring;
pub mod session;

pub use scoring::{HitDescriptor, MovementPattern, PlayerCombatStats, ScoreBoard};
pub use session::{GameSession, RoundPhase, SessionEvent, SessionHandle};

use uuid::Uuid;

/// Input received from a player's connection or engine callback
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub player: Uuid,
    pub msg: SessionMsg,
    pub received_at: u64,
}

/// Player-originated session messages
#[derive(Debug, Clone)]
pub enum SessionMsg {
    /// Join the session
    Join { display_name: String },
    /// Leave the session
    Leave,
    /// A projectile landed on a target
    TargetHit(HitDescriptor),
}
