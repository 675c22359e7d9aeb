//! Message definitions for the engine's player/client channel
//!
//! The host engine provides a fire-and-forget JSON message channel per
//! player; these are the wire types the core produces and consumes on it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::Vec3;

/// Directional movement input for one local tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveInput {
    /// True when no direction is held
    pub fn is_idle(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right)
    }
}

/// Client-originated intents transmitted upstream to the authoritative
/// simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientIntent {
    /// Immediate-apply notice for a locally predicted movement tick
    #[serde(rename_all = "camelCase")]
    MoveInput {
        input: MoveInput,
        yaw: f32,
        /// Estimated server time at which the input was applied locally
        timestamp: u64,
    },

    /// Fire intent for a speculatively spawned projectile
    #[serde(rename_all = "camelCase")]
    Throw {
        prediction_id: Uuid,
        direction: Vec3,
        timestamp: u64,
    },
}

impl ClientIntent {
    /// Decode an intent from its wire form
    pub fn decode(raw: &str) -> Result<Self, crate::GameError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Payloads produced for the surrounding game UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiMsg {
    /// Remaining projectile count changed
    UpdateProjectileCount { count: u32 },

    /// Fire attempted with an empty magazine
    AttemptShootNoAmmo,

    /// Fire attempted inside the cooldown window
    #[serde(rename_all = "camelCase")]
    OnCooldown { remaining_seconds: f32 },

    /// Latency-measurement ping carrying the local send time
    TimeSync { data: TimeSyncData },

    /// Diagnostic only
    DebugLog { message: String },
}

impl UiMsg {
    /// Encode for the engine's JSON message channel
    pub fn encode(&self) -> Result<String, crate::GameError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSyncData {
    pub client_time: u64,
}

/// Authoritative kinematic state pushed by the server for one entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritativeState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Server timestamp of the state, in server-clock milliseconds
    pub timestamp: u64,
}
