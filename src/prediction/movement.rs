//! Local movement prediction and reconciliation against authoritative state
//!
//! The predictor applies directional input immediately for instant visual
//! feedback and buffers every unconfirmed input. When an authoritative update
//! arrives it prunes subsumed inputs, corrects toward the server position
//! with a latency-adaptive interpolation factor, and replays the remaining
//! inputs on top of the corrected position.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::PredictionConfig;
use crate::math::Vec3;
use crate::protocol::{AuthoritativeState, MoveInput};
use crate::util::time::tick_delta;

/// One unconfirmed local input
#[derive(Debug, Clone)]
pub struct PendingInput {
    pub input: MoveInput,
    /// Estimated server time at which the input was applied
    pub timestamp: u64,
    /// Predicted position after applying the input
    pub position: Vec3,
    /// Displacement the input produced
    pub movement_delta: Vec3,
}

/// Outcome of one reconciliation pass, for diagnostics and tests
#[derive(Debug, Clone, Copy)]
pub struct Reconciliation {
    /// Weighted position error against the authoritative state
    pub position_error: f32,
    /// Whether the error exceeded the adaptive threshold
    pub corrected: bool,
    /// Interpolation factor actually used (0 when uncorrected)
    pub lerp_factor: f32,
    /// Pending-input steps replayed after the correction
    pub replayed_steps: f32,
    /// Whether velocity was blended toward the server value
    pub velocity_blended: bool,
}

/// Predicted kinematic state for one controlled entity
#[derive(Debug)]
pub struct MovementPredictor {
    cfg: PredictionConfig,
    position: Vec3,
    velocity: Vec3,
    pending_inputs: VecDeque<PendingInput>,
}

impl MovementPredictor {
    pub fn new(cfg: PredictionConfig, spawn_position: Vec3) -> Self {
        Self {
            cfg,
            position: spawn_position,
            velocity: Vec3::ZERO,
            pending_inputs: VecDeque::new(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn pending_inputs(&self) -> impl Iterator<Item = &PendingInput> {
        self.pending_inputs.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_inputs.len()
    }

    /// Displacement one tick of this input produces, relative to the camera
    /// yaw (forward/right basis vectors derived from yaw only)
    pub fn movement_delta(&self, input: &MoveInput, yaw: f32) -> Vec3 {
        let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
        let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());

        let fwd_axis = (input.forward as i8 - input.backward as i8) as f32;
        let right_axis = (input.right as i8 - input.left as i8) as f32;

        let dir = forward * fwd_axis + right * right_axis;
        match dir.normalized() {
            Some(unit) => unit * self.cfg.move_speed * tick_delta(),
            None => Vec3::ZERO,
        }
    }

    /// Apply one tick of local input immediately and buffer it for later
    /// replay. Idle input moves nothing and is not buffered.
    ///
    /// `timestamp` must be on the estimated server clock so it can be
    /// compared against authoritative update timestamps.
    pub fn apply_input(&mut self, input: MoveInput, yaw: f32, timestamp: u64) -> Vec3 {
        if input.is_idle() {
            return Vec3::ZERO;
        }
        // Opposing keys can still cancel to a zero delta
        let delta = self.movement_delta(&input, yaw);
        if delta == Vec3::ZERO {
            return Vec3::ZERO;
        }

        self.position += delta;
        self.pending_inputs.push_back(PendingInput {
            input,
            timestamp,
            position: self.position,
            movement_delta: delta,
        });
        delta
    }

    /// Correct the local prediction toward an authoritative server state.
    ///
    /// One-way latency selects the tuning band: higher latency tolerates
    /// more divergence, trusts fewer pending inputs on replay, and corrects
    /// more gently.
    pub fn reconcile(&mut self, server: &AuthoritativeState, one_way_ms: f32) -> Reconciliation {
        // Inputs at or before the server timestamp are subsumed by this update
        self.pending_inputs.retain(|p| p.timestamp > server.timestamp);

        let position_error = self.weighted_error(&server.position);
        let band = self.cfg.band_for(one_way_ms);

        let mut report = Reconciliation {
            position_error,
            corrected: false,
            lerp_factor: 0.0,
            replayed_steps: 0.0,
            velocity_blended: false,
        };

        if position_error > band.position_error_threshold {
            // Error velocity: how fast we are diverging, per second of
            // one-way latency. Larger divergence earns a stronger pull.
            let one_way_secs = (one_way_ms / 1000.0).max(0.005);
            let error_velocity = (server.position - self.position) * (1.0 / one_way_secs);
            let dynamic_lerp = (band.base_lerp_factor
                + error_velocity.length() * self.cfg.error_velocity_gain)
                .min(1.0);

            self.position = self.position.lerp(&server.position, dynamic_lerp);

            let replayed = self.replay_pending(band.replay_scale);

            report.corrected = true;
            report.lerp_factor = dynamic_lerp;
            report.replayed_steps = replayed;

            debug!(
                position_error,
                lerp_factor = dynamic_lerp,
                replayed_steps = replayed,
                one_way_ms,
                "Reconciled position"
            );
        }

        // Velocity divergence is handled separately with a fixed blend
        let velocity_error = (server.velocity - self.velocity).length();
        if velocity_error > self.cfg.velocity_error_threshold {
            self.velocity = self
                .velocity
                .lerp(&server.velocity, self.cfg.velocity_lerp_factor);
            report.velocity_blended = true;
        }

        report
    }

    /// Weighted Euclidean error with vertical divergence weighted heavier,
    /// since jump/fall dynamics diverge faster than planar movement
    fn weighted_error(&self, server_position: &Vec3) -> f32 {
        let dx = server_position.x - self.position.x;
        let dy = (server_position.y - self.position.y) * self.cfg.vertical_error_weight;
        let dz = server_position.z - self.position.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Re-apply pending inputs on top of a corrected position, trusting a
    /// band-scaled fraction of them to avoid overshooting.
    ///
    /// Returns the fractional number of steps applied (floor 0.5).
    fn replay_pending(&mut self, replay_scale: f32) -> f32 {
        if self.pending_inputs.is_empty() {
            return 0.0;
        }

        let effective_steps = (self.pending_inputs.len() as f32 * replay_scale)
            .max(self.cfg.min_replay_steps);

        let mut applied = 0.0;
        let mut position = self.position;
        for (i, pending) in self.pending_inputs.iter().enumerate() {
            let weight = (effective_steps - i as f32).clamp(0.0, 1.0);
            if weight <= 0.0 {
                break;
            }
            position += pending.movement_delta * weight;
            applied += weight;
        }
        self.position = position;
        applied
    }
}
