//! Per-entity prediction controller
//!
//! Composes movement prediction, latency estimation and projectile
//! speculation behind a single `handle(event) -> effects` surface, keeping
//! the core independent of the host engine's callback registration. Effects
//! are applied to the engine by [`crate::engine::EngineAdapter`].

use tracing::debug;
use uuid::Uuid;

use crate::config::{PredictionConfig, ThrowConfig};
use crate::engine::EntityId;
use crate::math::Vec3;
use crate::protocol::{AuthoritativeState, ClientIntent, MoveInput, TimeSyncData, UiMsg};

use super::latency::LatencyEstimator;
use super::movement::MovementPredictor;
use super::projectile::{ConfirmOutcome, ThrowController, ThrowOutcome};

/// Events the host feeds into the controller.
///
/// Two asynchronous sources drive these: the local per-tick input callback
/// (Move, Throw) and server-pushed messages (ServerState, Pong, Confirmed).
/// The two timer events come from the host's periodic scheduler.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// One tick of directional input plus the current camera yaw
    Move { input: MoveInput, yaw: f32 },
    /// Fire attempt toward a world-space direction
    Throw { direction: Vec3 },
    /// Authoritative state update for the controlled entity
    ServerState(AuthoritativeState),
    /// Reply to a time-sync ping
    Pong { client_time: u64, server_time: u64 },
    /// Server confirmation of a speculative projectile.
    /// `local_position` is the speculative entity's current position, if the
    /// host could query it.
    ProjectileConfirmed {
        prediction_id: Uuid,
        position: Vec3,
        local_position: Option<Vec3>,
    },
    /// Periodic latency-ping timer
    PingTimer,
    /// Periodic speculative-projectile timeout sweep
    SweepTimer,
}

/// Engine-facing effects produced by [`PredictionController::handle`]
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Spawn a speculative projectile thrown from `from` toward `direction`
    SpawnProjectile {
        prediction_id: Uuid,
        from: Vec3,
        direction: Vec3,
        speed: f32,
    },
    /// Remove a timed-out speculative projectile
    DespawnProjectile { entity: EntityId },
    /// Snap a confirmed projectile onto its authoritative position
    SnapProjectile { entity: EntityId, position: Vec3 },
    /// UI payload for this player's client
    Send(UiMsg),
    /// Intent to transmit upstream to the authoritative simulation
    Transmit(ClientIntent),
}

/// Client-side prediction state for one controlled entity
pub struct PredictionController {
    movement: MovementPredictor,
    latency: LatencyEstimator,
    throws: ThrowController,
    throw_cfg: ThrowConfig,
}

impl PredictionController {
    pub fn new(
        prediction_cfg: PredictionConfig,
        throw_cfg: ThrowConfig,
        spawn_position: Vec3,
    ) -> Self {
        let latency = LatencyEstimator::new(prediction_cfg.rtt_window, prediction_cfg.ping_interval_ms);
        Self {
            movement: MovementPredictor::new(prediction_cfg, spawn_position),
            latency,
            throws: ThrowController::new(throw_cfg.clone()),
            throw_cfg,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.movement.position()
    }

    pub fn velocity(&self) -> Vec3 {
        self.movement.velocity()
    }

    pub fn ammo(&self) -> u32 {
        self.throws.ammo()
    }

    pub fn set_ammo(&mut self, ammo: u32) {
        self.throws.set_ammo(ammo);
    }

    pub fn pending_input_count(&self) -> usize {
        self.movement.pending_len()
    }

    /// Bind the engine entity the host spawned for a speculative projectile.
    /// Returns false when the prediction already resolved; the host should
    /// despawn the entity in that case.
    pub fn attach_projectile(&mut self, prediction_id: Uuid, entity: EntityId) -> bool {
        self.throws.attach_entity(prediction_id, entity)
    }

    /// Engine entity bound to a still-pending speculative projectile
    pub fn projectile_entity(&self, prediction_id: Uuid) -> Option<EntityId> {
        self.throws.entity_for(prediction_id)
    }

    /// Process one event and return the effects to apply to the engine
    pub fn handle(&mut self, event: InputEvent, now: u64) -> Vec<Effect> {
        match event {
            InputEvent::Move { input, yaw } => self.on_move(input, yaw, now),
            InputEvent::Throw { direction } => self.on_throw(direction, now),
            InputEvent::ServerState(state) => self.on_server_state(&state),
            InputEvent::Pong {
                client_time,
                server_time,
            } => {
                self.latency.handle_pong(client_time, server_time, now);
                Vec::new()
            }
            InputEvent::ProjectileConfirmed {
                prediction_id,
                position,
                local_position,
            } => self.on_confirmed(prediction_id, position, local_position),
            InputEvent::PingTimer => self.on_ping_timer(now),
            InputEvent::SweepTimer => self
                .throws
                .sweep_timeouts(now)
                .into_iter()
                .map(|entity| Effect::DespawnProjectile { entity })
                .collect(),
        }
    }

    fn on_move(&mut self, input: MoveInput, yaw: f32, now: u64) -> Vec<Effect> {
        // Outgoing inputs are stamped on the estimated server clock so the
        // reconciliation prune can compare them against server timestamps
        let timestamp = self.latency.estimated_server_time(now);
        let delta = self.movement.apply_input(input, yaw, timestamp);
        if delta == Vec3::ZERO {
            return Vec::new();
        }

        vec![Effect::Transmit(ClientIntent::MoveInput {
            input,
            yaw,
            timestamp,
        })]
    }

    fn on_throw(&mut self, direction: Vec3, now: u64) -> Vec<Effect> {
        match self.throws.try_throw(direction, now) {
            ThrowOutcome::Fire {
                prediction_id,
                direction,
            } => vec![
                Effect::SpawnProjectile {
                    prediction_id,
                    from: self.movement.position(),
                    direction,
                    speed: self.throw_cfg.impulse_speed,
                },
                Effect::Send(UiMsg::UpdateProjectileCount {
                    count: self.throws.ammo(),
                }),
                Effect::Transmit(ClientIntent::Throw {
                    prediction_id,
                    direction,
                    timestamp: self.latency.estimated_server_time(now),
                }),
            ],
            ThrowOutcome::NoAmmo => vec![Effect::Send(UiMsg::AttemptShootNoAmmo)],
            ThrowOutcome::OnCooldown { remaining_seconds } => {
                vec![Effect::Send(UiMsg::OnCooldown { remaining_seconds })]
            }
            // Degenerate direction: silently dropped, already logged
            ThrowOutcome::Rejected => Vec::new(),
        }
    }

    fn on_server_state(&mut self, state: &AuthoritativeState) -> Vec<Effect> {
        let report = self.movement.reconcile(state, self.latency.one_way_ms());
        if !report.corrected {
            return Vec::new();
        }

        debug!(
            position_error = report.position_error,
            lerp_factor = report.lerp_factor,
            "Server correction applied"
        );
        vec![Effect::Send(UiMsg::DebugLog {
            message: format!(
                "reconciled: error {:.2} lerp {:.2} replayed {:.1}",
                report.position_error, report.lerp_factor, report.replayed_steps
            ),
        })]
    }

    fn on_confirmed(
        &mut self,
        prediction_id: Uuid,
        position: Vec3,
        local_position: Option<Vec3>,
    ) -> Vec<Effect> {
        match self.throws.confirm(prediction_id, position, local_position) {
            ConfirmOutcome::Snap(entity) => vec![Effect::SnapProjectile { entity, position }],
            ConfirmOutcome::Aligned | ConfirmOutcome::Unknown => Vec::new(),
        }
    }

    fn on_ping_timer(&mut self, now: u64) -> Vec<Effect> {
        if !self.latency.ping_due(now) {
            return Vec::new();
        }
        self.latency.mark_ping(now);
        vec![Effect::Send(UiMsg::TimeSync {
            data: TimeSyncData { client_time: now },
        })]
    }
}
