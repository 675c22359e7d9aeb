//! Speculative projectile prediction
//!
//! Firing spawns a local projectile immediately to mask latency. Each
//! speculative projectile carries a prediction id and a confirmation
//! deadline: the server either confirms it (snapping it onto the
//! authoritative position when it drifted too far) or the deadline passes
//! and the misprediction is quietly despawned.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::config::ThrowConfig;
use crate::engine::EntityId;
use crate::math::Vec3;

/// Result of a fire attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrowOutcome {
    /// Throw accepted; spawn a speculative projectile with this id
    Fire {
        prediction_id: Uuid,
        direction: Vec3,
    },
    /// Magazine empty; drives UI feedback, never an error
    NoAmmo,
    /// Inside the cooldown window from the previous shot
    OnCooldown { remaining_seconds: f32 },
    /// Degenerate direction vector; throw aborted
    Rejected,
}

/// Result of a server confirmation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmOutcome {
    /// Speculative entity drifted beyond the snap threshold
    Snap(EntityId),
    /// Speculative entity is close enough to the authoritative position
    Aligned,
    /// No pending record: already timed out or never known. A no-op.
    Unknown,
}

/// Bookkeeping for one speculative projectile
#[derive(Debug, Clone)]
struct ProjectilePrediction {
    entity: Option<EntityId>,
    deadline: u64,
}

/// Per-player firing state: ammo, cooldown, and speculative records
#[derive(Debug)]
pub struct ThrowController {
    cfg: ThrowConfig,
    ammo: u32,
    last_shot: Option<u64>,
    records: HashMap<Uuid, ProjectilePrediction>,
}

impl ThrowController {
    pub fn new(cfg: ThrowConfig) -> Self {
        let ammo = cfg.starting_ammo;
        Self {
            cfg,
            ammo,
            last_shot: None,
            records: HashMap::new(),
        }
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn set_ammo(&mut self, ammo: u32) {
        self.ammo = ammo;
    }

    pub fn pending_count(&self) -> usize {
        self.records.len()
    }

    /// Gate a fire attempt through cooldown, ammo, and direction validity -
    /// in that order. Cooldown rejection applies regardless of ammo or any
    /// other state.
    pub fn try_throw(&mut self, direction: Vec3, now: u64) -> ThrowOutcome {
        if let Some(last) = self.last_shot {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.cfg.cooldown_ms {
                return ThrowOutcome::OnCooldown {
                    remaining_seconds: (self.cfg.cooldown_ms - elapsed) as f32 / 1000.0,
                };
            }
        }

        if self.ammo == 0 {
            return ThrowOutcome::NoAmmo;
        }

        let unit = match direction.normalized() {
            Some(unit) => unit,
            None => {
                debug!("Throw aborted: degenerate direction vector");
                return ThrowOutcome::Rejected;
            }
        };

        self.ammo -= 1;
        self.last_shot = Some(now);

        let prediction_id = Uuid::new_v4();
        self.records.insert(
            prediction_id,
            ProjectilePrediction {
                entity: None,
                deadline: now + self.cfg.confirm_timeout_ms,
            },
        );

        ThrowOutcome::Fire {
            prediction_id,
            direction: unit,
        }
    }

    /// Attach the engine entity spawned for a prediction id. Returns false
    /// when the record is no longer pending (the caller should despawn the
    /// entity itself).
    pub fn attach_entity(&mut self, prediction_id: Uuid, entity: EntityId) -> bool {
        match self.records.get_mut(&prediction_id) {
            Some(record) => {
                record.entity = Some(entity);
                true
            }
            None => false,
        }
    }

    /// Handle server confirmation of a speculative projectile.
    ///
    /// Removes the record so the timeout sweep can never despawn a confirmed
    /// projectile; a confirmation arriving after the timeout finds no record
    /// and does nothing.
    pub fn confirm(
        &mut self,
        prediction_id: Uuid,
        authoritative_position: Vec3,
        local_position: Option<Vec3>,
    ) -> ConfirmOutcome {
        let record = match self.records.remove(&prediction_id) {
            Some(record) => record,
            None => return ConfirmOutcome::Unknown,
        };

        match (record.entity, local_position) {
            (Some(entity), Some(local)) => {
                if local.distance(&authoritative_position) > self.cfg.snap_threshold {
                    ConfirmOutcome::Snap(entity)
                } else {
                    ConfirmOutcome::Aligned
                }
            }
            _ => ConfirmOutcome::Aligned,
        }
    }

    /// Remove every speculative record whose confirmation deadline has
    /// passed, returning the entities to despawn. Each record is removed
    /// exactly once, so repeated sweeps cannot double-despawn.
    pub fn sweep_timeouts(&mut self, now: u64) -> Vec<EntityId> {
        let expired: Vec<Uuid> = self
            .records
            .iter()
            .filter(|(_, r)| r.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut despawn = Vec::new();
        for id in expired {
            if let Some(record) = self.records.remove(&id) {
                debug!(prediction_id = %id, "Speculative projectile timed out");
                if let Some(entity) = record.entity {
                    despawn.push(entity);
                }
            }
        }
        despawn
    }

    /// Engine entity attached to a pending prediction, if any
    pub fn entity_for(&self, prediction_id: Uuid) -> Option<EntityId> {
        self.records.get(&prediction_id).and_then(|r| r.entity)
    }

    /// Deadline of the earliest pending confirmation, if any
    pub fn next_deadline(&self) -> Option<u64> {
        self.records.values().map(|r| r.deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ThrowController {
        ThrowController::new(ThrowConfig::default())
    }

    fn fire(ctrl: &mut ThrowController, now: u64) -> Uuid {
        match ctrl.try_throw(Vec3::new(0.0, 0.0, -1.0), now) {
            ThrowOutcome::Fire { prediction_id, .. } => prediction_id,
            other => panic!("expected Fire, got {other:?}"),
        }
    }

    #[test]
    fn fire_decrements_ammo_and_normalizes_direction() {
        let mut ctrl = controller();
        match ctrl.try_throw(Vec3::new(0.0, 0.0, -10.0), 1_000) {
            ThrowOutcome::Fire { direction, .. } => {
                assert!((direction.length() - 1.0).abs() < 1e-6);
            }
            other => panic!("expected Fire, got {other:?}"),
        }
        assert_eq!(ctrl.ammo(), 9);
        assert_eq!(ctrl.pending_count(), 1);
    }

    #[test]
    fn cooldown_rejects_with_remaining_readout() {
        let mut ctrl = controller();
        fire(&mut ctrl, 1_000);
        match ctrl.try_throw(Vec3::new(1.0, 0.0, 0.0), 1_200) {
            ThrowOutcome::OnCooldown { remaining_seconds } => {
                assert!((remaining_seconds - 0.3).abs() < 1e-6);
            }
            other => panic!("expected OnCooldown, got {other:?}"),
        }
        assert_eq!(ctrl.ammo(), 9); // second attempt consumed nothing
    }

    #[test]
    fn cooldown_applies_even_with_empty_magazine() {
        let mut ctrl = controller();
        fire(&mut ctrl, 1_000);
        ctrl.set_ammo(0);
        let outcome = ctrl.try_throw(Vec3::new(1.0, 0.0, 0.0), 1_100);
        assert!(matches!(outcome, ThrowOutcome::OnCooldown { .. }));
    }

    #[test]
    fn empty_magazine_signals_no_ammo_without_underflow() {
        let mut ctrl = controller();
        ctrl.set_ammo(0);
        for _ in 0..3 {
            assert_eq!(
                ctrl.try_throw(Vec3::new(1.0, 0.0, 0.0), 10_000),
                ThrowOutcome::NoAmmo
            );
        }
        assert_eq!(ctrl.ammo(), 0);
    }

    #[test]
    fn degenerate_direction_aborts_without_consuming_ammo() {
        let mut ctrl = controller();
        assert_eq!(ctrl.try_throw(Vec3::ZERO, 1_000), ThrowOutcome::Rejected);
        assert_eq!(ctrl.ammo(), 10);
        assert_eq!(ctrl.pending_count(), 0);
    }

    #[test]
    fn unconfirmed_projectile_despawns_exactly_once() {
        let mut ctrl = controller();
        let id = fire(&mut ctrl, 1_000);
        ctrl.attach_entity(id, EntityId(7));

        assert!(ctrl.sweep_timeouts(2_999).is_empty());
        assert_eq!(ctrl.sweep_timeouts(3_000), vec![EntityId(7)]);
        assert!(ctrl.sweep_timeouts(3_000).is_empty());
        assert!(ctrl.sweep_timeouts(10_000).is_empty());
    }

    #[test]
    fn late_confirmation_after_timeout_is_a_no_op() {
        let mut ctrl = controller();
        let id = fire(&mut ctrl, 1_000);
        ctrl.attach_entity(id, EntityId(7));
        let _ = ctrl.sweep_timeouts(5_000);

        assert_eq!(
            ctrl.confirm(id, Vec3::ZERO, Some(Vec3::ZERO)),
            ConfirmOutcome::Unknown
        );
        assert_eq!(ctrl.pending_count(), 0);
    }

    #[test]
    fn confirmed_projectile_is_excluded_from_the_sweep() {
        let mut ctrl = controller();
        let id = fire(&mut ctrl, 1_000);
        ctrl.attach_entity(id, EntityId(7));

        let outcome = ctrl.confirm(id, Vec3::ZERO, Some(Vec3::new(0.1, 0.0, 0.0)));
        assert_eq!(outcome, ConfirmOutcome::Aligned);
        assert!(ctrl.sweep_timeouts(10_000).is_empty());
    }

    #[test]
    fn diverged_confirmation_snaps_to_authoritative_position() {
        let mut ctrl = controller();
        let id = fire(&mut ctrl, 1_000);
        ctrl.attach_entity(id, EntityId(3));

        let outcome = ctrl.confirm(id, Vec3::ZERO, Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(outcome, ConfirmOutcome::Snap(EntityId(3)));
    }

    #[test]
    fn attach_fails_for_unknown_or_expired_records() {
        let mut ctrl = controller();
        assert!(!ctrl.attach_entity(Uuid::new_v4(), EntityId(1)));

        let id = fire(&mut ctrl, 1_000);
        let _ = ctrl.sweep_timeouts(5_000);
        assert!(!ctrl.attach_entity(id, EntityId(2)));
    }

    #[test]
    fn next_deadline_tracks_earliest_pending_record() {
        let mut ctrl = controller();
        assert_eq!(ctrl.next_deadline(), None);
        fire(&mut ctrl, 1_000);
        assert_eq!(ctrl.next_deadline(), Some(3_000));
    }
}
