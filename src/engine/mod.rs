//! Host-engine abstraction
//!
//! The engine owns spawning, physics, rendering and the UI bridge. This
//! module models the narrow slice of it the core consumes as a trait, plus
//! an adapter that applies [`Effect`]s produced by the prediction controller.

use tracing::warn;
use uuid::Uuid;

use crate::config::ThrowConfig;
use crate::math::Vec3;
use crate::prediction::{Effect, PredictionController};
use crate::protocol::{ClientIntent, UiMsg};
use crate::GameError;

/// Opaque handle to an engine-owned entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

/// Result of a world raycast query
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    pub point: Vec3,
    pub distance: f32,
}

/// The engine surface consumed by this core. Implemented by the host glue;
/// a recording fake backs the tests.
pub trait EngineWorld {
    /// Spawn a projectile entity and apply its initial impulse
    fn spawn_projectile(&mut self, origin: Vec3, impulse: Vec3) -> EntityId;

    fn despawn(&mut self, entity: EntityId);

    fn entity_position(&self, entity: EntityId) -> Option<Vec3>;

    fn set_entity_position(&mut self, entity: EntityId, position: Vec3);

    /// Raycast against world geometry
    fn raycast(&self, origin: Vec3, direction: Vec3, max_length: f32) -> Option<RaycastHit>;

    /// Fire-and-forget UI payload to one player's client
    fn send_ui(&mut self, player: Uuid, msg: &UiMsg);

    /// Transmit a client intent upstream to the authoritative simulation
    fn transmit(&mut self, player: Uuid, intent: &ClientIntent);
}

/// Applies controller effects to the engine for one player.
///
/// Construction requires a live world reference; a controller without one
/// cannot function, so a missing reference fails immediately rather than
/// being retried.
pub struct EngineAdapter<W> {
    world: W,
    player: Uuid,
    throw_cfg: ThrowConfig,
}

impl<W: EngineWorld> EngineAdapter<W> {
    pub fn new(world: Option<W>, player: Uuid, throw_cfg: ThrowConfig) -> Result<Self, GameError> {
        let world = world.ok_or(GameError::MissingWorld)?;
        Ok(Self {
            world,
            player,
            throw_cfg,
        })
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Apply a batch of controller effects to the engine
    pub fn apply(&mut self, controller: &mut PredictionController, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SpawnProjectile {
                    prediction_id,
                    from,
                    direction,
                    speed,
                } => {
                    // Pull the spawn point back to the first obstruction so
                    // the speculative projectile never starts inside geometry
                    let offset = self.throw_cfg.spawn_offset;
                    let origin = match self.world.raycast(from, direction, offset) {
                        Some(hit) => hit.point,
                        None => from + direction * offset,
                    };

                    let entity = self.world.spawn_projectile(origin, direction * speed);
                    if !controller.attach_projectile(prediction_id, entity) {
                        // Prediction already resolved (timed out between
                        // effect emission and application)
                        warn!(prediction_id = %prediction_id, "Stale speculative spawn");
                        self.world.despawn(entity);
                    }
                }
                Effect::DespawnProjectile { entity } => self.world.despawn(entity),
                Effect::SnapProjectile { entity, position } => {
                    self.world.set_entity_position(entity, position)
                }
                Effect::Send(msg) => self.world.send_ui(self.player, &msg),
                Effect::Transmit(intent) => self.world.transmit(self.player, &intent),
            }
        }
    }

    /// Route a server projectile confirmation through the controller,
    /// querying the speculative entity's current position for the
    /// divergence check
    pub fn confirm_projectile(
        &mut self,
        controller: &mut PredictionController,
        prediction_id: Uuid,
        position: Vec3,
        now: u64,
    ) {
        let local_position = controller
            .projectile_entity(prediction_id)
            .and_then(|entity| self.world.entity_position(entity));
        let effects = controller.handle(
            crate::prediction::InputEvent::ProjectileConfirmed {
                prediction_id,
                position,
                local_position,
            },
            now,
        );
        self.apply(controller, effects);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;

    /// Recording engine fake for tests
    #[derive(Default)]
    pub struct FakeWorld {
        next_id: u64,
        pub positions: HashMap<EntityId, Vec3>,
        pub despawned: Vec<EntityId>,
        pub ui_sent: Vec<(Uuid, UiMsg)>,
        pub transmitted: Vec<(Uuid, ClientIntent)>,
        /// Fixed obstruction distance returned by raycasts, if any
        pub obstruction_at: Option<f32>,
    }

    impl EngineWorld for FakeWorld {
        fn spawn_projectile(&mut self, origin: Vec3, _impulse: Vec3) -> EntityId {
            self.next_id += 1;
            let id = EntityId(self.next_id);
            self.positions.insert(id, origin);
            id
        }

        fn despawn(&mut self, entity: EntityId) {
            self.positions.remove(&entity);
            self.despawned.push(entity);
        }

        fn entity_position(&self, entity: EntityId) -> Option<Vec3> {
            self.positions.get(&entity).copied()
        }

        fn set_entity_position(&mut self, entity: EntityId, position: Vec3) {
            self.positions.insert(entity, position);
        }

        fn raycast(&self, origin: Vec3, direction: Vec3, max_length: f32) -> Option<RaycastHit> {
            let distance = self.obstruction_at.filter(|d| *d <= max_length)?;
            Some(RaycastHit {
                point: origin + direction * distance,
                distance,
            })
        }

        fn send_ui(&mut self, player: Uuid, msg: &UiMsg) {
            self.ui_sent.push((player, msg.clone()));
        }

        fn transmit(&mut self, player: Uuid, intent: &ClientIntent) {
            self.transmitted.push((player, intent.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeWorld;
    use super::*;
    use crate::config::PredictionConfig;
    use crate::prediction::InputEvent;

    fn setup() -> (EngineAdapter<FakeWorld>, PredictionController, Uuid) {
        let player = Uuid::new_v4();
        let adapter =
            EngineAdapter::new(Some(FakeWorld::default()), player, ThrowConfig::default()).unwrap();
        let controller = PredictionController::new(
            PredictionConfig::default(),
            ThrowConfig::default(),
            Vec3::ZERO,
        );
        (adapter, controller, player)
    }

    #[test]
    fn missing_world_fails_at_construction() {
        let result =
            EngineAdapter::<FakeWorld>::new(None, Uuid::new_v4(), ThrowConfig::default());
        assert!(matches!(result, Err(GameError::MissingWorld)));
    }

    #[test]
    fn throw_effects_spawn_attach_and_notify() {
        let (mut adapter, mut controller, player) = setup();
        let effects = controller.handle(
            InputEvent::Throw {
                direction: Vec3::new(0.0, 0.0, -1.0),
            },
            1_000,
        );
        adapter.apply(&mut controller, effects);

        assert_eq!(adapter.world().positions.len(), 1);
        // spawn offset applied along the throw direction
        let origin = *adapter.world().positions.values().next().unwrap();
        assert!((origin.z + 1.2).abs() < 1e-5);

        assert_eq!(adapter.world().ui_sent.len(), 1);
        assert_eq!(adapter.world().ui_sent[0].0, player);
        assert_eq!(adapter.world().transmitted.len(), 1);
    }

    #[test]
    fn spawn_clearance_uses_raycast_obstruction() {
        let (mut adapter, mut controller, _) = setup();
        adapter.world.obstruction_at = Some(0.5);

        let effects = controller.handle(
            InputEvent::Throw {
                direction: Vec3::new(0.0, 0.0, -1.0),
            },
            1_000,
        );
        adapter.apply(&mut controller, effects);

        let origin = *adapter.world().positions.values().next().unwrap();
        assert!((origin.z + 0.5).abs() < 1e-5);
    }

    #[test]
    fn confirmation_snaps_diverged_projectile_in_world() {
        let (mut adapter, mut controller, _) = setup();
        let effects = controller.handle(
            InputEvent::Throw {
                direction: Vec3::new(0.0, 0.0, -1.0),
            },
            1_000,
        );
        let prediction_id = match effects[0] {
            Effect::SpawnProjectile { prediction_id, .. } => prediction_id,
            _ => unreachable!(),
        };
        adapter.apply(&mut controller, effects);

        let authoritative = Vec3::new(4.0, 2.0, -6.0);
        adapter.confirm_projectile(&mut controller, prediction_id, authoritative, 1_200);

        let entity = *adapter.world().positions.keys().next().unwrap();
        assert_eq!(adapter.world().entity_position(entity), Some(authoritative));
    }

    #[test]
    fn timed_out_projectile_is_despawned_in_world() {
        let (mut adapter, mut controller, _) = setup();
        let effects = controller.handle(
            InputEvent::Throw {
                direction: Vec3::new(1.0, 0.0, 0.0),
            },
            1_000,
        );
        adapter.apply(&mut controller, effects);

        let effects = controller.handle(InputEvent::SweepTimer, 10_000);
        adapter.apply(&mut controller, effects);

        assert_eq!(adapter.world().despawned.len(), 1);
        assert!(adapter.world().positions.is_empty());
    }
}
