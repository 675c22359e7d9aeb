//! End-to-end flows through the public API: a predicted client tick
//! sequence, and a scored session round driven over the session task.

use std::time::Duration;

use uuid::Uuid;

use target_arena::game::session::{SessionConfig, SessionEvent};
use target_arena::game::{GameSession, HitDescriptor, MovementPattern, SessionInput, SessionMsg};
use target_arena::prediction::{Effect, InputEvent, PredictionController};
use target_arena::protocol::{AuthoritativeState, ClientIntent, MoveInput, UiMsg};
use target_arena::util::time::ManualClock;
use target_arena::{PredictionConfig, ThrowConfig, Vec3};

fn forward() -> MoveInput {
    MoveInput {
        forward: true,
        ..Default::default()
    }
}

#[test]
fn predicted_client_tick_sequence() {
    let mut ctrl = PredictionController::new(
        PredictionConfig::default(),
        ThrowConfig::default(),
        Vec3::ZERO,
    );

    // establish the server clock: rtt 100ms, server 4s ahead of the client
    let _ = ctrl.handle(
        InputEvent::Pong {
            client_time: 1_000,
            server_time: 5_000,
        },
        1_100,
    );

    // a few ticks of forward movement apply immediately and transmit intents
    let mut now = 1_200;
    for _ in 0..5 {
        let effects = ctrl.handle(
            InputEvent::Move {
                input: forward(),
                yaw: 0.0,
            },
            now,
        );
        assert!(matches!(
            effects[0],
            Effect::Transmit(ClientIntent::MoveInput { .. })
        ));
        now += 33;
    }
    let predicted = ctrl.position();
    assert!(predicted.z < 0.0);
    assert_eq!(ctrl.pending_input_count(), 5);

    // fire: speculative spawn, ammo readout, upstream intent
    let effects = ctrl.handle(
        InputEvent::Throw {
            direction: Vec3::new(0.0, 0.0, -1.0),
        },
        now,
    );
    assert!(matches!(effects[0], Effect::SpawnProjectile { .. }));
    assert_eq!(
        effects[1],
        Effect::Send(UiMsg::UpdateProjectileCount { count: 9 })
    );
    assert!(matches!(
        effects[2],
        Effect::Transmit(ClientIntent::Throw { .. })
    ));

    // an authoritative state matching the prediction acknowledges the first
    // inputs without disturbing the predicted position
    let _ = ctrl.handle(
        InputEvent::ServerState(AuthoritativeState {
            position: predicted,
            velocity: Vec3::ZERO,
            timestamp: u64::MAX, // acknowledges everything pending
        }),
        now,
    );
    assert_eq!(ctrl.pending_input_count(), 0);
    assert!((ctrl.position().z - predicted.z).abs() < 1e-4);
}

#[tokio::test]
async fn session_round_scores_hits_and_declares_winner() {
    let cfg = SessionConfig {
        min_players: 1,
        countdown_secs: 0.1,
        round_secs: 0.5,
        wave_interval_secs: 0.2,
        targets_per_wave: 2,
        rounds_per_session: 1,
        arena_half_extent: 10.0,
    };
    let (session, handle) = GameSession::new(cfg, 99, ManualClock::new(0));
    let mut events = handle.subscribe();
    let task = tokio::spawn(session.run());

    let player = Uuid::new_v4();
    handle
        .send(SessionInput {
            player,
            msg: SessionMsg::Join {
                display_name: "solo".into(),
            },
            received_at: 0,
        })
        .await
        .unwrap();

    // wait for the round to open, then land a hit
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event stream stalled")
            .unwrap();
        if matches!(event, SessionEvent::RoundStarted { .. }) {
            break;
        }
    }

    handle
        .send(SessionInput {
            player,
            msg: SessionMsg::TargetHit(HitDescriptor {
                spawn_origin: Vec3::ZERO,
                impact_point: Vec3::new(10.0, 0.0, 0.0),
                half_extents: Vec3::new(1.0, 1.0, 1.0),
                pattern: Some(MovementPattern::Static),
                spawned_at: 0,
            }),
            received_at: 0,
        })
        .await
        .unwrap();

    let mut scored = false;
    let mut won = false;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event stream stalled")
            .unwrap();
        match event {
            SessionEvent::HitScored { score, player: p, .. } => {
                assert_eq!(p, player);
                assert_eq!(score, 60);
                scored = true;
            }
            SessionEvent::RoundEnded { winner, .. } => {
                assert_eq!(winner, Some(player));
                won = true;
            }
            SessionEvent::SessionEnded { standings } => {
                assert_eq!(standings.len(), 1);
                assert_eq!(standings[0].total_score, 60);
                break;
            }
            _ => {}
        }
    }
    assert!(scored);
    assert!(won);

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("session task did not stop")
        .unwrap();
}
