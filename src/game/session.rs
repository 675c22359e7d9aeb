//! Session state and round/wave orchestration
//!
//! Thin orchestration over the scoring engine: drives the round lifecycle
//! and wave spawning schedule, routes hit events into the score board, and
//! broadcasts session events for the host glue to act on. Target motion,
//! collision and rendering stay engine-owned.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::math::Vec3;
use crate::GameError;
use crate::util::time::{tick_delta, Clock, SIMULATION_TPS};

use super::scoring::{MovementPattern, PlayerStanding, ScoreBoard};
use super::{SessionInput, SessionMsg};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Waiting for players
    Waiting,
    /// Countdown before the round starts
    Countdown,
    /// Round in progress
    InProgress,
    /// Session over
    Ended,
}

/// Round/wave schedule tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub min_players: usize,
    pub countdown_secs: f32,
    pub round_secs: f32,
    pub wave_interval_secs: f32,
    pub targets_per_wave: usize,
    pub rounds_per_session: u32,
    /// Half extent of the square target spawn area
    pub arena_half_extent: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            countdown_secs: 5.0,
            round_secs: 60.0,
            wave_interval_secs: 8.0,
            targets_per_wave: 4,
            rounds_per_session: 3,
            arena_half_extent: 20.0,
        }
    }
}

/// One target the host glue should spawn
#[derive(Debug, Clone, serde::Serialize)]
pub struct TargetSpec {
    pub id: Uuid,
    pub position: Vec3,
    pub half_extents: Vec3,
    pub pattern: MovementPattern,
    pub lifetime_secs: f32,
}

/// Events broadcast to connected clients and the host glue
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PlayerJoined { player: Uuid, display_name: String },
    PlayerLeft { player: Uuid },
    RoundCountdown { seconds_remaining: u32 },
    RoundStarted { round: u32 },
    WaveSpawned { targets: Vec<TargetSpec> },
    HitScored {
        player: Uuid,
        score: u32,
        round_score: u32,
        total_score: u32,
        consecutive_hits: u32,
    },
    RoundEnded {
        round: u32,
        winner: Option<Uuid>,
        standings: Vec<PlayerStanding>,
    },
    SessionEnded { standings: Vec<PlayerStanding> },
}

/// Handle to a running session, exposing round-state queries
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<SessionInput>,
    event_tx: broadcast::Sender<SessionEvent>,
    scores: Arc<RwLock<ScoreBoard>>,
    phase: Arc<RwLock<RoundPhase>>,
    player_count: Arc<AtomicUsize>,
}

impl SessionHandle {
    /// Forward a player input to the session task
    pub async fn send(&self, input: SessionInput) -> Result<(), GameError> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| GameError::SessionClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn phase(&self) -> RoundPhase {
        *self.phase.read()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn round_score(&self, player: Uuid) -> u32 {
        self.scores.read().round_score(player)
    }

    pub fn total_score(&self, player: Uuid) -> u32 {
        self.scores.read().total_score(player)
    }

    pub fn wins(&self, player: Uuid) -> u32 {
        self.scores.read().wins(player)
    }
}

/// The session state machine, owned by the session task
pub struct GameSession<C: Clock> {
    id: Uuid,
    cfg: SessionConfig,
    clock: C,
    phase: RoundPhase,
    round: u32,
    countdown_remaining: f32,
    round_remaining: f32,
    wave_timer: f32,
    rng: ChaCha8Rng,
    scores: Arc<RwLock<ScoreBoard>>,
    input_rx: mpsc::Receiver<SessionInput>,
    event_tx: broadcast::Sender<SessionEvent>,
    shared_phase: Arc<RwLock<RoundPhase>>,
    player_count: Arc<AtomicUsize>,
}

impl<C: Clock> GameSession<C> {
    pub fn new(cfg: SessionConfig, seed: u64, clock: C) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (event_tx, _) = broadcast::channel(64);
        let scores = Arc::new(RwLock::new(ScoreBoard::new(ScoringConfig::default())));
        let shared_phase = Arc::new(RwLock::new(RoundPhase::Waiting));
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            input_tx,
            event_tx: event_tx.clone(),
            scores: scores.clone(),
            phase: shared_phase.clone(),
            player_count: player_count.clone(),
        };

        let countdown = cfg.countdown_secs;
        let session = Self {
            id: Uuid::new_v4(),
            cfg,
            clock,
            phase: RoundPhase::Waiting,
            round: 1,
            countdown_remaining: countdown,
            round_remaining: 0.0,
            wave_timer: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            scores,
            input_rx,
            event_tx,
            shared_phase,
            player_count,
        };

        (session, handle)
    }

    /// Run the session loop until the session ends or every player leaves
    pub async fn run(mut self) {
        info!(session_id = %self.id, "Session started");

        let tick_duration = Duration::from_micros(1_000_000 / SIMULATION_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            self.process_inputs();
            self.run_tick();

            if self.phase == RoundPhase::Ended {
                info!(session_id = %self.id, "Session ended");
                break;
            }

            if self.player_count.load(Ordering::Relaxed) == 0 && self.phase != RoundPhase::Waiting
            {
                info!(session_id = %self.id, "All players left, ending session");
                break;
            }
        }

        let standings = self.scores.read().round_summary();
        let _ = self.event_tx.send(SessionEvent::SessionEnded { standings });
    }

    /// Drain the input mailbox
    pub fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            self.process_input(input);
        }
    }

    pub fn process_input(&mut self, input: SessionInput) {
        match input.msg {
            SessionMsg::Join { display_name } => self.handle_join(input.player, display_name),
            SessionMsg::Leave => self.handle_leave(input.player),
            SessionMsg::TargetHit(hit) => {
                if self.phase != RoundPhase::InProgress {
                    return;
                }
                let now = self.clock.now_millis();
                let mut scores = self.scores.write();
                match scores.record_hit(input.player, &hit, now) {
                    Some(score) => {
                        let _ = self.event_tx.send(SessionEvent::HitScored {
                            player: input.player,
                            score,
                            round_score: scores.round_score(input.player),
                            total_score: scores.total_score(input.player),
                            consecutive_hits: scores.consecutive_hits(input.player),
                        });
                    }
                    None => {
                        warn!(player = %input.player, "Discarded hit with malformed geometry");
                    }
                }
            }
        }
    }

    fn handle_join(&mut self, player: Uuid, display_name: String) {
        {
            let mut scores = self.scores.write();
            scores.initialize_player(player);
            self.player_count.store(scores.player_count(), Ordering::Relaxed);
        }

        info!(session_id = %self.id, player = %player, "Player joined");
        let _ = self.event_tx.send(SessionEvent::PlayerJoined {
            player,
            display_name,
        });

        if self.phase == RoundPhase::Waiting
            && self.player_count.load(Ordering::Relaxed) >= self.cfg.min_players
        {
            self.begin_countdown();
        }
    }

    fn handle_leave(&mut self, player: Uuid) {
        {
            let mut scores = self.scores.write();
            scores.remove_player(player);
            self.player_count.store(scores.player_count(), Ordering::Relaxed);
        }
        info!(session_id = %self.id, player = %player, "Player left");
        let _ = self.event_tx.send(SessionEvent::PlayerLeft { player });
    }

    /// Advance the session by one simulation tick
    pub fn run_tick(&mut self) {
        let dt = tick_delta();

        match self.phase {
            RoundPhase::Waiting | RoundPhase::Ended => {}
            RoundPhase::Countdown => {
                self.countdown_remaining -= dt;
                if self.countdown_remaining <= 0.0 {
                    self.begin_round();
                }
            }
            RoundPhase::InProgress => {
                self.wave_timer -= dt;
                if self.wave_timer <= 0.0 {
                    self.spawn_wave();
                    self.wave_timer = self.cfg.wave_interval_secs;
                }

                self.round_remaining -= dt;
                if self.round_remaining <= 0.0 {
                    self.end_round();
                }
            }
        }
    }

    fn begin_countdown(&mut self) {
        self.set_phase(RoundPhase::Countdown);
        self.countdown_remaining = self.cfg.countdown_secs;
        let _ = self.event_tx.send(SessionEvent::RoundCountdown {
            seconds_remaining: self.cfg.countdown_secs.ceil() as u32,
        });
    }

    fn begin_round(&mut self) {
        self.set_phase(RoundPhase::InProgress);
        self.round_remaining = self.cfg.round_secs;
        self.wave_timer = 0.0; // first wave spawns on the next tick
        info!(session_id = %self.id, round = self.round, "Round started");
        let _ = self
            .event_tx
            .send(SessionEvent::RoundStarted { round: self.round });
    }

    fn end_round(&mut self) {
        let (winner, standings) = {
            let mut scores = self.scores.write();
            let winner = scores.handle_round_end();
            (winner, scores.round_summary())
        };

        info!(
            session_id = %self.id,
            round = self.round,
            winner = winner.map(|w| w.to_string()).unwrap_or_default(),
            "Round ended"
        );
        let _ = self.event_tx.send(SessionEvent::RoundEnded {
            round: self.round,
            winner,
            standings,
        });

        if self.round >= self.cfg.rounds_per_session {
            self.set_phase(RoundPhase::Ended);
        } else {
            self.round += 1;
            self.scores.write().start_new_round();
            self.begin_countdown();
        }
    }

    fn spawn_wave(&mut self) {
        let h = self.cfg.arena_half_extent;
        let targets: Vec<TargetSpec> = (0..self.cfg.targets_per_wave)
            .map(|_| {
                let pattern =
                    MovementPattern::ALL[self.rng.gen_range(0..MovementPattern::ALL.len())];
                let size = self.rng.gen_range(0.5..1.5);
                TargetSpec {
                    id: Uuid::new_v4(),
                    position: Vec3::new(
                        self.rng.gen_range(-h..h),
                        self.rng.gen_range(1.0..6.0),
                        self.rng.gen_range(-h..h),
                    ),
                    half_extents: Vec3::new(size, size, size),
                    pattern,
                    lifetime_secs: self.rng.gen_range(5.0..12.0),
                }
            })
            .collect();

        let _ = self.event_tx.send(SessionEvent::WaveSpawned { targets });
    }

    fn set_phase(&mut self, phase: RoundPhase) {
        self.phase = phase;
        *self.shared_phase.write() = phase;
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }
}
