//! Scoring engine - hit valuation, combo tracking, round aggregation
//!
//! Converts weapon-hit events into point values from shot distance, target
//! size, movement-pattern difficulty and time decay, and owns all per-player
//! combat statistics. Nothing else in the crate mutates player stats.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::math::Vec3;

/// Target motion behaviors, in ascending order of difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Static,
    Rising,
    VerticalWave,
    SineWave,
    PopUp,
    Parabolic,
}

impl MovementPattern {
    pub const ALL: [MovementPattern; 6] = [
        MovementPattern::Static,
        MovementPattern::Rising,
        MovementPattern::VerticalWave,
        MovementPattern::SineWave,
        MovementPattern::PopUp,
        MovementPattern::Parabolic,
    ];

    /// Fixed difficulty multiplier per pattern. Every named pattern scores
    /// above the unknown-pattern baseline in [`ScoringConfig`].
    pub fn difficulty_multiplier(self) -> f32 {
        match self {
            MovementPattern::Static => 1.2,
            MovementPattern::Rising => 1.4,
            MovementPattern::VerticalWave => 1.5,
            MovementPattern::SineWave => 1.6,
            MovementPattern::PopUp => 1.8,
            MovementPattern::Parabolic => 2.0,
        }
    }

    /// Parse a pattern tag from engine config data
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "static" => Some(MovementPattern::Static),
            "rising" => Some(MovementPattern::Rising),
            "vertical_wave" => Some(MovementPattern::VerticalWave),
            "sine_wave" => Some(MovementPattern::SineWave),
            "pop_up" => Some(MovementPattern::PopUp),
            "parabolic" => Some(MovementPattern::Parabolic),
            _ => None,
        }
    }
}

/// Per-player combat statistics, owned by the [`ScoreBoard`]
#[derive(Debug, Clone, Default)]
pub struct PlayerCombatStats {
    /// Cumulative score; never reset mid-session
    pub total_score: u32,
    /// Resets at round boundaries
    pub round_score: u32,
    /// Rounds won
    pub wins: u32,
    /// Hits landed inside the current combo window
    pub consecutive_hits: u32,
    /// Multi-hit counter driven by the same window
    pub multi_hit_count: u32,
    /// Timestamp of the player's last scoring hit
    pub last_hit_time: u64,
}

/// One weapon-hit event to be valued
#[derive(Debug, Clone, Copy)]
pub struct HitDescriptor {
    /// Where the projectile was thrown from
    pub spawn_origin: Vec3,
    /// Where it landed
    pub impact_point: Vec3,
    /// Target collider half extents, each component >= 0
    pub half_extents: Vec3,
    /// Movement pattern of the target, if recognized
    pub pattern: Option<MovementPattern>,
    /// When the target was spawned (ms, same clock as `now`)
    pub spawned_at: u64,
}

/// Per-player round standing for end-of-round summaries
#[derive(Debug, Clone, serde::Serialize)]
pub struct PlayerStanding {
    pub player: Uuid,
    pub round_score: u32,
    pub total_score: u32,
    pub wins: u32,
}

/// Owns every player's combat stats and the scoring formula
#[derive(Debug, Default)]
pub struct ScoreBoard {
    cfg: ScoringConfig,
    players: HashMap<Uuid, PlayerCombatStats>,
}

impl ScoreBoard {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self {
            cfg,
            players: HashMap::new(),
        }
    }

    /// Register a player; keeps existing stats if already present
    pub fn initialize_player(&mut self, player: Uuid) {
        self.players.entry(player).or_default();
    }

    pub fn remove_player(&mut self, player: Uuid) {
        self.players.remove(&player);
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Value a hit and apply it to the player's totals in one step.
    ///
    /// Returns `None` without touching any state when the hit geometry is
    /// malformed (non-finite coordinates).
    pub fn record_hit(&mut self, player: Uuid, hit: &HitDescriptor, now: u64) -> Option<u32> {
        let score = self.compute_hit_score(player, hit, now)?;
        self.add_score(player, score);
        Some(score)
    }

    /// Value a hit without applying it. Updates the player's combo counters
    /// exactly once; callers that want the score recorded should prefer
    /// [`ScoreBoard::record_hit`].
    pub fn compute_hit_score(
        &mut self,
        player: Uuid,
        hit: &HitDescriptor,
        now: u64,
    ) -> Option<u32> {
        if !hit.spawn_origin.is_finite()
            || !hit.impact_point.is_finite()
            || !hit.half_extents.is_finite()
        {
            return None;
        }

        let distance = hit.spawn_origin.distance(&hit.impact_point);

        // Nominal target size with a per-axis floor, so tiny colliders do
        // not blow up the distance/size ratio
        let min = self.cfg.min_target_size;
        let avg_size = ((2.0 * hit.half_extents.x).max(min)
            + (2.0 * hit.half_extents.y).max(min)
            + (2.0 * hit.half_extents.z).max(min))
            / 3.0;

        let movement_multiplier = hit
            .pattern
            .map(MovementPattern::difficulty_multiplier)
            .unwrap_or(self.cfg.default_pattern_multiplier);

        let elapsed_secs = now.saturating_sub(hit.spawned_at) as f32 / 1000.0;
        let time_factor = time_factor(elapsed_secs, self.cfg.decay_seconds);

        self.update_hit_counters(player, now);
        let stats = self.players.entry(player).or_default();

        let combo_bonus = ((stats.consecutive_hits.saturating_sub(1)) as f32
            * self.cfg.per_hit_combo_rate)
            .min(self.cfg.max_combo_bonus);
        let multi_hit_bonus = ((stats.multi_hit_count.saturating_sub(1)) as f32
            * self.cfg.per_hit_multi_rate)
            .min(self.cfg.max_multi_bonus);

        let base_score =
            (distance / avg_size) * movement_multiplier * time_factor * self.cfg.base_multiplier;
        let final_score = (base_score * (1.0 + combo_bonus + multi_hit_bonus))
            .round()
            .max(self.cfg.min_score as f32) as u32;

        debug!(
            player = %player,
            distance,
            avg_size,
            movement_multiplier,
            time_factor,
            combo_bonus,
            final_score,
            "Hit scored"
        );

        Some(final_score)
    }

    /// Add points to a player's total and round scores, auto-initializing
    /// unknown players
    pub fn add_score(&mut self, player: Uuid, points: u32) {
        let stats = self.players.entry(player).or_default();
        stats.total_score = stats.total_score.saturating_add(points);
        stats.round_score = stats.round_score.saturating_add(points);
    }

    /// Advance the combo state machine for one hit.
    ///
    /// A hit inside the combo window extends the combo; outside it, the hit
    /// starts a fresh combo counting as hit #1. Always stamps
    /// `last_hit_time = now`.
    pub fn update_hit_counters(&mut self, player: Uuid, now: u64) {
        let timeout = self.cfg.combo_timeout_ms;
        let stats = self.players.entry(player).or_default();

        let in_window =
            stats.consecutive_hits > 0 && now.saturating_sub(stats.last_hit_time) <= timeout;
        if in_window {
            stats.consecutive_hits += 1;
            stats.multi_hit_count += 1;
        } else {
            stats.consecutive_hits = 1;
            stats.multi_hit_count = 1;
        }
        stats.last_hit_time = now;
    }

    /// Zero a player's combo counters without touching scores. A no-op for
    /// unknown players.
    pub fn reset_combo(&mut self, player: Uuid) {
        if let Some(stats) = self.players.get_mut(&player) {
            stats.consecutive_hits = 0;
            stats.multi_hit_count = 0;
        }
    }

    /// Pick the round winner and increment their win count.
    ///
    /// Highest `round_score` wins; exact ties break deterministically toward
    /// the smallest player id. Resets nothing - callers start the next round
    /// explicitly via [`ScoreBoard::start_new_round`].
    pub fn handle_round_end(&mut self) -> Option<Uuid> {
        let winner = self
            .players
            .iter()
            .map(|(id, stats)| (*id, stats.round_score))
            .reduce(|best, candidate| {
                if candidate.1 > best.1 || (candidate.1 == best.1 && candidate.0 < best.0) {
                    candidate
                } else {
                    best
                }
            })
            .map(|(id, _)| id)?;

        if let Some(stats) = self.players.get_mut(&winner) {
            stats.wins += 1;
        }
        Some(winner)
    }

    /// Reset round scores and combo counters for every player. Total scores
    /// and win counts carry over.
    pub fn start_new_round(&mut self) {
        for stats in self.players.values_mut() {
            stats.round_score = 0;
            stats.consecutive_hits = 0;
            stats.multi_hit_count = 0;
        }
    }

    /// Standings sorted by round score, ties toward the smaller id
    pub fn round_summary(&self) -> Vec<PlayerStanding> {
        let mut standings: Vec<PlayerStanding> = self
            .players
            .iter()
            .map(|(id, stats)| PlayerStanding {
                player: *id,
                round_score: stats.round_score,
                total_score: stats.total_score,
                wins: stats.wins,
            })
            .collect();
        standings.sort_by(|a, b| {
            b.round_score
                .cmp(&a.round_score)
                .then(a.player.cmp(&b.player))
        });
        standings
    }

    pub fn stats(&self, player: Uuid) -> Option<&PlayerCombatStats> {
        self.players.get(&player)
    }

    pub fn total_score(&self, player: Uuid) -> u32 {
        self.players
            .get(&player)
            .map(|s| s.total_score)
            .unwrap_or(0)
    }

    pub fn round_score(&self, player: Uuid) -> u32 {
        self.players
            .get(&player)
            .map(|s| s.round_score)
            .unwrap_or(0)
    }

    pub fn wins(&self, player: Uuid) -> u32 {
        self.players.get(&player).map(|s| s.wins).unwrap_or(0)
    }

    pub fn consecutive_hits(&self, player: Uuid) -> u32 {
        self.players
            .get(&player)
            .map(|s| s.consecutive_hits)
            .unwrap_or(0)
    }
}

/// Time decay applied to a hit's value: 1.0 for a fresh target, strictly
/// decreasing as the target ages
fn time_factor(elapsed_secs: f32, decay: f32) -> f32 {
    decay / (elapsed_secs.max(0.0) + decay)
}
