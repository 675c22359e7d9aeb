//! Static tuning values for the scoring and prediction cores
//!
//! Everything here is fixed data with `Default` impls; there is no runtime
//! configuration surface for the core.

/// Scoring formula tuning
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Global multiplier applied to every base score
    pub base_multiplier: f32,
    /// Time-decay constant: `time_factor = decay / (elapsed_secs + decay)`
    pub decay_seconds: f32,
    /// Window within which consecutive hits keep building the combo
    pub combo_timeout_ms: u64,
    /// Bonus fraction added per consecutive hit beyond the first
    pub per_hit_combo_rate: f32,
    /// Cap for the consecutive-hit bonus
    pub max_combo_bonus: f32,
    /// Bonus fraction added per multi-hit beyond the first
    pub per_hit_multi_rate: f32,
    /// Cap for the multi-hit bonus
    pub max_multi_bonus: f32,
    /// Floor for any scored hit
    pub min_score: u32,
    /// Minimum nominal target size per axis, so tiny colliders cannot
    /// produce a near-zero denominator
    pub min_target_size: f32,
    /// Multiplier for hits on targets with an unrecognized movement pattern.
    /// Strictly lower than every named pattern.
    pub default_pattern_multiplier: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_multiplier: 10.0,
            decay_seconds: 5.0,
            combo_timeout_ms: 3_000,
            per_hit_combo_rate: 0.10,
            max_combo_bonus: 1.0,
            per_hit_multi_rate: 0.05,
            max_multi_bonus: 0.5,
            min_score: 1,
            min_target_size: 2.0,
            default_pattern_multiplier: 1.0,
        }
    }
}

/// Correction tuning for one one-way latency band
#[derive(Debug, Clone, Copy)]
pub struct LatencyBand {
    /// Upper bound of the band in one-way milliseconds (exclusive)
    pub max_one_way_ms: f32,
    /// Position divergence tolerated before any correction, in world units
    pub position_error_threshold: f32,
    /// Base interpolation factor toward the authoritative position
    pub base_lerp_factor: f32,
    /// Fraction of pending inputs trusted during replay
    pub replay_scale: f32,
}

/// Prediction and reconciliation tuning
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Six bands from excellent (<50ms one-way) to terrible (>400ms).
    /// Worse bands tolerate more divergence and replay fewer inputs but
    /// correct more gently, since aggressive correction under poor network
    /// conditions shows up as visible jitter.
    pub latency_bands: [LatencyBand; 6],
    /// Weight applied to vertical error, which has distinct jump/fall dynamics
    pub vertical_error_weight: f32,
    /// Extra lerp factor per unit of error-velocity magnitude (units/sec)
    pub error_velocity_gain: f32,
    /// Velocity divergence tolerated before blending, in units/sec
    pub velocity_error_threshold: f32,
    /// Fixed blend factor for velocity corrections
    pub velocity_lerp_factor: f32,
    /// Floor on the number of replay steps
    pub min_replay_steps: f32,
    /// Sliding-window size for round-trip time samples
    pub rtt_window: usize,
    /// Cadence of time-sync pings
    pub ping_interval_ms: u64,
    /// Local movement speed in units/sec
    pub move_speed: f32,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            latency_bands: [
                // excellent
                LatencyBand {
                    max_one_way_ms: 50.0,
                    position_error_threshold: 0.40,
                    base_lerp_factor: 0.35,
                    replay_scale: 1.00,
                },
                // good
                LatencyBand {
                    max_one_way_ms: 100.0,
                    position_error_threshold: 0.60,
                    base_lerp_factor: 0.30,
                    replay_scale: 0.85,
                },
                // fair
                LatencyBand {
                    max_one_way_ms: 200.0,
                    position_error_threshold: 1.00,
                    base_lerp_factor: 0.22,
                    replay_scale: 0.70,
                },
                // poor
                LatencyBand {
                    max_one_way_ms: 300.0,
                    position_error_threshold: 1.50,
                    base_lerp_factor: 0.16,
                    replay_scale: 0.55,
                },
                // bad
                LatencyBand {
                    max_one_way_ms: 400.0,
                    position_error_threshold: 2.00,
                    base_lerp_factor: 0.12,
                    replay_scale: 0.45,
                },
                // terrible
                LatencyBand {
                    max_one_way_ms: f32::INFINITY,
                    position_error_threshold: 3.00,
                    base_lerp_factor: 0.08,
                    replay_scale: 0.35,
                },
            ],
            vertical_error_weight: 1.5,
            error_velocity_gain: 0.01,
            velocity_error_threshold: 2.0,
            velocity_lerp_factor: 0.30,
            min_replay_steps: 0.5,
            rtt_window: 10,
            ping_interval_ms: 1_000,
            move_speed: 8.0,
        }
    }
}

impl PredictionConfig {
    /// Look up the band for a measured one-way latency
    pub fn band_for(&self, one_way_ms: f32) -> &LatencyBand {
        self.latency_bands
            .iter()
            .find(|b| one_way_ms < b.max_one_way_ms)
            .unwrap_or(&self.latency_bands[5])
    }
}

/// Projectile throwing tuning
#[derive(Debug, Clone)]
pub struct ThrowConfig {
    /// Minimum gap between shots
    pub cooldown_ms: u64,
    /// Projectiles a player starts with
    pub starting_ammo: u32,
    /// Throw impulse speed in units/sec
    pub impulse_speed: f32,
    /// Speculative projectile forward spawn offset from the player
    pub spawn_offset: f32,
    /// Deadline for server confirmation of a speculative projectile
    pub confirm_timeout_ms: u64,
    /// Divergence beyond which a confirmed projectile snaps to the
    /// authoritative position
    pub snap_threshold: f32,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 500,
            starting_ammo: 10,
            impulse_speed: 30.0,
            spawn_offset: 1.2,
            confirm_timeout_ms: 2_000,
            snap_threshold: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_degrade_monotonically() {
        let cfg = PredictionConfig::default();
        for pair in cfg.latency_bands.windows(2) {
            assert!(pair[0].max_one_way_ms < pair[1].max_one_way_ms);
            assert!(pair[0].position_error_threshold <= pair[1].position_error_threshold);
            assert!(pair[0].base_lerp_factor >= pair[1].base_lerp_factor);
            assert!(pair[0].replay_scale >= pair[1].replay_scale);
        }
    }

    #[test]
    fn band_lookup_covers_extremes() {
        let cfg = PredictionConfig::default();
        assert_eq!(cfg.band_for(0.0).max_one_way_ms, 50.0);
        assert_eq!(cfg.band_for(49.9).max_one_way_ms, 50.0);
        assert_eq!(cfg.band_for(250.0).max_one_way_ms, 300.0);
        assert!(cfg.band_for(10_000.0).max_one_way_ms.is_infinite());
    }
}
