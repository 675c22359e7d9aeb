//! Round-trip time estimation and server clock offset
//!
//! Pings are sent on a fixed cadence; each pong yields one RTT sample for a
//! bounded sliding window. One-way latency is assumed symmetric (RTT/2) and
//! drives the adaptive correction bands in the movement predictor.

use std::collections::VecDeque;

use tracing::trace;

/// Smoothed latency estimator for one client connection
#[derive(Debug)]
pub struct LatencyEstimator {
    rtt_history: VecDeque<f32>,
    window: usize,
    average_rtt_ms: f32,
    server_time_offset_ms: f64,
    ping_interval_ms: u64,
    last_ping_sent: Option<u64>,
}

impl LatencyEstimator {
    pub fn new(window: usize, ping_interval_ms: u64) -> Self {
        Self {
            rtt_history: VecDeque::with_capacity(window),
            window,
            average_rtt_ms: 0.0,
            server_time_offset_ms: 0.0,
            ping_interval_ms,
            last_ping_sent: None,
        }
    }

    /// Whether the periodic ping is due
    pub fn ping_due(&self, now: u64) -> bool {
        match self.last_ping_sent {
            None => true,
            Some(sent) => now.saturating_sub(sent) >= self.ping_interval_ms,
        }
    }

    /// Record that a ping left at `now`
    pub fn mark_ping(&mut self, now: u64) {
        self.last_ping_sent = Some(now);
    }

    /// Fold one pong into the sliding window.
    ///
    /// `client_time` is the echoed original send time; `server_time` is the
    /// server clock at pong emission.
    pub fn handle_pong(&mut self, client_time: u64, server_time: u64, now: u64) {
        let rtt = now.saturating_sub(client_time) as f32;

        self.rtt_history.push_back(rtt);
        while self.rtt_history.len() > self.window {
            self.rtt_history.pop_front();
        }
        self.average_rtt_ms =
            self.rtt_history.iter().sum::<f32>() / self.rtt_history.len() as f32;

        let one_way = self.one_way_ms() as f64;
        self.server_time_offset_ms = server_time as f64 - (now as f64 - one_way);

        trace!(
            rtt_ms = rtt,
            avg_rtt_ms = self.average_rtt_ms,
            offset_ms = self.server_time_offset_ms,
            "RTT sample recorded"
        );
    }

    pub fn average_rtt_ms(&self) -> f32 {
        self.average_rtt_ms
    }

    /// One-way latency under the symmetric assumption
    pub fn one_way_ms(&self) -> f32 {
        self.average_rtt_ms / 2.0
    }

    /// Local time translated onto the estimated server clock, for
    /// timestamping outgoing inputs
    pub fn estimated_server_time(&self, now: u64) -> u64 {
        (now as f64 + self.server_time_offset_ms).max(0.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ping_is_always_due() {
        let est = LatencyEstimator::new(10, 1_000);
        assert!(est.ping_due(0));
    }

    #[test]
    fn ping_cadence_respects_interval() {
        let mut est = LatencyEstimator::new(10, 1_000);
        est.mark_ping(5_000);
        assert!(!est.ping_due(5_500));
        assert!(est.ping_due(6_000));
    }

    #[test]
    fn rtt_window_is_bounded() {
        let mut est = LatencyEstimator::new(10, 1_000);
        for i in 0..25u64 {
            let sent = i * 1_000;
            est.handle_pong(sent, 0, sent + 100 + i);
        }
        assert_eq!(est.rtt_history.len(), 10);
        // only the last 10 samples (rtt 115..=124) contribute
        assert!((est.average_rtt_ms() - 119.5).abs() < 1e-3);
    }

    #[test]
    fn one_way_is_half_of_rtt() {
        let mut est = LatencyEstimator::new(10, 1_000);
        est.handle_pong(1_000, 5_000, 1_100);
        assert_eq!(est.average_rtt_ms(), 100.0);
        assert_eq!(est.one_way_ms(), 50.0);
    }

    #[test]
    fn server_offset_maps_local_time_onto_server_clock() {
        let mut est = LatencyEstimator::new(10, 1_000);
        // ping out at 1000, back at 1100; server stamped 5000 at one-way point
        est.handle_pong(1_000, 5_000, 1_100);
        // offset = 5000 - (1100 - 50) = 3950
        assert_eq!(est.estimated_server_time(1_200), 5_150);
    }
}
