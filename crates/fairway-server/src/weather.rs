//! Ambient weather director.
//!
//! Flips a "raining" flag after a randomized dwell and broadcasts the new
//! value reliably. Receivers overwrite their local flag, so a late packet
//! costs at most one tick of visual lag.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use fairway_protocol::Packet;

use crate::config::WeatherConfig;
use crate::transport::Transport;

pub struct WeatherDirector {
    raining: bool,
    elapsed: Duration,
    dwell: Duration,
    dwell_min: Duration,
    dwell_max: Duration,
    rng: StdRng,
}

impl WeatherDirector {
    pub fn new(config: &WeatherConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic director for tests and replays
    pub fn with_rng(config: &WeatherConfig, rng: StdRng) -> Self {
        let mut director = Self {
            raining: false,
            elapsed: Duration::ZERO,
            dwell: Duration::ZERO,
            dwell_min: config.dwell_min(),
            dwell_max: config.dwell_max().max(config.dwell_min()),
            rng,
        };
        director.dwell = director.draw_dwell();
        director
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    /// Time until the next flip is due
    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Advance by one tick. Returns true if the weather changed.
    pub fn update<T: Transport>(&mut self, delta: Duration, transport: &mut T) -> bool {
        self.elapsed += delta;
        if self.elapsed <= self.dwell {
            return false;
        }

        self.raining = !self.raining;
        self.elapsed = Duration::ZERO;
        self.dwell = self.draw_dwell();

        debug!(
            "Weather now {}, next change in {:.0}s",
            if self.raining { "raining" } else { "clear" },
            self.dwell.as_secs_f32()
        );
        transport.broadcast_packet(&Packet::WeatherChange(self.raining));
        true
    }

    fn draw_dwell(&mut self) -> Duration {
        let min = self.dwell_min.as_millis() as u64;
        let max = self.dwell_max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..=max))
    }
}
