//! Fixed-rate game clock
//!
//! All movement is gated on ticks, never on raw frame rate. `update` is fed
//! the host's monotonic time each loop iteration; a game tick fires once the
//! configured interval has elapsed, and every `divisor`-th game tick is also
//! a secondary tick (the cadence of background actors and talk cycling).

use std::time::Duration;

use opentot_common::TimingConfig;

#[derive(Debug, Clone)]
pub struct Chrono {
    tick: Duration,
    divisor: u32,
    last: Duration,
    count: u64,
    game_tick: bool,
    secondary_tick: bool,
}

impl Chrono {
    pub fn new(tick: Duration, divisor: u32) -> Self {
        Self {
            tick,
            divisor: divisor.max(1),
            last: Duration::ZERO,
            count: 0,
            game_tick: false,
            secondary_tick: false,
        }
    }

    pub fn from_millis(tick_ms: u64, divisor: u32) -> Self {
        Self::new(Duration::from_millis(tick_ms.max(1)), divisor)
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Feed the current time. At most one tick fires per call; a host that
    /// falls behind slows the game down instead of skipping steps.
    pub fn update(&mut self, now: Duration) {
        if now.saturating_sub(self.last) >= self.tick {
            self.last = now;
            self.fire();
        }
    }

    /// Fire a tick regardless of elapsed time
    pub fn force_tick(&mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        self.count += 1;
        self.game_tick = true;
        self.secondary_tick = self.count % self.divisor as u64 == 0;
    }

    /// Consume the pending game tick
    pub fn take_game_tick(&mut self) -> bool {
        std::mem::take(&mut self.game_tick)
    }

    /// Whether the most recent game tick was also a secondary tick
    pub fn secondary_tick(&self) -> bool {
        self.secondary_tick
    }

    /// Game ticks fired so far
    pub fn ticks(&self) -> u64 {
        self.count
    }
}

impl Default for Chrono {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for Chrono {
    fn from(timing: &TimingConfig) -> Self {
        Self::from_millis(timing.tick_ms, timing.secondary_divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn ticks_only_after_interval() {
        let mut c = Chrono::from_millis(20, 2);
        c.update(ms(10));
        assert!(!c.take_game_tick());
        c.update(ms(20));
        assert!(c.take_game_tick());
        assert!(!c.take_game_tick());
        c.update(ms(39));
        assert!(!c.take_game_tick());
        c.update(ms(40));
        assert!(c.take_game_tick());
    }

    #[test]
    fn secondary_every_divisor_ticks() {
        let mut c = Chrono::from_millis(10, 3);
        let mut pattern = Vec::new();
        for i in 1..=6 {
            c.update(ms(i * 10));
            assert!(c.take_game_tick());
            pattern.push(c.secondary_tick());
        }
        assert_eq!(pattern, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn late_host_gets_one_tick_per_update() {
        let mut c = Chrono::from_millis(20, 1);
        c.update(ms(500));
        assert_eq!(c.ticks(), 1);
        c.update(ms(505));
        assert_eq!(c.ticks(), 1);
    }

    #[test]
    fn built_from_timing_config() {
        let c = Chrono::from(&TimingConfig { tick_ms: 55, secondary_divisor: 4 });
        assert_eq!(c.tick_interval(), ms(55));
        assert_eq!(Chrono::default().tick_interval(), ms(20));
    }

    #[test]
    fn zero_divisor_behaves_as_one() {
        let mut c = Chrono::new(ms(5), 0);
        c.force_tick();
        assert!(c.secondary_tick());
    }
}
