//! Live-tunable parameters for the translation engine.
//!
//! A config value is an immutable snapshot: the control surface replaces the
//! whole struct through the engine handle rather than poking single fields,
//! so related values (sensitivity and deadzone, for instance) are always read
//! together from one consistent version.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Floor for loop periods so a zeroed or garbage rate cannot busy-spin a
/// background loop.
const MIN_LOOP_TICK: Duration = Duration::from_micros(100);

/// Engine parameters. Doubles as the flat on-disk profile schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Multiplier from pointer pixels to stick units.
    pub sensitivity: f64,

    /// Minimum motion magnitude, in pixels, below which a delta is ignored.
    /// Also reused as the per-axis collapse threshold on the scaled value.
    pub deadzone: i32,

    /// Seconds of pointer silence before the watchdog recenters the stick.
    pub reset_delay: f64,

    /// Minimum seconds between accepted pointer updates. Bounds CPU cost
    /// under high-rate sources; skipped motion is batched into the next
    /// accepted delta, not lost.
    pub update_interval: f64,

    /// Per-tick downward pull while the recoil trigger is held.
    pub recoil_strength: i32,

    /// Seconds per recoil pull tick.
    pub recoil_rate: f64,

    /// Seconds per recoil recovery tick.
    pub recoil_recovery_rate: f64,

    /// Master switch for the recoil simulator.
    pub recoil_enabled: bool,

    /// Clamp ceiling for the accumulated recoil offset magnitude.
    pub max_recoil_offset: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sensitivity: 8000.0,
            deadzone: 3,
            reset_delay: 0.01,
            update_interval: 0.001,
            recoil_strength: 600,
            recoil_rate: 0.004,
            recoil_recovery_rate: 0.004,
            recoil_enabled: true,
            max_recoil_offset: 6000,
        }
    }
}

impl EngineConfig {
    /// Squared deadzone for the raw-delta distance check.
    pub fn deadzone_squared(&self) -> i64 {
        i64::from(self.deadzone) * i64::from(self.deadzone)
    }

    pub fn reset_delay_duration(&self) -> Duration {
        duration_from_secs(self.reset_delay)
    }

    pub fn update_interval_duration(&self) -> Duration {
        duration_from_secs(self.update_interval)
    }

    pub fn recoil_rate_duration(&self) -> Duration {
        duration_from_secs(self.recoil_rate).max(MIN_LOOP_TICK)
    }

    pub fn recoil_recovery_duration(&self) -> Duration {
        duration_from_secs(self.recoil_recovery_rate).max(MIN_LOOP_TICK)
    }
}

/// Tolerates any numeric input: negative, NaN and infinite values become zero
/// instead of panicking in `Duration::from_secs_f64`.
fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_profile() {
        let config = EngineConfig::default();
        assert_eq!(config.sensitivity, 8000.0);
        assert_eq!(config.deadzone, 3);
        assert_eq!(config.deadzone_squared(), 9);
        assert!(config.recoil_enabled);
        assert_eq!(config.max_recoil_offset, 6000);
    }

    #[test]
    fn hostile_timing_values_do_not_panic() {
        let config = EngineConfig {
            reset_delay: -1.0,
            update_interval: f64::NAN,
            recoil_rate: 0.0,
            recoil_recovery_rate: f64::INFINITY,
            ..EngineConfig::default()
        };
        assert_eq!(config.reset_delay_duration(), Duration::ZERO);
        assert_eq!(config.update_interval_duration(), Duration::ZERO);
        // Loop periods are floored so the simulator cannot spin hot.
        assert!(config.recoil_rate_duration() >= Duration::from_micros(100));
        assert!(config.recoil_recovery_duration() >= Duration::from_micros(100));
    }

    #[test]
    fn negative_deadzone_squares_positive() {
        let config = EngineConfig {
            deadzone: -3,
            ..EngineConfig::default()
        };
        assert_eq!(config.deadzone_squared(), 9);
    }
}
