//! Recoil offset simulator.
//!
//! While the trigger is held the vertical offset chases a floor that drops by
//! `recoil_strength` every tick, approaching it 60% per step: an exponential
//! approach to a moving target rather than a linear ramp, which smooths
//! jitter while the floor keeps advancing. Once the trigger releases the
//! offset relaxes back to zero, slower from large magnitudes so there is no
//! visible snap-back, and snaps to exactly zero inside a small epsilon.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::coordinator::EngineShared;

/// Fraction of the distance to the target covered per tick.
const APPROACH_FACTOR: f64 = 0.6;
/// Recovery fraction used while the offset magnitude exceeds
/// [`RECOVERY_SLOW_THRESHOLD`].
const SLOW_RECOVERY_FACTOR: f64 = 0.4;
/// Offset magnitude above which recovery switches to the slow factor.
const RECOVERY_SLOW_THRESHOLD: i32 = 1000;
/// Offsets inside this band snap to exactly zero.
const RECOVERY_SNAP_EPSILON: i32 = 10;

/// One pull tick: advance the floor by `strength`, clamp it at
/// `-max_offset`, then move 60% of the way there.
pub(crate) fn pull_tick(offset: i32, strength: i32, max_offset: i32) -> i32 {
    let target = (offset - strength).max(-max_offset);
    step_toward(offset, target, APPROACH_FACTOR)
}

/// One recovery tick toward zero, with the slow factor for large offsets and
/// the snap-to-zero band.
pub(crate) fn recover_tick(offset: i32) -> i32 {
    let factor = if offset.abs() > RECOVERY_SLOW_THRESHOLD {
        SLOW_RECOVERY_FACTOR
    } else {
        APPROACH_FACTOR
    };
    let next = step_toward(offset, 0, factor);
    if next.abs() < RECOVERY_SNAP_EPSILON {
        0
    } else {
        next
    }
}

fn step_toward(offset: i32, target: i32, factor: f64) -> i32 {
    // Truncation toward zero matches the rest of the integer pipeline.
    (f64::from(offset) + f64::from(target - offset) * factor) as i32
}

/// Free-running loop driving the offset. It never terminates between
/// activations: each iteration re-reads the trigger flag and picks the pull
/// or recovery branch, so releasing and re-pressing the trigger needs no
/// coordination beyond the shared flag.
pub struct RecoilSimulator {
    shared: Arc<EngineShared>,
}

impl RecoilSimulator {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("recoil simulator loop started");
        loop {
            let config = self.shared.config();
            let pulling = {
                // Critical section is the single offset update, not the
                // sleep that follows it.
                let mut motion = self.shared.motion();
                let pulling =
                    motion.recoil_active && self.shared.is_enabled() && config.recoil_enabled;
                if pulling {
                    motion.recoil_offset = pull_tick(
                        motion.recoil_offset,
                        config.recoil_strength,
                        config.max_recoil_offset,
                    );
                } else {
                    motion.recoil_offset = recover_tick(motion.recoil_offset);
                }
                pulling
            };

            let period = if pulling {
                config.recoil_rate_duration()
            } else {
                config.recoil_recovery_duration()
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("recoil simulator shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(period) => {}
            }
        }
        info!("recoil simulator loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pull_tick_matches_reference_values() {
        // strength=600, max=6000, starting at rest:
        // target = max(0-600, -6000) = -600, offset = 0 + (-600)*0.6 = -360
        assert_eq!(pull_tick(0, 600, 6000), -360);
    }

    #[test]
    fn pull_is_monotone_until_the_floor_then_stable() {
        let mut offset = 0;
        let mut previous = offset;
        for _ in 0..200 {
            offset = pull_tick(offset, 600, 6000);
            assert!(offset <= previous, "offset rose from {previous} to {offset}");
            assert!(offset >= -6000);
            previous = offset;
        }
        // At the floor the target equals the offset, so it stays put.
        assert_eq!(pull_tick(-6000, 600, 6000), -6000);
    }

    #[test]
    fn recovery_converges_to_exactly_zero_without_overshoot() {
        let mut offset = -360;
        let mut ticks = 0;
        while offset != 0 {
            let next = recover_tick(offset);
            assert!(next > offset, "no progress at {offset}");
            assert!(next <= 0, "overshot zero: {next}");
            offset = next;
            ticks += 1;
            assert!(ticks < 50, "did not converge");
        }
        assert_eq!(recover_tick(0), 0);
    }

    #[test]
    fn recovery_is_slower_from_large_offsets() {
        // Above the threshold only 40% of the distance is covered per tick.
        assert_eq!(recover_tick(-2000), -1200);
        // At or below the threshold the fast factor applies.
        assert_eq!(recover_tick(-1000), -400);
    }

    #[test]
    fn small_offsets_snap_to_zero() {
        assert_eq!(recover_tick(-9), 0);
        assert_eq!(recover_tick(9), 0);
        // -20 relaxes to -8, which lands inside the snap band.
        assert_eq!(recover_tick(-20), 0);
        // -30 relaxes to -12 and stays out of it.
        assert_eq!(recover_tick(-30), -12);
    }
}
