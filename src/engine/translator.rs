//! Motion translator: raw pointer samples to candidate stick vectors.
//!
//! Each pointer-move notification is processed as one atomic unit under the
//! motion lock. The configured deadzone is used twice on purpose: squared
//! against the raw pixel delta, then as an absolute threshold on each scaled
//! axis. Both checks match the shipped behavior of the device mapping.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

use super::coordinator::EngineShared;
use super::output::{clamp_axis, StickVector, STICK_CENTER};

pub struct MotionTranslator {
    shared: Arc<EngineShared>,
}

impl MotionTranslator {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    /// One raw pointer-move notification with absolute coordinates.
    ///
    /// Throttled events update nothing, so the next accepted event measures
    /// its delta from the last observed coordinates: high-rate motion is
    /// batched, never lost.
    pub fn on_pointer_move(&self, x: i32, y: i32) {
        if !self.shared.is_enabled() || !self.shared.is_attached() {
            return;
        }

        let config = self.shared.config();
        let vector = {
            let mut motion = self.shared.motion();

            // Re-check under the lock: a concurrent disable or stop may have
            // won the race since the unlocked check above.
            if !self.shared.is_enabled() || !self.shared.is_attached() {
                return;
            }

            let now = Instant::now();
            if now.duration_since(motion.last_update) < config.update_interval_duration() {
                trace!("pointer update throttled");
                return;
            }
            motion.last_update = now;

            let dx = x - motion.last_x;
            let dy = y - motion.last_y;
            motion.last_x = x;
            motion.last_y = y;
            motion.last_move = now;

            let distance_sq = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
            if distance_sq < config.deadzone_squared() {
                return;
            }

            self.shared.stats.record_movement();
            motion.is_moving = true;

            let raw_x = f64::from(dx) * config.sensitivity;
            // Screen-down pointer motion maps to a downward stick pull.
            let mut raw_y = f64::from(-dy) * config.sensitivity;

            if motion.recoil_active && config.recoil_enabled {
                raw_y += f64::from(motion.recoil_offset);
            }

            StickVector {
                x: collapse_axis(raw_x, config.deadzone),
                y: collapse_axis(raw_y, config.deadzone),
            }
        };

        // Motion lock released before the device write.
        self.shared.commit(vector);
    }

    /// Trigger-button edge from the pointer source. Press edges count as a
    /// click and a recoil activation; holds and releases count nothing.
    pub fn on_trigger(&self, pressed: bool) {
        let config = self.shared.config();
        if !config.recoil_enabled || !self.shared.is_enabled() {
            return;
        }

        let mut motion = self.shared.motion();
        motion.recoil_active = pressed;
        if pressed {
            self.shared.stats.record_click();
            self.shared.stats.record_recoil_activation();
            debug!("recoil trigger engaged");
        }
    }
}

/// Per-axis deadzone collapse on the scaled value: inside the threshold the
/// axis snaps to center, outside it floor-clamps into device range.
fn collapse_axis(raw: f64, deadzone: i32) -> i16 {
    if raw.abs() <= f64::from(deadzone) {
        STICK_CENTER
    } else {
        clamp_axis(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::coordinator::testing::{attached_shared, set_enabled};
    use crate::engine::output::{STICK_MAX, STICK_MIN};

    fn translator_with(
        config: EngineConfig,
    ) -> (MotionTranslator, Arc<EngineShared>, crate::device::testing::WriteLog) {
        let (shared, log) = attached_shared(config);
        (MotionTranslator::new(shared.clone()), shared, log)
    }

    fn no_throttle(config: EngineConfig) -> EngineConfig {
        EngineConfig {
            update_interval: 0.0,
            ..config
        }
    }

    #[test]
    fn sub_deadzone_motion_writes_nothing() {
        // sensitivity=8000, deadzone=3: (0,0) -> (1,0) gives 1 < 9.
        let (translator, shared, log) = translator_with(no_throttle(EngineConfig::default()));
        translator.on_pointer_move(1, 0);
        assert!(log.lock().unwrap().is_empty());
        assert!(!shared.motion().is_moving);
        // The observation itself is still recorded.
        assert_eq!(shared.motion().last_x, 1);
    }

    #[test]
    fn large_delta_saturates_the_axis() {
        // (0,0) -> (10,0): raw_x = 80000 clamps to 32767, y stays centered.
        let (translator, _shared, log) = translator_with(no_throttle(EngineConfig::default()));
        translator.on_pointer_move(10, 0);
        assert_eq!(*log.lock().unwrap(), vec![(STICK_MAX, 0)]);
    }

    #[test]
    fn negative_overflow_saturates_to_min() {
        let (translator, _shared, log) = translator_with(no_throttle(EngineConfig::default()));
        translator.on_pointer_move(-10, 0);
        assert_eq!(*log.lock().unwrap(), vec![(STICK_MIN, 0)]);
    }

    #[test]
    fn scaled_axes_collapse_independently() {
        // Unity sensitivity: delta (10,2) passes the distance check but the
        // scaled y magnitude sits inside the per-axis threshold.
        let config = no_throttle(EngineConfig {
            sensitivity: 1.0,
            ..EngineConfig::default()
        });
        let (translator, _shared, log) = translator_with(config);
        translator.on_pointer_move(10, 2);
        assert_eq!(*log.lock().unwrap(), vec![(10, 0)]);
    }

    #[test]
    fn vertical_axis_is_inverted() {
        let config = no_throttle(EngineConfig {
            sensitivity: 1.0,
            ..EngineConfig::default()
        });
        let (translator, _shared, log) = translator_with(config);
        // Pointer moves down the screen; the stick pulls down (negative y).
        translator.on_pointer_move(0, 10);
        assert_eq!(*log.lock().unwrap(), vec![(0, -10)]);
    }

    #[test]
    fn active_recoil_offset_is_merged_into_y() {
        let config = no_throttle(EngineConfig {
            sensitivity: 1.0,
            deadzone: 0,
            ..EngineConfig::default()
        });
        let (translator, shared, log) = translator_with(config);
        {
            let mut motion = shared.motion();
            motion.recoil_active = true;
            motion.recoil_offset = -500;
        }
        translator.on_pointer_move(5, 0);
        assert_eq!(*log.lock().unwrap(), vec![(5, -500)]);
    }

    #[test]
    fn recoil_offset_is_ignored_when_disabled_in_config() {
        let config = no_throttle(EngineConfig {
            sensitivity: 1.0,
            deadzone: 0,
            recoil_enabled: false,
            ..EngineConfig::default()
        });
        let (translator, shared, log) = translator_with(config);
        {
            let mut motion = shared.motion();
            motion.recoil_active = true;
            motion.recoil_offset = -500;
        }
        translator.on_pointer_move(5, 0);
        assert_eq!(*log.lock().unwrap(), vec![(5, 0)]);
    }

    #[test]
    fn disabled_translation_is_a_no_op() {
        let (translator, shared, log) = translator_with(no_throttle(EngineConfig::default()));
        set_enabled(&shared, false);
        translator.on_pointer_move(100, 100);
        assert!(log.lock().unwrap().is_empty());
        // Not even the observed position moves.
        assert_eq!(shared.motion().last_x, 0);
    }

    #[test]
    fn throttled_events_batch_into_the_next_delta() {
        // Half a second: long enough that the second event below is always
        // inside the window, short enough that the backdated throttle clock
        // lets the first one through.
        let config = EngineConfig {
            sensitivity: 1.0,
            update_interval: 0.5,
            ..EngineConfig::default()
        };
        let (translator, shared, log) = translator_with(config);

        translator.on_pointer_move(10, 0);
        assert_eq!(log.lock().unwrap().len(), 1);

        // Within the throttle window: dropped, coordinates untouched.
        translator.on_pointer_move(20, 0);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(shared.motion().last_x, 10);
    }

    #[test]
    fn zero_sensitivity_never_reaches_the_device() {
        let config = no_throttle(EngineConfig {
            sensitivity: 0.0,
            ..EngineConfig::default()
        });
        let (translator, _shared, log) = translator_with(config);
        translator.on_pointer_move(1000, 1000);
        // Scaled values are 0, inside the per-axis threshold; the committed
        // center equals the gate's initial state and is deduped away.
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn trigger_press_edges_drive_counters_and_flag() {
        let (translator, shared, _log) = translator_with(EngineConfig::default());

        translator.on_trigger(true);
        assert!(shared.motion().recoil_active);
        translator.on_trigger(false);
        assert!(!shared.motion().recoil_active);
        translator.on_trigger(true);

        shared.stats.flush();
        let snapshot = shared.stats.snapshot();
        assert_eq!(snapshot.clicks, 2);
        assert_eq!(snapshot.recoil_activations, 2);
    }

    #[test]
    fn trigger_is_ignored_while_recoil_disabled() {
        let config = EngineConfig {
            recoil_enabled: false,
            ..EngineConfig::default()
        };
        let (translator, shared, _log) = translator_with(config);
        translator.on_trigger(true);
        assert!(!shared.motion().recoil_active);
        shared.stats.flush();
        assert_eq!(shared.stats.snapshot().clicks, 0);
    }
}
