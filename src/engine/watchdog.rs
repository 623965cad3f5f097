//! Idle watchdog: stats flush and stick recentering.
//!
//! Translation alone never recenters, since a deadzone-filtered "no motion"
//! event never reaches the output gate. This loop is what stops stick drift
//! once the pointer goes quiet, and what pins the stick to neutral while
//! translation is disabled.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::coordinator::EngineShared;

/// Watchdog period; also the stats flush interval.
pub(crate) const WATCHDOG_TICK: Duration = Duration::from_millis(5);

pub struct IdleWatchdog {
    shared: Arc<EngineShared>,
}

impl IdleWatchdog {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("idle watchdog loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("idle watchdog shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(WATCHDOG_TICK) => {}
            }
            self.tick();
        }
        info!("idle watchdog loop stopped");
    }

    /// One watchdog pass: drain pending stats, then recenter if needed.
    pub(crate) fn tick(&self) {
        self.shared.stats.flush();

        if !self.shared.is_enabled() {
            // Mapping is off: whatever is in flight, the physical stick must
            // read neutral.
            let mut gate = self.shared.gate();
            if !gate.is_centered() {
                if let Err(e) = gate.center() {
                    warn!("failed to recenter disabled stick: {}", e);
                }
                drop(gate);
                self.shared.motion().is_moving = false;
            }
            return;
        }

        let config = self.shared.config();
        let idle = {
            let mut motion = self.shared.motion();
            let idle = motion.is_moving
                && motion.last_move.elapsed() > config.reset_delay_duration();
            if idle {
                // Cleared before the device write so the recentering happens
                // exactly once per idle episode.
                motion.is_moving = false;
            }
            idle
        };

        if idle {
            debug!("pointer idle past reset delay, recentering stick");
            if let Err(e) = self.shared.gate().center() {
                warn!("failed to recenter idle stick: {}", e);
            }
        }
    }
}
