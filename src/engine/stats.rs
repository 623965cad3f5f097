//! Lock-batched session counters.
//!
//! The input path increments relaxed atomic pending counters without ever
//! touching the totals lock; the watchdog tick drains them into the totals in
//! one short critical section. Readers see totals that lag reality by at most
//! one flush interval. Totals only move forward, except across an explicit
//! reset.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time copy of the externally visible totals.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub movements: u64,
    pub clicks: u64,
    pub recoil_activations: u64,
    pub started_at: DateTime<Local>,
}

impl StatsSnapshot {
    pub fn uptime(&self) -> chrono::Duration {
        Local::now().signed_duration_since(self.started_at)
    }
}

#[derive(Debug)]
struct Totals {
    movements: u64,
    clicks: u64,
    recoil_activations: u64,
    started_at: DateTime<Local>,
}

impl Totals {
    fn new() -> Self {
        Self {
            movements: 0,
            clicks: 0,
            recoil_activations: 0,
            started_at: Local::now(),
        }
    }
}

#[derive(Debug)]
pub struct StatsAggregator {
    pending_movements: AtomicU64,
    pending_clicks: AtomicU64,
    pending_recoils: AtomicU64,
    totals: Mutex<Totals>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            pending_movements: AtomicU64::new(0),
            pending_clicks: AtomicU64::new(0),
            pending_recoils: AtomicU64::new(0),
            totals: Mutex::new(Totals::new()),
        }
    }

    pub fn record_movement(&self) {
        self.pending_movements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_click(&self) {
        self.pending_clicks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recoil_activation(&self) {
        self.pending_recoils.fetch_add(1, Ordering::Relaxed);
    }

    /// Drains pending counters into the totals. Called from the watchdog
    /// tick; skips the totals lock entirely when nothing is pending.
    pub fn flush(&self) {
        let movements = self.pending_movements.swap(0, Ordering::Relaxed);
        let clicks = self.pending_clicks.swap(0, Ordering::Relaxed);
        let recoils = self.pending_recoils.swap(0, Ordering::Relaxed);
        if movements == 0 && clicks == 0 && recoils == 0 {
            return;
        }
        let mut totals = self.totals();
        totals.movements += movements;
        totals.clicks += clicks;
        totals.recoil_activations += recoils;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let totals = self.totals();
        StatsSnapshot {
            movements: totals.movements,
            clicks: totals.clicks,
            recoil_activations: totals.recoil_activations,
            started_at: totals.started_at,
        }
    }

    /// Zeroes every counter and restarts the session clock.
    pub fn reset(&self) {
        self.pending_movements.store(0, Ordering::Relaxed);
        self.pending_clicks.store(0, Ordering::Relaxed);
        self.pending_recoils.store(0, Ordering::Relaxed);
        *self.totals() = Totals::new();
    }

    fn totals(&self) -> MutexGuard<'_, Totals> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
