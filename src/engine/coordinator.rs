//! Engine coordinator: shared state and background-loop lifecycle.
//!
//! Implements the engine lifecycle as a statum state machine with
//! compile-time state safety, driven from a handle that owns the spawned
//! tasks.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Armed ──► Active ──► Deactivating ──► Deactivated
//!       │           │
//!       └───────────┘
//!   (attach device + sample pointer)
//! ```
//!
//! # Architecture
//!
//! ```text
//! PointerSource ─[PointerEvent]─► input-reaction loop ─► MotionTranslator
//!                (mpsc channel)                               │
//!      recoil simulator loop ──── motion lock ────────────────┤
//!      idle watchdog loop    ──── motion lock ── OutputGate ──► DeviceSink
//! ```
//!
//! Three locks with fixed roles: the motion lock (pointer, recoil and
//! is-moving state), the gate lock (device handle plus last committed
//! vector) and the stats totals lock. Where both engine locks are needed the
//! order is motion before gate, and the motion lock is never held across a
//! device write.

use statum::{machine, state};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::EngineError;
use super::output::{OutputGate, StickVector};
use super::recoil::RecoilSimulator;
use super::stats::{StatsAggregator, StatsSnapshot};
use super::translator::MotionTranslator;
use super::watchdog::IdleWatchdog;
use crate::config::EngineConfig;
use crate::device::DeviceSink;
use crate::pointer::{CollectorHandle, PointerButton, PointerEvent, PointerSource};

/// Capacity of the pointer event channel; headroom for burst input without
/// stalling the blocking pump.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Pointer and recoil state guarded by the motion lock.
#[derive(Debug)]
pub(crate) struct MotionState {
    /// Last observed absolute pointer coordinates.
    pub last_x: i32,
    pub last_y: i32,
    /// Monotonic time of the last accepted pointer update.
    pub last_move: Instant,
    /// Monotonic time used by the minimum-interval throttle.
    pub last_update: Instant,
    /// True between an accepted motion and the next recentering.
    pub is_moving: bool,
    /// Current vertical recoil offset, negative while pulling.
    pub recoil_offset: i32,
    /// True while the recoil trigger is held.
    pub recoil_active: bool,
}

impl MotionState {
    fn new() -> Self {
        let now = Instant::now();
        // Backdated so the very first pointer event passes the throttle.
        let long_ago = now
            .checked_sub(Duration::from_secs(1))
            .unwrap_or(now);
        Self {
            last_x: 0,
            last_y: 0,
            last_move: now,
            last_update: long_ago,
            is_moving: false,
            recoil_offset: 0,
            recoil_active: false,
        }
    }
}

/// Running × enabled × device-attached. Three independent booleans: loops
/// can be running while translation is disabled and the stick is pinned to
/// center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    pub running: bool,
    pub enabled: bool,
    pub device_attached: bool,
}

/// State shared by the input-reaction loop, the recoil simulator and the
/// idle watchdog.
pub(crate) struct EngineShared {
    motion: Mutex<MotionState>,
    gate: Mutex<OutputGate>,
    pub(crate) stats: StatsAggregator,
    config: watch::Receiver<EngineConfig>,
    enabled: AtomicBool,
    attached: AtomicBool,
    running: AtomicBool,
}

impl EngineShared {
    fn new(sink: Box<dyn DeviceSink>, config: watch::Receiver<EngineConfig>) -> Self {
        Self {
            motion: Mutex::new(MotionState::new()),
            gate: Mutex::new(OutputGate::new(sink)),
            stats: StatsAggregator::new(),
            config,
            enabled: AtomicBool::new(false),
            attached: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    pub(crate) fn motion(&self) -> MutexGuard<'_, MotionState> {
        self.motion.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn gate(&self) -> MutexGuard<'_, OutputGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clones the current config snapshot; readers never see a half-updated
    /// set of fields.
    pub(crate) fn config(&self) -> EngineConfig {
        self.config.borrow().clone()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Relaxed);
    }

    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// Best-effort commit; a transient write failure is logged and must not
    /// take down the calling loop.
    pub(crate) fn commit(&self, vector: StickVector) {
        if let Err(e) = self.gate().commit(vector) {
            warn!("stick write failed: {}", e);
        }
    }

    /// Full neutral reset: stick centered, recoil zeroed, trigger and
    /// is-moving flags cleared. Used by disable and stop so no residual
    /// state leaks into a later re-enable. Idempotent.
    pub(crate) fn force_center(&self) {
        {
            let mut motion = self.motion();
            motion.recoil_offset = 0;
            motion.recoil_active = false;
            motion.is_moving = false;
        }
        if let Err(e) = self.gate().center() {
            warn!("failed to recenter stick: {}", e);
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum EngineState {
    Initializing, // Shared state built, device not yet verified
    Armed,        // Device attached, initial pointer position sampled
    Active,       // Input-reaction loop running
    Deactivating, // Shutting down gracefully
    Deactivated,  // Fully stopped, device released
}

/// Engine lifecycle machine. The Active state runs the input-reaction loop;
/// the recoil and watchdog loops are spawned by the handle against the same
/// shared state.
#[machine]
pub struct Engine<S: EngineState> {
    shared: Arc<EngineShared>,
    source: Option<Box<dyn PointerSource>>,
    events_rx: Option<mpsc::Receiver<PointerEvent>>,
}

impl Engine<Initializing> {
    pub(crate) fn create(
        shared: Arc<EngineShared>,
        source: Box<dyn PointerSource>,
        events_rx: mpsc::Receiver<PointerEvent>,
    ) -> Self {
        debug!("creating engine state machine");
        Self::new(shared, Some(source), Some(events_rx))
    }

    /// Attaches the device and samples the initial pointer position. Either
    /// failure is fatal to startup and leaves the engine stopped.
    pub(crate) fn arm(mut self) -> Result<Engine<Armed>, EngineError> {
        self.shared
            .gate()
            .attach()
            .map_err(EngineError::Attachment)?;
        self.shared.set_attached(true);

        let (x, y) = match self.source.as_mut() {
            Some(source) => source.position().map_err(EngineError::Sample)?,
            None => return Err(EngineError::Task("pointer source already taken".into())),
        };
        {
            let mut motion = self.shared.motion();
            motion.last_x = x;
            motion.last_y = y;
            motion.last_move = Instant::now();
        }

        info!("engine armed at pointer position ({}, {})", x, y);
        Ok(self.transition())
    }
}

impl Engine<Armed> {
    pub(crate) fn take_source(&mut self) -> Option<Box<dyn PointerSource>> {
        self.source.take()
    }

    pub(crate) fn activate(self) -> Engine<Active> {
        info!("activating engine");
        self.transition()
    }
}

impl Engine<Active> {
    /// Input-reaction loop: applies pointer events in arrival order until
    /// shutdown. A single consumer task keeps the ordering guarantee for
    /// free.
    pub(crate) async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> Engine<Deactivating> {
        let translator = MotionTranslator::new(self.shared.clone());
        let mut events = match self.events_rx.take() {
            Some(events) => events,
            None => {
                error!("pointer event channel already taken, shutting down");
                return self.transition();
            }
        };

        info!("input reaction loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("input reaction loop shutdown signal received");
                    break;
                }
                event = events.recv() => match event {
                    Some(PointerEvent::Moved { x, y }) => translator.on_pointer_move(x, y),
                    Some(PointerEvent::Button { button: PointerButton::Primary, pressed }) => {
                        translator.on_trigger(pressed);
                    }
                    Some(PointerEvent::Button { .. }) => {}
                    None => {
                        warn!("pointer event channel closed");
                        break;
                    }
                }
            }
        }
        self.transition()
    }
}

impl Engine<Deactivating> {
    pub(crate) fn shutdown(self) -> Engine<Deactivated> {
        self.shared.set_running(false);
        self.shared.force_center();
        info!("engine loops released the stick");
        self.transition()
    }
}

impl Engine<Deactivated> {}

/// Owning handle for a started engine.
///
/// `start` attaches the device, samples the pointer and spawns the three
/// loops; the handle then exposes the live control surface (enable, config
/// swap, stats, status) and `stop`.
pub struct EngineHandle {
    shared: Arc<EngineShared>,
    config_tx: watch::Sender<EngineConfig>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Starts the engine. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * [`EngineError::Attachment`] - the device sink could not be attached
    /// * [`EngineError::Sample`] - the initial pointer position could not be
    ///   sampled
    ///
    /// In both cases nothing has been spawned and the engine stays stopped.
    pub fn start(
        config: EngineConfig,
        sink: Box<dyn DeviceSink>,
        source: Box<dyn PointerSource>,
    ) -> Result<Self, EngineError> {
        info!("starting engine with config: {:?}", config);

        let (config_tx, config_rx) = watch::channel(config);
        let shared = Arc::new(EngineShared::new(sink, config_rx));
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut armed = Engine::create(shared.clone(), source, events_rx).arm()?;
        let source = match armed.take_source() {
            Some(source) => source,
            None => return Err(EngineError::Task("pointer source missing after arm".into())),
        };
        let active = armed.activate();

        let cancel = CancellationToken::new();
        shared.set_running(true);

        // The pointer pump is fire-and-forget: it blocks in device reads and
        // winds down once the event channel closes after shutdown.
        let _collector = CollectorHandle::spawn(source, events_tx, cancel.clone());

        let input_task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let deactivating = active.run_until_shutdown(cancel).await;
                let _ = deactivating.shutdown();
            }
        });
        let recoil_task = tokio::spawn(RecoilSimulator::new(shared.clone()).run(cancel.clone()));
        let watchdog_task = tokio::spawn(IdleWatchdog::new(shared.clone()).run(cancel.clone()));

        info!("engine started, translation disabled until enabled");
        Ok(Self {
            shared,
            config_tx,
            cancel,
            tasks: vec![input_task, recoil_task, watchdog_task],
        })
    }

    /// Turns translation on or off. Disabling performs the full neutral
    /// reset; calling it twice in a row is indistinguishable from once.
    pub fn enable(&self, enabled: bool) {
        self.shared.set_enabled(enabled);
        if enabled {
            info!("translation enabled");
        } else {
            self.shared.force_center();
            info!("translation disabled, stick recentered");
        }
    }

    /// Stops all loops and recenters the stick. Idempotent and safe to call
    /// concurrently with in-flight pointer events.
    pub async fn stop(&mut self) {
        self.shared.set_enabled(false);
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("engine task panicked: {}", e);
            }
        }
        self.shared.set_running(false);
        self.shared.force_center();
        self.shared.set_attached(false);
        info!("engine stopped");
    }

    /// Replaces the whole config snapshot; loops pick it up on their next
    /// read.
    pub fn set_config(&self, config: EngineConfig) {
        if self.config_tx.send(config).is_err() {
            warn!("config update dropped, engine no longer listening");
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config_tx.borrow().clone()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.shared.is_running(),
            enabled: self.shared.is_enabled(),
            device_attached: self.shared.is_attached(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        // Loops hold the shared state alive; make sure they wind down even
        // if the handle is dropped without an explicit stop.
        self.cancel.cancel();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::device::testing::MemoryPad;

    /// Shared state with an attached in-memory pad, enabled, for exercising
    /// the translator and watchdog without spawning loops.
    pub(crate) fn attached_shared(
        config: EngineConfig,
    ) -> (Arc<EngineShared>, crate::device::testing::WriteLog) {
        let (pad, log) = MemoryPad::new();
        // A watch receiver keeps serving the last value after the sender is
        // dropped, so the sender does not need to outlive this helper.
        let (_config_tx, config_rx) = watch::channel(config);
        let shared = Arc::new(EngineShared::new(Box::new(pad), config_rx));
        shared
            .gate()
            .attach()
            .expect("memory pad attach cannot fail");
        shared.set_attached(true);
        shared.set_enabled(true);
        shared.set_running(true);
        (shared, log)
    }

    pub(crate) fn set_enabled(shared: &EngineShared, enabled: bool) {
        shared.set_enabled(enabled);
    }
}
