//! Raw pointer input boundary.
//!
//! A [`PointerSource`] delivers absolute move coordinates and button edges.
//! The engine never assumes anything about the delivery context beyond
//! "serialized per source": events are pumped on a dedicated blocking task
//! into an mpsc channel consumed by the input-reaction loop.

pub mod evdev_source;

pub use evdev_source::EvdevPointer;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    /// Absolute pointer coordinates after this motion.
    Moved { x: i32, y: i32 },
    /// Button edge; `pressed` is false on release.
    Button { button: PointerButton, pressed: bool },
}

#[derive(Debug, Error)]
pub enum PointerError {
    #[error("no pointer device found")]
    NoDevice,

    #[error("failed to open pointer device: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to read pointer events: {0}")]
    Read(#[source] std::io::Error),
}

/// Boundary to whatever produces pointer motion.
pub trait PointerSource: Send + 'static {
    /// Current absolute pointer position, sampled before streaming starts.
    fn position(&mut self) -> Result<(i32, i32), PointerError>;

    /// Blocking event pump. Returns when cancelled, when the event channel
    /// closes, or when the device goes away.
    fn pump(
        &mut self,
        events: mpsc::Sender<PointerEvent>,
        cancel: CancellationToken,
    ) -> Result<(), PointerError>;
}

/// Runs a [`PointerSource`] pump on a blocking task.
pub struct CollectorHandle {
    _task: JoinHandle<()>,
}

impl CollectorHandle {
    pub fn spawn(
        mut source: Box<dyn PointerSource>,
        events: mpsc::Sender<PointerEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let task = tokio::task::spawn_blocking(move || {
            info!("pointer collector started");
            match source.pump(events, cancel) {
                Ok(()) => info!("pointer collector stopped"),
                Err(e) => error!("pointer collector terminated: {}", e),
            }
        });
        Self { _task: task }
    }
}
