//! Virtual controller output boundary.
//!
//! The engine only ever talks to [`DeviceSink`]; the production
//! implementation is a uinput virtual gamepad, tests substitute an in-memory
//! pad. Writes are two-phase on purpose: `write_stick` queues axis values,
//! `flush` pushes the report out to the host, matching how virtual-device
//! backends batch events behind a sync marker.

pub mod uinput_pad;

pub use uinput_pad::UinputPad;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to create virtual device: {0}")]
    Create(#[source] std::io::Error),

    #[error("failed to write stick report: {0}")]
    Write(#[source] std::io::Error),

    #[error("virtual device not attached")]
    NotAttached,
}

/// Sink for committed stick vectors.
///
/// `attach` may be called once before any write; implementations are free to
/// fail every write until it has succeeded.
pub trait DeviceSink: Send {
    /// Create or open the underlying virtual device.
    fn attach(&mut self) -> Result<(), DeviceError>;

    /// Queue a stick position, both axes in `[-32768, 32767]`.
    fn write_stick(&mut self, x: i16, y: i16) -> Result<(), DeviceError>;

    /// Push queued axis writes out to the host.
    fn flush(&mut self) -> Result<(), DeviceError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{DeviceError, DeviceSink};
    use std::sync::{Arc, Mutex};

    /// Committed vectors recorded by a [`MemoryPad`], shared with the test.
    pub(crate) type WriteLog = Arc<Mutex<Vec<(i16, i16)>>>;

    /// In-memory sink recording every flushed stick vector.
    pub(crate) struct MemoryPad {
        log: WriteLog,
        pending: Vec<(i16, i16)>,
        attached: bool,
        pub(crate) fail_attach: bool,
        pub(crate) fail_write: bool,
    }

    impl MemoryPad {
        pub(crate) fn new() -> (Self, WriteLog) {
            let log = WriteLog::default();
            (
                Self {
                    log: log.clone(),
                    pending: Vec::new(),
                    attached: false,
                    fail_attach: false,
                    fail_write: false,
                },
                log,
            )
        }
    }

    impl DeviceSink for MemoryPad {
        fn attach(&mut self) -> Result<(), DeviceError> {
            if self.fail_attach {
                return Err(DeviceError::Create(std::io::Error::other(
                    "simulated attach failure",
                )));
            }
            self.attached = true;
            Ok(())
        }

        fn write_stick(&mut self, x: i16, y: i16) -> Result<(), DeviceError> {
            if !self.attached {
                return Err(DeviceError::NotAttached);
            }
            if self.fail_write {
                return Err(DeviceError::Write(std::io::Error::other(
                    "simulated write failure",
                )));
            }
            self.pending.push((x, y));
            Ok(())
        }

        fn flush(&mut self) -> Result<(), DeviceError> {
            let mut log = self.log.lock().unwrap();
            log.append(&mut self.pending);
            Ok(())
        }
    }
}
