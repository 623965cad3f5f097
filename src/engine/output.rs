//! Output gate between the translation pipeline and the virtual device.
//!
//! The gate owns the device sink and the last committed vector; the mutex
//! wrapping it in the coordinator is the device-write lock. Commits are
//! deduped against the last committed vector, and that vector is only
//! updated after the device accepted the write.

use tracing::trace;

use crate::device::{DeviceError, DeviceSink};

pub const STICK_MAX: i16 = i16::MAX;
pub const STICK_MIN: i16 = i16::MIN;
pub const STICK_CENTER: i16 = 0;

/// Virtual analog-stick position in device axis range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickVector {
    pub x: i16,
    pub y: i16,
}

impl StickVector {
    pub const CENTER: Self = Self {
        x: STICK_CENTER,
        y: STICK_CENTER,
    };

    pub fn is_center(&self) -> bool {
        *self == Self::CENTER
    }
}

/// Floor-clamps a scaled axis value into device range.
///
/// Fractional intermediates floor toward negative infinity before
/// saturating, so -0.5 commits as -1, not 0.
pub(crate) fn clamp_axis(value: f64) -> i16 {
    let floored = value.floor();
    if floored <= f64::from(STICK_MIN) {
        STICK_MIN
    } else if floored >= f64::from(STICK_MAX) {
        STICK_MAX
    } else {
        floored as i16
    }
}

pub struct OutputGate {
    sink: Box<dyn DeviceSink>,
    last_sent: StickVector,
}

impl OutputGate {
    pub fn new(sink: Box<dyn DeviceSink>) -> Self {
        Self {
            sink,
            last_sent: StickVector::CENTER,
        }
    }

    pub fn attach(&mut self) -> Result<(), DeviceError> {
        self.sink.attach()
    }

    /// Commits a stick vector to the device. Returns `Ok(false)` when the
    /// vector equals the last committed one and nothing was written.
    pub fn commit(&mut self, vector: StickVector) -> Result<bool, DeviceError> {
        if vector == self.last_sent {
            return Ok(false);
        }
        self.sink.write_stick(vector.x, vector.y)?;
        self.sink.flush()?;
        trace!("committed stick vector ({}, {})", vector.x, vector.y);
        self.last_sent = vector;
        Ok(true)
    }

    pub fn center(&mut self) -> Result<bool, DeviceError> {
        self.commit(StickVector::CENTER)
    }

    pub fn is_centered(&self) -> bool {
        self.last_sent.is_center()
    }

    pub fn last_sent(&self) -> StickVector {
        self.last_sent
    }
}
