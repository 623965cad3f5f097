//! Evdev mouse reader.
//!
//! Relative motion is integrated into absolute coordinates from a (0, 0)
//! origin at open time. The engine only consumes differences of successive
//! coordinates, so the origin choice is unobservable downstream.

use evdev::{Device, InputEventKind, Key, RelativeAxisType};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{PointerButton, PointerError, PointerEvent, PointerSource};

pub struct EvdevPointer {
    device: Device,
    x: i32,
    y: i32,
}

impl EvdevPointer {
    /// Open a specific evdev node, e.g. `/dev/input/event5`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PointerError> {
        let device = Device::open(path.as_ref()).map_err(PointerError::Open)?;
        info!(
            "opened pointer device: {} ({})",
            device.name().unwrap_or("unnamed"),
            path.as_ref().display()
        );
        Ok(Self { device, x: 0, y: 0 })
    }

    /// Pick the first device that looks like a mouse: relative X motion plus
    /// a left button.
    pub fn autodetect() -> Result<Self, PointerError> {
        for (path, device) in evdev::enumerate() {
            if is_pointer(&device) {
                info!(
                    "auto-detected pointer device: {} ({})",
                    device.name().unwrap_or("unnamed"),
                    path.display()
                );
                return Ok(Self { device, x: 0, y: 0 });
            }
            debug!("skipping non-pointer device: {}", path.display());
        }
        Err(PointerError::NoDevice)
    }
}

fn is_pointer(device: &Device) -> bool {
    let has_rel = device
        .supported_relative_axes()
        .map_or(false, |axes| axes.contains(RelativeAxisType::REL_X));
    let has_button = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_LEFT));
    has_rel && has_button
}

fn map_button(key: Key) -> PointerButton {
    match key {
        Key::BTN_LEFT => PointerButton::Primary,
        Key::BTN_RIGHT => PointerButton::Secondary,
        Key::BTN_MIDDLE => PointerButton::Middle,
        other => PointerButton::Other(other.code()),
    }
}

impl PointerSource for EvdevPointer {
    fn position(&mut self) -> Result<(i32, i32), PointerError> {
        Ok((self.x, self.y))
    }

    fn pump(
        &mut self,
        events: mpsc::Sender<PointerEvent>,
        cancel: CancellationToken,
    ) -> Result<(), PointerError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            // Blocks until the device produces a batch; cancellation is
            // observed on the next batch boundary.
            let batch = self.device.fetch_events().map_err(PointerError::Read)?;
            for event in batch {
                let outgoing = match event.kind() {
                    InputEventKind::RelAxis(RelativeAxisType::REL_X) => {
                        self.x = self.x.wrapping_add(event.value());
                        Some(PointerEvent::Moved {
                            x: self.x,
                            y: self.y,
                        })
                    }
                    InputEventKind::RelAxis(RelativeAxisType::REL_Y) => {
                        self.y = self.y.wrapping_add(event.value());
                        Some(PointerEvent::Moved {
                            x: self.x,
                            y: self.y,
                        })
                    }
                    InputEventKind::Key(key) if event.value() != 2 => Some(PointerEvent::Button {
                        button: map_button(key),
                        pressed: event.value() == 1,
                    }),
                    _ => None,
                };

                if let Some(outgoing) = outgoing {
                    if events.blocking_send(outgoing).is_err() {
                        warn!("pointer event channel closed, stopping pump");
                        return Ok(());
                    }
                }
            }
        }
    }
}
