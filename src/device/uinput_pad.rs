//! Uinput-backed virtual gamepad.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup};
use tracing::{debug, info};

use super::{DeviceError, DeviceSink};

const DEVICE_NAME: &str = "mousestick virtual pad";

/// Virtual Xbox-style gamepad exposing the right stick on ABS_RX/ABS_RY.
///
/// Axis writes are queued and emitted as a single report on `flush`; the
/// evdev layer appends the SYN_REPORT marker itself.
pub struct UinputPad {
    device: Option<VirtualDevice>,
    pending: Vec<InputEvent>,
}

impl UinputPad {
    pub fn new() -> Self {
        Self {
            device: None,
            pending: Vec::new(),
        }
    }
}

impl Default for UinputPad {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSink for UinputPad {
    fn attach(&mut self) -> Result<(), DeviceError> {
        let stick_info = AbsInfo::new(0, i32::from(i16::MIN), i32::from(i16::MAX), 0, 0, 1);

        // A couple of gamepad buttons are advertised so the host classifies
        // the node as a game controller rather than a bare axis device.
        let mut buttons = AttributeSet::<Key>::new();
        buttons.insert(Key::BTN_SOUTH);
        buttons.insert(Key::BTN_EAST);

        let device = VirtualDeviceBuilder::new()
            .map_err(DeviceError::Create)?
            .name(DEVICE_NAME)
            .with_keys(&buttons)
            .map_err(DeviceError::Create)?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RX, stick_info))
            .map_err(DeviceError::Create)?
            .with_absolute_axis(&UinputAbsSetup::new(AbsoluteAxisType::ABS_RY, stick_info))
            .map_err(DeviceError::Create)?
            .build()
            .map_err(DeviceError::Create)?;

        info!("virtual pad attached: {}", DEVICE_NAME);
        self.device = Some(device);
        Ok(())
    }

    fn write_stick(&mut self, x: i16, y: i16) -> Result<(), DeviceError> {
        if self.device.is_none() {
            return Err(DeviceError::NotAttached);
        }
        self.pending.push(InputEvent::new(
            EventType::ABSOLUTE,
            AbsoluteAxisType::ABS_RX.0,
            i32::from(x),
        ));
        self.pending.push(InputEvent::new(
            EventType::ABSOLUTE,
            AbsoluteAxisType::ABS_RY.0,
            i32::from(y),
        ));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DeviceError> {
        let device = self.device.as_mut().ok_or(DeviceError::NotAttached)?;
        if self.pending.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.pending);
        debug!("flushing {} axis events", events.len());
        device.emit(&events).map_err(DeviceError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_before_attach_are_rejected() {
        let mut pad = UinputPad::new();
        assert!(matches!(
            pad.write_stick(0, 0),
            Err(DeviceError::NotAttached)
        ));
        assert!(matches!(pad.flush(), Err(DeviceError::NotAttached)));
    }
}
