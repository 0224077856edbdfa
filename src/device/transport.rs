use std::time::Duration;

use hidapi::HidDevice;

use super::{DeviceError, REPORT_ID};
use crate::debug_println;

const RESPONSE_BUFFER_SIZE: usize = 256;

/// The send/receive primitive the protocol layer runs on.
///
/// The session never has more than one awaited response outstanding, so a
/// blocking read with a timeout is all that is required.
pub trait Transport {
    fn send_report(&self, report_id: u8, payload: &[u8]) -> Result<(), DeviceError>;

    /// Wait for the next input report, with the report id stripped.
    /// Returns `DeviceError::Timeout` if none arrives in time.
    fn await_input_report(&self, timeout: Duration) -> Result<Vec<u8>, DeviceError>;
}

pub struct HidTransport {
    hid_device: HidDevice,
}

impl HidTransport {
    pub fn new(hid_device: HidDevice) -> Self {
        HidTransport { hid_device }
    }
}

impl Transport for HidTransport {
    fn send_report(&self, report_id: u8, payload: &[u8]) -> Result<(), DeviceError> {
        let mut packet = Vec::with_capacity(payload.len() + 1);
        packet.push(report_id);
        packet.extend_from_slice(payload);
        debug_println!("Write packet: {packet:02x?}");
        self.hid_device.write(&packet)?;
        Ok(())
    }

    fn await_input_report(&self, timeout: Duration) -> Result<Vec<u8>, DeviceError> {
        let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
        let read = self
            .hid_device
            .read_timeout(&mut buf[..], timeout.as_millis() as i32)?;
        if read == 0 {
            return Err(DeviceError::Timeout());
        }
        // Numbered reports come back with the report id prefixed.
        let payload = if buf[0] == REPORT_ID {
            buf[1..read].to_vec()
        } else {
            buf[..read].to_vec()
        };
        debug_println!("Read packet: {payload:02x?}");
        Ok(payload)
    }
}
