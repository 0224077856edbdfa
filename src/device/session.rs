//! The device protocol state machine.
//!
//! One session owns one transport handle. Every operation takes the busy
//! lock for its full duration; a second call while one is in flight fails
//! immediately with `DeviceBusy` instead of queueing. Filter writes are
//! fire-and-forget (the hardware does not acknowledge them); reads await
//! exactly one response under a bounded timeout.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::codec::{build_filter_packet, encode_global_gain, parse_filter_packet};
use super::transport::Transport;
use super::{
    DeviceError, CMD_FLASH_EQ, CMD_GLOBAL_GAIN, CMD_PEQ_VALUES, CMD_TEMP_WRITE, CMD_VERSION, END,
    READ, REPORT_ID, WRITE,
};
use crate::eq::{neutral_band, Band, NUM_BANDS};

/// Filter slots the hardware exposes.
pub const MAX_FILTERS: usize = NUM_BANDS;

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const GLOBAL_GAIN_TIMEOUT: Duration = Duration::from_millis(500);
/// One deadline for the whole pull batch, not per request.
const PULL_TIMEOUT: Duration = Duration::from_secs(10);
/// Pacing between consecutive commands; the hardware drops packets without it.
const COMMAND_DELAY: Duration = Duration::from_millis(50);

/// Raw global-gain value that mutes the output while the filter bank is
/// in a transient, inconsistent state.
const GLOBAL_GAIN_MUTE: f64 = -128.0;

/// A complete EQ configuration as read from the device.
#[derive(Debug, Clone)]
pub struct DeviceEq {
    pub bands: [Band; NUM_BANDS],
    pub global_gain: f64,
}

pub struct DeviceSession<T: Transport> {
    transport: T,
    busy: Mutex<()>,
    pub device_name: Option<String>,
    pub firmware_version: Option<String>,
    pub current_slot: i32,
}

fn unknown_response(data: &[u8]) -> DeviceError {
    let mut head = [0u8; 8];
    for (dst, src) in head.iter_mut().zip(data) {
        *dst = *src;
    }
    DeviceError::UnknownResponse(head, data.len())
}

impl<T: Transport> DeviceSession<T> {
    pub fn new(transport: T, device_name: Option<String>) -> Self {
        DeviceSession {
            transport,
            busy: Mutex::new(()),
            device_name,
            firmware_version: None,
            current_slot: -1,
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, DeviceError> {
        self.busy.try_lock().map_err(|_| DeviceError::DeviceBusy())
    }

    /// Read the firmware version as three ASCII digits.
    pub fn read_firmware_version(&self) -> Result<String, DeviceError> {
        let _guard = self.acquire()?;
        self.transport
            .send_report(REPORT_ID, &[READ, CMD_VERSION, END])?;
        let response = self.transport.await_input_report(RESPONSE_TIMEOUT)?;
        if response.len() < 6 {
            return Err(unknown_response(&response));
        }
        Ok(response[3..6].iter().map(|&b| b as char).collect())
    }

    /// Read the active EQ slot, `-1` if the response carries no slot byte.
    pub fn read_current_slot(&self) -> Result<i32, DeviceError> {
        let _guard = self.acquire()?;
        self.transport
            .send_report(REPORT_ID, &[READ, CMD_PEQ_VALUES, END])?;
        let response = self.transport.await_input_report(RESPONSE_TIMEOUT)?;
        Ok(response.get(35).map(|&b| b as i32).unwrap_or(-1))
    }

    /// Pull all 10 filters plus the global gain.
    ///
    /// Filter slots the device never answers for default to the neutral
    /// band, and a failed global-gain read defaults to 0 dB; losing the
    /// global gain is less severe than losing filter data.
    pub fn pull_filters(&self) -> Result<DeviceEq, DeviceError> {
        let _guard = self.acquire()?;
        let deadline = Instant::now() + PULL_TIMEOUT;

        for index in 0..MAX_FILTERS {
            self.transport.send_report(
                REPORT_ID,
                &[READ, CMD_PEQ_VALUES, 0x00, 0x00, index as u8, END],
            )?;
            std::thread::sleep(COMMAND_DELAY);
        }

        let mut filters: [Option<Band>; NUM_BANDS] = [None; NUM_BANDS];
        let mut received = 0;
        while received < MAX_FILTERS {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let response = match self.transport.await_input_report(remaining) {
                Ok(response) => response,
                Err(DeviceError::Timeout()) => break,
                Err(err) => return Err(err),
            };
            if response.len() < 32 {
                continue;
            }
            let Some(parsed) = parse_filter_packet(&response) else {
                continue;
            };
            if let Some(slot) = filters.get_mut(parsed.filter_index as usize) {
                if slot.is_none() {
                    received += 1;
                }
                *slot = Some(parsed.to_band());
            }
        }

        let global_gain = self.read_global_gain_locked().unwrap_or(0.0);

        let bands = filters.map(|band| band.unwrap_or_else(neutral_band));
        Ok(DeviceEq { bands, global_gain })
    }

    /// Apply a configuration to the live filter bank (volatile memory).
    pub fn push_filters(
        &self,
        bands: &[Band],
        slot_id: u8,
        preamp: f64,
    ) -> Result<(), DeviceError> {
        let _guard = self.acquire()?;
        self.push_filters_locked(bands, slot_id, preamp)
    }

    /// Apply a configuration and persist it across power cycles.
    pub fn save_to_flash(
        &self,
        bands: &[Band],
        slot_id: u8,
        preamp: f64,
    ) -> Result<(), DeviceError> {
        let _guard = self.acquire()?;
        self.push_filters_locked(bands, slot_id, preamp)?;
        self.transport
            .send_report(REPORT_ID, &[WRITE, CMD_FLASH_EQ, 0x01, END])
    }

    /// The 4-phase push: mute, write filters, commit, restore gain.
    /// The order is a hard invariant; a half-written bank must never be
    /// audible at full gain.
    fn push_filters_locked(
        &self,
        bands: &[Band],
        slot_id: u8,
        preamp: f64,
    ) -> Result<(), DeviceError> {
        self.write_global_gain_locked(GLOBAL_GAIN_MUTE)?;

        for (index, band) in bands.iter().take(MAX_FILTERS).enumerate() {
            let packet = build_filter_packet(index as u8, band, slot_id);
            self.transport.send_report(REPORT_ID, &packet)?;
        }

        // TEMP_WRITE activates the new bank in volatile memory.
        self.transport.send_report(
            REPORT_ID,
            &[WRITE, CMD_TEMP_WRITE, 0x04, 0x00, 0x00, 0xff, 0xff, END],
        )?;

        std::thread::sleep(COMMAND_DELAY);
        self.write_global_gain_locked(preamp)
    }

    fn write_global_gain_locked(&self, gain: f64) -> Result<(), DeviceError> {
        let byte = encode_global_gain(gain);
        self.transport
            .send_report(REPORT_ID, &[WRITE, CMD_GLOBAL_GAIN, 0x01, 0x00, byte, END])?;
        std::thread::sleep(COMMAND_DELAY);
        Ok(())
    }

    fn read_global_gain_locked(&self) -> Result<f64, DeviceError> {
        self.transport
            .send_report(REPORT_ID, &[READ, CMD_GLOBAL_GAIN, 0x00])?;
        let response = self.transport.await_input_report(GLOBAL_GAIN_TIMEOUT)?;
        // A response that does not echo the command is treated as "no value".
        if response.len() < 5 || response[0] != READ || response[1] != CMD_GLOBAL_GAIN {
            return Ok(0.0);
        }
        Ok(response[4] as i8 as f64)
    }
}
