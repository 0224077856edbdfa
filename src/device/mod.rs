pub mod codec;
pub mod session;
pub mod transport;

use hidapi::{HidApi, HidError};
use thistermination::TerminationFull;

use crate::device::session::DeviceSession;
use crate::device::transport::HidTransport;

// Vendor IDs of Walkplay-based devices [CrinEar, Moondrop, ...].
pub const VENDOR_IDS: [u16; 9] = [
    0x3302, 0x0762, 0x35d8, 0x2fc6, 0x0104, 0xb445, 0x0661, 0x0666, 0x0d8c,
];

/// Report id used for every report in both directions.
pub const REPORT_ID: u8 = 0x4b;

// Direction prefixes and packet terminator.
pub const READ: u8 = 0x80;
pub const WRITE: u8 = 0x01;
pub const END: u8 = 0x00;

// Command codes.
pub const CMD_PEQ_VALUES: u8 = 0x09;
pub const CMD_VERSION: u8 = 0x0c;
pub const CMD_TEMP_WRITE: u8 = 0x0a;
pub const CMD_FLASH_EQ: u8 = 0x01;
pub const CMD_GET_SLOT: u8 = 0x0f;
pub const CMD_GLOBAL_GAIN: u8 = 0x03;

#[derive(TerminationFull)]
pub enum DeviceError {
    #[termination(msg("{0:?}"))]
    HidError(#[from] HidError),
    #[termination(msg("No compatible device found."))]
    NoDeviceFound(),
    #[termination(msg("Device is busy with another operation."))]
    DeviceBusy(),
    #[termination(msg("No response from the device."))]
    Timeout(),
    #[termination(msg("Unknown response: {0:?} with length: {1:?}"))]
    UnknownResponse([u8; 8], usize),
}

/// Find the first device on the vendor allow-list, open it and run the
/// connect handshake. Firmware version and slot reads are best-effort;
/// some devices answer neither.
pub fn connect_compatible_device() -> Result<DeviceSession<HidTransport>, DeviceError> {
    let hid_api = HidApi::new()?;
    let info = hid_api
        .device_list()
        .find(|info| VENDOR_IDS.contains(&info.vendor_id()))
        .ok_or(DeviceError::NoDeviceFound())?;
    let hid_device = hid_api.open(info.vendor_id(), info.product_id())?;
    let device_name = hid_device.get_product_string()?;
    println!(
        "Connecting to {}",
        device_name.as_deref().unwrap_or("unknown device")
    );

    let mut session = DeviceSession::new(HidTransport::new(hid_device), device_name);
    let firmware_version = session.read_firmware_version().ok();
    session.firmware_version = firmware_version;
    let current_slot = session.read_current_slot().unwrap_or(-1);
    session.current_slot = current_slot;
    Ok(session)
}
