//! Fixed-point wire codec for PEQ filter packets.
//!
//! The device takes the five normalized biquad terms as 30-bit fixed point
//! (a1/a2 negated on the wire) plus the human-facing parameters in ×256
//! fixed point, so a pulled configuration can be re-edited without
//! re-deriving parameters from coefficients.

use super::{CMD_PEQ_VALUES, END, WRITE};
use crate::eq::biquad::compute_coefficients;
use crate::eq::{round_to, Band, FilterType, SAMPLE_RATE};

pub(crate) const FIXED_POINT_SCALE: f64 = (1u64 << 30) as f64;

pub fn filter_type_to_byte(filter_type: FilterType) -> u8 {
    match filter_type {
        FilterType::LowShelf => 1,
        FilterType::Peaking => 2,
        FilterType::HighShelf => 3,
    }
}

/// Unknown codes decode as peaking.
pub fn byte_to_filter_type(byte: u8) -> FilterType {
    match byte {
        1 => FilterType::LowShelf,
        3 => FilterType::HighShelf,
        _ => FilterType::Peaking,
    }
}

/// 20 bytes of IIR coefficients: `{b0, b1, b2, -a1, -a2}` quantized to
/// 30-bit fixed point and packed as five 32-bit LE two's-complement words.
pub fn encode_iir_bytes(freq: u32, gain: f64, q: f64, filter_type: FilterType) -> [u8; 20] {
    let coeffs = compute_coefficients(freq as f64, gain, q, filter_type, SAMPLE_RATE);
    let terms = [coeffs.b0, coeffs.b1, coeffs.b2, -coeffs.a1, -coeffs.a2];

    let mut bytes = [0u8; 20];
    for (chunk, term) in bytes.chunks_exact_mut(4).zip(terms) {
        // i64 -> i32 keeps the low 32 bits, matching the device firmware's
        // 32-bit wrap for out-of-range terms.
        let fixed = (term * FIXED_POINT_SCALE).round() as i64 as i32;
        chunk.copy_from_slice(&fixed.to_le_bytes());
    }
    bytes
}

/// Plain integer Hz, no scaling.
pub fn encode_freq(freq: u32) -> [u8; 2] {
    (freq as u16).to_le_bytes()
}

pub fn encode_q(q: f64) -> [u8; 2] {
    ((q * 256.0).round() as u16).to_le_bytes()
}

/// ×256 fixed point, 16-bit two's complement.
pub fn encode_gain(gain: f64) -> [u8; 2] {
    ((gain * 256.0).round() as i16).to_le_bytes()
}

/// Single signed byte, clamped to the i8 range.
pub fn encode_global_gain(gain: f64) -> u8 {
    gain.round().clamp(-128.0, 127.0) as i8 as u8
}

/// Assemble the complete 37-byte PEQ write packet for one filter slot.
/// A disabled band is transmitted with gain 0 but keeps its parameters.
pub fn build_filter_packet(filter_index: u8, band: &Band, slot_id: u8) -> Vec<u8> {
    let gain = band.effective_gain();
    let iir = encode_iir_bytes(band.freq, gain, band.q, band.filter_type);

    let mut packet = vec![WRITE, CMD_PEQ_VALUES, 0x18, 0x00, filter_index, 0x00, 0x00];
    packet.extend_from_slice(&iir);
    packet.extend_from_slice(&encode_freq(band.freq));
    packet.extend_from_slice(&encode_q(band.q));
    packet.extend_from_slice(&encode_gain(gain));
    packet.push(filter_type_to_byte(band.filter_type));
    packet.push(0x00);
    packet.push(slot_id);
    packet.push(END);
    packet
}

/// One filter parsed out of a PEQ read response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedFilter {
    pub filter_index: u8,
    pub freq: u32,
    pub q: f64,
    pub gain: f64,
    pub filter_type: FilterType,
}

impl ParsedFilter {
    /// The read packet carries no on/off bit; a filter counts as enabled
    /// when its gain or frequency is nonzero.
    pub fn to_band(self) -> Band {
        Band {
            freq: self.freq,
            gain: self.gain,
            q: self.q,
            filter_type: self.filter_type,
            enabled: self.gain != 0.0 || self.freq != 0,
        }
    }
}

/// Parse a filter from a response packet. Returns `None` for packets too
/// short to hold the parsed region.
pub fn parse_filter_packet(packet: &[u8]) -> Option<ParsedFilter> {
    if packet.len() < 34 {
        return None;
    }
    let freq = u16::from_le_bytes([packet[27], packet[28]]) as u32;
    let q = round_to(u16::from_le_bytes([packet[29], packet[30]]) as f64 / 256.0, 2);
    let gain = round_to(i16::from_le_bytes([packet[31], packet[32]]) as f64 / 256.0, 2);
    Some(ParsedFilter {
        filter_index: packet[4],
        freq,
        q,
        gain,
        filter_type: byte_to_filter_type(packet[33]),
    })
}
