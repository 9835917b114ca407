//! Signal Decoding Engine
//!
//! Extracts signal values from a raw 64-bit CAN payload based on the signal
//! definitions of a parsed [`Frame`]. Handles byte order, masking, sign
//! extension and physical value conversion.
//!
//! # Byte order
//!
//! Intel (little-endian) signals are handled by reversing the eight payload
//! bytes before extraction; Motorola (big-endian) signals are extracted from
//! the payload as-is. Bit `n` is always bit `n` of the resulting integer. This
//! is a simplification of the DBC bit numbering: it corrects byte order but
//! not the Motorola start-bit convention, so fields that cross byte boundaries
//! can decode differently from tools that implement the full scheme.

use crate::signals::frame::{ByteOrder, Frame, Signal, ValueType};
use crate::types::{DecoderError, Result};
use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

/// Signal decoder - extracts physical values from CAN payloads
pub struct SignalDecoder;

impl SignalDecoder {
    /// Decode the named signal from a payload into its physical value
    ///
    /// # Arguments
    /// * `frame` - Message definition holding the signal
    /// * `signal_name` - Name of the signal to decode
    /// * `payload` - Up to 8 data bytes packed into a `u64`
    ///
    /// # Returns
    /// * `Ok(value)` - `raw * scale + offset`
    /// * `Err(DecoderError::UnknownSignal)` if the frame has no such signal
    pub fn decode(frame: &Frame, signal_name: &str, payload: u64) -> Result<f64> {
        let signal = Self::lookup(frame, signal_name)?;
        Ok(Self::decode_signal(signal, payload))
    }

    /// Like [`SignalDecoder::decode`], but rejects values outside the
    /// declared `[min, max]` range.
    ///
    /// Signals declared with `[0|0]` carry no range and are never rejected.
    pub fn decode_checked(frame: &Frame, signal_name: &str, payload: u64) -> Result<f64> {
        let signal = Self::lookup(frame, signal_name)?;
        let value = Self::decode_signal(signal, payload);
        Self::check_range(signal, value)?;
        Ok(value)
    }

    /// Decode a signal definition against a payload
    pub fn decode_signal(signal: &Signal, payload: u64) -> f64 {
        let field = Self::extract_field(signal, payload);

        let raw = match signal.value_type {
            ValueType::Unsigned => field as f64,
            ValueType::Signed => Self::sign_extend(field, signal.length) as f64,
        };

        raw * signal.scale + signal.offset
    }

    /// Raw integer value of a signal, sign-extended for signed signals
    ///
    /// Unsigned 64-bit fields with the top bit set wrap around; use
    /// [`SignalDecoder::extract_field`] for the unsigned bits.
    pub fn decode_raw(signal: &Signal, payload: u64) -> i64 {
        let field = Self::extract_field(signal, payload);
        match signal.value_type {
            ValueType::Unsigned => field as i64,
            ValueType::Signed => Self::sign_extend(field, signal.length),
        }
    }

    /// Extract the unsigned bit field of a signal
    pub fn extract_field(signal: &Signal, payload: u64) -> u64 {
        let normalized = Self::normalize_byte_order(signal.byte_order, payload);
        let mask = Self::field_mask(signal.start_bit, signal.length);
        (normalized & mask)
            .checked_shr(u32::from(signal.start_bit))
            .unwrap_or(0)
    }

    /// Build a payload with exactly the given raw field set
    ///
    /// The inverse of [`SignalDecoder::extract_field`]; bits of `raw` above the
    /// signal length are dropped.
    pub fn encode_raw(signal: &Signal, raw: u64) -> u64 {
        let mask = Self::field_mask(signal.start_bit, signal.length);
        let placed = raw.checked_shl(u32::from(signal.start_bit)).unwrap_or(0) & mask;
        // A byte swap is its own inverse
        Self::normalize_byte_order(signal.byte_order, placed)
    }

    /// Reverse the payload bytes for little-endian signals
    pub fn normalize_byte_order(byte_order: ByteOrder, payload: u64) -> u64 {
        match byte_order {
            ByteOrder::BigEndian => payload,
            ByteOrder::LittleEndian => {
                let mut bytes = [0u8; 8];
                BigEndian::write_u64(&mut bytes, payload);
                LittleEndian::read_u64(&bytes)
            }
        }
    }

    /// Mask of `length` contiguous one-bits starting at `start_bit`
    ///
    /// Computed in 64 bits so that `length == 64` yields all ones.
    pub fn field_mask(start_bit: u8, length: u8) -> u64 {
        let ones = match length {
            0 => 0,
            n if n >= 64 => u64::MAX,
            n => (1u64 << n) - 1,
        };
        ones.checked_shl(u32::from(start_bit)).unwrap_or(0)
    }

    /// Sign-extend a value from N bits to 64 bits
    ///
    /// If the value's MSB is 1, fill the upper bits with 1s.
    pub fn sign_extend(value: u64, bit_length: u8) -> i64 {
        if bit_length == 0 {
            return 0;
        }
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }

    fn lookup<'a>(frame: &'a Frame, signal_name: &str) -> Result<&'a Signal> {
        frame
            .signal(signal_name)
            .ok_or_else(|| DecoderError::UnknownSignal(signal_name.to_string()))
    }

    pub(crate) fn check_range(signal: &Signal, value: f64) -> Result<()> {
        if !signal.has_range() {
            return Ok(());
        }

        // Allow for rounding in raw * scale + offset
        let tolerance = 1e-9 * signal.min.abs().max(signal.max.abs()).max(1.0);
        if value < signal.min - tolerance || value > signal.max + tolerance {
            return Err(DecoderError::OutOfRange {
                signal: signal.name.clone(),
                value,
                min: signal.min,
                max: signal.max,
            });
        }
        Ok(())
    }
}
