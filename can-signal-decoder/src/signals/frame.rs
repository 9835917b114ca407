//! Frame and signal definitions
//!
//! A `Frame` is the single message definition parsed from a DBC file. It owns
//! its signals by value, keyed by name.

use std::collections::HashMap;

/// A CAN message definition
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Declared message size in bytes (not enforced against payloads)
    pub byte_length: usize,
    /// Sender node name (optional)
    pub sender: Option<String>,
    /// Signals keyed by name
    pub signals: HashMap<String, Signal>,
}

/// A CAN signal definition
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name
    pub name: String,
    /// Start bit in the 64-bit payload
    pub start_bit: u8,
    /// Length in bits (1-64)
    pub length: u8,
    /// Byte order (Motorola or Intel)
    pub byte_order: ByteOrder,
    /// Value type (signed/unsigned)
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub scale: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h"), empty when undeclared
    pub unit: String,
    /// Receiving node names
    pub receivers: Vec<String>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format), DBC marker `1`
    LittleEndian,
    /// Big-endian (Motorola format), DBC marker `0`
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Two's-complement signed integer, DBC marker `-`
    Signed,
    /// Unsigned integer, DBC marker `+`
    Unsigned,
}

impl Frame {
    /// Create a frame with no signals
    pub fn new(id: u32, name: impl Into<String>, byte_length: usize) -> Self {
        Self {
            id,
            name: name.into(),
            byte_length,
            sender: None,
            signals: HashMap::new(),
        }
    }

    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    /// All signal names, sorted
    pub fn signal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.signals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Signal {
    pub fn is_big_endian(&self) -> bool {
        self.byte_order == ByteOrder::BigEndian
    }

    pub fn is_signed(&self) -> bool {
        self.value_type == ValueType::Signed
    }

    /// Whether the declared range carries information.
    ///
    /// `[0|0]` is the DBC idiom for "no range given".
    pub fn has_range(&self) -> bool {
        !(self.min == 0.0 && self.max == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(name: &str) -> Signal {
        Signal {
            name: name.to_string(),
            start_bit: 0,
            length: 16,
            byte_order: ByteOrder::LittleEndian,
            value_type: ValueType::Unsigned,
            scale: 0.01,
            offset: 0.0,
            min: 0.0,
            max: 655.35,
            unit: "km/h".to_string(),
            receivers: Vec::new(),
        }
    }

    #[test]
    fn test_frame_lookup() {
        let mut frame = Frame::new(100, "ECU_WheelSpeed", 8);
        for name in ["WheelSpeedRR", "WheelSpeedFL"] {
            frame.signals.insert(name.to_string(), signal(name));
        }

        assert_eq!(frame.signal_names(), vec!["WheelSpeedFL", "WheelSpeedRR"]);
        assert!(frame.signal("WheelSpeedFL").is_some());
        assert!(frame.signal("WheelSpeedXX").is_none());
    }

    #[test]
    fn test_signal_flags() {
        let mut sig = signal("WheelSpeedFR");
        assert!(!sig.is_big_endian());
        assert!(!sig.is_signed());
        assert!(sig.has_range());

        sig.byte_order = ByteOrder::BigEndian;
        sig.value_type = ValueType::Signed;
        sig.max = 0.0;
        assert!(sig.is_big_endian());
        assert!(sig.is_signed());
        assert!(!sig.has_range());
    }
}
