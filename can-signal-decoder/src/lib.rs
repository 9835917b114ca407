//! CAN Signal Decoder Library
//!
//! A small, stateless library for decoding physical signal values out of raw
//! CAN traffic with the help of a DBC message definition.
//!
//! # Architecture
//!
//! - The DBC parser reads the first `BO_` block of a DBC file into a `Frame`
//! - The signal decoder extracts a signal's bit field from a 64-bit payload,
//!   corrects byte order, sign-extends and applies scale/offset
//! - The candump reader turns `candump -l` log lines into payloads
//!
//! The library does NOT:
//! - Print or write output files
//! - Handle multiplexed signals, value tables or CAN-FD frames
//! - Read more than one message definition per DBC file
//!
//! Output formatting lives in the application layer (can-signal-cli).
//!
//! # Example Usage
//!
//! ```
//! use can_signal_decoder::{Decoder, DecoderConfig, Payload};
//!
//! let dbc = "BO_ 100 ECU_WheelSpeed: 8 VECTOR__XXX\n \
//!            SG_ WheelSpeedFR : 0|16@1+ (0.01,0) [0|655.35] \"km/h\" X\n";
//! let decoder = Decoder::from_dbc_str(dbc).unwrap();
//!
//! // Bytes 10 27 on the wire are 0x2710 little-endian = 10000
//! let payload = Payload::new(100, 0x1027_0000_0000_0000, "(1600000000.000000)");
//! let signals = decoder.decode_payload(&payload, &DecoderConfig::new());
//!
//! let speed = signals[0].as_ref().unwrap();
//! assert_eq!(speed.name, "WheelSpeedFR");
//! assert!((speed.value - 100.0).abs() < 1e-9);
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod formats;
pub mod signal_decoder;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::{Decoder, DecodingIterator};
pub use formats::{parse_candump_line, CandumpFrameIterator, CandumpParser};
pub use signal_decoder::SignalDecoder;
pub use signals::{parse_dbc_file, parse_dbc_reader, parse_dbc_str, ByteOrder, Frame, Signal, ValueType};
pub use types::{parse_timestamp, DecodedSignal, DecoderError, ParseErrorKind, Payload, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
