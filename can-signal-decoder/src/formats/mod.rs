//! Log file format parsers
//!
//! Each parser turns a log source into an iterator over `Payload` values.

pub mod candump;

// Re-export parser types
pub use candump::{parse_candump_line, CandumpFrameIterator, CandumpParser};
