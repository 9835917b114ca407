//! Signal definitions and the DBC parser
//!
//! This module contains the parser for DBC signal database files and the
//! frame/signal types it produces.

pub mod dbc;
pub mod frame;

// Re-export key types for convenience
pub use dbc::{parse_dbc_file, parse_dbc_reader, parse_dbc_str};
pub use frame::{ByteOrder, Frame, Signal, ValueType};
