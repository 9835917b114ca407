//! candump log file parser
//!
//! Reads the text format written by linux-can `candump -l`:
//!
//! ```text
//! (1600000000.000000) can0 064#00FF000000000000
//! ```
//!
//! Each line becomes a [`Payload`]. The data bytes are packed into a `u64`
//! exactly as an 8-byte frame would be: the first byte on the wire is the
//! most significant byte and missing trailing bytes are zero
//! (`1027` is `0x1027_0000_0000_0000`).
//!
//! ## Known Limitations
//! - CAN-FD lines (`id##flags data`) are rejected
//! - Remote frames (`id#R`) are rejected

use crate::types::{DecoderError, Payload, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Maximum number of hex digits in a classic CAN payload
const MAX_DATA_DIGITS: usize = 16;

/// Parse a single candump log line
///
/// Errors carry line number 0; use [`CandumpParser`] for numbered errors.
pub fn parse_candump_line(line: &str) -> Result<Payload> {
    parse_line(0, line)
}

fn parse_line(line_no: usize, line: &str) -> Result<Payload> {
    let mut tokens = line.split_whitespace();
    let (timestamp, interface, frame) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(t), Some(i), Some(f)) => (t, i, f),
        _ => {
            return Err(DecoderError::log(
                line_no,
                format!("expected '<timestamp> <interface> <id>#<data>', found '{}'", line.trim()),
            ))
        }
    };

    let (id, data) = frame
        .split_once('#')
        .ok_or_else(|| DecoderError::log(line_no, format!("missing '#' in frame '{}'", frame)))?;

    if data.starts_with('#') {
        return Err(DecoderError::log(line_no, "CAN-FD frames are not supported"));
    }
    if data.starts_with(['R', 'r']) {
        return Err(DecoderError::log(line_no, "remote frames carry no data"));
    }

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecoderError::log(line_no, format!("invalid CAN ID '{}'", id)));
    }
    let can_id = u32::from_str_radix(id, 16)
        .map_err(|e| DecoderError::log(line_no, format!("invalid CAN ID '{}': {}", id, e)))?;

    if !data.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecoderError::log(line_no, format!("invalid payload '{}'", data)));
    }
    if data.len() > MAX_DATA_DIGITS {
        return Err(DecoderError::log(
            line_no,
            format!("payload '{}' is longer than 8 bytes", data),
        ));
    }
    if data.len() % 2 != 0 {
        return Err(DecoderError::log(
            line_no,
            format!("payload '{}' has an odd number of hex digits", data),
        ));
    }

    let dlc = data.len() / 2;
    let value = if data.is_empty() {
        0
    } else {
        u64::from_str_radix(data, 16)
            .map_err(|e| DecoderError::log(line_no, format!("invalid payload '{}': {}", data, e)))?
    };
    // Pad missing trailing bytes so byte 0 is always bits 56..63
    let payload = value
        .checked_shl(8 * (MAX_DATA_DIGITS / 2 - dlc) as u32)
        .unwrap_or(0);

    Ok(Payload {
        timestamp: timestamp.to_string(),
        interface: interface.to_string(),
        can_id,
        data: payload,
        dlc,
    })
}

/// candump log file parser
pub struct CandumpParser;

impl CandumpParser {
    /// Open a candump log file and return an iterator over its payloads
    pub fn parse(path: &Path) -> Result<CandumpFrameIterator<BufReader<File>>> {
        log::info!("Parsing candump file: {:?}", path);

        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Iterate over the payloads of any buffered candump source
    pub fn from_reader<R: BufRead>(reader: R) -> CandumpFrameIterator<R> {
        CandumpFrameIterator {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

/// Iterator over payloads from a candump source
///
/// Blank lines and lines starting with `#` are skipped. A malformed line
/// yields an error and iteration continues with the next line.
pub struct CandumpFrameIterator<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> Iterator for CandumpFrameIterator<R> {
    type Item = Result<Payload>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;

            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                log::trace!("Skipping line {}", self.line_no);
                continue;
            }

            return Some(parse_line(self.line_no, trimmed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candump_line() {
        let payload = parse_candump_line("(1600000000.000000) can0 064#00FF000000000000").unwrap();
        assert_eq!(payload.timestamp, "(1600000000.000000)");
        assert_eq!(payload.interface, "can0");
        assert_eq!(payload.can_id, 0x64);
        assert_eq!(payload.data, 0x00FF000000000000);
        assert_eq!(payload.dlc, 8);
    }

    #[test]
    fn test_short_payload_is_left_aligned() {
        let payload = parse_candump_line("(1.5) vcan0 705#00FF").unwrap();
        assert_eq!(payload.can_id, 0x705);
        assert_eq!(payload.data, 0x00FF_0000_0000_0000);
        assert_eq!(payload.dlc, 2);

        let single = parse_candump_line("(1.5) vcan0 705#AB").unwrap();
        assert_eq!(single.data, 0xAB00_0000_0000_0000);
        assert_eq!(single.dlc, 1);

        let empty = parse_candump_line("(1.5) vcan0 705#").unwrap();
        assert_eq!(empty.data, 0);
        assert_eq!(empty.dlc, 0);
    }

    #[test]
    fn test_extended_id() {
        let payload = parse_candump_line("(0.0) can1 18FEF100#0102030405060708").unwrap();
        assert_eq!(payload.can_id, 0x18FEF100);
        assert_eq!(payload.data, 0x0102030405060708);
    }

    #[test]
    fn test_rejects_malformed_lines() {
        for line in [
            "",
            "(0.0) can0",
            "(0.0) can0 064",
            "(0.0) can0 #0011",
            "(0.0) can0 0G4#00",
            "(0.0) can0 064#00ZZ",
            "(0.0) can0 064#001122334455667788",
            "(0.0) can0 064#123",
            "(0.0) can0 064##1001122",
            "(0.0) can0 064#R",
        ] {
            let err = parse_candump_line(line).unwrap_err();
            assert!(
                matches!(err, DecoderError::LogParseError { line: 0, .. }),
                "line '{}' gave {:?}",
                line,
                err
            );
        }
    }

    #[test]
    fn test_iterator_skips_comments_and_numbers_lines() {
        let log = "# recorded on the test bench\n\
                   (1.0) can0 064#00000000000000FF\n\
                   \n\
                   garbage\n\
                   (2.0) can0 064#0000000000000001\n";

        let items: Vec<_> = CandumpParser::from_reader(log.as_bytes()).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().data, 0xFF);
        assert!(matches!(items[1], Err(DecoderError::LogParseError { line: 4, .. })));
        assert_eq!(items[2].as_ref().unwrap().timestamp, "(2.0)");
    }

    #[test]
    fn test_file_not_found() {
        let result = CandumpParser::parse(Path::new("nonexistent.log"));
        assert!(matches!(result, Err(DecoderError::IoError(_))));
    }
}
