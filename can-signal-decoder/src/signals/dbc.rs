//! DBC file parser
//!
//! Parses the message block of a Vector DBC file into a [`Frame`]. Only the
//! first `BO_` definition and the `SG_` lines directly beneath it are read;
//! the block ends at the first blank line.
//!
//! ```text
//! BO_ 100 ECU_WheelSpeed: 8 VECTOR__XXX
//!  SG_ WheelSpeedFR : 0|16@1+ (0.01,0) [0|655.35] "km/h" Vector__XXX
//! ```

use crate::signals::frame::{ByteOrder, Frame, Signal, ValueType};
use crate::types::{DecoderError, ParseErrorKind, Result};
use std::io::BufRead;
use std::path::Path;

const MESSAGE_KEYWORD: &str = "BO_";
const SIGNAL_KEYWORD: &str = "SG_";

/// Width of the payload in bits; no signal may extend past it
const PAYLOAD_BITS: u32 = 64;

/// Parse a DBC file and return its message definition
pub fn parse_dbc_file(path: &Path) -> Result<Frame> {
    log::info!("Parsing DBC file: {:?}", path);

    let bytes = std::fs::read(path)?;

    // Try UTF-8 first, then fall back to Latin-1
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("DBC file {:?} is not UTF-8, trying Latin-1 encoding", path);
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    parse_dbc_str(&content)
}

/// Parse DBC text from any buffered reader
pub fn parse_dbc_reader<R: BufRead>(mut reader: R) -> Result<Frame> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_dbc_str(&content)
}

/// Parse DBC text held in memory
pub fn parse_dbc_str(text: &str) -> Result<Frame> {
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    // Move through the input until we find the message definition
    let (header_line, header) = lines
        .by_ref()
        .find(|(_, line)| first_token(line) == Some(MESSAGE_KEYWORD))
        .ok_or_else(|| {
            let last_line = text.lines().count();
            DecoderError::dbc(last_line, ParseErrorKind::MissingHeader)
        })?;

    let mut frame = parse_message_header(header_line, header)?;

    for (line_no, line) in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }

        let signal = parse_signal(line_no, line)?;
        log::debug!(
            "Signal {} at {}|{} ({:?}, {:?})",
            signal.name,
            signal.start_bit,
            signal.length,
            signal.byte_order,
            signal.value_type
        );

        if frame.signals.contains_key(&signal.name) {
            return Err(DecoderError::dbc(
                line_no,
                ParseErrorKind::DuplicateSignal(signal.name),
            ));
        }
        frame.signals.insert(signal.name.clone(), signal);
    }

    if lines.any(|(_, line)| first_token(line) == Some(MESSAGE_KEYWORD)) {
        log::warn!(
            "Only the first message definition ({}) is used; later BO_ blocks are ignored",
            frame.name
        );
    }

    log::info!(
        "Parsed message {} (ID 0x{:X}) with {} signals",
        frame.name,
        frame.id,
        frame.signals.len()
    );

    Ok(frame)
}

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Parse `BO_ <id> <name>: <length> [sender]`
fn parse_message_header(line_no: usize, line: &str) -> Result<Frame> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let malformed = || {
        DecoderError::dbc(
            line_no,
            ParseErrorKind::MalformedHeader(line.trim().to_string()),
        )
    };

    let id_token = tokens.get(1).ok_or_else(malformed)?;
    let name_token = tokens.get(2).ok_or_else(malformed)?;

    // Accept both `Name:` and `Name :`
    let (name, rest) = match name_token.strip_suffix(':') {
        Some(name) if !name.is_empty() => (name, &tokens[3..]),
        _ if tokens.get(3) == Some(&":") => (*name_token, &tokens[4..]),
        _ => return Err(malformed()),
    };

    let length_token = rest.first().ok_or_else(malformed)?;

    let id: u32 = parse_number(line_no, "message id", id_token)?;
    let byte_length: usize = parse_number(line_no, "message length", length_token)?;

    let mut frame = Frame::new(id, name, byte_length);
    frame.sender = rest.get(1).map(|s| s.to_string());
    Ok(frame)
}

/// Parse `SG_ <name> : <start>|<length>@<endian><sign> (<scale>,<offset>) [<min>|<max>] "<unit>" [receivers]`
fn parse_signal(line_no: usize, line: &str) -> Result<Signal> {
    let details = line.trim_start_matches([' ', '\t']);
    let tokens: Vec<&str> = details.split_whitespace().collect();
    let missing = |what: &str| DecoderError::dbc(line_no, ParseErrorKind::MissingFields(what.to_string()));

    if tokens.first() != Some(&SIGNAL_KEYWORD) {
        return Err(missing(&format!("expected SG_ definition, found '{}'", details.trim_end())));
    }
    if tokens.len() < 6 {
        return Err(missing("expected name, ':', bit spec, (scale,offset) and [min|max]"));
    }

    let name = tokens[1];
    if tokens[2] != ":" {
        return Err(missing(&format!("expected ':' after signal name {}", name)));
    }

    let (start_bit, length, byte_order, value_type) = parse_bit_spec(line_no, tokens[3])?;
    if length == 0 {
        return Err(malformed_field(line_no, name, "signal length must be at least 1 bit".to_string()));
    }
    if start_bit.saturating_add(length) > PAYLOAD_BITS {
        return Err(malformed_field(
            line_no,
            name,
            format!("bits {}..{} exceed the {}-bit payload", start_bit, start_bit.saturating_add(length), PAYLOAD_BITS),
        ));
    }

    let (scale, offset) = split_delimited(tokens[4], '(', ')', ',')
        .ok_or_else(|| missing(&format!("expected (scale,offset), found '{}'", tokens[4])))?;
    let scale = parse_factor(line_no, name, "scale", scale)?;
    let offset = parse_factor(line_no, name, "offset", offset)?;

    let (min, max) = split_delimited(tokens[5], '[', ']', '|')
        .ok_or_else(|| missing(&format!("expected [min|max], found '{}'", tokens[5])))?;
    let min: f64 = parse_number(line_no, "min", min)?;
    let max: f64 = parse_number(line_no, "max", max)?;

    // The unit sits between the first two quotes, wherever they are
    let (unit, receivers) = match details.split_once('"') {
        Some((_, after_open)) => {
            let (unit, after_close) = after_open
                .split_once('"')
                .ok_or_else(|| missing("unterminated unit string"))?;
            let receivers = after_close
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            (unit.to_string(), receivers)
        }
        None => (String::new(), Vec::new()),
    };

    Ok(Signal {
        name: name.to_string(),
        start_bit: start_bit as u8,
        length: length as u8,
        byte_order,
        value_type,
        scale,
        offset,
        min,
        max,
        unit,
        receivers,
    })
}

/// Parse `start|length@<endian><sign>`, e.g. `32|16@0+`
fn parse_bit_spec(line_no: usize, spec: &str) -> Result<(u32, u32, ByteOrder, ValueType)> {
    let missing = || {
        DecoderError::dbc(
            line_no,
            ParseErrorKind::MissingFields(format!("expected start|length@order sign, found '{}'", spec)),
        )
    };

    let (start, rest) = spec.split_once('|').ok_or_else(missing)?;
    let (length, marker) = rest.split_once('@').ok_or_else(missing)?;

    let byte_order = match marker.as_bytes() {
        [b'0', _] => ByteOrder::BigEndian,
        [b'1', _] => ByteOrder::LittleEndian,
        _ => return Err(missing()),
    };
    let value_type = match marker.as_bytes()[1] {
        b'+' => ValueType::Unsigned,
        b'-' => ValueType::Signed,
        _ => return Err(missing()),
    };

    let start: u32 = parse_number(line_no, "start bit", start)?;
    let length: u32 = parse_number(line_no, "signal length", length)?;

    Ok((start, length, byte_order, value_type))
}

/// Strip `open`/`close` from `token` and split the inside on `sep`
fn split_delimited(token: &str, open: char, close: char, sep: char) -> Option<(&str, &str)> {
    token
        .strip_prefix(open)?
        .strip_suffix(close)?
        .split_once(sep)
}

fn parse_number<T: std::str::FromStr>(line_no: usize, field: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        DecoderError::dbc(
            line_no,
            ParseErrorKind::InvalidNumber {
                field,
                value: value.to_string(),
            },
        )
    })
}

/// Scale and offset feed the value computation directly, so a bad one makes
/// the whole signal unusable.
fn parse_factor(line_no: usize, signal: &str, field: &str, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(malformed_field(line_no, signal, format!("invalid {} '{}'", field, value))),
    }
}

fn malformed_field(line: usize, signal: &str, reason: String) -> DecoderError {
    DecoderError::MalformedField {
        line,
        signal: signal.to_string(),
        reason,
    }
}
