//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The `Decoder` owns the parsed `Frame` for the life of the run and decodes
//! payloads or whole candump logs against it.

use crate::config::DecoderConfig;
use crate::formats::{CandumpFrameIterator, CandumpParser};
use crate::signal_decoder::SignalDecoder;
use crate::signals::Frame;
use crate::types::{DecodedSignal, DecoderError, Payload, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
///
/// The frame is never mutated after construction, so a `Decoder` can be
/// shared by reference across threads.
#[derive(Debug, Clone)]
pub struct Decoder {
    frame: Frame,
}

impl Decoder {
    /// Create a decoder for an already parsed frame
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }

    /// Load a DBC file and build a decoder for its message definition
    ///
    /// # Example
    /// ```no_run
    /// use can_signal_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::from_dbc(Path::new("wheel_speed.dbc")).unwrap();
    /// println!("{} signals", decoder.frame().signals.len());
    /// ```
    pub fn from_dbc(path: &Path) -> Result<Self> {
        log::info!("Loading DBC file: {:?}", path);
        let frame = crate::signals::parse_dbc_file(path)?;
        log::info!("DBC file loaded successfully: {:?}", path);
        Ok(Self::new(frame))
    }

    /// Build a decoder from DBC text held in memory
    pub fn from_dbc_str(text: &str) -> Result<Self> {
        Ok(Self::new(crate::signals::parse_dbc_str(text)?))
    }

    /// The message definition this decoder works against
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Names of all signals in the frame, sorted
    pub fn signal_names(&self) -> Vec<&str> {
        self.frame.signal_names()
    }

    /// Decode one signal from a raw payload
    pub fn decode(&self, signal_name: &str, payload: u64) -> Result<f64> {
        SignalDecoder::decode(&self.frame, signal_name, payload)
    }

    /// Check that every signal named by the config exists in the frame
    pub fn validate_config(&self, config: &DecoderConfig) -> Result<()> {
        if let Some(names) = &config.signals {
            if let Some(missing) = names.iter().find(|n| self.frame.signal(n).is_none()) {
                return Err(DecoderError::UnknownSignal(missing.clone()));
            }
        }
        Ok(())
    }

    /// Decode the selected signals of one payload
    ///
    /// Returns one result per selected signal, or an empty list when the ID
    /// filter rejects the payload. An unknown or out-of-range signal only
    /// fails its own entry.
    pub fn decode_payload(&self, payload: &Payload, config: &DecoderConfig) -> Vec<Result<DecodedSignal>> {
        if !config.should_process_message(self.frame.id, payload.can_id) {
            log::trace!(
                "Skipping CAN ID 0x{:X} (decoding 0x{:X})",
                payload.can_id,
                self.frame.id
            );
            return Vec::new();
        }

        let names: Vec<&str> = match &config.signals {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => self.frame.signal_names(),
        };

        names
            .into_iter()
            .map(|name| -> Result<DecodedSignal> {
                let signal = self
                    .frame
                    .signal(name)
                    .ok_or_else(|| DecoderError::UnknownSignal(name.to_string()))?;

                let value = SignalDecoder::decode_signal(signal, payload.data);
                if config.enforce_range {
                    SignalDecoder::check_range(signal, value)?;
                }

                Ok(DecodedSignal {
                    timestamp: payload.timestamp.clone(),
                    name: signal.name.clone(),
                    value,
                    unit: signal.unit.clone(),
                    raw_value: SignalDecoder::decode_raw(signal, payload.data),
                })
            })
            .collect()
    }

    /// Decode a candump log file and return an iterator of decoded signals
    ///
    /// # Example
    /// ```no_run
    /// use can_signal_decoder::{Decoder, DecoderConfig};
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::from_dbc(Path::new("wheel_speed.dbc")).unwrap();
    /// let signals = decoder
    ///     .decode_file(Path::new("candump.log"), DecoderConfig::new())
    ///     .unwrap();
    ///
    /// for signal in signals {
    ///     match signal {
    ///         Ok(decoded) => println!("{}", decoded),
    ///         Err(e) => eprintln!("Error: {}", e),
    ///     }
    /// }
    /// ```
    pub fn decode_file(
        &self,
        path: &Path,
        config: DecoderConfig,
    ) -> Result<DecodingIterator<'_, CandumpFrameIterator<BufReader<File>>>> {
        log::info!("Decoding log file: {:?}", path);
        self.validate_config(&config)?;
        let payloads = CandumpParser::parse(path)?;
        Ok(DecodingIterator::new(payloads, self, config))
    }

    /// Decode candump lines from any buffered reader
    pub fn decode_reader<R: BufRead>(
        &self,
        reader: R,
        config: DecoderConfig,
    ) -> Result<DecodingIterator<'_, CandumpFrameIterator<R>>> {
        self.validate_config(&config)?;
        Ok(DecodingIterator::new(CandumpParser::from_reader(reader), self, config))
    }
}

/// Iterator that decodes payloads into decoded signals
///
/// Each payload expands to one item per selected signal. A bad log line
/// yields a single error item; a signal that fails to decode yields an error
/// in its own slot and its siblings are still emitted.
pub struct DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<Payload>>,
{
    payloads: I,
    decoder: &'a Decoder,
    config: DecoderConfig,
    pending: VecDeque<Result<DecodedSignal>>,
}

impl<'a, I> DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<Payload>>,
{
    fn new(payloads: I, decoder: &'a Decoder, config: DecoderConfig) -> Self {
        Self {
            payloads,
            decoder,
            config,
            pending: VecDeque::new(),
        }
    }
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<Payload>>,
{
    type Item = Result<DecodedSignal>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(signal) = self.pending.pop_front() {
                return Some(signal);
            }

            let payload = match self.payloads.next()? {
                Ok(payload) => payload,
                Err(e) => return Some(Err(e)),
            };

            self.pending
                .extend(self.decoder.decode_payload(&payload, &self.config));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DBC: &str = "BO_ 100 ECU_WheelSpeed: 8 VECTOR__XXX\n \
        SG_ WheelSpeedFL : 16|16@1+ (0.01,0) [0|655.35] \"km/h\" X\n \
        SG_ WheelSpeedFR : 0|16@1+ (0.01,0) [0|655.35] \"km/h\" X\n";

    fn decoder() -> Decoder {
        Decoder::from_dbc_str(DBC).unwrap()
    }

    #[test]
    fn test_decoder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Decoder>();
    }

    #[test]
    fn test_decode_payload_all_signals_sorted() {
        // FR = bytes 0-1 (10 00 -> 0x0010), FL = bytes 2-3 (E8 03 -> 0x03E8)
        let payload = Payload::new(100, 0x1000_E803_0000_0000, "(1.0)");
        let signals: Vec<_> = decoder()
            .decode_payload(&payload, &DecoderConfig::new())
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].name, "WheelSpeedFL");
        assert_eq!(signals[0].raw_value, 1000);
        assert!((signals[0].value - 10.0).abs() < 1e-9);
        assert_eq!(signals[1].name, "WheelSpeedFR");
        assert_eq!(signals[1].raw_value, 16);
        assert_eq!(signals[1].unit, "km/h");
        assert_eq!(signals[1].timestamp, "(1.0)");
    }

    #[test]
    fn test_decode_payload_respects_id_filter() {
        let payload = Payload::new(101, u64::MAX, "(1.0)");
        let decoder = decoder();

        assert!(decoder.decode_payload(&payload, &DecoderConfig::new()).is_empty());

        let config = DecoderConfig::new().with_id_filter(false);
        assert_eq!(decoder.decode_payload(&payload, &config).len(), 2);
    }

    #[test]
    fn test_selected_signals_keep_order() {
        let config = DecoderConfig::new().with_signals(["WheelSpeedFR", "WheelSpeedFL"]);
        let payload = Payload::new(100, 0, "(1.0)");
        let names: Vec<String> = decoder()
            .decode_payload(&payload, &config)
            .into_iter()
            .map(|s| s.unwrap().name)
            .collect();
        assert_eq!(names, vec!["WheelSpeedFR", "WheelSpeedFL"]);
    }

    #[test]
    fn test_unknown_selected_signal() {
        let config = DecoderConfig::new().add_signal("WheelSpeedXX");
        let decoder = decoder();

        assert!(matches!(
            decoder.validate_config(&config),
            Err(DecoderError::UnknownSignal(_))
        ));
        assert!(decoder.decode_reader("".as_bytes(), config).is_err());
        assert!(matches!(
            decoder.decode("WheelSpeedXX", 0),
            Err(DecoderError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_range_enforcement() {
        let payload = Payload::new(100, u64::MAX, "(1.0)");
        let decoder = decoder();

        // 0xFFFF * 0.01 = 655.35 is within range
        let config = DecoderConfig::new().with_range_enforcement(true);
        assert!(decoder.decode_payload(&payload, &config).iter().all(|s| s.is_ok()));

        let mut frame = decoder.frame().clone();
        frame.signals.get_mut("WheelSpeedFL").unwrap().max = 100.0;
        let strict = Decoder::new(frame);
        let results = strict.decode_payload(&payload, &config);
        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[0],
            Err(DecoderError::OutOfRange { signal, .. }) if signal == "WheelSpeedFL"
        ));
        assert_eq!(results[1].as_ref().unwrap().name, "WheelSpeedFR");
    }

    #[test]
    fn test_out_of_range_signal_keeps_siblings() {
        let decoder = Decoder::from_dbc_str(
            "BO_ 100 M: 8 X\n \
             SG_ A : 0|8@0+ (1,0) [0|10] \"\" X\n \
             SG_ B : 8|8@0+ (1,0) [0|255] \"\" X\n",
        )
        .unwrap();
        let config = DecoderConfig::new().with_range_enforcement(true);

        let results = decoder.decode_payload(&Payload::new(100, 0x05FF, "(1.0)"), &config);
        assert!(matches!(
            &results[0],
            Err(DecoderError::OutOfRange { signal, value, .. }) if signal == "A" && *value == 255.0
        ));
        assert_eq!(results[1].as_ref().unwrap().value, 5.0);

        // The iterator reports the violation and still yields B
        let items: Vec<_> = decoder
            .decode_reader("(1.0) can0 064#00000000000005FF\n".as_bytes(), config)
            .unwrap()
            .collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().name, "B");
    }

    #[test]
    fn test_decode_reader_yields_signals_in_order() {
        let log = "(1.0) can0 064#1000000000000000\n\
                   (1.5) can0 065#FFFFFFFFFFFFFFFF\n\
                   bad line\n\
                   (2.0) can0 064#2000000000000000\n";

        let config = DecoderConfig::new().add_signal("WheelSpeedFR");
        let decoder = decoder();
        let items: Vec<_> = decoder.decode_reader(log.as_bytes(), config).unwrap().collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().raw_value, 0x10);
        assert!(matches!(items[1], Err(DecoderError::LogParseError { line: 3, .. })));
        assert_eq!(items[2].as_ref().unwrap().raw_value, 0x20);
        assert_eq!(items[2].as_ref().unwrap().timestamp, "(2.0)");
    }

    #[test]
    fn test_missing_log_file() {
        let binding = decoder();
        let result = binding.decode_file(Path::new("missing.log"), DecoderConfig::new());
        assert!(matches!(result, Err(DecoderError::IoError(_))));
    }
}
