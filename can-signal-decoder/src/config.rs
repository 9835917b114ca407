//! Decoder configuration types
//!
//! This module defines the knobs the decoder library understands. Output
//! formatting and destinations are handled by the application layer.

use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Signals to decode for each payload (None = every signal in the frame)
    #[serde(default)]
    pub signals: Option<Vec<String>>,

    /// Skip payloads whose CAN ID differs from the frame ID
    #[serde(default = "default_true")]
    pub id_filter: bool,

    /// Reject values outside the signal's declared [min, max] range
    #[serde(default)]
    pub enforce_range: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            signals: None,
            id_filter: true,
            enforce_range: false,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: decode only the given signals, in the given order
    pub fn with_signals<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signals = Some(signals.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: add one signal of interest
    pub fn add_signal(mut self, signal: impl Into<String>) -> Self {
        self.signals.get_or_insert_with(Vec::new).push(signal.into());
        self
    }

    /// Builder method: enable or disable the CAN ID filter
    pub fn with_id_filter(mut self, enabled: bool) -> Self {
        self.id_filter = enabled;
        self
    }

    /// Builder method: enable or disable range enforcement
    pub fn with_range_enforcement(mut self, enabled: bool) -> Self {
        self.enforce_range = enabled;
        self
    }

    /// Check if a payload with this CAN ID should be decoded
    pub fn should_process_message(&self, frame_id: u32, can_id: u32) -> bool {
        !self.id_filter || frame_id == can_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_signals(["WheelSpeedFR", "WheelSpeedFL"])
            .add_signal("WheelSpeedRR")
            .with_id_filter(false)
            .with_range_enforcement(true);

        assert_eq!(
            config.signals,
            Some(vec![
                "WheelSpeedFR".to_string(),
                "WheelSpeedFL".to_string(),
                "WheelSpeedRR".to_string()
            ])
        );
        assert!(!config.id_filter);
        assert!(config.enforce_range);
    }

    #[test]
    fn test_filter_logic() {
        let config = DecoderConfig::new();
        assert!(config.should_process_message(0x64, 0x64));
        assert!(!config.should_process_message(0x64, 0x65));

        let config = config.with_id_filter(false);
        assert!(config.should_process_message(0x64, 0x65));
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::new();
        assert_eq!(config.signals, None);
        assert!(config.id_filter);
        assert!(!config.enforce_range);
    }
}
