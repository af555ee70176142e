//! Decoder configuration value object.
//!
//! [`DecoderConfig`] is `Copy`, so the decoder snapshots it once per event and
//! a concurrent `configure` call can never be observed half-applied.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Card length used when nothing else is configured.
pub const DEFAULT_CARD_LENGTH: usize = 10;

/// Inactivity window, in milliseconds, after which a partial buffer is discarded.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Error type for invalid decoder configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecoderConfigError {
    /// A card number must contain at least one digit.
    #[error("card length must be at least 1")]
    ZeroCardLength,
}

/// What the inactivity timeout does with a buffer that already holds
/// exactly `card_length` digits (only reachable when a terminator is required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleBufferPolicy {
    /// Discard every non-empty buffer when the timeout fires.
    ///
    /// A reader that types all digits but never the required Enter therefore
    /// leaves nothing behind once the timeout elapses.
    #[default]
    ClearAll,
    /// Keep a buffer of exactly `card_length` digits until the terminator arrives.
    KeepComplete,
}

/// Decoder settings applied to every subsequent key event.
///
/// Deserialization goes through the same validation as [`DecoderConfig::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedDecoderConfig")]
pub struct DecoderConfig {
    card_length: usize,
    require_terminator: bool,
    stale_buffer: StaleBufferPolicy,
}

/// Wire shape of [`DecoderConfig`] before validation.
#[derive(Deserialize)]
struct UncheckedDecoderConfig {
    card_length: usize,
    require_terminator: bool,
    #[serde(default)]
    stale_buffer: StaleBufferPolicy,
}

impl TryFrom<UncheckedDecoderConfig> for DecoderConfig {
    type Error = DecoderConfigError;

    fn try_from(raw: UncheckedDecoderConfig) -> Result<Self, Self::Error> {
        Ok(DecoderConfig::new(raw.card_length, raw.require_terminator)?
            .with_stale_buffer(raw.stale_buffer))
    }
}

impl DecoderConfig {
    /// Creates a configuration with the default stale-buffer policy.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderConfigError::ZeroCardLength`] if `card_length` is zero.
    pub fn new(card_length: usize, require_terminator: bool) -> Result<Self, DecoderConfigError> {
        if card_length == 0 {
            return Err(DecoderConfigError::ZeroCardLength);
        }
        Ok(Self {
            card_length,
            require_terminator,
            stale_buffer: StaleBufferPolicy::default(),
        })
    }

    /// Returns a copy with a different stale-buffer policy.
    pub fn with_stale_buffer(mut self, policy: StaleBufferPolicy) -> Self {
        self.stale_buffer = policy;
        self
    }

    pub fn card_length(&self) -> usize {
        self.card_length
    }

    pub fn require_terminator(&self) -> bool {
        self.require_terminator
    }

    pub fn stale_buffer(&self) -> StaleBufferPolicy {
        self.stale_buffer
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            card_length: DEFAULT_CARD_LENGTH,
            require_terminator: false,
            stale_buffer: StaleBufferPolicy::ClearAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ten_digits_without_terminator() {
        let cfg = DecoderConfig::default();
        assert_eq!(cfg.card_length(), 10);
        assert!(!cfg.require_terminator());
        assert_eq!(cfg.stale_buffer(), StaleBufferPolicy::ClearAll);
    }

    #[test]
    fn test_new_rejects_zero_length() {
        assert_eq!(
            DecoderConfig::new(0, true),
            Err(DecoderConfigError::ZeroCardLength)
        );
    }

    #[test]
    fn test_with_stale_buffer_keeps_other_fields() {
        let cfg = DecoderConfig::new(8, true)
            .unwrap()
            .with_stale_buffer(StaleBufferPolicy::KeepComplete);
        assert_eq!(cfg.card_length(), 8);
        assert!(cfg.require_terminator());
        assert_eq!(cfg.stale_buffer(), StaleBufferPolicy::KeepComplete);
    }

    #[test]
    fn test_deserialize_rejects_zero_length() {
        // Arrange
        let toml_str = "card_length = 0\nrequire_terminator = false\n";

        // Act
        let result: Result<DecoderConfig, _> = toml::from_str(toml_str);

        // Assert
        let err = result.expect_err("zero length must not deserialize");
        assert!(err.to_string().contains("card length must be at least 1"));
    }

    #[test]
    fn test_deserialize_valid_config_defaults_policy() {
        let cfg: DecoderConfig =
            toml::from_str("card_length = 12\nrequire_terminator = true\n").unwrap();

        assert_eq!(cfg, DecoderConfig::new(12, true).unwrap());
    }

    #[test]
    fn test_serialized_config_deserializes_to_itself() {
        let cfg = DecoderConfig::new(6, false)
            .unwrap()
            .with_stale_buffer(StaleBufferPolicy::KeepComplete);

        let text = toml::to_string(&cfg).unwrap();

        assert_eq!(toml::from_str::<DecoderConfig>(&text).unwrap(), cfg);
    }
}
