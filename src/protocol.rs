//! LED + Button service protocol.
//!
//! Identifier constants for the user service and its three characteristics,
//! the LED command encoding, and the two switch-state payload layouts.
//!
//! ## Switch payload layouts
//!
//! The peripheral reports the two panel switches as little-endian `i16`
//! words, `0x0001` meaning ON. Pushed button notifications carry the words
//! at the head of the payload; polled reads of the state characteristic
//! prefix them with an 8-byte sensor header:
//!
//! ```text
//! notification:  [0-1] sw1   [2-3] sw2
//! polled read:   [0-7] header (ignored)   [8-9] sw1   [10-11] sw2
//! ```

use std::fmt;

use thiserror::Error;
use uuid::{uuid, Uuid};

/// User service UUID. Substitute these four constants (via settings) when
/// targeting a peripheral with different firmware.
pub const USER_SERVICE_UUID: Uuid = uuid!("ae8edba0-a010-44ba-bfd6-913754414ca1");

/// State (sensor) characteristic: polled reads and optional notifications.
pub const STATE_CHARACTERISTIC_UUID: Uuid = uuid!("e90b4b4e-f18a-44f0-8691-b041c7fe57f2");

/// LED characteristic: single-byte command writes.
pub const LED_CHARACTERISTIC_UUID: Uuid = uuid!("e9062e71-9e62-4bc6-b0d3-35cdcd9b027b");

/// Button characteristic: notifies on press/release.
pub const BUTTON_CHARACTERISTIC_UUID: Uuid = uuid!("62fbd229-6edd-4d1a-b554-5c4e1bb29169");

/// Encode the one-byte LED command: `0x01` on, `0x00` off.
pub fn led_command(on: bool) -> [u8; 1] {
    if on {
        [0x01]
    } else {
        [0x00]
    }
}

/// State of one panel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    fn from_raw(value: i16) -> Self {
        if value == 0x0001 {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }

    /// Display label, matching the panel firmware's convention.
    pub fn label(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Both switch readings decoded from one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPair {
    pub sw1: SwitchState,
    pub sw2: SwitchState,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("switch payload too short: got {got} bytes, need {need}")]
    TooShort { need: usize, got: usize },
}

/// Decode a pushed notification payload (switch words at offsets 0 and 2).
pub fn decode_notification(payload: &[u8]) -> Result<SwitchPair, DecodeError> {
    decode_at(payload, 0)
}

/// Decode a polled-read payload (8-byte header, switch words at 8 and 10).
pub fn decode_polled(payload: &[u8]) -> Result<SwitchPair, DecodeError> {
    decode_at(payload, 8)
}

fn decode_at(payload: &[u8], offset: usize) -> Result<SwitchPair, DecodeError> {
    let need = offset + 4;
    if payload.len() < need {
        return Err(DecodeError::TooShort {
            need,
            got: payload.len(),
        });
    }

    let sw1 = i16::from_le_bytes([payload[offset], payload[offset + 1]]);
    let sw2 = i16::from_le_bytes([payload[offset + 2], payload[offset + 3]]);

    Ok(SwitchPair {
        sw1: SwitchState::from_raw(sw1),
        sw2: SwitchState::from_raw(sw2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_command_bytes() {
        assert_eq!(led_command(true), [0x01]);
        assert_eq!(led_command(false), [0x00]);
    }

    #[test]
    fn notification_layout_starts_at_zero() {
        let pair = decode_notification(&[0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(pair.sw1, SwitchState::On);
        assert_eq!(pair.sw2, SwitchState::Off);
    }

    #[test]
    fn polled_layout_skips_header() {
        let mut payload = vec![0u8; 12];
        payload[8] = 0x01;
        payload[10] = 0x01;
        let pair = decode_polled(&payload).unwrap();
        assert_eq!(pair.sw1, SwitchState::On);
        assert_eq!(pair.sw2, SwitchState::On);
    }

    #[test]
    fn only_exact_one_counts_as_on() {
        // 0x0100, -1, 2 are all OFF; only 0x0001 is ON.
        let pair = decode_notification(&[0x00, 0x01, 0xFF, 0xFF]).unwrap();
        assert_eq!(pair.sw1, SwitchState::Off);
        assert_eq!(pair.sw2, SwitchState::Off);
    }

    #[test]
    fn short_payloads_are_rejected() {
        assert_eq!(
            decode_notification(&[0x01, 0x00]),
            Err(DecodeError::TooShort { need: 4, got: 2 })
        );
        assert_eq!(
            decode_polled(&[0u8; 11]),
            Err(DecodeError::TooShort { need: 12, got: 11 })
        );
    }

    #[test]
    fn switch_labels() {
        assert_eq!(SwitchState::On.label(), "ON");
        assert_eq!(SwitchState::Off.to_string(), "OFF");
    }
}
