//! The card record and the message-length font scaling.

use serde::Serialize;

use crate::config::FontScaling;

/// Display name used when a sender leaves the display field blank.
pub const ANONYMOUS: &str = "Anonymous";

/// One recipient's printable card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    /// `true` for delivery, `false` for pickup.
    pub delivery: bool,
    pub sender: String,
    pub recipient: String,
    /// Street address, with the room number appended when one was given.
    pub address: String,
    pub num_flowers: String,
    pub message: String,
    /// Font size in px for the message text.
    pub font_size: f64,
}

/// Font size for a message of the given text.
///
/// Up to `max_message_len` characters the default size is used. Past that the
/// size shrinks with the log of the relative overage, so moderately long
/// messages lose little while very long ones keep shrinking.
pub fn font_size_for(message: &str, scaling: &FontScaling) -> f64 {
    let len = message.chars().count();
    if len <= scaling.max_message_len {
        return scaling.default_size;
    }
    let max_len = scaling.max_message_len as f64;
    let overage = (len - scaling.max_message_len) as f64;
    scaling.default_size - (1.0 + overage / max_len).ln() * scaling.multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn short_messages_use_default_size() {
        let scaling = FontScaling::default();
        for len in [0, 1, 50, 179, 180] {
            assert_eq!(font_size_for(&msg(len), &scaling), 16.0, "len {len}");
        }
    }

    #[test]
    fn long_messages_shrink_monotonically() {
        let scaling = FontScaling::default();
        let mut previous = font_size_for(&msg(180), &scaling);
        for len in (181..=2000).step_by(7) {
            let size = font_size_for(&msg(len), &scaling);
            assert!(size < previous, "len {len}: {size} !< {previous}");
            assert!(size > 0.0, "len {len} went non-positive");
            previous = size;
        }
        assert!(font_size_for(&msg(200), &scaling) > font_size_for(&msg(400), &scaling));
    }

    #[test]
    fn shrink_follows_log_curve() {
        let scaling = FontScaling::default();
        // overage equal to max_len doubles the ratio: 16 - ln(2) * 6
        let expected = 16.0 - 2f64.ln() * 6.0;
        assert!((font_size_for(&msg(360), &scaling) - expected).abs() < 1e-9);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let scaling = FontScaling::default();
        let flowers = "\u{1F337}".repeat(180);
        assert_eq!(font_size_for(&flowers, &scaling), 16.0);
    }
}
