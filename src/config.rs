//! Run configuration.
//!
//! The form export changes shape from year to year, so every column offset,
//! count and font parameter lives here instead of being scattered through
//! the extractor. All fields have defaults matching the current form; a JSON
//! file only needs to name the fields it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::PageSetup;
use crate::error::{CardError, Result};

/// Number of fields read from each recipient slot (name, email, flower
/// count, address, room, message, trailing unused field).
pub const RECIPIENT_FIELDS: usize = 7;

/// Top-level configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Form responses exported as CSV.
    pub input_csv: PathBuf,
    /// Directory receiving `messages.pdf`, `info.pdf` and the final file.
    pub output_dir: PathBuf,
    pub form: FormLayout,
    pub font: FontScaling,
    pub assets: AssetPaths,
    pub page: PageSetup,
}

/// Column layout of the responses CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLayout {
    /// Maximum recipient slots per form submission.
    pub max_recipients: usize,
    /// Leading fields belonging to the sender.
    pub sender_field_count: usize,
    /// Fields per recipient slot.
    pub recipient_field_count: usize,
    /// Absolute column holding the sender's display name.
    pub sender_display_index: usize,
    /// Absolute column holding "Delivery" or a pickup choice.
    pub delivery_index: usize,
}

/// Parameters of the message-length font shrink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontScaling {
    /// Font size in px for messages up to `max_message_len` characters.
    pub default_size: f64,
    /// Length after which the font starts shrinking.
    pub max_message_len: usize,
    /// How fast the font shrinks past `max_message_len`.
    pub multiplier: f64,
}

/// Optional on-disk replacements for the built-in card assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub front_image: Option<PathBuf>,
    pub back_image: Option<PathBuf>,
    pub message_template: Option<PathBuf>,
    pub info_template: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from("csv/responses.csv"),
            output_dir: PathBuf::from("out"),
            form: FormLayout::default(),
            font: FontScaling::default(),
            assets: AssetPaths::default(),
            page: PageSetup::default(),
        }
    }
}

impl Default for FormLayout {
    fn default() -> Self {
        Self {
            max_recipients: 12,
            sender_field_count: 7,
            recipient_field_count: 7,
            sender_display_index: 94,
            delivery_index: 6,
        }
    }
}

impl Default for FontScaling {
    fn default() -> Self {
        Self {
            default_size: 16.0,
            max_message_len: 180,
            multiplier: 6.0,
        }
    }
}

impl FormLayout {
    /// First column of recipient slot `slot`.
    pub fn slot_offset(&self, slot: usize) -> usize {
        self.sender_field_count + slot * self.recipient_field_count
    }

    /// Minimum number of fields a data row must have for every fixed offset
    /// to resolve.
    pub fn required_width(&self) -> usize {
        let last_slot_end = match self.max_recipients {
            0 => 0,
            n => self.slot_offset(n - 1) + RECIPIENT_FIELDS,
        };
        last_slot_end
            .max(self.sender_display_index + 1)
            .max(self.delivery_index + 1)
    }
}

impl CardConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from '{}'", path.display());
        Ok(config)
    }

    /// Reject values that would make extraction or layout meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.form.max_recipients == 0 {
            return Err(CardError::config("form.max_recipients must be at least 1"));
        }
        if self.form.recipient_field_count < RECIPIENT_FIELDS {
            return Err(CardError::config(format!(
                "form.recipient_field_count must be at least {RECIPIENT_FIELDS}, got {}",
                self.form.recipient_field_count
            )));
        }
        if self.font.max_message_len == 0 {
            return Err(CardError::config("font.max_message_len must be at least 1"));
        }
        if !(self.font.default_size > 0.0) {
            return Err(CardError::config("font.default_size must be positive"));
        }
        let page = &self.page;
        if page.margin_pt < 0.0
            || page.width_pt <= 2.0 * page.margin_pt
            || page.height_pt <= 2.0 * page.margin_pt
        {
            return Err(CardError::config(format!(
                "page {}x{} pt leaves no room inside a {} pt margin",
                page.width_pt, page.height_pt, page.margin_pt
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_current_form() {
        let form = FormLayout::default();
        assert_eq!(form.slot_offset(0), 7);
        assert_eq!(form.slot_offset(11), 84);
        // sender display column 94 is the widest requirement
        assert_eq!(form.required_width(), 95);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CardConfig::from_json(r#"{ "form": { "sender_display_index": 40 } }"#).unwrap();
        assert_eq!(config.form.sender_display_index, 40);
        assert_eq!(config.form.max_recipients, 12);
        assert_eq!(config.font.max_message_len, 180);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn rejects_narrow_recipient_slots() {
        let err = CardConfig::from_json(r#"{ "form": { "recipient_field_count": 5 } }"#).unwrap_err();
        assert!(matches!(err, CardError::Config { .. }), "{err}");
    }

    #[test]
    fn rejects_page_smaller_than_margins() {
        let err = CardConfig::from_json(r#"{ "page": { "width_pt": 30, "margin_pt": 18 } }"#)
            .unwrap_err();
        assert!(matches!(err, CardError::Config { .. }), "{err}");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CardConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CardError::ConfigJson(_)));
    }
}
