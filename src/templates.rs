//! Card templates – handlebars sources for the two card layouts plus the
//! stylesheet fed to the PDF engine.
//!
//! The built-in sources below are used unless [`AssetPaths`] names a
//! replacement file. Templates see:
//!
//! - `cards`: the card array (empty objects for placeholders)
//! - `front_img` / `back_img`: image `src` values, empty when unset

use std::fs;
use std::path::Path;

use handlebars::Handlebars;
use serde_json::{json, Value};

use crate::assets::CardImages;
use crate::card::Card;
use crate::config::AssetPaths;
use crate::error::Result;

const MESSAGE: &str = "message";
const INFO: &str = "info";

/// Message side: one page per card, in extraction order. A trailing
/// placeholder keeps the artwork but no text.
pub fn message_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<body>
{{#each cards}}
<div class="card message-card">
    {{#if @root.front_img}}<img class="art" src="{{{@root.front_img}}}" />{{/if}}
    {{#if recipient}}
    <p class="to">To: {{recipient}}</p>
    <p class="message" style="font-size: {{font_size}}px">{{message}}</p>
    <p class="from">From: {{sender}}</p>
    {{/if}}
</div>
{{/each}}
</body>
</html>
"##
}

/// Info side: delivery or pickup logistics, printed on the back of the
/// message cards. Placeholder slots keep their page but stay blank.
pub fn info_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<body>
{{#each cards}}
<div class="card info-card">
    {{#if recipient}}
    {{#if delivery}}
    <p class="kind">Delivery</p>
    <p class="name">{{recipient}}</p>
    <p class="address">{{address}}</p>
    {{else}}
    <p class="kind">Pickup</p>
    <p class="name">{{recipient}}</p>
    {{/if}}
    <p class="count">Flowers: {{num_flowers}}</p>
    {{/if}}
    {{#if @root.back_img}}<img class="art" src="{{{@root.back_img}}}" />{{/if}}
</div>
{{/each}}
</body>
</html>
"##
}

/// Default stylesheet. Sizes assume the default 306 × 396 pt card with an
/// 18 pt margin (270 × 360 content box).
pub fn default_stylesheet() -> &'static str {
    r#"
.card {
    display: flex;
    flex-direction: column;
    justify-content: center;
    align-items: center;
    height: 360px;
    page-break-after: always;
}
.art { width: 72px; height: 72px; margin-bottom: 12px; }
.to, .from { font-size: 12px; font-style: italic; color: #555555; }
.to { margin-bottom: 10px; }
.message { text-align: center; line-height: 1.3; margin-bottom: 10px; }
.kind { font-size: 20px; font-weight: bold; margin-bottom: 8px; }
.name { font-size: 18px; margin-bottom: 6px; }
.address, .count { font-size: 14px; margin-bottom: 4px; }
"#
}

/// Compiled card templates and the stylesheet that goes with them.
pub struct CardTemplates {
    registry: Handlebars<'static>,
    stylesheet: String,
}

impl CardTemplates {
    /// Built-in templates and stylesheet.
    pub fn builtin() -> Result<Self> {
        Self::from_sources(message_template(), info_template(), default_stylesheet())
    }

    /// Built-in assets, each replaced by its file when configured.
    pub fn load(paths: &AssetPaths) -> Result<Self> {
        let message = read_or(paths.message_template.as_deref(), message_template())?;
        let info = read_or(paths.info_template.as_deref(), info_template())?;
        let stylesheet = read_or(paths.stylesheet.as_deref(), default_stylesheet())?;
        Self::from_sources(&message, &info, &stylesheet)
    }

    pub fn from_sources(message: &str, info: &str, stylesheet: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_template_string(MESSAGE, message)?;
        registry.register_template_string(INFO, info)?;
        Ok(Self {
            registry,
            stylesheet: stylesheet.to_string(),
        })
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    /// Render the message document, one card per slot in the order given.
    pub fn render_messages(&self, slots: &[Option<Card>], images: &CardImages) -> Result<String> {
        self.render(MESSAGE, slots, images)
    }

    /// Render the info document for an already reordered slot sequence.
    pub fn render_info(&self, slots: &[Option<Card>], images: &CardImages) -> Result<String> {
        self.render(INFO, slots, images)
    }

    fn render(&self, name: &str, slots: &[Option<Card>], images: &CardImages) -> Result<String> {
        let cards: Vec<Value> = slots
            .iter()
            .map(|slot| match slot {
                Some(card) => json!(card),
                None => json!({}),
            })
            .collect();
        let context = json!({
            "cards": cards,
            "front_img": images.front,
            "back_img": images.back,
        });
        Ok(self.registry.render(name, &context)?)
    }
}

fn read_or(path: Option<&Path>, builtin: &str) -> Result<String> {
    match path {
        Some(p) => {
            log::debug!("Using '{}'", p.display());
            Ok(fs::read_to_string(p)?)
        }
        None => Ok(builtin.to_string()),
    }
}
