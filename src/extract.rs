//! Record extraction – turns the form responses CSV into [`Card`]s.
//!
//! Each data row is one form submission: a block of sender fields followed by
//! a fixed number of recipient slots at fixed offsets. Cards come out in row
//! order, then slot order; the renderer relies on that order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::card::{font_size_for, Card, ANONYMOUS};
use crate::config::{FontScaling, FormLayout};
use crate::error::{CardError, Result};

/// Exact value of the delivery column that marks an order for delivery.
pub const DELIVERY_MARKER: &str = "Delivery";

/// Read every card from a CSV source. The first row is a header and is
/// always skipped.
pub fn extract_cards<R: Read>(
    source: R,
    form: &FormLayout,
    font: &FontScaling,
) -> Result<Vec<Card>> {
    // Flexible so that a short row reaches `cards_from_row` and is reported
    // with its line number instead of as a generic length mismatch.
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let mut cards = Vec::new();
    let mut rows = 0usize;
    for record in reader.records() {
        let record = record?;
        rows += 1;
        cards.extend(cards_from_row(&record, form, font)?);
    }

    log::info!("Extracted {} cards from {} responses", cards.len(), rows);
    Ok(cards)
}

/// Open `path` and extract its cards.
pub fn extract_cards_from_path(
    path: &Path,
    form: &FormLayout,
    font: &FontScaling,
) -> Result<Vec<Card>> {
    let file = File::open(path)?;
    log::info!("Reading responses from '{}'", path.display());
    extract_cards(file, form, font)
}

fn cards_from_row(record: &StringRecord, form: &FormLayout, font: &FontScaling) -> Result<Vec<Card>> {
    let expected = form.required_width();
    if record.len() < expected {
        return Err(CardError::ShortRow {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            expected,
            found: record.len(),
        });
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default();

    let sender = match field(form.sender_display_index) {
        "" => ANONYMOUS,
        name => name,
    };
    let delivery = field(form.delivery_index) == DELIVERY_MARKER;

    let mut cards = Vec::new();
    for slot in 0..form.max_recipients {
        let at = form.slot_offset(slot);
        let recipient = field(at);
        // Most submissions fill only a few of the slots.
        if recipient.is_empty() {
            continue;
        }
        // at + 1 is the recipient's email, unused on the cards
        let num_flowers = field(at + 2);
        let address = field(at + 3);
        let room = field(at + 4);
        let message = field(at + 5).trim();

        let address = if room.is_empty() {
            address.to_string()
        } else {
            format!("{address} {room}")
        };

        log::debug!("Card for '{recipient}' from '{sender}' (slot {slot})");
        cards.push(Card {
            delivery,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            address,
            num_flowers: num_flowers.to_string(),
            message: message.to_string(),
            font_size: font_size_for(message, font),
        });
    }
    Ok(cards)
}
