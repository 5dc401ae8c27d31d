//! Integration tests for the card pipeline.
//!
//! These tests validate:
//! - A form response turns into the expected cards
//! - Rendering produces one page per card on each side
//! - The finished document alternates message and info pages
//! - A full run writes all three PDFs

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use lopdf::Document;
use sha2::{Digest, Sha256};

use flower_cards::assets::CardImages;
use flower_cards::config::{AssetPaths, CardConfig, FontScaling, FormLayout};
use flower_cards::engine::{compute_document_layout, ForgeRenderer, HtmlRenderer, PageSetup};
use flower_cards::extract::extract_cards;
use flower_cards::interleave::{interleave, page_count};
use flower_cards::pipeline::CardPipeline;
use flower_cards::reorder::{pad_to_even, swap_pairs};
use flower_cards::templates::CardTemplates;
use flower_cards::{Card, CardError};

// =====================================================================
// Helpers
// =====================================================================

const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// One form response: sender, delivery choice and up to twelve
/// (recipient, message) slots, laid out like the real export.
fn response_csv(sender: &str, delivery: &str, slots: &[(&str, &str)]) -> String {
    let header: Vec<String> = (0..95).map(|i| format!("Question {i}")).collect();
    let mut row = vec![String::new(); 95];
    row[6] = delivery.to_string();
    row[94] = sender.to_string();
    for (slot, (name, message)) in slots.iter().enumerate() {
        let at = 7 + slot * 7;
        row[at] = name.to_string();
        row[at + 2] = "1".to_string();
        row[at + 3] = "77 Massachusetts Ave".to_string();
        row[at + 5] = message.to_string();
    }
    let quoted: Vec<String> = row
        .iter()
        .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
        .collect();
    format!("{}\n{}\n", header.join(","), quoted.join(","))
}

fn extract(csv: &str) -> Vec<Card> {
    extract_cards(csv.as_bytes(), &FormLayout::default(), &FontScaling::default()).unwrap()
}

fn named_cards(names: &[&str]) -> Vec<Card> {
    let slots: Vec<(&str, &str)> = names.iter().map(|n| (*n, "Happy Valentine's Day")).collect();
    extract(&response_csv("Jane", "Delivery", &slots))
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

/// Render both card documents with the built-in templates, padded the way
/// the pipeline pads them.
fn render_both(cards: &[Card], images: &CardImages) -> (Vec<u8>, Vec<u8>) {
    let templates = CardTemplates::builtin().unwrap();
    let renderer = ForgeRenderer::default();
    let messages = renderer
        .render(
            &templates.render_messages(&pad_to_even(cards), images).unwrap(),
            templates.stylesheet(),
        )
        .unwrap();
    let info = renderer
        .render(
            &templates.render_info(&swap_pairs(cards), images).unwrap(),
            templates.stylesheet(),
        )
        .unwrap();
    (messages, info)
}

/// SHA-256 of every page's content stream, in page order.
fn page_fingerprints(pdf: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| Sha256::digest(doc.get_page_content(id).unwrap()).to_vec())
        .collect()
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, BASE64_STD.decode(PIXEL_PNG).unwrap()).unwrap();
    path
}

// =====================================================================
// Extraction
// =====================================================================

#[test]
fn one_response_two_recipients() {
    let short = "x".repeat(50);
    let long = "y".repeat(250);
    let cards = extract(&response_csv(
        "Jane",
        "Delivery",
        &[("Alice", &short), ("Bob", &long)],
    ));

    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c.sender == "Jane" && c.delivery));
    assert_eq!(cards[0].recipient, "Alice");
    assert_eq!(cards[0].font_size, 16.0);
    assert_eq!(cards[1].recipient, "Bob");
    assert!(cards[1].font_size < 16.0);
}

#[test]
fn short_row_reports_its_line() {
    let mut csv = response_csv("Jane", "Delivery", &[("Alice", "hi")]);
    csv.push_str("only,three,fields\n");
    let err = extract_cards(csv.as_bytes(), &FormLayout::default(), &FontScaling::default())
        .unwrap_err();
    match err {
        CardError::ShortRow { line, expected, found } => {
            assert_eq!(line, 3);
            assert_eq!(expected, 95);
            assert_eq!(found, 3);
        }
        other => panic!("expected ShortRow, got {other:?}"),
    }
}

// =====================================================================
// Rendering
// =====================================================================

#[test]
fn one_page_per_card_each_side() {
    for n in 1..=5 {
        let names: Vec<String> = (0..n).map(|i| format!("Recipient {i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let cards = named_cards(&names);
        let (messages, info) = render_both(&cards, &CardImages::default());

        assert_valid_pdf(&messages);
        assert_valid_pdf(&info);
        assert_eq!(page_count(&messages).unwrap(), n + n % 2, "messages for n = {n}");
        assert_eq!(page_count(&info).unwrap(), n + n % 2, "info for n = {n}");
    }
}

#[test]
fn card_text_lands_on_its_own_page() {
    let cards = named_cards(&["Alice", "Bob", "Cara"]);
    let templates = CardTemplates::builtin().unwrap();
    let page = PageSetup::default();

    let messages = compute_document_layout(
        &templates.render_messages(&pad_to_even(&cards), &CardImages::default()).unwrap(),
        templates.stylesheet(),
        &page,
    )
    .unwrap();
    assert_eq!(messages.pages.len(), 4);
    assert!(messages.page_text(0).contains(&"To: Alice".to_string()));
    assert!(messages.page_text(2).contains(&"From: Jane".to_string()));
    assert!(messages.page_text(3).is_empty(), "placeholder should be blank");

    let info = compute_document_layout(
        &templates.render_info(&swap_pairs(&cards), &CardImages::default()).unwrap(),
        templates.stylesheet(),
        &page,
    )
    .unwrap();
    assert_eq!(info.pages.len(), 4);
    assert!(info.page_text(0).contains(&"Bob".to_string()));
    assert!(info.page_text(1).contains(&"Alice".to_string()));
    assert!(info.page_text(2).is_empty(), "placeholder should be blank");
    assert!(info.page_text(3).contains(&"Cara".to_string()));
}

#[test]
fn long_message_stays_on_one_card() {
    let long = "Roses are red, violets are blue. ".repeat(8);
    let cards = extract(&response_csv("Jane", "Pickup", &[("Alice", long.trim())]));
    assert!(cards[0].font_size < 16.0);
    let (messages, _) = render_both(&cards, &CardImages::default());
    // The card plus its blank partner.
    assert_eq!(page_count(&messages).unwrap(), 2);
}

#[test]
fn card_images_are_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let assets = AssetPaths {
        front_image: Some(write_png(dir.path(), "front.png")),
        back_image: Some(write_png(dir.path(), "back.png")),
        ..AssetPaths::default()
    };
    let images = CardImages::load(&assets).unwrap();
    let cards = named_cards(&["Alice", "Bob"]);

    let (plain, _) = render_both(&cards, &CardImages::default());
    let (messages, info) = render_both(&cards, &images);
    assert_eq!(page_count(&messages).unwrap(), 2);
    assert_eq!(page_count(&info).unwrap(), 2);
    assert!(messages.len() > plain.len());
}

// =====================================================================
// Interleaving
// =====================================================================

#[test]
fn finished_document_alternates_sides() {
    let cards = named_cards(&["Alice", "Bob", "Cara", "Dan"]);
    let (messages, info) = render_both(&cards, &CardImages::default());

    let merged = interleave(&messages, &info).unwrap();
    let message_pages = page_fingerprints(&messages);
    let info_pages = page_fingerprints(&info);
    let merged_pages = page_fingerprints(&merged);

    assert_eq!(merged_pages.len(), 2 * message_pages.len());
    for i in 0..message_pages.len() {
        assert_eq!(merged_pages[2 * i], message_pages[i], "message page {i}");
        assert_eq!(merged_pages[2 * i + 1], info_pages[i], "info page {i}");
    }
}

#[test]
fn merged_pages_keep_their_size() {
    let cards = named_cards(&["Alice", "Bob"]);
    let (messages, info) = render_both(&cards, &CardImages::default());
    let merged = Document::load_mem(&interleave(&messages, &info).unwrap()).unwrap();

    for id in merged.get_pages().into_values() {
        let page = merged.get_dictionary(id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = media_box[2].as_float().unwrap() - media_box[0].as_float().unwrap();
        assert!((width - 306.0).abs() < 1.0, "width {width}");
    }
}

#[test]
fn mismatched_sides_are_rejected() {
    let (messages, _) = render_both(&named_cards(&["Alice", "Bob", "Cara"]), &CardImages::default());
    let (_, info) = render_both(&named_cards(&["Alice"]), &CardImages::default());
    let err = interleave(&messages, &info).unwrap_err();
    assert!(matches!(
        err,
        CardError::PageCountMismatch {
            messages: 4,
            info: 2
        }
    ));
}

// =====================================================================
// Full run
// =====================================================================

#[test]
fn full_run_writes_three_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("responses.csv");
    fs::write(
        &csv_path,
        response_csv("", "Delivery", &[("Alice", "hi"), ("Bob", "hello"), ("Cara", "hey")]),
    )
    .unwrap();

    let config = CardConfig::from_json(&format!(
        r#"{{ "input_csv": {:?}, "output_dir": {:?} }}"#,
        csv_path,
        dir.path().join("out")
    ))
    .unwrap();
    let paths = CardPipeline::new(config).run().unwrap();

    // Three cards plus one placeholder on each side.
    assert_eq!(page_count(&fs::read(&paths.messages).unwrap()).unwrap(), 4);
    assert_eq!(page_count(&fs::read(&paths.info).unwrap()).unwrap(), 4);
    assert_eq!(page_count(&fs::read(&paths.finished).unwrap()).unwrap(), 8);
    let finished = paths.finished.file_name().unwrap().to_string_lossy().into_owned();
    assert!(finished.starts_with("finished_") && finished.ends_with(".pdf"));
}

#[test]
fn config_rejects_unusable_layout() {
    let err = CardConfig::from_json(r#"{ "form": { "recipient_field_count": 3 } }"#).unwrap_err();
    assert!(matches!(err, CardError::Config { .. }));

    let config = CardConfig::from_json(r#"{ "font": { "default_size": 14.0 } }"#).unwrap();
    assert_eq!(config.font.default_size, 14.0);
    assert_eq!(config.font.max_message_len, 180);
    assert_eq!(config.page, PageSetup::default());
}
