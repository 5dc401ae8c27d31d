//! Pipeline – ties together extraction, templating, rendering and page
//! interleaving into a single run.
//!
//! ```text
//! responses.csv ─► cards ─► messages.html ─► messages.pdf ─┐
//!                      └─► swap_pairs ─► info.html ─► info.pdf ─┴► finished_<ts>.pdf
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::assets::CardImages;
use crate::card::Card;
use crate::config::CardConfig;
use crate::engine::{ForgeRenderer, HtmlRenderer};
use crate::error::{CardError, Result};
use crate::extract::extract_cards_from_path;
use crate::interleave::{page_count, LopdfMerger, PageMerger};
use crate::reorder::{pad_to_even, swap_pairs};
use crate::templates::CardTemplates;

/// `strftime` pattern for the final document's file name.
pub const TIMESTAMP_FORMAT: &str = "%m.%d.%Y_%H.%M.%S";

/// Where one run writes its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub messages: PathBuf,
    pub info: PathBuf,
    pub finished: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, now: DateTime<Local>) -> Self {
        Self {
            messages: dir.join("messages.pdf"),
            info: dir.join("info.pdf"),
            finished: dir.join(format!("finished_{}.pdf", now.format(TIMESTAMP_FORMAT))),
        }
    }
}

/// The two intermediate documents.
#[derive(Debug, Clone)]
pub struct RenderedCards {
    pub messages: Vec<u8>,
    pub info: Vec<u8>,
}

/// Runs the whole job for one configuration. The renderer and merger are
/// swappable so the stages around them can be exercised without real PDFs.
pub struct CardPipeline<R = ForgeRenderer, M = LopdfMerger> {
    config: CardConfig,
    renderer: R,
    merger: M,
}

impl CardPipeline {
    pub fn new(config: CardConfig) -> Self {
        let renderer = ForgeRenderer::new(config.page.clone());
        Self::with_backends(config, renderer, LopdfMerger)
    }
}

impl<R: HtmlRenderer, M: PageMerger> CardPipeline<R, M> {
    pub fn with_backends(config: CardConfig, renderer: R, merger: M) -> Self {
        Self {
            config,
            renderer,
            merger,
        }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Run with the current local time in the output file name.
    pub fn run(&self) -> Result<OutputPaths> {
        self.run_at(Local::now())
    }

    /// Extract, render, write both intermediates, then interleave them into
    /// the finished document.
    pub fn run_at(&self, now: DateTime<Local>) -> Result<OutputPaths> {
        let config = &self.config;
        let cards = extract_cards_from_path(&config.input_csv, &config.form, &config.font)?;
        if cards.is_empty() {
            return Err(CardError::NoCards {
                path: config.input_csv.clone(),
            });
        }

        let rendered = self.render_cards(&cards)?;

        fs::create_dir_all(&config.output_dir)?;
        let paths = OutputPaths::new(&config.output_dir, now);
        fs::write(&paths.messages, &rendered.messages)?;
        fs::write(&paths.info, &rendered.info)?;
        log::info!(
            "Wrote '{}' and '{}'",
            paths.messages.display(),
            paths.info.display()
        );

        let finished = self
            .merger
            .merge_interleaved(&rendered.messages, &rendered.info)?;
        fs::write(&paths.finished, finished)?;
        log::info!("Finished cards: '{}'", paths.finished.display());
        Ok(paths)
    }

    /// Render the message document in card order and the info document in
    /// pair-swapped order. Both sides are padded to an even count, so they
    /// always have the same number of pages.
    pub fn render_cards(&self, cards: &[Card]) -> Result<RenderedCards> {
        let images = CardImages::load(&self.config.assets)?;
        let templates = CardTemplates::load(&self.config.assets)?;

        let front = pad_to_even(cards);
        let message_html = templates.render_messages(&front, &images)?;
        let messages = self.renderer.render(&message_html, templates.stylesheet())?;
        check_page_count("messages", &messages, front.len());

        let back = swap_pairs(cards);
        let info_html = templates.render_info(&back, &images)?;
        let info = self.renderer.render(&info_html, templates.stylesheet())?;
        check_page_count("info", &info, back.len());

        log::info!("Rendered {} cards on {} sheets", cards.len(), front.len() / 2);
        Ok(RenderedCards { messages, info })
    }
}

/// A card that overflows its page shifts every later card, so flag it.
fn check_page_count(label: &str, pdf: &[u8], expected: usize) {
    match page_count(pdf) {
        Ok(pages) if pages != expected => {
            log::warn!("{label} document has {pages} pages for {expected} cards")
        }
        Ok(_) => {}
        Err(e) => log::debug!("Could not count {label} pages: {e}"),
    }
}
