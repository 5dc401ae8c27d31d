//! Error type shared by every stage of the card pipeline.
//!
//! Nothing here is recoverable: each variant aborts the run and is reported
//! by the `cards` binary before it exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced while building the card PDFs.
#[derive(Debug, Error)]
pub enum CardError {
    // ── Input ────────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A data row does not reach every fixed column offset.
    #[error("CSV line {line} has {found} fields but the form layout needs at least {expected}")]
    ShortRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("configuration is not valid JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("card image '{path}': {reason}")]
    Asset { path: PathBuf, reason: String },

    // ── Rendering ────────────────────────────────────────────────────────
    #[error("template does not compile: {0}")]
    TemplateSyntax(#[from] handlebars::TemplateError),

    #[error("template failed to render: {0}")]
    TemplateRender(#[from] handlebars::RenderError),

    #[error("HTML to PDF conversion failed: {0}")]
    Render(String),

    // ── Merge ────────────────────────────────────────────────────────────
    #[error("intermediate PDF could not be read: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The two intermediate documents must pair up page for page.
    #[error("page count mismatch: messages has {messages} pages, info has {info}")]
    PageCountMismatch { messages: usize, info: usize },

    #[error("no cards found in '{path}'")]
    NoCards { path: PathBuf },
}

impl CardError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
