//! HTML → PDF.
//!
//! A small layout engine for card templates: parse, style, lay out with
//! Taffy, paginate, render with printpdf. [`HtmlRenderer`] is the seam the
//! pipeline talks to; [`ForgeRenderer`] is the implementation.

pub mod dom;
pub mod fonts;
pub mod layout;
pub mod page_layout;
pub mod pagination;
pub mod render;
pub mod style;

use serde::{Deserialize, Serialize};

use crate::error::{CardError, Result};
use dom::{body_children, parse_html};
use layout::compute_layout;
use page_layout::DocumentLayout;
use pagination::paginate;
use render::render_pdf;
use style::{build_styled_tree, Stylesheet};

/// Page geometry in PDF points (1 pt = 1/72 inch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub width_pt: f32,
    pub height_pt: f32,
    pub margin_pt: f32,
}

impl Default for PageSetup {
    /// A 4.25 × 5.5 in card.
    fn default() -> Self {
        Self {
            title: "Flower cards".to_string(),
            width_pt: 306.0,
            height_pt: 396.0,
            margin_pt: 18.0,
        }
    }
}

impl PageSetup {
    pub fn content_width(&self) -> f32 {
        self.width_pt - 2.0 * self.margin_pt
    }

    pub fn content_height(&self) -> f32 {
        self.height_pt - 2.0 * self.margin_pt
    }
}

/// Turns an HTML document plus stylesheet into PDF bytes.
pub trait HtmlRenderer {
    fn render(&self, markup: &str, stylesheet: &str) -> Result<Vec<u8>>;
}

/// The built-in renderer.
#[derive(Debug, Clone, Default)]
pub struct ForgeRenderer {
    pub page: PageSetup,
}

impl ForgeRenderer {
    pub fn new(page: PageSetup) -> Self {
        Self { page }
    }
}

impl HtmlRenderer for ForgeRenderer {
    fn render(&self, markup: &str, stylesheet: &str) -> Result<Vec<u8>> {
        let (bytes, layout) =
            generate_pdf(markup, stylesheet, &self.page).map_err(CardError::Render)?;
        log::debug!(
            "Rendered {} page(s), {} bytes",
            layout.pages.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// Full pipeline: HTML string → PDF bytes, along with the layout that was
/// rendered.
pub fn generate_pdf(
    html: &str,
    stylesheet: &str,
    page: &PageSetup,
) -> std::result::Result<(Vec<u8>, DocumentLayout), String> {
    let layout = compute_document_layout(html, stylesheet, page)?;
    let bytes = render_pdf(&layout)?;
    Ok((bytes, layout))
}

/// Parse, style, lay out and paginate without rendering.
pub fn compute_document_layout(
    html: &str,
    stylesheet: &str,
    page: &PageSetup,
) -> std::result::Result<DocumentLayout, String> {
    if page.content_width() <= 0.0 || page.content_height() <= 0.0 {
        return Err(format!(
            "Page {} x {} pt leaves no room inside a {} pt margin",
            page.width_pt, page.height_pt, page.margin_pt
        ));
    }

    let dom = parse_html(html);
    let nodes = body_children(&dom);
    let sheet = Stylesheet::parse(stylesheet);
    let styled = build_styled_tree(&nodes, &sheet, None);

    let boxes = compute_layout(&styled, page.width_pt, page.margin_pt)?;
    let mut layout = paginate(&boxes, page.width_pt, page.height_pt, page.margin_pt);
    layout.title = page.title.clone();
    Ok(layout)
}
