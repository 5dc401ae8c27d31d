//! Pagination – splits the positioned top-level boxes into fixed-size pages.
//!
//! Boxes move to a new page when they would cross the bottom margin or when
//! `page-break-before` / `page-break-after` asks for it. Oversized containers
//! without content of their own are opened up so their children paginate
//! individually.

use crate::engine::fonts::text_width;
use crate::engine::layout::{BoxContent, PositionedBox};
use crate::engine::page_layout::*;
use crate::engine::style::TextAlign;

/// Slack for float noise when a box ends exactly on the bottom margin.
const FIT_TOLERANCE: f32 = 0.5;

fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height + FIT_TOLERANCE
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Convert positioned boxes into a paginated [`DocumentLayout`]. The result
/// always has at least one page.
pub fn paginate(
    boxes: &[PositionedBox],
    page_width: f32,
    page_height: f32,
    page_margin: f32,
) -> DocumentLayout {
    let mut doc = DocumentLayout::new("", page_width, page_height);
    let content_height = page_height - 2.0 * page_margin;
    let flat = flatten_for_pagination(boxes, content_height);

    let mut current = PageLayout {
        page_index: 0,
        boxes: Vec::new(),
    };
    // Document-space y at which the current page begins.
    let mut page_start_doc_y = 0.0f32;

    for pbox in flat {
        let overflows = pbox.y - page_start_doc_y + pbox.height > content_height + FIT_TOLERANCE;
        if !current.boxes.is_empty() && (pbox.style.page_break_before || overflows) {
            start_new_page(&mut doc, &mut current);
            page_start_doc_y = pbox.y;
        }
        if overflows && current.boxes.is_empty() {
            log::debug!(
                "Box of height {:.1} does not fit on one page; it will be clipped",
                pbox.height
            );
        }

        let y_on_page = (pbox.y - page_start_doc_y).max(0.0);
        current
            .boxes
            .push(build_layout_box(pbox, pbox.x, page_margin + y_on_page));

        if pbox.style.page_break_after {
            start_new_page(&mut doc, &mut current);
            page_start_doc_y = pbox.y + pbox.height;
        }
    }

    if !current.boxes.is_empty() || doc.pages.is_empty() {
        doc.pages.push(current);
    }
    doc
}

fn start_new_page(doc: &mut DocumentLayout, current: &mut PageLayout) {
    let next = PageLayout {
        page_index: doc.pages.len() + 1,
        boxes: Vec::new(),
    };
    doc.pages.push(std::mem::replace(current, next));
}

/// Build a [`LayoutBox`] tree with page-absolute coordinates. Children keep
/// their offset from the parent: `child_abs_y = abs_y + (child.y - pbox.y)`.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32) -> LayoutBox {
    let style = &pbox.style;
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);

    if !style.background_color.is_transparent() {
        lb.background_color = Some(style.background_color.to_array());
    }
    if style.border_width > 0.0 {
        lb.border = Some(BorderStyle {
            width: style.border_width,
            color: style.border_color.to_array(),
        });
    }

    match &pbox.content {
        BoxContent::Text { lines } => {
            let line_height = style.line_height_px();
            let inner_width = pbox.width - style.padding.horizontal();
            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let slack = (inner_width - text_width(line, style.font_size, style.is_bold()))
                        .max(0.0);
                    let align = match style.text_align {
                        TextAlign::Left => 0.0,
                        TextAlign::Center => slack / 2.0,
                        TextAlign::Right => slack,
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset: style.padding.left + align,
                        y_offset: style.padding.top + i as f32 * line_height,
                    }
                })
                .collect();
            lb.text = Some(TextContent {
                lines: text_lines,
                font_size: style.font_size,
                bold: style.is_bold(),
                italic: style.is_italic(),
                color: style.color.to_array(),
                line_height,
            });
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        lb.children
            .push(build_layout_box(child, child.x, abs_y + (child.y - pbox.y)));
    }
    lb
}
