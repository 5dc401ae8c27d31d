//! Layout engine – uses Taffy to compute flexbox layout from a styled DOM
//! tree, then converts the result into a tree of positioned boxes in
//! document coordinates.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use taffy::prelude::*;
use taffy::TaffyResult;

use crate::engine::dom::Tag;
use crate::engine::fonts::{text_width, wrap_text};
use crate::engine::style::{self as css, ComputedStyle, StyledNode};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { lines: Vec<String> },
    Image { src: String },
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder {
    taffy: TaffyTree<()>,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl LayoutBuilder {
    fn new() -> Self {
        Self {
            taffy: TaffyTree::new(),
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// Collect all text content from an inline subtree (spans, text nodes).
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { children, .. } => {
                children.iter().map(Self::collect_inline_text).collect()
            }
        }
    }

    /// True when every child is a text node or an inline element with only
    /// inline content.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style,
                children: gc,
                ..
            } => style.display == css::Display::Inline && Self::all_inline(gc),
        })
    }

    /// `parent_width` is the content width of the containing box.
    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> TaffyResult<Option<NodeId>> {
        match styled {
            StyledNode::Text { text, style } => {
                let collapsed = collapse_whitespace(text);
                self.build_text_node(&collapsed, style, parent_width).map(Some)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// A leaf holding wrapped text. The box takes the block's margin and
    /// padding, stretches across its container when asked to, and never
    /// shrinks below the widest line.
    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> TaffyResult<NodeId> {
        let bold = style.is_bold();
        let wrap_width = parent_width - style.margin.horizontal() - style.padding.horizontal();
        let lines = wrap_text(text, style.font_size, bold, wrap_width);

        let widest = lines
            .iter()
            .map(|l| text_width(l, style.font_size, bold))
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * style.line_height_px();

        let taffy_style = Style {
            size: Size {
                width: Dimension::Auto,
                height: Dimension::Length(
                    text_height + style.padding.top + style.padding.bottom,
                ),
            },
            min_size: Size {
                width: Dimension::Length(widest + style.padding.horizontal()),
                height: Dimension::Auto,
            },
            margin: margin_rect(style),
            padding: padding_rect(style),
            flex_shrink: 0.0,
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> TaffyResult<Option<NodeId>> {
        // Paragraph-like blocks with inline-only content become one wrapped
        // text node so spans flow with the surrounding text.
        if tag.is_text_block() && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            let combined = collapse_whitespace(&raw);
            if !combined.is_empty() {
                return self.build_text_node(&combined, style, parent_width).map(Some);
            }
        }

        if *tag == Tag::Img {
            let src = attrs.get("src").map(String::as_str).unwrap_or_default();
            return self.build_image_node(src, style, parent_width);
        }

        let my_width = style
            .width
            .resolve(parent_width)
            .unwrap_or(parent_width - style.margin.horizontal());
        let inner_width = my_width - style.padding.horizontal() - 2.0 * style.border_width;

        // Flex rows split the width evenly between element children so text
        // wraps to roughly the right column width at build time.
        let child_width = if style.display == css::Display::Flex
            && style.flex_direction == css::FlexDirection::Row
        {
            let count = children
                .iter()
                .filter(|c| matches!(c, StyledNode::Element { .. }))
                .count()
                .max(1);
            let gaps = style.gap * (count - 1) as f32;
            ((inner_width - gaps) / count as f32).max(1.0)
        } else {
            inner_width
        };

        let mut child_nodes = Vec::new();
        for child in children {
            if let Some(id) = self.build_node(child, child_width)? {
                child_nodes.push(id);
            }
        }

        let node = self
            .taffy
            .new_with_children(to_taffy_style(style), &child_nodes)?;
        self.node_styles.insert(node, style.clone());
        Ok(Some(node))
    }

    /// Images without a usable `src` are left out of the layout entirely.
    fn build_image_node(
        &mut self,
        src: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> TaffyResult<Option<NodeId>> {
        if src.is_empty() {
            return Ok(None);
        }
        let Some((width, height)) = image_box_size(src, style, parent_width) else {
            log::warn!("Skipping image with unknown size");
            return Ok(None);
        };

        let taffy_style = Style {
            size: Size {
                width: Dimension::Length(width),
                height: Dimension::Length(height),
            },
            margin: margin_rect(style),
            flex_shrink: 0.0,
            ..Default::default()
        };
        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Image {
                src: src.to_string(),
            },
        );
        Ok(Some(node))
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> TaffyResult<PositionedBox> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<TaffyResult<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn margin_rect(s: &ComputedStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(s.margin.top),
        right: LengthPercentageAuto::Length(s.margin.right),
        bottom: LengthPercentageAuto::Length(s.margin.bottom),
        left: LengthPercentageAuto::Length(s.margin.left),
    }
}

fn padding_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.padding.top),
        right: LengthPercentage::Length(s.padding.right),
        bottom: LengthPercentage::Length(s.padding.bottom),
        left: LengthPercentage::Length(s.padding.left),
    }
}

fn to_taffy_dimension(d: css::Dimension) -> Dimension {
    match d {
        css::Dimension::Auto => Dimension::Auto,
        css::Dimension::Px(v) => Dimension::Length(v),
        css::Dimension::Percent(v) => Dimension::Percent(v / 100.0),
    }
}

fn to_taffy_style(s: &ComputedStyle) -> Style {
    let mut ts = Style::default();

    match s.display {
        css::Display::Flex => {
            ts.display = Display::Flex;
            ts.flex_direction = match s.flex_direction {
                css::FlexDirection::Row => FlexDirection::Row,
                css::FlexDirection::Column => FlexDirection::Column,
            };
            ts.justify_content = Some(match s.justify_content {
                css::JustifyContent::Start => JustifyContent::Start,
                css::JustifyContent::End => JustifyContent::End,
                css::JustifyContent::Center => JustifyContent::Center,
                css::JustifyContent::SpaceBetween => JustifyContent::SpaceBetween,
                css::JustifyContent::SpaceAround => JustifyContent::SpaceAround,
                css::JustifyContent::SpaceEvenly => JustifyContent::SpaceEvenly,
            });
            ts.align_items = Some(match s.align_items {
                css::AlignItems::Start => AlignItems::Start,
                css::AlignItems::End => AlignItems::End,
                css::AlignItems::Center => AlignItems::Center,
                css::AlignItems::Stretch => AlignItems::Stretch,
            });
        }
        // Block-level elements stack vertically.
        css::Display::Block => {
            ts.display = Display::Flex;
            ts.flex_direction = FlexDirection::Column;
        }
        css::Display::Inline => {
            ts.display = Display::Flex;
            ts.flex_direction = FlexDirection::Row;
            ts.flex_wrap = FlexWrap::Wrap;
        }
        css::Display::None => ts.display = Display::None,
    }

    ts.size = Size {
        width: to_taffy_dimension(s.width),
        height: to_taffy_dimension(s.height),
    };
    // A fixed height is a hard size; do not let the parent squeeze it.
    if matches!(s.height, css::Dimension::Px(_)) {
        ts.flex_shrink = 0.0;
    }
    ts.margin = margin_rect(s);
    ts.padding = padding_rect(s);
    ts.border = Rect {
        top: LengthPercentage::Length(s.border_width),
        right: LengthPercentage::Length(s.border_width),
        bottom: LengthPercentage::Length(s.border_width),
        left: LengthPercentage::Length(s.border_width),
    };
    ts.gap = Size {
        width: LengthPercentage::Length(s.gap),
        height: LengthPercentage::Length(s.gap),
    };
    ts
}

// ---------------------------------------------------------------------------
// Image intrinsic-size helper
// ---------------------------------------------------------------------------

/// Box size for an image. Explicit dimensions win; a missing one is derived
/// from the image's aspect ratio, and with neither the intrinsic pixel size
/// is used at 1 px = 1 pt.
fn image_box_size(src: &str, style: &ComputedStyle, parent_width: f32) -> Option<(f32, f32)> {
    let known_w = style.width.resolve(parent_width);
    let known_h = match style.height {
        css::Dimension::Px(v) => Some(v),
        _ => None,
    };
    if let (Some(w), Some(h)) = (known_w, known_h) {
        return Some((w, h));
    }

    let (px_w, px_h) = intrinsic_size(src)?;
    let aspect = px_w / px_h;
    Some(match (known_w, known_h) {
        (Some(w), None) => (w, (w / aspect).max(1.0)),
        (None, Some(h)) => ((h * aspect).max(1.0), h),
        _ => (px_w, px_h),
    })
}

fn intrinsic_size(src: &str) -> Option<(f32, f32)> {
    let (header, data) = src.strip_prefix("data:")?.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    let bytes = BASE64_STD.decode(data.trim()).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (w, h) = (img.width() as f32, img.height() as f32);
    (w > 0.0 && h > 0.0).then_some((w, h))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates (x includes the page margin, y starts at 0).
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page_width: f32,
    page_margin: f32,
) -> Result<Vec<PositionedBox>, String> {
    let content_width = page_width - 2.0 * page_margin;
    build_and_extract(styled_nodes, content_width, page_margin).map_err(|e| e.to_string())
}

fn build_and_extract(
    styled_nodes: &[StyledNode],
    content_width: f32,
    page_margin: f32,
) -> TaffyResult<Vec<PositionedBox>> {
    let mut builder = LayoutBuilder::new();

    let mut child_ids = Vec::new();
    for node in styled_nodes {
        if let Some(id) = builder.build_node(node, content_width)? {
            child_ids.push(id);
        }
    }

    // Root flex column; children keep their natural height so the document
    // can grow past one page.
    let root_style = Style {
        display: Display::Flex,
        flex_direction: FlexDirection::Column,
        size: Size {
            width: Dimension::Length(content_width),
            height: Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder.taffy.new_with_children(root_style, &child_ids)?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    Ok(builder.extract(root, page_margin, 0.0)?.children)
}
