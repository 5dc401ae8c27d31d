//! Style resolver – applies tag defaults, stylesheet rules and inline
//! `style` attributes to produce a flat [`ComputedStyle`] per element.
//!
//! The stylesheet dialect is deliberately small: rules are `selector { decls }`
//! where a selector is `tag`, `.class`, `tag.class` (any number of classes),
//! `*`, or a comma list of those. There is no specificity; later rules win
//! over earlier ones and inline styles win over every rule. Selectors with
//! combinators and at-rules are ignored.

use std::collections::HashMap;

use crate::engine::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,

    // Spacing (px)
    pub margin: Edges,
    pub padding: Edges,

    // Border
    pub border_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of the font size.
    pub line_height: f32,

    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            margin: Edges::default(),
            padding: Edges::default(),
            border_width: 0.0,
            border_color: Color::BLACK,
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
        }
    }
}

impl ComputedStyle {
    /// Style for a text run: inherited typography, no box decoration.
    fn for_text(parent: &ComputedStyle) -> Self {
        Self {
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_style: parent.font_style,
            color: parent.color,
            text_align: parent.text_align,
            line_height: parent.line_height,
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    /// Line advance in px.
    pub fn line_height_px(&self) -> f32 {
        self.font_size * self.line_height
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

impl Dimension {
    /// Resolve against the containing width; `None` for `Auto`.
    pub fn resolve(self, containing: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Px(v) => Some(v),
            Dimension::Percent(p) => Some(containing * p / 100.0),
        }
    }
}

/// Top/right/bottom/left lengths in px.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rgb`, `#rrggbb`, or one of a handful of named colours.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "gray" | "grey" => Some(Self::rgb(0.5, 0.5, 0.5)),
            "red" => Some(Self::rgb(1.0, 0.0, 0.0)),
            "transparent" => Some(Self::TRANSPARENT),
            other => Self::from_hex(other),
        }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheet
// ---------------------------------------------------------------------------

/// A parsed stylesheet: rules in source order.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    selectors: Vec<Selector>,
    declarations: Vec<(String, String)>,
}

/// `tag.class1.class2`; `tag` of `None` matches any element.
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '[' | '#'))
        {
            return None;
        }
        let mut parts = text.split('.');
        let tag = match parts.next() {
            Some("") | Some("*") => None,
            Some(tag) => Some(tag.to_ascii_lowercase()),
            None => None,
        };
        let classes: Vec<String> = parts.map(str::to_string).collect();
        if classes.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { tag, classes })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        self.tag.as_deref().map_or(true, |t| t == element.tag.name())
            && self.classes.iter().all(|c| element.has_class(c))
    }
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        for block in css.split('}') {
            let Some((selector_text, body)) = block.split_once('{') else {
                continue;
            };
            let selector_text = selector_text.trim();
            if selector_text.starts_with('@') {
                log::debug!("Ignoring at-rule '{selector_text}'");
                continue;
            }
            let selectors: Vec<Selector> = selector_text
                .split(',')
                .filter_map(|s| {
                    let parsed = Selector::parse(s);
                    if parsed.is_none() {
                        log::debug!("Ignoring unsupported selector '{}'", s.trim());
                    }
                    parsed
                })
                .collect();
            if selectors.is_empty() {
                continue;
            }
            rules.push(Rule {
                selectors,
                declarations: parse_declarations(body),
            });
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn apply(&self, style: &mut ComputedStyle, element: &ElementNode) {
        for rule in &self.rules {
            if rule.selectors.iter().any(|s| s.matches(element)) {
                for (prop, val) in &rule.declarations {
                    apply_css_property(style, prop, val);
                }
            }
        }
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let (prop, val) = (prop.trim(), val.trim());
            if prop.is_empty() || val.is_empty() {
                return None;
            }
            Some((prop.to_ascii_lowercase(), val.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(
    element: &ElementNode,
    sheet: &Stylesheet,
    parent: Option<&ComputedStyle>,
) -> ComputedStyle {
    let mut style = match parent {
        Some(p) => ComputedStyle::for_text(p),
        None => ComputedStyle::default(),
    };
    apply_tag_defaults(&mut style, &element.tag);
    sheet.apply(&mut style, element);
    if let Some(inline) = element.inline_style() {
        for (prop, val) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &val);
        }
    }
    style
}

/// Default styles based on tag semantics.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    let heading = |s: &mut ComputedStyle, size: f32, margin: f32| {
        s.font_size = size;
        s.font_weight = FontWeight::Bold;
        s.margin.bottom = margin;
    };
    match tag {
        Tag::H1 => heading(s, 32.0, 12.0),
        Tag::H2 => heading(s, 24.0, 10.0),
        Tag::H3 => heading(s, 20.0, 8.0),
        Tag::P => s.margin.bottom = 10.0,
        Tag::Span => s.display = Display::Inline,
        Tag::Head => s.display = Display::None,
        Tag::Div | Tag::Img | Tag::Body | Tag::Html | Tag::Other(_) => {}
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "display" => {
            s.display = match val {
                "flex" => Display::Flex,
                "block" => Display::Block,
                "inline" | "inline-block" => Display::Inline,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "justify-content" => {
            s.justify_content = match val {
                "flex-start" | "start" => JustifyContent::Start,
                "flex-end" | "end" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "font-size" => {
            if let Some(px) = parse_length(val) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "width" => s.width = parse_dimension(val),
        "height" => s.height = parse_dimension(val),
        "margin" => apply_shorthand(val, &mut s.margin),
        "margin-top" => set_length(val, &mut s.margin.top),
        "margin-right" => set_length(val, &mut s.margin.right),
        "margin-bottom" => set_length(val, &mut s.margin.bottom),
        "margin-left" => set_length(val, &mut s.margin.left),
        "padding" => apply_shorthand(val, &mut s.padding),
        "padding-top" => set_length(val, &mut s.padding.top),
        "padding-right" => set_length(val, &mut s.padding.right),
        "padding-bottom" => set_length(val, &mut s.padding.bottom),
        "padding-left" => set_length(val, &mut s.padding.left),
        "border" => {
            // `border: 1px solid #333` – width and colour in any order
            for part in val.split_whitespace() {
                if let Some(px) = parse_length(part) {
                    s.border_width = px;
                } else if let Some(c) = Color::parse(part) {
                    s.border_color = c;
                }
            }
        }
        "border-width" => set_length(val, &mut s.border_width),
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "line-height" => {
            if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(px) = parse_length(val) {
                s.line_height = px / s.font_size;
            }
        }
        "gap" => set_length(val, &mut s.gap),
        "page-break-before" | "break-before" => {
            s.page_break_before = val == "always" || val == "page";
        }
        "page-break-after" | "break-after" => {
            s.page_break_after = val == "always" || val == "page";
        }
        _ => log::trace!("Unsupported CSS property '{prop}'"),
    }
}

/// A length in px. `pt` is accepted as-is since one layout px is one PDF point.
fn parse_length(s: &str) -> Option<f32> {
    let s = s.trim();
    let number = s
        .strip_suffix("px")
        .or_else(|| s.strip_suffix("pt"))
        .unwrap_or(s);
    number.trim().parse().ok()
}

fn set_length(val: &str, target: &mut f32) {
    if let Some(px) = parse_length(val) {
        *target = px;
    }
}

fn parse_dimension(s: &str) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        return Dimension::Auto;
    }
    if let Some(pct) = s.strip_suffix('%') {
        return pct
            .trim()
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto);
    }
    parse_length(s).map(Dimension::Px).unwrap_or(Dimension::Auto)
}

fn apply_shorthand(val: &str, edges: &mut Edges) {
    let parts: Vec<f32> = val.split_whitespace().filter_map(parse_length).collect();
    let (top, right, bottom, left) = match parts[..] {
        [all] => (all, all, all, all),
        [vertical, horizontal] => (vertical, horizontal, vertical, horizontal),
        [top, horizontal, bottom] => (top, horizontal, bottom, horizontal),
        [top, right, bottom, left] => (top, right, bottom, left),
        _ => return,
    };
    *edges = Edges {
        top,
        right,
        bottom,
        left,
    };
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Element attributes (for image `src`).
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
/// Elements with `display: none` are dropped along with their subtree.
pub fn build_styled_tree(
    nodes: &[DomNode],
    sheet: &Stylesheet,
    parent_style: Option<&ComputedStyle>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, sheet, parent_style);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, sheet, Some(&style));
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if !text.trim().is_empty() {
                    let style = parent_style
                        .map(ComputedStyle::for_text)
                        .unwrap_or_default();
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dom::parse_html;

    fn first_element(html: &str) -> ElementNode {
        match parse_html(html).into_iter().next() {
            Some(DomNode::Element(e)) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn inline_style_font_size_and_color() {
        let el = first_element(r#"<p style="font-size: 14.25px; color: #ff0000">x</p>"#);
        let s = resolve_style(&el, &Stylesheet::default(), None);
        assert_eq!(s.font_size, 14.25);
        assert!((s.color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn stylesheet_class_rules_apply_in_order() {
        let sheet = Stylesheet::parse(
            "/* card */ .card { height: 360px; page-break-after: always }\n\
             div.card { height: 300px }\n\
             .missing { color: red }",
        );
        let el = first_element(r#"<div class="card">x</div>"#);
        let s = resolve_style(&el, &sheet, None);
        assert_eq!(s.height, Dimension::Px(300.0));
        assert!(s.page_break_after);
        assert_eq!(s.color, Color::BLACK);
    }

    #[test]
    fn inline_style_beats_stylesheet() {
        let sheet = Stylesheet::parse(".message { font-size: 16px }");
        let el = first_element(r#"<p class="message" style="font-size: 12px">x</p>"#);
        assert_eq!(resolve_style(&el, &sheet, None).font_size, 12.0);
    }

    #[test]
    fn comma_selectors_and_unsupported_ones() {
        let sheet = Stylesheet::parse(".to, .from { font-style: italic } div p { color: red } @page { size: A6 }");
        let from = first_element(r#"<p class="from">x</p>"#);
        let s = resolve_style(&from, &sheet, None);
        assert_eq!(s.font_style, FontStyle::Italic);
        assert_eq!(s.color, Color::BLACK);
    }

    #[test]
    fn text_properties_inherit_box_properties_do_not() {
        let sheet = Stylesheet::parse(".card { font-weight: bold; padding: 8px; background: #eeeeee }");
        let nodes = parse_html(r#"<div class="card"><span>hi</span></div>"#);
        let styled = build_styled_tree(&nodes, &sheet, None);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected element");
        };
        let StyledNode::Element { style, .. } = &children[0] else {
            panic!("expected span");
        };
        assert_eq!(style.font_weight, FontWeight::Bold);
        assert_eq!(style.padding, Edges::default());
        assert!(style.background_color.is_transparent());
    }

    #[test]
    fn shorthand_spacing() {
        let mut s = ComputedStyle::default();
        apply_css_property(&mut s, "margin", "4px 8px");
        assert_eq!(s.margin.top, 4.0);
        assert_eq!(s.margin.left, 8.0);
        apply_css_property(&mut s, "padding", "1pt 2pt 3pt 4pt");
        assert_eq!(s.padding.horizontal(), 6.0);
    }

    #[test]
    fn color_parsing() {
        let c = Color::parse("#ff8800").unwrap();
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("chartreuse"), None);
    }

    #[test]
    fn display_none_drops_subtree() {
        let sheet = Stylesheet::parse(".hidden { display: none }");
        let nodes = parse_html(r#"<div class="hidden"><p>gone</p></div><p>kept</p>"#);
        assert_eq!(build_styled_tree(&nodes, &sheet, None).len(), 1);
    }
}
