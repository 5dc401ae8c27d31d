//! Text measurement for the builtin Helvetica family.
//!
//! The renderer only uses the PDF base-14 fonts, so no font files are
//! embedded. Widths come from the Helvetica AFM advance table (units per
//! 1000 em); bold text is approximated as a fixed percentage wider.

/// Ascender as a fraction of the font size, used to place the baseline.
pub const ASCENDER: f32 = 0.75;

const BOLD_FACTOR: f32 = 1.07;
const FALLBACK_ADVANCE: u16 = 556;

/// Helvetica advances for `' '..='~'`.
const ASCII_ADVANCES: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

fn advance(c: char) -> u16 {
    match c {
        ' '..='~' => ASCII_ADVANCES[c as usize - ' ' as usize],
        '\u{00A0}' => 278,
        _ => FALLBACK_ADVANCE,
    }
}

/// Width of `text` in px at `font_size`.
pub fn text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| advance(c) as u32).sum();
    let width = units as f32 * font_size / 1000.0;
    if bold {
        width * BOLD_FACTOR
    } else {
        width
    }
}

/// Word-wrap text to fit within `max_width` px. Words wider than the line
/// are kept whole on a line of their own.
pub fn wrap_text(text: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if text_width(&candidate, font_size, bold) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}
