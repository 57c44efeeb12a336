//! 5x7 bitmap font for overlay text.
//!
//! Each glyph is seven rows, top first; the low five bits of a row are the
//! pixels, most significant bit leftmost. Lowercase letters share the
//! uppercase shapes.

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
/// Horizontal advance in font pixels, including one column of spacing.
pub const ADVANCE: usize = 6;

type Glyph = [u8; GLYPH_HEIGHT];

const LETTERS: [Glyph; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
];

const DIGITS: [Glyph; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

const BLANK: Glyph = [0; GLYPH_HEIGHT];

pub fn glyph(ch: char) -> Option<&'static Glyph> {
    let g: &'static Glyph = match ch {
        'a'..='z' => &LETTERS[(ch as u8 - b'a') as usize],
        'A'..='Z' => &LETTERS[(ch as u8 - b'A') as usize],
        '0'..='9' => &DIGITS[(ch as u8 - b'0') as usize],
        ' ' => &BLANK,
        '.' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => &[0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => &[0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => &[0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '\'' => &[0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '"' => &[0x0A, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00],
        '-' => &[0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '>' => &[0x08, 0x04, 0x02, 0x01, 0x02, 0x04, 0x08],
        '<' => &[0x02, 0x04, 0x08, 0x10, 0x08, 0x04, 0x02],
        '(' => &[0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => &[0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        ':' => &[0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => &[0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '+' => &[0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '*' => &[0x00, 0x04, 0x15, 0x0E, 0x15, 0x04, 0x00],
        '=' => &[0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00],
        '♡' | '♥' => &[0x00, 0x0A, 0x1F, 0x1F, 0x0E, 0x04, 0x00],
        _ => return None,
    };
    Some(g)
}

/// Width in screen pixels of `text` drawn at `pixel` scale.
pub fn text_width(text: &str, pixel: f32) -> f32 {
    text.chars().count() as f32 * ADVANCE as f32 * pixel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_share_glyphs() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('z'), glyph('Z'));
        assert_ne!(glyph('a'), glyph('b'));
    }

    #[test]
    fn glyphs_fit_in_five_columns() {
        let all = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,!?'\"-_><():/+*=♡";
        for ch in all.chars() {
            let rows = glyph(ch).unwrap_or_else(|| panic!("missing glyph {ch:?}"));
            assert!(rows.iter().all(|r| *r < 1 << GLYPH_WIDTH), "{ch:?}");
        }
    }

    #[test]
    fn unknown_characters_have_no_glyph() {
        assert!(glyph('˶').is_none());
        assert!(glyph(' ').is_some());
        assert_eq!(text_width("ab c", 2.0), 48.0);
    }
}
