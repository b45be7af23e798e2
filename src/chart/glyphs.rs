//! Compact 3x5 bitmap glyphs for chart labels.
//!
//! Only the characters needed for numbers and `MM-DD` dates are covered;
//! anything else is drawn as a blank cell.

/// Glyph width in cells.
pub const GLYPH_WIDTH: u32 = 3;
/// Glyph height in cells.
pub const GLYPH_HEIGHT: u32 = 5;
/// Blank cells between glyphs.
pub const GLYPH_SPACING: u32 = 1;

/// Returns the rows of `c`, most significant bit on the left.
pub fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        _ => [0; 5],
    }
}

/// Width in pixels of `text` drawn at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let count = text.chars().count() as u32;
    if count == 0 {
        return 0;
    }
    (count * (GLYPH_WIDTH + GLYPH_SPACING) - GLYPH_SPACING) * scale
}

/// Calls `plot` for every lit pixel of `text` with its top-left corner at
/// (`x`, `y`).
pub fn for_each_pixel(text: &str, x: i64, y: i64, scale: u32, mut plot: impl FnMut(i64, i64)) {
    let scale = i64::from(scale);
    let advance = i64::from(GLYPH_WIDTH + GLYPH_SPACING) * scale;
    for (index, c) in text.chars().enumerate() {
        let origin_x = x + index as i64 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - column)) == 0 {
                    continue;
                }
                let cell_x = origin_x + i64::from(column) * scale;
                let cell_y = y + row as i64 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        plot(cell_x + dx, cell_y + dy);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{for_each_pixel, glyph, text_width};

    #[test]
    fn measures_text() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("1", 2), 6);
        assert_eq!(text_width("03-13", 1), 19);
    }

    #[test]
    fn unknown_characters_are_blank() {
        assert_eq!(glyph('x'), [0; 5]);
        let mut lit = 0;
        for_each_pixel("x", 0, 0, 3, |_, _| lit += 1);
        assert_eq!(lit, 0);
    }

    #[test]
    fn scales_pixels() {
        let mut lit = 0;
        for_each_pixel("-", 0, 0, 2, |_, _| lit += 1);
        assert_eq!(lit, 3 * 4);
    }
}
