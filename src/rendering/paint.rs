/// Paint command set produced by the invoice layout

/// Width and height of one glyph cell at text scale 1.
pub const GLYPH_SIZE: u32 = 8;

/// RGBA color tuple.
pub type Rgba = (u8, u8, u8, u8);

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    /// Single line of text drawn with the 8x8 bitmap font. `scale` multiplies
    /// the glyph cell.
    Text {
        x: i32,
        y: i32,
        text: String,
        scale: u32,
        rgba: Rgba,
    },
    /// Draws `VisualNode::images()[index]` stretched into the box.
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        index: usize,
    },
}

/// Advance width of `text` at the given scale.
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_SIZE * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_width_counts_chars_not_bytes() {
        assert_eq!(text_width("abc", 1), 24);
        assert_eq!(text_width("é", 2), 16);
        assert_eq!(text_width("", 3), 0);
    }
}
