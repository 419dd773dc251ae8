use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::error::FontLoadError;

/// Where the label typeface comes from.
#[derive(Debug, Clone, Default)]
pub enum FontSource {
    /// The bundled 5×7 bitmap face.
    #[default]
    Builtin,
    /// Raw TTF/OTF bytes, e.g. an uploaded font file.
    Bytes(Vec<u8>),
}

/// A loaded typeface, shared read-only by every item in a run.
pub enum Typeface {
    /// A parsed TrueType/OpenType font.
    Outline(FontVec),
    /// The bundled 5×7 bitmap face.
    Builtin,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Typeface::Outline(_) => f.write_str("Typeface::Outline"),
            Typeface::Builtin => f.write_str("Typeface::Builtin"),
        }
    }
}

/// Cell of the bitmap face: 5 columns of glyph plus 1 column of spacing, 7 rows plus 1.
const CELL_WIDTH: u32 = 6;
const CELL_HEIGHT: u32 = 8;
const GLYPH_COLUMNS: usize = 5;
const GLYPH_ROWS: u32 = 7;

impl Typeface {
    /// Parse `source`. Fails only for unparsable font bytes.
    pub fn load(source: &FontSource) -> Result<Self, FontLoadError> {
        match source {
            FontSource::Builtin => Ok(Typeface::Builtin),
            FontSource::Bytes(data) => FontVec::try_from_vec(data.clone())
                .map(Typeface::Outline)
                .map_err(|e| FontLoadError(e.to_string())),
        }
    }

    /// Parse `source`, falling back to the built-in face on failure.
    pub fn load_or_builtin(source: &FontSource) -> (Self, Option<FontLoadError>) {
        match Self::load(source) {
            Ok(typeface) => (typeface, None),
            Err(e) => (Typeface::Builtin, Some(e)),
        }
    }

    /// Advance width in pixels of `text` rendered at `size`.
    pub fn width(&self, size: f32, text: &str) -> u32 {
        match self {
            Typeface::Outline(font) => {
                if text.is_empty() {
                    return 0;
                }
                text_size(PxScale::from(size), font, text).0
            }
            Typeface::Builtin => {
                let count = text.chars().count() as u32;
                if count == 0 {
                    return 0;
                }
                let px = size / CELL_HEIGHT as f32;
                ((count * CELL_WIDTH - 1) as f32 * px).ceil() as u32
            }
        }
    }

    /// Height in pixels of one line at `size`, from the top of the line box to
    /// the lowest descender. All ink drawn by [`draw`](Self::draw) at `y`
    /// stays above `y + line_height`.
    pub fn line_height(&self, size: f32) -> u32 {
        match self {
            Typeface::Outline(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                (scaled.ascent() - scaled.descent()).ceil() as u32
            }
            Typeface::Builtin => (GLYPH_ROWS as f32 * size / CELL_HEIGHT as f32).ceil() as u32,
        }
    }

    /// Draw `text` with the top of its line box at `y` and its left edge at
    /// `x`. Pixels outside the canvas are skipped.
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        match self {
            Typeface::Outline(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text);
            }
            Typeface::Builtin => draw_bitmap_text(canvas, color, x, y, size, text),
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
    let px = size / CELL_HEIGHT as f32;
    let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);
    let edge = |origin: i32, cells: u32| origin + (cells as f32 * px).round() as i32;

    for (index, ch) in text.chars().enumerate() {
        let columns = glyph(ch);
        let cell_x = index as u32 * CELL_WIDTH;
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..GLYPH_ROWS {
                if bits & (1 << row) == 0 {
                    continue;
                }
                let (x0, x1) = (edge(x, cell_x + col as u32), edge(x, cell_x + col as u32 + 1));
                let (y0, y1) = (edge(y, row), edge(y, row + 1));
                for py in y0.max(0)..y1.min(canvas_h) {
                    for px_x in x0.max(0)..x1.min(canvas_w) {
                        canvas.put_pixel(px_x as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

/// Column bitmaps (bit 0 = top row) for printable ASCII; anything else
/// renders as a hollow box.
fn glyph(ch: char) -> [u8; GLYPH_COLUMNS] {
    const UNKNOWN: [u8; GLYPH_COLUMNS] = [0x7F, 0x41, 0x41, 0x41, 0x7F];
    let code = ch as u32;
    if !(0x20..=0x7E).contains(&code) {
        return UNKNOWN;
    }
    FONT_5X7[(code - 0x20) as usize]
}

#[rustfmt::skip]
const FONT_5X7: [[u8; GLYPH_COLUMNS]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

/// A font installed on common systems, if any.
#[cfg(test)]
pub(crate) fn system_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .find_map(|path| std::fs::read(path).ok())
}
