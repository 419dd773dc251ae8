use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, Rgb, RgbImage, RgbaImage};

use crate::config::{OutputFormat, RenderConfig, TextAlign, TextStyle};
use crate::error::ItemError;
use crate::geometry::CropRect;
use crate::typeface::Typeface;

/// Smallest font size the label may shrink to.
pub const MIN_FONT_SIZE: f32 = 6.0;

/// Vertical gap between wrapped lines of the name.
pub const LINE_SPACING: u32 = 5;

/// Upper bound on label layouts tried per item.
const MAX_FIT_ATTEMPTS: usize = 32;

/// Encoded frame plus what the compositor decided along the way.
#[derive(Debug, Clone)]
pub(crate) struct Composed {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Font size the label was drawn at; `None` when the name is blank.
    pub font_size: Option<f32>,
}

/// One line of a wrapped name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LabelLine {
    pub text: String,
    pub width: u32,
}

/// Label layout chosen by [`fit_label`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FittedLabel {
    pub size: f32,
    pub lines: Vec<LabelLine>,
    pub line_height: u32,
}

impl FittedLabel {
    /// Width of the widest line.
    pub fn width(&self) -> u32 {
        self.lines.iter().map(|line| line.width).max().unwrap_or(0)
    }

    /// Height of the whole block, spacing included.
    pub fn height(&self) -> u32 {
        let count = self.lines.len() as u32;
        if count == 0 {
            return 0;
        }
        count * self.line_height + (count - 1) * LINE_SPACING
    }
}

/// Decode input bytes into a `DynamicImage`.
pub(crate) fn decode_image(input: &[u8]) -> Result<DynamicImage, ItemError> {
    let image = image::load_from_memory(input).map_err(|e| ItemError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ItemError::ZeroDimensions);
    }
    Ok(image)
}

/// Crop, resize, frame, label, and encode one picture.
pub(crate) fn compose(
    image: &DynamicImage,
    crop: CropRect,
    name: &str,
    config: &RenderConfig,
    typeface: &Typeface,
) -> Result<Composed, ItemError> {
    let (photo_w, photo_h) = config.photo_size();
    let background = config.background.to_rgb();

    let mut photo = image
        .crop_imm(crop.left, crop.top, crop.width, crop.height)
        .resize_exact(photo_w, photo_h, FilterType::Lanczos3)
        .to_rgba8();
    if config.corner_radius > 0 {
        round_corners(&mut photo, config.corner_radius);
    }
    let photo = flatten_alpha(&photo, background);

    let mut canvas = RgbImage::from_pixel(config.frame_width, config.frame_height, background);
    let (origin_x, origin_y) = config.photo_origin();
    image::imageops::replace(&mut canvas, &photo, origin_x as i64, origin_y as i64);

    let font_size = draw_label(&mut canvas, name, &config.text, typeface)?;
    let data = encode_image(&canvas, config.format, config.quality)?;

    Ok(Composed {
        data,
        width: canvas.width(),
        height: canvas.height(),
        font_size,
    })
}

/// Draw the name so its last line ends `bottom_offset` px above the bottom
/// edge. Returns the font size used.
fn draw_label(
    canvas: &mut RgbImage,
    name: &str,
    style: &TextStyle,
    typeface: &Typeface,
) -> Result<Option<f32>, ItemError> {
    let text = name.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let (frame_w, frame_h) = (canvas.width(), canvas.height());
    let available_width = frame_w.saturating_sub(style.margin.saturating_mul(2));
    let available_height = frame_h.saturating_sub(style.bottom_offset);
    let label = fit_label(typeface, text, style.size, available_width, available_height)?;

    let top = available_height.saturating_sub(label.height());
    for (i, line) in label.lines.iter().enumerate() {
        let x = match style.align {
            TextAlign::Left => style.margin,
            TextAlign::Center => frame_w.saturating_sub(line.width) / 2,
            TextAlign::Right => frame_w.saturating_sub(style.margin + line.width),
        };
        let y = top + i as u32 * (label.line_height + LINE_SPACING);
        typeface.draw(
            canvas,
            style.color.to_rgb(),
            x as i32,
            y as i32,
            label.size,
            &line.text,
        );
    }
    Ok(Some(label.size))
}

/// Break `text` greedily at spaces so each line is at most `available` px
/// wide. A single word wider than `available` keeps a line of its own.
pub(crate) fn wrap_words(
    typeface: &Typeface,
    text: &str,
    size: f32,
    available: u32,
) -> Vec<LabelLine> {
    let mut lines = Vec::new();
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return lines;
    };

    let mut current = first.to_string();
    for word in words {
        let candidate = format!("{current} {word}");
        if typeface.width(size, &candidate) <= available {
            current = candidate;
        } else {
            let width = typeface.width(size, &current);
            lines.push(LabelLine {
                text: std::mem::replace(&mut current, word.to_string()),
                width,
            });
        }
    }
    let width = typeface.width(size, &current);
    lines.push(LabelLine {
        text: current,
        width,
    });
    lines
}

/// Find the largest size ≤ `size` at which the word-wrapped `text` fits in
/// `available_width` × `available_height`.
///
/// Wraps first, then shrinks proportionally to the overflow, by at least 1px
/// per attempt, stopping at [`MIN_FONT_SIZE`].
pub(crate) fn fit_label(
    typeface: &Typeface,
    text: &str,
    size: f32,
    available_width: u32,
    available_height: u32,
) -> Result<FittedLabel, ItemError> {
    let mut size = size;
    for _ in 0..MAX_FIT_ATTEMPTS {
        let label = FittedLabel {
            size,
            lines: wrap_words(typeface, text, size, available_width),
            line_height: typeface.line_height(size),
        };
        let (width, height) = (label.width(), label.height());
        if width <= available_width && height <= available_height {
            return Ok(label);
        }
        if size <= MIN_FONT_SIZE {
            break;
        }
        let ratio = (available_width as f32 / width.max(1) as f32)
            .min(available_height as f32 / height.max(1) as f32);
        let proportional = (size * ratio).floor();
        size = proportional.min(size - 1.0).max(MIN_FONT_SIZE);
    }
    Err(ItemError::TextOverflow {
        available: available_width,
        min_size: MIN_FONT_SIZE,
    })
}

/// Make everything outside a rounded rectangle of `radius` fully transparent.
///
/// A radius of half the shorter side or more turns a square photo into a circle.
pub(crate) fn round_corners(photo: &mut RgbaImage, radius: u32) {
    let (width, height) = (photo.width(), photo.height());
    let r = radius.min(width / 2).min(height / 2) as f32;
    if r <= 0.0 {
        return;
    }
    let (w, h) = (width as f32, height as f32);

    for (x, y, pixel) in photo.enumerate_pixels_mut() {
        let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
        let cx = if fx < r {
            r
        } else if fx > w - r {
            w - r
        } else {
            continue;
        };
        let cy = if fy < r {
            r
        } else if fy > h - r {
            h - r
        } else {
            continue;
        };
        let (dx, dy) = (fx - cx, fy - cy);
        if dx * dx + dy * dy > r * r {
            pixel.0[3] = 0;
        }
    }
}

/// Flatten the alpha channel by compositing onto `background`.
pub(crate) fn flatten_alpha(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let mut rgb = RgbImage::new(image.width(), image.height());

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let blend =
            |channel: u8, back: u8| (channel as f32 * alpha + back as f32 * inv_alpha).round() as u8;
        let [br, bg, bb] = background.0;
        rgb.put_pixel(x, y, Rgb([blend(r, br), blend(g, bg), blend(b, bb)]));
    }

    rgb
}

/// Encode the finished frame.
pub(crate) fn encode_image(image: &RgbImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, ItemError> {
    let mut buffer = Vec::new();
    let (width, height) = (image.width(), image.height());

    match format {
        OutputFormat::Jpeg => {
            JpegEncoder::new_with_quality(&mut buffer, quality)
                .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| ItemError::Encode(e.to_string()))?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| ItemError::Encode(e.to_string()))?;
        }
    }

    Ok(buffer)
}
