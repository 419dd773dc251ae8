use crate::config::RenderConfig;
use crate::error::ItemError;
use crate::face_detector::FaceBox;

/// Crop region within the source image. Always lies fully inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge in source pixels.
    pub left: u32,
    /// Top edge in source pixels.
    pub top: u32,
    /// Width in source pixels.
    pub width: u32,
    /// Height in source pixels.
    pub height: u32,
}

/// Unclipped crop rectangle in source coordinates. May extend past the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredRect {
    /// Left edge; may be negative.
    pub left: f64,
    /// Top edge; may be negative.
    pub top: f64,
    /// Width before clipping.
    pub width: f64,
    /// Height before clipping.
    pub height: f64,
}

/// Rectangle of aspect `aspect` (width / height) centered on the face.
///
/// The shorter side is `max(face side) × box_size_factor × (1 + 2 × padding_ratio)`.
pub fn centered_rect(face: &FaceBox, box_size_factor: f64, padding_ratio: f64, aspect: f64) -> DesiredRect {
    let base_size = face.width.max(face.height) * box_size_factor;
    let padded_size = base_size * (1.0 + 2.0 * padding_ratio);

    let (width, height) = if aspect >= 1.0 {
        (padded_size * aspect, padded_size)
    } else {
        (padded_size, padded_size / aspect)
    };
    let (cx, cy) = face.center();

    DesiredRect {
        left: cx - width / 2.0,
        top: cy - height / 2.0,
        width,
        height,
    }
}

/// Derive the crop for `face` in an `image_width` × `image_height` image.
///
/// The rect keeps the aspect of the configured photo area. When it would leave
/// the image it is first translated inward at full size, and only shrunk when
/// it is larger than the image itself.
pub fn resolve(
    face: &FaceBox,
    image_width: u32,
    image_height: u32,
    config: &RenderConfig,
) -> Result<CropRect, ItemError> {
    let (photo_width, photo_height) = config.photo_size();
    let aspect = photo_width as f64 / photo_height as f64;
    let desired = centered_rect(
        face,
        config.box_size_factor as f64,
        config.padding_ratio as f64,
        aspect,
    );

    let rect = fit_into(&desired, image_width, image_height);

    let requested = desired.width.min(desired.height);
    let min_size = requested.min(face.width.min(face.height)).floor().max(1.0) as u32;
    if rect.width == 0 || rect.height == 0 || rect.width.min(rect.height) < min_size {
        return Err(ItemError::DegenerateCrop {
            width: rect.width,
            height: rect.height,
            min_size,
        });
    }
    Ok(rect)
}

/// Translate-then-shrink `desired` into the image bounds.
fn fit_into(desired: &DesiredRect, image_width: u32, image_height: u32) -> CropRect {
    let (img_w, img_h) = (image_width as f64, image_height as f64);

    let scale = (img_w / desired.width).min(img_h / desired.height).min(1.0);
    let width = ((desired.width * scale).round() as u32).min(image_width);
    let height = ((desired.height * scale).round() as u32).min(image_height);

    let cx = desired.left + desired.width / 2.0;
    let cy = desired.top + desired.height / 2.0;
    let left = (cx - width as f64 / 2.0)
        .round()
        .clamp(0.0, image_width.saturating_sub(width) as f64) as u32;
    let top = (cy - height as f64 / 2.0)
        .round()
        .clamp(0.0, image_height.saturating_sub(height) as f64) as u32;

    CropRect {
        left,
        top,
        width,
        height,
    }
}
