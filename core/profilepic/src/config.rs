use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locate::{FaceSelection, MultiFacePolicy};

/// An opaque RGB color, written as `#RRGGBB` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    /// `#000000`
    pub const BLACK: Color = Color([0, 0, 0]);
    /// `#ffffff`
    pub const WHITE: Color = Color([255, 255, 255]);

    /// As an `image` pixel.
    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb(self.0)
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConfigError::InvalidColor(s.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ConfigError::InvalidColor(s.to_string()))
        };
        Ok(Color([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Horizontal placement of the name label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Flush with the left margin.
    Left,
    /// Centered in the frame.
    #[default]
    Center,
    /// Flush with the right margin.
    Right,
}

/// How the cropped photo is placed in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameLayout {
    /// The photo fills the whole frame and the name is drawn over it.
    #[default]
    Overlay,

    /// A square photo `frame_width` wide sits `top_padding` pixels below the
    /// top edge; the name goes in the band underneath.
    Card {
        /// Space between the top edge and the photo.
        top_padding: u32,
    },
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG at the configured quality.
    #[default]
    Jpeg,

    /// Lossless PNG. Quality is ignored.
    Png,
}

impl OutputFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Typography of the name label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Starting font size in pixels. Shrunk automatically when the name is too wide.
    pub size: f32,
    /// Ink color.
    pub color: Color,
    /// Horizontal placement of each line.
    pub align: TextAlign,
    /// Distance from the bottom edge of the frame to the bottom of the last line.
    pub bottom_offset: u32,
    /// Horizontal space kept free on both sides of the text.
    pub margin: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 16.0,
            color: Color::BLACK,
            align: TextAlign::Center,
            bottom_offset: 8,
            margin: 10,
        }
    }
}

/// Frozen layout and typography parameters for one batch run.
///
/// Build it with the chained setters, or deserialize it from TOML; every field
/// has a default so partial files are accepted.
///
/// ```
/// use profilepic::{RenderConfig, TextAlign};
///
/// let config = RenderConfig::default()
///     .frame(200, 240)
///     .box_size_factor(1.5)
///     .padding_ratio(0.2)
///     .align(TextAlign::Left)
///     .quality(85);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Base crop size relative to the larger side of the face box.
    pub box_size_factor: f32,
    /// Extra margin added on each side, relative to the base crop size.
    pub padding_ratio: f32,
    /// Output width in pixels.
    pub frame_width: u32,
    /// Output height in pixels.
    pub frame_height: u32,
    /// Placement of the photo in the frame.
    pub layout: FrameLayout,
    /// Photo corner radius in output pixels; half the photo side or more gives a circle.
    pub corner_radius: u32,
    /// Canvas color behind the photo, transparent pixels, and masked corners.
    pub background: Color,
    /// Name label typography.
    pub text: TextStyle,
    /// Encoder quality, 1–100.
    pub quality: u8,
    /// Output encoding.
    pub format: OutputFormat,
    /// Which face is the subject when several are found.
    pub face_selection: FaceSelection,
    /// Whether several faces warn or fail the item.
    pub multiple_faces: MultiFacePolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            box_size_factor: 1.0,
            padding_ratio: 0.5,
            frame_width: 100,
            frame_height: 160,
            layout: FrameLayout::Overlay,
            corner_radius: 0,
            background: Color::WHITE,
            text: TextStyle::default(),
            quality: 90,
            format: OutputFormat::Jpeg,
            face_selection: FaceSelection::default(),
            multiple_faces: MultiFacePolicy::default(),
        }
    }
}

impl RenderConfig {
    /// Set the output frame size in pixels.
    pub fn frame(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Crop size as a multiple of the larger face side.
    pub fn box_size_factor(mut self, factor: f32) -> Self {
        self.box_size_factor = factor;
        self
    }

    /// Margin added on each side of the crop, as a fraction of its base size.
    pub fn padding_ratio(mut self, ratio: f32) -> Self {
        self.padding_ratio = ratio;
        self
    }

    /// Overlay or card layout.
    pub fn layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Round the photo corners; 0 keeps them square.
    pub fn corner_radius(mut self, radius: u32) -> Self {
        self.corner_radius = radius;
        self
    }

    /// Canvas color.
    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Starting font size in pixels.
    pub fn font_size(mut self, size: f32) -> Self {
        self.text.size = size;
        self
    }

    /// Name color.
    pub fn text_color(mut self, color: Color) -> Self {
        self.text.color = color;
        self
    }

    /// Horizontal name alignment.
    pub fn align(mut self, align: TextAlign) -> Self {
        self.text.align = align;
        self
    }

    /// Gap between the last line of the name and the bottom edge.
    pub fn bottom_offset(mut self, offset: u32) -> Self {
        self.text.bottom_offset = offset;
        self
    }

    /// Space kept free left and right of the name.
    pub fn margin(mut self, margin: u32) -> Self {
        self.text.margin = margin;
        self
    }

    /// JPEG quality, 1–100.
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Output encoding.
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Subject face when several are found.
    pub fn face_selection(mut self, selection: FaceSelection) -> Self {
        self.face_selection = selection;
        self
    }

    /// Warn on or reject images with several faces.
    pub fn multiple_faces(mut self, policy: MultiFacePolicy) -> Self {
        self.multiple_faces = policy;
        self
    }

    /// Check every parameter once, up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(ConfigError::InvalidFrame {
                width: self.frame_width,
                height: self.frame_height,
            });
        }
        if !self.box_size_factor.is_finite() || self.box_size_factor <= 0.0 {
            return Err(ConfigError::InvalidBoxSizeFactor(self.box_size_factor));
        }
        if !self.padding_ratio.is_finite() || self.padding_ratio < 0.0 {
            return Err(ConfigError::InvalidPaddingRatio(self.padding_ratio));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::InvalidQuality(self.quality));
        }
        if !self.text.size.is_finite() || self.text.size <= 0.0 {
            return Err(ConfigError::InvalidFontSize(self.text.size));
        }
        if self.text.margin.saturating_mul(2) >= self.frame_width {
            return Err(ConfigError::InvalidMargin {
                margin: self.text.margin,
                frame_width: self.frame_width,
            });
        }
        if let FrameLayout::Card { top_padding } = self.layout {
            if top_padding.saturating_add(self.frame_width) > self.frame_height {
                return Err(ConfigError::CardOverflow {
                    photo: self.frame_width,
                    top_padding,
                    frame_height: self.frame_height,
                });
            }
        }
        Ok(())
    }

    /// Size of the region the cropped photo is resized into.
    pub fn photo_size(&self) -> (u32, u32) {
        match self.layout {
            FrameLayout::Overlay => (self.frame_width, self.frame_height),
            FrameLayout::Card { .. } => (self.frame_width, self.frame_width),
        }
    }

    /// Top-left corner of the photo region within the frame.
    pub fn photo_origin(&self) -> (u32, u32) {
        match self.layout {
            FrameLayout::Overlay => (0, 0),
            FrameLayout::Card { top_padding } => (0, top_padding),
        }
    }
}
