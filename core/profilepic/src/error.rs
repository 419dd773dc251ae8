use std::fmt;

use thiserror::Error;

/// Invalid run configuration. Fatal to the whole batch, raised before any item
/// is processed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Frame width or height is zero.
    #[error("frame dimensions must be > 0, got {width}x{height}")]
    InvalidFrame {
        /// Requested frame width.
        width: u32,
        /// Requested frame height.
        height: u32,
    },

    /// Box size factor is zero, negative, or not finite.
    #[error("box size factor must be a finite number > 0, got {0}")]
    InvalidBoxSizeFactor(f32),

    /// Padding ratio is negative or not finite.
    #[error("padding ratio must be a finite number >= 0, got {0}")]
    InvalidPaddingRatio(f32),

    /// Quality outside 1–100.
    #[error("output quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// Font size is zero, negative, or not finite.
    #[error("font size must be a finite number > 0, got {0}")]
    InvalidFontSize(f32),

    /// Text margins leave no room for the name.
    #[error("text margin of {margin}px on both sides leaves no room in a frame {frame_width}px wide")]
    InvalidMargin {
        /// Margin kept free on each side.
        margin: u32,
        /// Frame width.
        frame_width: u32,
    },

    /// Card photo plus its top padding is taller than the frame.
    #[error("card photo ({photo}px + {top_padding}px top padding) does not fit a frame {frame_height}px tall")]
    CardOverflow {
        /// Side of the square photo.
        photo: u32,
        /// Space above the photo.
        top_padding: u32,
        /// Frame height.
        frame_height: u32,
    },

    /// Color string that is not `#RRGGBB`.
    #[error("invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    /// Batch chunk size of zero.
    #[error("chunk size must be > 0")]
    InvalidChunkSize,
}

/// Failure of a single item. Never aborts the batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ItemError {
    /// Input bytes are not a supported image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Image decoded to zero width or height.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// The detector found no usable face.
    #[error("no face found")]
    NoFaceFound,

    /// Several faces found under [`MultiFacePolicy::Reject`](crate::MultiFacePolicy::Reject).
    #[error("{0} faces found, expected exactly one")]
    MultipleFaces(usize),

    /// Crop clipped to the image is too small to use.
    #[error("crop of {width}x{height} is smaller than the minimum usable size {min_size}px")]
    DegenerateCrop {
        /// Clipped crop width.
        width: u32,
        /// Clipped crop height.
        height: u32,
        /// Smallest acceptable side.
        min_size: u32,
    },

    /// Name does not fit the frame even at the minimum font size.
    #[error("name does not fit a {available}px wide frame even at {min_size}px font size")]
    TextOverflow {
        /// Width available for a line of text.
        available: u32,
        /// Smallest font size tried.
        min_size: f32,
    },

    /// Encoder failure.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// A custom font that could not be parsed. Recorded once per run; the run
/// continues with the built-in typeface.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("failed to load font: {0}")]
pub struct FontLoadError(pub String);

/// Preview request that cannot be served.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreviewError {
    /// Position past the end of the batch.
    #[error("preview index {index} is out of range for a batch of {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of items in the batch.
        len: usize,
    },
}

/// Pipeline stage an item was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoding the input bytes.
    Decoding,
    /// Running the detector and picking a face.
    Locating,
    /// Deriving the crop rectangle.
    Resolving,
    /// Cropping, resizing, labeling and encoding.
    Composing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decoding",
            Stage::Locating => "locating",
            Stage::Resolving => "resolving",
            Stage::Composing => "composing",
        };
        f.write_str(name)
    }
}

/// Face model that could not be loaded by a built-in detector backend.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Model file could not be read.
    #[error("failed to read face model {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Model bytes could not be parsed.
    #[error("invalid face model: {0}")]
    InvalidModel(String),
}
