//! Batch profile pictures. Each photo has its face located and cropped, is
//! resized into a fixed frame with the person's name printed on it, and is
//! encoded. One bad photo never stops the rest of the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use profilepic::{BatchProcessor, FaceBox, FaceDetector, FontSource, InputItem, RenderConfig};
//!
//! struct MyDetector;
//! impl FaceDetector for MyDetector {
//!     fn detect(&self, _gray: &[u8], _width: u32, _height: u32) -> Vec<FaceBox> {
//!         // Plug a real detection engine in here.
//!         vec![]
//!     }
//! }
//!
//! let items = vec![InputItem::new(1, "Jane Smith", std::fs::read("1.jpg").unwrap())];
//! let processor = BatchProcessor::new(
//!     RenderConfig::default().frame(200, 240).quality(85),
//!     &FontSource::Builtin,
//!     Arc::new(MyDetector),
//! )
//! .unwrap();
//!
//! let report = processor.run(&items);
//! println!("{report}");
//! ```

#![warn(missing_docs)]

mod batch;
mod compose;
mod config;
mod error;
/// Face detection trait and bounding-box type.
pub mod face_detector;
/// Crop rectangle derivation around a face.
pub mod geometry;
/// Running the detector and choosing the subject face.
pub mod locate;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
mod typeface;

pub use batch::{
    BatchOptions, BatchProcessor, BatchReport, InputItem, ItemOutcome, OutputItem, Progress,
    Warning,
};
pub use compose::MIN_FONT_SIZE;
pub use config::{Color, FrameLayout, OutputFormat, RenderConfig, TextAlign, TextStyle};
pub use error::{ConfigError, DetectorError, FontLoadError, ItemError, PreviewError, Stage};
/// Face detection trait and face bounding-box type.
pub use face_detector::{FaceBox, FaceDetector};
pub use geometry::CropRect;
pub use locate::{FaceSelection, MultiFacePolicy};
#[cfg(feature = "rustface")]
/// Built-in detector that loads a SeetaFace model.
pub use rustface_backend::RustfaceDetector;
pub use typeface::{FontSource, Typeface};

/// A finished profile picture.
#[derive(Debug, Clone)]
pub struct RenderedPhoto {
    /// The encoded image bytes.
    pub data: Vec<u8>,

    /// The output format used.
    pub format: OutputFormat,

    /// Width of the output image in pixels; always the frame width.
    pub width: u32,

    /// Height of the output image in pixels; always the frame height.
    pub height: u32,

    /// The face the crop was built around, in source coordinates.
    pub face: FaceBox,

    /// The region of the source image that was used.
    pub crop: CropRect,

    /// Font size the name was drawn at, after any shrinking. `None` for a blank name.
    pub font_size: Option<f32>,

    /// Size of the original input in bytes.
    pub original_size: usize,
}
