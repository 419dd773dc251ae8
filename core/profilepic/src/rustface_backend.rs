use std::path::Path;

use crate::error::DetectorError;
use crate::face_detector::{FaceBox, FaceDetector};

/// Default minimum face size in pixels.
const DEFAULT_MIN_FACE_SIZE: u32 = 20;

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is parsed once; every `detect` call builds a fresh detector from
/// a clone of it, so a single instance can serve many worker threads.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceDetector {
    /// Load a SeetaFace model (`seeta_fd_frontal_v1.0.bin`) from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| DetectorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    /// Parse a SeetaFace model already held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DetectorError> {
        let model = rustface::read_model(std::io::Cursor::new(data))
            .map_err(|e| DetectorError::InvalidModel(e.to_string()))?;
        Ok(Self {
            model,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
        })
    }

    /// Ignore faces smaller than `size` pixels (default: 20).
    pub fn min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBox> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        detector
            .detect(&rustface::ImageData::new(gray, width, height))
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBox {
                    left: bbox.x() as f64,
                    top: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect()
    }
}
