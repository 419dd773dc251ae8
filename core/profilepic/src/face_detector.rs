/// Bounding box of a detected face, in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    /// X coordinate of the top-left corner (pixels).
    pub left: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub top: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score. Scale depends on the backend.
    pub confidence: f64,
}

impl FaceBox {
    /// Box with a neutral confidence of 1.0.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            confidence: 1.0,
        }
    }

    /// Width times height.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Centroid of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Pluggable face detection backend.
///
/// Only the bounding-box contract matters to the pipeline; implement this
/// trait to plug in ONNX, dlib, a remote service, or a test double, and pass
/// it to [`crate::BatchProcessor::new`]. Implementations are shared read-only
/// across worker threads.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    ///
    /// Returns an empty vector when no face is present.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBox>;
}
