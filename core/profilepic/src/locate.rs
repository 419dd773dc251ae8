use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ItemError;
use crate::face_detector::{FaceBox, FaceDetector};

/// Which face becomes the subject when the detector returns several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSelection {
    /// Largest box area; ties go to the earliest box.
    #[default]
    Largest,
    /// First box in detector order.
    First,
    /// Highest detector confidence; ties go to the earliest box.
    MostConfident,
}

/// What to do when more than one face is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiFacePolicy {
    /// Keep the selected face and record a warning.
    #[default]
    Warn,
    /// Fail the item.
    Reject,
}

/// The face chosen for an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedFace {
    /// The subject face, clipped to the image.
    pub face: FaceBox,
    /// Number of usable boxes the detector returned.
    pub faces_found: usize,
}

/// Run the detector on `image` and pick the subject face.
pub fn locate(
    detector: &dyn FaceDetector,
    image: &DynamicImage,
    selection: FaceSelection,
    policy: MultiFacePolicy,
) -> Result<LocatedFace, ItemError> {
    let gray = image::imageops::grayscale(image);
    let (width, height) = (gray.width(), gray.height());

    let faces: Vec<FaceBox> = detector
        .detect(gray.as_raw(), width, height)
        .into_iter()
        .filter_map(|face| clip_to_image(face, width, height))
        .collect();
    debug!(faces = faces.len(), "detector finished");

    if faces.len() > 1 && policy == MultiFacePolicy::Reject {
        return Err(ItemError::MultipleFaces(faces.len()));
    }
    let face = select_face(&faces, selection).ok_or(ItemError::NoFaceFound)?;

    Ok(LocatedFace {
        face,
        faces_found: faces.len(),
    })
}

/// Pick one face according to `selection`. `None` only for an empty slice.
pub fn select_face(faces: &[FaceBox], selection: FaceSelection) -> Option<FaceBox> {
    let key = |face: &FaceBox| match selection {
        FaceSelection::Largest => face.area(),
        FaceSelection::MostConfident => face.confidence,
        FaceSelection::First => 0.0,
    };

    let mut best: Option<&FaceBox> = None;
    for face in faces {
        match best {
            Some(current) if key(face) <= key(current) => {}
            _ => best = Some(face),
        }
    }
    best.copied()
}

/// Clip a detector box to the image; boxes left with no area are dropped.
fn clip_to_image(face: FaceBox, width: u32, height: u32) -> Option<FaceBox> {
    if ![face.left, face.top, face.width, face.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return None;
    }
    let left = face.left.max(0.0);
    let top = face.top.max(0.0);
    let right = (face.left + face.width).min(width as f64);
    let bottom = (face.top + face.height).min(height as f64);
    if right <= left || bottom <= top {
        return None;
    }
    Some(FaceBox {
        left,
        top,
        width: right - left,
        height: bottom - top,
        confidence: face.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedDetector(Vec<FaceBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _gray: &[u8], _width: u32, _height: u32) -> Vec<FaceBox> {
            self.0.clone()
        }
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    fn boxed(left: f64, top: f64, size: f64, confidence: f64) -> FaceBox {
        FaceBox {
            left,
            top,
            width: size,
            height: size,
            confidence,
        }
    }

    #[test]
    fn no_faces_is_an_error() {
        let result = locate(
            &FixedDetector(vec![]),
            &blank(50, 50),
            FaceSelection::Largest,
            MultiFacePolicy::Warn,
        );
        assert_eq!(result, Err(ItemError::NoFaceFound));
    }

    #[test]
    fn largest_face_wins_by_default() {
        let detector = FixedDetector(vec![boxed(0.0, 0.0, 10.0, 9.0), boxed(50.0, 50.0, 30.0, 1.0)]);
        let located = locate(
            &detector,
            &blank(200, 200),
            FaceSelection::Largest,
            MultiFacePolicy::Warn,
        )
        .unwrap();
        assert_eq!(located.face.left, 50.0);
        assert_eq!(located.faces_found, 2);
    }

    #[test]
    fn selection_policies() {
        let faces = [
            boxed(0.0, 0.0, 10.0, 9.0),
            boxed(20.0, 0.0, 30.0, 1.0),
            boxed(60.0, 0.0, 30.0, 2.0),
        ];
        assert_eq!(select_face(&faces, FaceSelection::First).unwrap().left, 0.0);
        // Equal areas: the earlier box is kept.
        assert_eq!(select_face(&faces, FaceSelection::Largest).unwrap().left, 20.0);
        assert_eq!(
            select_face(&faces, FaceSelection::MostConfident).unwrap().left,
            0.0
        );
        assert!(select_face(&[], FaceSelection::Largest).is_none());
    }

    #[test]
    fn reject_policy_fails_on_multiple_faces() {
        let detector = FixedDetector(vec![boxed(0.0, 0.0, 10.0, 1.0), boxed(20.0, 20.0, 10.0, 1.0)]);
        let result = locate(
            &detector,
            &blank(100, 100),
            FaceSelection::Largest,
            MultiFacePolicy::Reject,
        );
        assert_eq!(result, Err(ItemError::MultipleFaces(2)));
    }

    #[test]
    fn boxes_are_clipped_and_empty_ones_dropped() {
        let detector = FixedDetector(vec![
            boxed(-10.0, -10.0, 30.0, 1.0),
            boxed(150.0, 150.0, 20.0, 1.0),
            FaceBox::new(5.0, 5.0, 0.0, 10.0),
        ]);
        let located = locate(
            &detector,
            &blank(100, 100),
            FaceSelection::Largest,
            MultiFacePolicy::Reject,
        )
        .unwrap();
        assert_eq!(located.faces_found, 1);
        assert_eq!(located.face.left, 0.0);
        assert_eq!(located.face.top, 0.0);
        assert_eq!(located.face.width, 20.0);
        assert_eq!(located.face.height, 20.0);
    }
}
