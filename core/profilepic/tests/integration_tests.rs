use std::collections::HashMap;
use std::sync::Arc;

use image::ImageEncoder;
use profilepic::{
    BatchOptions, BatchProcessor, CropRect, FaceBox, FaceDetector, FontSource, FrameLayout,
    InputItem, ItemError, MultiFacePolicy, OutputFormat, RenderConfig, Stage, Warning,
};

/// Mock face detector keyed on image size, so each test image can get its own faces.
struct MockDetector {
    faces: HashMap<(u32, u32), Vec<FaceBox>>,
}

impl MockDetector {
    fn new() -> Self {
        Self {
            faces: HashMap::new(),
        }
    }

    fn with_faces(mut self, width: u32, height: u32, faces: Vec<FaceBox>) -> Self {
        self.faces.insert((width, height), faces);
        self
    }
}

impl FaceDetector for MockDetector {
    fn detect(&self, _gray: &[u8], width: u32, height: u32) -> Vec<FaceBox> {
        self.faces.get(&(width, height)).cloned().unwrap_or_default()
    }
}

fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = image::RgbImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ]);
    }
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

/// 400x400 has one face, 300x200 has none, 500x300 has two.
fn detector() -> Arc<MockDetector> {
    Arc::new(
        MockDetector::new()
            .with_faces(400, 400, vec![FaceBox::new(100.0, 100.0, 50.0, 50.0)])
            .with_faces(
                500,
                300,
                vec![
                    FaceBox::new(20.0, 20.0, 40.0, 40.0),
                    FaceBox::new(250.0, 100.0, 80.0, 80.0),
                ],
            ),
    )
}

fn square_config() -> RenderConfig {
    RenderConfig::default()
        .frame(100, 100)
        .box_size_factor(2.0)
        .padding_ratio(0.1)
}

fn mixed_batch() -> Vec<InputItem> {
    vec![
        InputItem::new(1, "Jane Smith", make_test_png(400, 400)),
        InputItem::new(2, "No Face", make_test_png(300, 200)),
        InputItem::new(3, "Broken", b"definitely not an image".to_vec()),
        InputItem::new(4, "Two People", make_test_png(500, 300)),
        InputItem::new(5, "Alex", make_test_png(400, 400)),
    ]
}

#[test]
fn every_input_yields_one_output_in_order() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let items = mixed_batch();
    let report = processor.run(&items);

    assert_eq!(report.items.len(), items.len());
    for (input, output) in items.iter().zip(&report.items) {
        assert_eq!(input.index, output.index);
        assert_eq!(input.name, output.name);
    }
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 2);
}

#[test]
fn missing_face_fails_only_that_item() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let report = processor.run(&mixed_batch());

    let no_face = &report.items[1];
    assert_eq!(
        no_face.failure(),
        Some((Stage::Locating, &ItemError::NoFaceFound))
    );
    assert!(report.items[4].is_success(), "later items still processed");

    let broken = &report.items[2];
    assert!(matches!(
        broken.failure(),
        Some((Stage::Decoding, ItemError::Decode(_)))
    ));

    let failures: Vec<_> = report.failures().map(|(item, _, _)| item.index).collect();
    assert_eq!(failures, vec![2, 3]);
}

#[test]
fn successful_outputs_match_the_frame() {
    let config = RenderConfig::default()
        .frame(120, 180)
        .box_size_factor(1.5)
        .padding_ratio(0.2);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector()).unwrap();
    let report = processor.run(&mixed_batch());

    for item in report.items.iter().filter(|item| item.is_success()) {
        let photo = item.photo().unwrap();
        assert_eq!(&photo.data[0..2], &[0xFF, 0xD8], "JPEG by default");
        let decoded = image::load_from_memory(&photo.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 180));
        assert_eq!((photo.width, photo.height), (120, 180));
    }
}

#[test]
fn crop_follows_the_face_box() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(1, "Jane", make_test_png(400, 400)));
    let photo = output.photo().unwrap();
    assert_eq!(
        photo.crop,
        CropRect {
            left: 65,
            top: 65,
            width: 120,
            height: 120
        }
    );
}

#[test]
fn same_input_gives_identical_bytes() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let first = processor.run(&mixed_batch());
    let second = processor.run(&mixed_batch());

    for (a, b) in first.items.iter().zip(&second.items) {
        assert_eq!(a.photo().map(|p| &p.data), b.photo().map(|p| &p.data));
    }
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let parallel = BatchProcessor::new(square_config(), &FontSource::Builtin, detector())
        .unwrap()
        .options(BatchOptions {
            parallel: true,
            chunk_size: 2,
        })
        .unwrap()
        .run(&mixed_batch());
    let sequential = BatchProcessor::new(square_config(), &FontSource::Builtin, detector())
        .unwrap()
        .options(BatchOptions {
            parallel: false,
            chunk_size: 1,
        })
        .unwrap()
        .run(&mixed_batch());

    assert_eq!(parallel.items.len(), sequential.items.len());
    for (a, b) in parallel.items.iter().zip(&sequential.items) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.photo().map(|p| &p.data), b.photo().map(|p| &p.data));
    }
}

#[test]
fn preview_matches_the_full_run() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let items = mixed_batch();
    let report = processor.run(&items);

    let preview = processor.preview(&items, 4).unwrap();
    assert_eq!(preview.index, 5);
    assert_eq!(
        preview.photo().unwrap().data,
        report.items[4].photo().unwrap().data
    );

    let failed_preview = processor.preview(&items, 1).unwrap();
    assert!(!failed_preview.is_success());
}

#[test]
fn multiple_faces_warn_by_default() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(4, "Two", make_test_png(500, 300)));

    assert!(output.is_success());
    assert_eq!(output.warnings, vec![Warning::MultipleFaces { found: 2 }]);
    // The larger face is the subject.
    assert_eq!(output.photo().unwrap().face.left, 250.0);
    assert!(output.to_string().contains("warning: 2 faces found"));
}

#[test]
fn multiple_faces_can_be_rejected() {
    let config = square_config().multiple_faces(MultiFacePolicy::Reject);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(4, "Two", make_test_png(500, 300)));

    assert_eq!(
        output.failure(),
        Some((Stage::Locating, &ItemError::MultipleFaces(2)))
    );
}

#[test]
fn corrupt_font_falls_back_once_for_the_whole_run() {
    let font = FontSource::Bytes(vec![0u8; 64]);
    let processor = BatchProcessor::new(square_config(), &font, detector()).unwrap();
    assert!(processor.font_error().is_some());

    let report = processor.run(&mixed_batch());
    assert!(report.font_error.is_some());
    assert_eq!(report.succeeded(), 3);
    assert!(report
        .failures()
        .all(|(_, stage, _)| stage != Stage::Composing));
    assert!(report.summary().contains("Using the built-in font"));
}

#[test]
fn overlong_name_fails_with_text_overflow() {
    let config = square_config().frame(40, 60);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector()).unwrap();
    let items = vec![
        InputItem::new(1, "Bartholomew Alexander Montgomery", make_test_png(400, 400)),
        InputItem::new(2, "Al", make_test_png(400, 400)),
    ];
    let report = processor.run(&items);

    assert!(matches!(
        report.items[0].failure(),
        Some((Stage::Composing, ItemError::TextOverflow { .. }))
    ));
    assert!(report.items[1].is_success());
}

#[test]
fn long_name_shrinks_instead_of_failing() {
    let config = square_config().frame(120, 120);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(1, "Christopher Lee", make_test_png(400, 400)));

    let photo = output.photo().unwrap();
    let size = photo.font_size.unwrap();
    assert!(size < 16.0, "font should shrink, got {size}");
    assert!(size >= profilepic::MIN_FONT_SIZE);
}

#[test]
fn degenerate_crop_fails_at_resolving() {
    let detector = Arc::new(MockDetector::new().with_faces(
        100,
        100,
        vec![FaceBox::new(10.0, 10.0, 80.0, 80.0)],
    ));
    let config = RenderConfig::default().frame(25, 100).box_size_factor(2.0);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector).unwrap();
    let output = processor.process_item(&InputItem::new(1, "", make_test_png(100, 100)));

    assert!(matches!(
        output.failure(),
        Some((Stage::Resolving, ItemError::DegenerateCrop { .. }))
    ));
}

#[test]
fn card_layout_with_round_photo_and_png_output() {
    let config = RenderConfig::default()
        .frame(100, 140)
        .layout(FrameLayout::Card { top_padding: 8 })
        .corner_radius(50)
        .format(OutputFormat::Png);
    let processor = BatchProcessor::new(config, &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(1, "Jane", make_test_png(400, 400)));

    let photo = output.photo().unwrap();
    assert_eq!(photo.crop.width, photo.crop.height);
    let decoded = image::load_from_memory(&photo.data).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (100, 140));
    // Corner of the circular photo shows the white background.
    assert_eq!(decoded.get_pixel(1, 9).0, [255, 255, 255]);
}

#[test]
fn empty_batch_is_fine() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let report = processor.run(&[]);
    assert!(report.items.is_empty());
    assert!(report.summary().starts_with("Processed 0 items"));
}

#[test]
fn multi_word_name_wraps_instead_of_shrinking_hard() {
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Builtin, detector()).unwrap();
    let output = processor.process_item(&InputItem::new(
        1,
        "Bartholomew Montgomery",
        make_test_png(400, 400),
    ));
    // Sized for the longest word, not the whole name on one line.
    assert_eq!(output.photo().unwrap().font_size, Some(9.0));
}

fn system_font() -> Option<Vec<u8>> {
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

#[test]
fn custom_font_renders_every_item() {
    let Some(data) = system_font() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let processor =
        BatchProcessor::new(square_config(), &FontSource::Bytes(data), detector()).unwrap();
    assert!(processor.font_error().is_none());

    let report = processor.run(&mixed_batch());
    assert!(report.font_error.is_none());
    assert_eq!(report.succeeded(), 3);
    for photo in report.items.iter().filter_map(|item| item.photo()) {
        let decoded = image::load_from_memory(&photo.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 100));
        assert!(photo.font_size.unwrap() >= profilepic::MIN_FONT_SIZE);
    }
}
