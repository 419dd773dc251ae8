//! Batch profile pictures from a photo archive.
//!
//! Usage:
//!   profilepic photos.zip                          # writes processed_images.zip
//!   profilepic photos.zip -o out.zip --width 200 --height 240
//!   profilepic photos.zip --preview 3 -o preview.png --format png
//!   profilepic photos.zip --config style.toml --font Roboto.ttf

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use profilepic::{
    BatchOptions, BatchProcessor, Color, FaceDetector, FaceSelection, FontSource, MultiFacePolicy,
    OutputFormat, RenderConfig, TextAlign,
};
use profilepic_cli::{load_config, read_batch, write_results, ArchiveBatch, Overrides};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "profilepic")]
#[command(author, version, about = "Crop, frame and label a batch of portrait photos", long_about = None)]
struct Args {
    /// ZIP archive with numbered images and a CSV of names
    #[arg(required = true)]
    archive: PathBuf,

    /// Output file (ZIP for a batch run, image for a preview)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render only the Nth image (1-based)
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// TOML file with render settings; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// TrueType/OpenType font for the names
    #[arg(long)]
    font: Option<PathBuf>,

    /// Face detector model path
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    detector: PathBuf,

    /// Minimum face size for detection
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Also write the report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Process one image at a time
    #[arg(long)]
    sequential: bool,

    /// Images in flight at once
    #[arg(long, default_value = "16")]
    chunk_size: usize,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Crop size as a multiple of the detected face
    #[arg(long)]
    box_size: Option<f32>,

    /// Extra margin around the crop, as a fraction of its size
    #[arg(long)]
    padding: Option<f32>,

    /// Font size in pixels
    #[arg(long)]
    font_size: Option<f32>,

    /// Name color, e.g. "#ffffff"
    #[arg(long)]
    text_color: Option<Color>,

    #[arg(long, value_enum)]
    align: Option<AlignArg>,

    /// Distance from the name to the bottom edge
    #[arg(long)]
    bottom_offset: Option<u32>,

    /// Space kept free left and right of the name
    #[arg(long)]
    margin: Option<u32>,

    /// Round the photo corners; half the width or more gives a circle
    #[arg(long)]
    corner_radius: Option<u32>,

    /// Card layout: square photo this far from the top, name below it
    #[arg(long, value_name = "PX")]
    card: Option<u32>,

    /// Canvas color
    #[arg(long)]
    background: Option<Color>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Which face to keep when several are found
    #[arg(long, value_enum)]
    select: Option<SelectArg>,

    /// Fail images that contain more than one face
    #[arg(long)]
    reject_multiple: bool,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpeg,
    Png,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SelectArg {
    Largest,
    First,
    MostConfident,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            frame_width: self.width,
            frame_height: self.height,
            box_size_factor: self.box_size,
            padding_ratio: self.padding,
            font_size: self.font_size,
            text_color: self.text_color,
            align: self.align.map(|align| match align {
                AlignArg::Left => TextAlign::Left,
                AlignArg::Center => TextAlign::Center,
                AlignArg::Right => TextAlign::Right,
            }),
            bottom_offset: self.bottom_offset,
            margin: self.margin,
            corner_radius: self.corner_radius,
            card_top_padding: self.card,
            background: self.background,
            quality: self.quality,
            format: self.format.map(|format| match format {
                FormatArg::Jpeg => OutputFormat::Jpeg,
                FormatArg::Png => OutputFormat::Png,
            }),
            face_selection: self.select.map(|select| match select {
                SelectArg::Largest => FaceSelection::Largest,
                SelectArg::First => FaceSelection::First,
                SelectArg::MostConfident => FaceSelection::MostConfident,
            }),
            multiple_faces: self.reject_multiple.then_some(MultiFacePolicy::Reject),
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "profilepic=debug,profilepic_cli=debug"
    } else {
        "profilepic=info,profilepic_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RenderConfig::default(),
    };
    let config = args.overrides().apply(config);
    debug!(?config, "render settings");

    let font = match &args.font {
        Some(path) => FontSource::Bytes(
            fs::read(path).with_context(|| format!("failed to read font {}", path.display()))?,
        ),
        None => FontSource::Builtin,
    };

    let detector = load_detector(args)?;
    let format = config.format;
    let processor = BatchProcessor::new(config, &font, detector)
        .context("invalid render settings")?
        .options(BatchOptions {
            parallel: !args.sequential,
            chunk_size: args.chunk_size,
        })?;

    let file = File::open(&args.archive)
        .with_context(|| format!("failed to open {}", args.archive.display()))?;
    let batch = read_batch(BufReader::new(file))
        .with_context(|| format!("failed to read {}", args.archive.display()))?;
    info!(items = batch.items.len(), "archive loaded");

    match args.preview {
        Some(n) => preview(args, &processor, &batch.items, n, format),
        None => process_all(args, &processor, &batch),
    }
}

#[cfg(feature = "rustface")]
fn load_detector(args: &Args) -> Result<Arc<dyn FaceDetector>> {
    info!("loading face detector from {}", args.detector.display());
    let detector = profilepic::RustfaceDetector::from_path(&args.detector)
        .context("failed to load face detector")?
        .min_face_size(args.min_face_size);
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "rustface"))]
fn load_detector(_args: &Args) -> Result<Arc<dyn FaceDetector>> {
    bail!("built without a face detector; enable the `rustface` feature")
}

fn preview(
    args: &Args,
    processor: &BatchProcessor,
    items: &[profilepic::InputItem],
    n: usize,
    format: OutputFormat,
) -> Result<()> {
    if n == 0 {
        bail!("--preview counts from 1");
    }
    let item = processor.preview(items, n - 1)?;
    println!("{item}");

    match item.photo() {
        Some(photo) => {
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("preview.{}", format.extension())));
            fs::write(&path, &photo.data)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("preview written to {}", path.display());
        }
        None => warn!("no preview image written"),
    }
    Ok(())
}

fn process_all(args: &Args, processor: &BatchProcessor, batch: &ArchiveBatch) -> Result<()> {
    let report = processor.run_with_progress(&batch.items, |progress| {
        debug!(
            completed = progress.completed,
            total = progress.total,
            index = progress.index,
            ok = progress.succeeded,
            "progress"
        );
    });

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("processed_images.zip"));
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let written = write_results(BufWriter::new(file), &report, batch)?;
    info!(written, "output written to {}", path.display());

    let summary = format!("{report}{}", batch.skipped_summary());
    if let Some(report_path) = &args.report {
        write_report(report_path, &summary)?;
    }
    print!("{summary}");
    Ok(())
}

fn write_report(path: &Path, summary: &str) -> Result<()> {
    fs::write(path, summary).with_context(|| format!("failed to write report {}", path.display()))
}
