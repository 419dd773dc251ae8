use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, debug_span, info, warn};

use crate::compose;
use crate::config::RenderConfig;
use crate::error::{ConfigError, FontLoadError, ItemError, PreviewError, Stage};
use crate::face_detector::FaceDetector;
use crate::geometry;
use crate::locate;
use crate::typeface::{FontSource, Typeface};
use crate::RenderedPhoto;

/// One photo and the name to print on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Caller-assigned sequence number, carried through to the output.
    pub index: usize,
    /// Name printed on the picture.
    pub name: String,
    /// Encoded source image (JPEG, PNG, ...).
    pub data: Vec<u8>,
}

impl InputItem {
    /// Pair `data` with `name` at sequence `index`.
    pub fn new(index: usize, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            index,
            name: name.into(),
            data,
        }
    }
}

/// Non-fatal observation about one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// More than one face was detected; the configured selection picked one.
    MultipleFaces {
        /// Number of usable faces the detector returned.
        found: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MultipleFaces { found } => {
                write!(f, "{found} faces found, kept the selected one")
            }
        }
    }
}

/// Final state of one item.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// The finished picture.
    Succeeded(RenderedPhoto),
    /// Where and why the item stopped.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// Reason.
        error: ItemError,
    },
}

/// Result for one [`InputItem`], in input order.
#[derive(Debug, Clone)]
pub struct OutputItem {
    /// Sequence index of the input.
    pub index: usize,
    /// Name of the input.
    pub name: String,
    /// Picture or failure.
    pub outcome: ItemOutcome,
    /// Non-fatal observations, in the order they were made.
    pub warnings: Vec<Warning>,
}

impl OutputItem {
    /// Whether the item produced a picture.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Succeeded(_))
    }

    /// Rendered photo, if the item succeeded.
    pub fn photo(&self) -> Option<&RenderedPhoto> {
        match &self.outcome {
            ItemOutcome::Succeeded(photo) => Some(photo),
            ItemOutcome::Failed { .. } => None,
        }
    }

    /// Failing stage and reason, if the item failed.
    pub fn failure(&self) -> Option<(Stage, &ItemError)> {
        match &self.outcome {
            ItemOutcome::Succeeded(_) => None,
            ItemOutcome::Failed { stage, error } => Some((*stage, error)),
        }
    }
}

impl fmt::Display for OutputItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: ", self.index, self.name)?;
        match &self.outcome {
            ItemOutcome::Succeeded(_) => f.write_str("ok")?,
            ItemOutcome::Failed { stage, error } => write!(f, "failed while {stage}: {error}")?,
        }
        for warning in &self.warnings {
            write!(f, " (warning: {warning})")?;
        }
        Ok(())
    }
}

/// Everything a batch run produced: one item per input plus run-level notes.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per input, in input order.
    pub items: Vec<OutputItem>,
    /// Set when a custom font could not be parsed and the built-in face was used.
    pub font_error: Option<FontLoadError>,
}

impl BatchReport {
    /// Number of items with a picture.
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Failed items with their stage and reason.
    pub fn failures(&self) -> impl Iterator<Item = (&OutputItem, Stage, &ItemError)> {
        self.items
            .iter()
            .filter_map(|item| item.failure().map(|(stage, error)| (item, stage, error)))
    }

    /// Human-readable report listing every item.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed {} items: {} succeeded, {} failed",
            self.items.len(),
            self.succeeded(),
            self.failed()
        )?;
        if let Some(error) = &self.font_error {
            writeln!(f, "Using the built-in font: {error}")?;
        }
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

/// Progress after each finished item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Items finished so far, this one included.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// Sequence index of the item that just finished.
    pub index: usize,
    /// Whether that item produced a picture.
    pub succeeded: bool,
}

/// Scheduling knobs for [`BatchProcessor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Process the items of a chunk on the rayon pool.
    pub parallel: bool,
    /// Items in flight at once; bounds the decoded pixel buffers held in memory.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 16,
        }
    }
}

/// Runs the locate → resolve → compose pipeline over a batch.
///
/// The configuration is validated and the typeface loaded once in
/// [`BatchProcessor::new`]; afterwards both are shared read-only by every item.
pub struct BatchProcessor {
    config: Arc<RenderConfig>,
    typeface: Arc<Typeface>,
    detector: Arc<dyn FaceDetector>,
    font_error: Option<FontLoadError>,
    options: BatchOptions,
}

impl BatchProcessor {
    /// Validate `config` and load `font`.
    ///
    /// An invalid configuration fails here, before any item is touched. A font
    /// that cannot be parsed does not: the built-in face is used instead and the
    /// error is kept for the report.
    pub fn new(
        config: RenderConfig,
        font: &FontSource,
        detector: Arc<dyn FaceDetector>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (typeface, font_error) = Typeface::load_or_builtin(font);
        if let Some(error) = &font_error {
            warn!("{error}; falling back to the built-in font");
        }

        Ok(Self {
            config: Arc::new(config),
            typeface: Arc::new(typeface),
            detector,
            font_error,
            options: BatchOptions::default(),
        })
    }

    /// Replace the scheduling options.
    pub fn options(mut self, options: BatchOptions) -> Result<Self, ConfigError> {
        if options.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }
        self.options = options;
        Ok(self)
    }

    /// The validated configuration shared by every item.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Why the custom font was replaced by the built-in one, if it was.
    pub fn font_error(&self) -> Option<&FontLoadError> {
        self.font_error.as_ref()
    }

    /// Process every item. Never fails as a whole: each input yields exactly
    /// one output, in input order.
    pub fn run(&self, items: &[InputItem]) -> BatchReport {
        self.run_with_progress(items, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_progress` after each item. With
    /// parallel processing the callback runs on worker threads.
    pub fn run_with_progress<F>(&self, items: &[InputItem], on_progress: F) -> BatchReport
    where
        F: Fn(Progress) + Sync,
    {
        let started = Instant::now();
        let total = items.len();
        info!(
            total,
            parallel = self.options.parallel,
            chunk_size = self.options.chunk_size,
            "starting batch"
        );

        let completed = AtomicUsize::new(0);
        let process = |item: &InputItem| {
            let output = self.process_item(item);
            on_progress(Progress {
                completed: completed.fetch_add(1, Ordering::SeqCst) + 1,
                total,
                index: output.index,
                succeeded: output.is_success(),
            });
            output
        };

        let mut outputs = Vec::with_capacity(total);
        for chunk in items.chunks(self.options.chunk_size) {
            if self.options.parallel {
                outputs.par_extend(chunk.par_iter().map(process));
            } else {
                outputs.extend(chunk.iter().map(process));
            }
        }

        let report = BatchReport {
            items: outputs,
            font_error: self.font_error.clone(),
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        report
    }

    /// Render only the item at `position` in `items`, for tuning the
    /// configuration before a full run.
    pub fn preview(&self, items: &[InputItem], position: usize) -> Result<OutputItem, PreviewError> {
        let item = items.get(position).ok_or(PreviewError::IndexOutOfRange {
            index: position,
            len: items.len(),
        })?;
        Ok(self.process_item(item))
    }

    /// Run the full pipeline on one item, folding any stage failure into the result.
    pub fn process_item(&self, item: &InputItem) -> OutputItem {
        let span = debug_span!("item", index = item.index, name = %item.name);
        let _guard = span.enter();

        let mut warnings = Vec::new();
        let outcome = match self.render(item, &mut warnings) {
            Ok(photo) => {
                debug!("succeeded");
                ItemOutcome::Succeeded(photo)
            }
            Err((stage, error)) => {
                warn!(index = item.index, name = %item.name, %stage, "{error}");
                ItemOutcome::Failed { stage, error }
            }
        };

        OutputItem {
            index: item.index,
            name: item.name.clone(),
            outcome,
            warnings,
        }
    }

    fn render(
        &self,
        item: &InputItem,
        warnings: &mut Vec<Warning>,
    ) -> Result<RenderedPhoto, (Stage, ItemError)> {
        let config = self.config.as_ref();

        debug!(stage = %Stage::Decoding);
        let image = compose::decode_image(&item.data).map_err(|e| (Stage::Decoding, e))?;

        debug!(stage = %Stage::Locating, width = image.width(), height = image.height());
        let located = locate::locate(
            self.detector.as_ref(),
            &image,
            config.face_selection,
            config.multiple_faces,
        )
        .map_err(|e| (Stage::Locating, e))?;
        if located.faces_found > 1 {
            let warning = Warning::MultipleFaces {
                found: located.faces_found,
            };
            warn!(index = item.index, "{warning}");
            warnings.push(warning);
        }

        debug!(stage = %Stage::Resolving, face = ?located.face);
        let crop = geometry::resolve(&located.face, image.width(), image.height(), config)
            .map_err(|e| (Stage::Resolving, e))?;

        debug!(stage = %Stage::Composing, crop = ?crop);
        let composed = compose::compose(&image, crop, &item.name, config, &self.typeface)
            .map_err(|e| (Stage::Composing, e))?;

        Ok(RenderedPhoto {
            data: composed.data,
            format: config.format,
            width: composed.width,
            height: composed.height,
            face: located.face,
            crop,
            font_size: composed.font_size,
            original_size: item.data.len(),
        })
    }
}
