//! Photo archives: a ZIP of numbered images plus a CSV of names in, a ZIP of
//! finished pictures plus a report out.

use std::cmp::Ordering;
use std::io::{Read, Seek, Write};

use anyhow::{bail, Context, Result};
use profilepic::{BatchReport, InputItem};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Name of the summary entry in the output archive.
pub const REPORT_ENTRY: &str = "report.txt";

/// Items read from an input archive, paired image-to-name in order.
#[derive(Debug, Clone)]
pub struct ArchiveBatch {
    pub items: Vec<InputItem>,
    /// Images with no name left to pair with.
    pub unpaired_images: Vec<String>,
    /// Names with no image left to pair with.
    pub unpaired_names: Vec<String>,
}

impl ArchiveBatch {
    /// One line per image or name that was left out of the run.
    pub fn skipped_summary(&self) -> String {
        let mut summary = String::new();
        for path in &self.unpaired_images {
            summary.push_str(&format!("Skipped image without a name: {path}\n"));
        }
        for name in &self.unpaired_names {
            summary.push_str(&format!("Skipped name without an image: {name}\n"));
        }
        summary
    }
}

/// Read a photo archive.
///
/// Images are matched to the rows of the first CSV in the archive, in order.
/// Item indices are 1-based pair positions.
pub fn read_batch<R: Read + Seek>(reader: R) -> Result<ArchiveBatch> {
    let mut archive = ZipArchive::new(reader).context("input is not a readable ZIP archive")?;

    let mut images: Vec<(String, Vec<u8>)> = Vec::new();
    let mut tables: Vec<(String, Vec<u8>)> = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("failed to open archive entry {i}"))?;
        if entry.is_dir() {
            continue;
        }
        let path = entry.name().to_string();
        if is_metadata(&path) {
            debug!(%path, "skipping metadata entry");
            continue;
        }

        let kind = match extension(&path) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => &mut images,
            Some(ext) if ext == "csv" => &mut tables,
            _ => {
                debug!(%path, "skipping entry");
                continue;
            }
        };
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read {path}"))?;
        kind.push((path, data));
    }

    if tables.is_empty() {
        bail!("no CSV file found in the archive");
    }
    if images.is_empty() {
        bail!("no images (jpg, jpeg, png) found in the archive");
    }

    tables.sort_by(|a, b| a.0.cmp(&b.0));
    if tables.len() > 1 {
        warn!(used = %tables[0].0, ignored = tables.len() - 1, "several CSV files found");
    }
    let (table_path, table) = tables.swap_remove(0);
    let names = parse_names(&table).with_context(|| format!("failed to parse {table_path}"))?;

    sort_images(&mut images);

    let pairs = images.len().min(names.len());
    let unpaired_images: Vec<String> = images[pairs..].iter().map(|(path, _)| path.clone()).collect();
    let unpaired_names: Vec<String> = names[pairs..].to_vec();
    if !unpaired_images.is_empty() {
        warn!(count = unpaired_images.len(), "images without a name are skipped");
    }
    if !unpaired_names.is_empty() {
        warn!(count = unpaired_names.len(), "names without an image are skipped");
    }

    let items = images
        .into_iter()
        .zip(names)
        .enumerate()
        .map(|(position, ((_, data), name))| InputItem::new(position + 1, name, data))
        .collect();

    Ok(ArchiveBatch {
        items,
        unpaired_images,
        unpaired_names,
    })
}

/// Names from the first column of a CSV table with a header row.
pub fn parse_names(table: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table);

    if reader.headers()?.is_empty() {
        bail!("CSV has no columns");
    }

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record?;
        names.push(record.get(0).unwrap_or_default().to_string());
    }
    Ok(names)
}

/// Sort by numeric file stem (`2.jpg` before `10.jpg`). If any stem is not a
/// number, fall back to sorting by full path.
pub fn sort_images<T>(images: &mut [(String, T)]) {
    let numeric: Option<Vec<u64>> = images
        .iter()
        .map(|(path, _)| stem(path).parse::<u64>().ok())
        .collect();

    match numeric {
        Some(_) => images.sort_by(|a, b| compare_numeric(&a.0, &b.0)),
        None => images.sort_by(|a, b| a.0.cmp(&b.0)),
    }
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let key = |path: &str| stem(path).parse::<u64>().unwrap_or(u64::MAX);
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let dot = name.rfind('.')?;
    (dot > 0).then(|| name[dot + 1..].to_ascii_lowercase())
}

/// macOS resource forks and other hidden files.
fn is_metadata(path: &str) -> bool {
    path.starts_with("__MACOSX/") || file_name(path).starts_with('.')
}

/// Write every successful picture as `{index:02}.{ext}` plus [`REPORT_ENTRY`],
/// which lists every item and anything from `batch` that was left unpaired.
/// Returns the number of pictures written.
pub fn write_results<W: Write + Seek>(
    writer: W,
    report: &BatchReport,
    batch: &ArchiveBatch,
) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0;
    for item in &report.items {
        let Some(photo) = item.photo() else { continue };
        let entry = output_entry_name(item.index, photo.format.extension());
        zip.start_file(entry.as_str(), stored)
            .with_context(|| format!("failed to add {entry}"))?;
        zip.write_all(&photo.data)?;
        written += 1;
    }

    zip.start_file(REPORT_ENTRY, deflated)?;
    zip.write_all(report.summary().as_bytes())?;
    zip.write_all(batch.skipped_summary().as_bytes())?;
    zip.finish().context("failed to finish output archive")?;

    Ok(written)
}

/// Entry name for a picture, zero-padded to two digits.
pub fn output_entry_name(index: usize, extension: &str) -> String {
    format!("{index:02}.{extension}")
}
