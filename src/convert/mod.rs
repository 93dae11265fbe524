//! Chapter folder to PDF conversion
//!
//! Scans a manga's directory for chapter folders, converts each folder's page
//! images into one multi-page PDF, and removes the source images afterwards.
//! Folders are processed through a bounded worker pool; a single folder's
//! failure is logged and counted but never aborts its siblings. Only
//! scheduling-level failures (the manga directory itself missing or
//! unreadable) surface to the caller.


use crate::config::Config;
use crate::error::{ConvertError, Result};
use crate::types::{ConversionReport, Event};
use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use printpdf::{Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, RawImage, XObjectTransform};
use regex::Regex;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// JPEG quality used when embedding pages into the PDF
const PAGE_JPEG_QUALITY: u8 = 90;

/// First run of decimal digits anywhere in a filename
#[allow(clippy::expect_used)]
static PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// Outcome of converting one chapter folder
enum FolderOutcome {
    /// PDF written, sources cleaned up
    Converted { folder: String, pages: usize },
    /// No page images in the folder, nothing to do
    Skipped { folder: String },
    /// Conversion failed, sources left in place
    Failed { folder: String, error: String },
}

/// Converts chapter folders into per-chapter PDF documents
///
/// One engine is shared by all tasks; it is stateless apart from
/// configuration and the event channel.
pub struct ConversionEngine {
    config: Arc<Config>,
    events: broadcast::Sender<Event>,
}

impl ConversionEngine {
    /// Create an engine over the crate configuration
    pub fn new(config: Arc<Config>, events: broadcast::Sender<Event>) -> Self {
        Self { config, events }
    }

    /// Convert every chapter folder of one manga
    ///
    /// Candidates are the immediate subdirectories of
    /// `work_dir/<manga_name>` whose name starts with the manga name without
    /// being equal to it. Each candidate becomes one PDF named after the
    /// folder, written next to it; the folder and its images are deleted
    /// after a successful write.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MangaDirMissing`] when the manga directory
    /// does not exist and [`ConvertError::ScanFailed`] when it cannot be
    /// enumerated. Per-folder failures are absorbed into the report.
    pub async fn convert_manga(&self, manga_name: &str) -> Result<ConversionReport> {
        let manga_dir = self.config.work_dir.join(manga_name);
        if !manga_dir.is_dir() {
            return Err(ConvertError::MangaDirMissing { path: manga_dir }.into());
        }

        let candidates = chapter_folders(&manga_dir, manga_name).await?;
        info!(
            manga = manga_name,
            folders = candidates.len(),
            "starting conversion"
        );
        self.events
            .send(Event::ConversionStarted {
                manga: manga_name.to_string(),
                folders: candidates.len(),
            })
            .ok();

        let mut report = ConversionReport {
            folders_found: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            info!(manga = manga_name, "no chapter folders to convert");
            self.events
                .send(Event::ConversionFinished {
                    manga: manga_name.to_string(),
                    report,
                })
                .ok();
            return Ok(report);
        }

        let workers = self.config.convert.max_workers.max(1);
        let outcomes: Vec<FolderOutcome> = stream::iter(candidates)
            .map(|folder| self.convert_folder(folder, manga_dir.clone()))
            .buffer_unordered(workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                FolderOutcome::Converted { folder, pages } => {
                    report.converted += 1;
                    debug!(folder = %folder, pages, "folder converted");
                    self.events
                        .send(Event::FolderConverted {
                            manga: manga_name.to_string(),
                            folder,
                            pages,
                        })
                        .ok();
                }
                FolderOutcome::Skipped { folder } => {
                    report.skipped += 1;
                    info!(folder = %folder, "no page images found, skipping");
                }
                FolderOutcome::Failed { folder, error } => {
                    report.failed += 1;
                    warn!(folder = %folder, error = %error, "folder conversion failed");
                    self.events
                        .send(Event::FolderFailed {
                            manga: manga_name.to_string(),
                            folder,
                            error,
                        })
                        .ok();
                }
            }
        }

        info!(
            manga = manga_name,
            converted = report.converted,
            skipped = report.skipped,
            failed = report.failed,
            "conversion finished"
        );
        self.events
            .send(Event::ConversionFinished {
                manga: manga_name.to_string(),
                report,
            })
            .ok();
        Ok(report)
    }

    /// Run one folder's conversion on the blocking pool
    async fn convert_folder(&self, folder: PathBuf, manga_dir: PathBuf) -> FolderOutcome {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image_ext = self.config.convert.image_ext.clone();
        let dpi = self.config.convert.pdf_dpi;

        let result = tokio::task::spawn_blocking({
            let name = name.clone();
            move || convert_folder_blocking(&folder, &manga_dir, &name, &image_ext, dpi)
        })
        .await;

        match result {
            Ok(Ok(Some(pages))) => FolderOutcome::Converted {
                folder: name,
                pages,
            },
            Ok(Ok(None)) => FolderOutcome::Skipped { folder: name },
            Ok(Err(e)) => FolderOutcome::Failed {
                folder: name,
                error: e.to_string(),
            },
            Err(e) => FolderOutcome::Failed {
                folder: name,
                error: format!("conversion task panicked: {e}"),
            },
        }
    }
}

/// Immediate subdirectories that belong to this manga
///
/// A candidate's name starts with the manga name but is not the manga name
/// itself, which excludes the root folder and unrelated directories.
async fn chapter_folders(manga_dir: &Path, manga_name: &str) -> Result<Vec<PathBuf>> {
    let scan_failed = |e: std::io::Error| ConvertError::ScanFailed {
        path: manga_dir.to_path_buf(),
        reason: e.to_string(),
    };

    let mut candidates = Vec::new();
    let mut entries = tokio::fs::read_dir(manga_dir).await.map_err(scan_failed)?;
    while let Some(entry) = entries.next_entry().await.map_err(scan_failed)? {
        let file_type = entry.file_type().await.map_err(scan_failed)?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(manga_name) && name != manga_name {
            candidates.push(entry.path());
        }
    }
    Ok(candidates)
}

/// Convert one chapter folder, start to finish
///
/// Returns `Ok(None)` when the folder holds no page images, `Ok(Some(pages))`
/// after the PDF has been written and the sources cleaned up. Cleanup
/// failures are logged but never fail the unit: the PDF already exists.
fn convert_folder_blocking(
    folder: &Path,
    manga_dir: &Path,
    folder_name: &str,
    image_ext: &str,
    dpi: f32,
) -> std::result::Result<Option<usize>, ConvertError> {
    let pages = collect_pages(folder, image_ext)?;
    if pages.is_empty() {
        return Ok(None);
    }
    let page_count = pages.len();

    let images = decode_pages(&pages)?;
    let bytes = assemble_pdf(folder_name, &images, dpi)?;
    drop(images);

    let pdf_path = manga_dir.join(format!("{folder_name}.pdf"));
    write_atomic(&pdf_path, &bytes)?;
    debug!(path = %pdf_path.display(), pages = page_count, "wrote chapter PDF");

    for page in &pages {
        if let Err(e) = std::fs::remove_file(page) {
            warn!(path = %page.display(), error = %e, "failed to delete page image");
        }
    }
    if let Err(e) = std::fs::remove_dir(folder) {
        warn!(path = %folder.display(), error = %e, "failed to remove chapter folder");
    }

    Ok(Some(page_count))
}

/// Page image files of one folder, in reading order
///
/// Ordering key is the first run of digits in the filename; names without
/// digits sort as page 0, and the sort is stable so equal keys keep their
/// enumeration order.
fn collect_pages(folder: &Path, image_ext: &str) -> std::result::Result<Vec<PathBuf>, ConvertError> {
    let scan_failed = |e: std::io::Error| ConvertError::ScanFailed {
        path: folder.to_path_buf(),
        reason: e.to_string(),
    };

    let mut pages = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(scan_failed)? {
        let entry = entry.map_err(scan_failed)?;
        let path = entry.path();
        let matches_ext = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(image_ext));
        if path.is_file() && matches_ext {
            pages.push(path);
        }
    }

    pages.sort_by_key(|path| {
        path.file_name()
            .map(|name| page_number(&name.to_string_lossy()))
            .unwrap_or(0)
    });
    Ok(pages)
}

/// Numeric page key of a filename
///
/// Digit runs too long for a u64 clamp to `u64::MAX` and sort last.
fn page_number(name: &str) -> u64 {
    PAGE_NUMBER
        .find(name)
        .map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Decode every page to 8-bit RGB, dropping any alpha channel
fn decode_pages(pages: &[PathBuf]) -> std::result::Result<Vec<image::RgbImage>, ConvertError> {
    let mut images = Vec::with_capacity(pages.len());
    for path in pages {
        let decode_failed = |reason: String| ConvertError::Decode {
            path: path.clone(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| decode_failed(e.to_string()))?;
        let decoded =
            image::load_from_memory(&bytes).map_err(|e| decode_failed(e.to_string()))?;
        images.push(decoded.to_rgb8());
    }
    Ok(images)
}

/// Assemble decoded pages into one PDF, sized to each image at `dpi`
fn assemble_pdf(
    title: &str,
    images: &[image::RgbImage],
    dpi: f32,
) -> std::result::Result<Vec<u8>, ConvertError> {
    let mut warnings = Vec::new();
    let mut doc = PdfDocument::new(title);
    let mut pages = Vec::with_capacity(images.len());

    for image in images {
        let encode_failed = |reason: String| ConvertError::DocumentWrite {
            path: PathBuf::from(format!("{title}.pdf")),
            reason,
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), PAGE_JPEG_QUALITY)
            .encode_image(image)
            .map_err(|e| encode_failed(e.to_string()))?;

        let raw = RawImage::decode_from_bytes(&jpeg, &mut warnings)
            .map_err(|e| encode_failed(e.to_string()))?;
        let id = doc.add_image(&raw);

        let (width_px, height_px) = image.dimensions();
        let width_mm = Mm(width_px as f32 * 25.4 / dpi);
        let height_mm = Mm(height_px as f32 * 25.4 / dpi);
        pages.push(PdfPage::new(
            width_mm,
            height_mm,
            vec![Op::UseXobject {
                id,
                transform: XObjectTransform {
                    dpi: Some(dpi),
                    ..Default::default()
                },
            }],
        ));
    }

    Ok(doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings))
}

/// Write bytes through a temporary sibling and rename into place
///
/// A crashed conversion can leave a `.tmp` file behind but never a partial
/// document at the final path.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::result::Result<(), ConvertError> {
    let write_failed = |reason: String| ConvertError::DocumentWrite {
        path: path.to_path_buf(),
        reason,
    };

    let tmp = path.with_extension("pdf.tmp");
    std::fs::write(&tmp, bytes).map_err(|e| write_failed(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| write_failed(e.to_string()))?;
    Ok(())
}
