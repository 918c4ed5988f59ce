//! Admin import pipeline: selected files in, catalog records out.
//!
//! Files are processed one after another on a worker thread. A file whose
//! metadata cannot be read is logged and skipped; the rest of the batch still
//! lands in the catalog as a single append once the whole batch is done.

use crate::model::{DEFAULT_COVER_ART_URL, Locator, Track, TrackId, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPicture {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Whatever the extractor managed to read. Missing fields get fallbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<f64>,
    pub picture: Option<ExtractedPicture>,
}

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Extracted>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("Could not load the music processing library. Please restart the player.")]
    ExtractorUnavailable,
    #[error("No files selected")]
    EmptySelection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub tracks: Vec<Track>,
    pub failures: Vec<ImportFailure>,
}

/// Hands out ids above the current maximum, never reusing one that is taken.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
    taken: BTreeSet<TrackId>,
}

impl IdAllocator {
    pub fn new(existing: impl IntoIterator<Item = TrackId>) -> Self {
        let taken: BTreeSet<TrackId> = existing.into_iter().collect();
        let next = taken.last().map_or(1, |max| max.0.saturating_add(1));
        Self { next, taken }
    }

    /// `None` once every id above the current maximum is used up.
    pub fn allocate(&mut self) -> Option<TrackId> {
        while self.taken.contains(&TrackId(self.next)) {
            self.next = self.next.checked_add(1)?;
        }
        let id = TrackId(self.next);
        self.taken.insert(id);
        Some(id)
    }
}

/// Process-lifetime home for blobs such as embedded cover art. Everything is
/// deleted when the store is dropped.
#[derive(Debug)]
pub struct BlobStore {
    dir: TempDir,
}

impl BlobStore {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("musikipri-blobs-")
            .tempdir()
            .context("failed to create blob directory")?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn materialize(&self, name: &str, data: &[u8], mime_type: Option<&str>) -> Result<Locator> {
        let path = self
            .dir
            .path()
            .join(format!("{name}.{}", extension_for_mime(mime_type)));
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Locator::Local(path))
    }
}

fn extension_for_mime(mime_type: Option<&str>) -> &'static str {
    match mime_type.map(str::to_ascii_lowercase).as_deref() {
        Some("image/png") => "png",
        Some("image/jpeg" | "image/jpg") => "jpg",
        Some("image/gif") => "gif",
        Some("image/bmp") => "bmp",
        Some("image/tiff") => "tiff",
        Some("image/webp") => "webp",
        _ => "bin",
    }
}

/// Runs the batch in order and returns every record that could be built.
pub fn import_batch(
    files: &[PathBuf],
    existing: impl IntoIterator<Item = TrackId>,
    extractor: &dyn MetadataExtractor,
    blobs: &BlobStore,
) -> ImportReport {
    let mut ids = IdAllocator::new(existing);
    let mut report = ImportReport::default();

    for path in files {
        match extractor.extract(path) {
            Ok(extracted) => {
                let Some(id) = ids.allocate() else {
                    tracing::warn!(path = %path.display(), "no track id left for import");
                    report.failures.push(ImportFailure {
                        path: path.clone(),
                        reason: String::from("no track id left"),
                    });
                    continue;
                };
                let track = build_track(id, path, extracted, blobs);
                tracing::debug!(id = %id, path = %path.display(), "parsed import file");
                report.tracks.push(track);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "error parsing file metadata: {err:#}");
                report.failures.push(ImportFailure {
                    path: path.clone(),
                    reason: format!("{err:#}"),
                });
            }
        }
    }

    tracing::info!(
        imported = report.tracks.len(),
        skipped = report.failures.len(),
        "import batch finished"
    );
    report
}

fn build_track(id: TrackId, path: &Path, extracted: Extracted, blobs: &BlobStore) -> Track {
    let title = extracted.title.unwrap_or_else(|| {
        path.file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("unknown")
            .to_string()
    });

    let cover_art = match extracted.picture {
        Some(picture) => blobs
            .materialize(
                &format!("cover-{id}"),
                &picture.data,
                picture.mime_type.as_deref(),
            )
            .unwrap_or_else(|err| {
                tracing::warn!(id = %id, "could not store cover art: {err:#}");
                Locator::remote(DEFAULT_COVER_ART_URL)
            }),
        None => Locator::remote(DEFAULT_COVER_ART_URL),
    };

    Track {
        id,
        title,
        artist: extracted
            .artist
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: extracted.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
        duration_seconds: extracted
            .duration_seconds
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .unwrap_or(0.0),
        cover_art,
        audio: Locator::Local(path.to_path_buf()),
    }
}

/// A batch running on a worker thread. Poll it from the UI loop.
pub struct ImportJob {
    receiver: Receiver<ImportReport>,
    file_count: usize,
}

impl ImportJob {
    pub fn start(
        extractor: Option<Arc<dyn MetadataExtractor>>,
        blobs: Arc<BlobStore>,
        files: Vec<PathBuf>,
        existing: Vec<TrackId>,
    ) -> Result<Self, ImportError> {
        let Some(extractor) = extractor else {
            tracing::error!("metadata extractor is not available");
            return Err(ImportError::ExtractorUnavailable);
        };
        if files.is_empty() {
            return Err(ImportError::EmptySelection);
        }

        let file_count = files.len();
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let report = import_batch(&files, existing, extractor.as_ref(), &blobs);
            let _ = sender.send(report);
        });

        tracing::info!(files = file_count, "import started");
        Ok(Self {
            receiver,
            file_count,
        })
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// `None` while the worker is still busy.
    pub fn poll(&self) -> Option<ImportReport> {
        match self.receiver.try_recv() {
            Ok(report) => Some(report),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(ImportReport {
                tracks: Vec::new(),
                failures: vec![ImportFailure {
                    path: PathBuf::new(),
                    reason: String::from("import worker stopped unexpectedly"),
                }],
            }),
        }
    }
}
