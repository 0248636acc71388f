// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export: encode a finished scan as PDF / PNG / JPEG and file it under a
// category folder in local or cloud document storage.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use docscan_core::error::{DocscanError, Result};
use docscan_core::types::{DocumentCategory, ExportFormat, PageLayout};
use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;
use crate::pdf::writer::PdfWriter;
use crate::scan::perspective::CorrectedDocumentImage;

/// Format used for file names when the user gives none.
const DEFAULT_NAME_FORMAT: &str = "%Y-%m-%d %I%M%S %p";

/// An encoded scan, ready for storage or sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
}

impl EncodedDocument {
    /// `<stem>.<ext>` for this document's format.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.format.extension())
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// The export collaborator. Receives each successfully captured document
/// exactly once.
pub trait DocumentSink: Send + Sync {
    fn accept(&self, document: EncodedDocument) -> Result<()>;
}

/// Encodes corrected documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportEncoder {
    layout: PageLayout,
}

impl ExportEncoder {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    #[instrument(skip(self, document), fields(width = document.width(), height = document.height()))]
    pub fn encode(
        &self,
        document: &CorrectedDocumentImage,
        format: ExportFormat,
    ) -> Result<EncodedDocument> {
        if document.width() == 0 || document.height() == 0 {
            return Err(DocscanError::Export("no image to encode".into()));
        }
        let bytes = match format {
            ExportFormat::Pdf => {
                let mut writer = PdfWriter::new(self.layout);
                writer.set_title("Scanned Document");
                writer.create_from_image(document.image())?
            }
            ExportFormat::Png | ExportFormat::Jpeg { .. } => {
                let processor =
                    ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(document.image().clone()));
                match format {
                    ExportFormat::Jpeg { quality } => processor.to_jpeg_bytes(quality)?,
                    _ => processor.to_png_bytes()?,
                }
            }
        };
        info!(?format, bytes = bytes.len(), "Document encoded");
        Ok(EncodedDocument { bytes, format })
    }
}

/// `YYYY-MM-DD hhmmss AM`, the default name for a new scan.
pub fn default_file_name(now: NaiveDateTime) -> String {
    now.format(DEFAULT_NAME_FORMAT).to_string()
}

/// Reject names that are empty or would escape their folder.
fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(DocscanError::InvalidFileName(name.to_string()));
    }
    Ok(trimmed)
}

/// A document found in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Where saved documents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StorageLocation {
    Local,
    Cloud,
}

/// Category-foldered document storage.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    location: StorageLocation,
}

impl DocumentStore {
    /// Store rooted directly at a local documents directory.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            location: StorageLocation::Local,
        }
    }

    /// Store inside a cloud container's `Documents` folder.
    pub fn cloud(container: impl AsRef<Path>) -> Self {
        Self {
            root: container.as_ref().join("Documents"),
            location: StorageLocation::Cloud,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn location(&self) -> StorageLocation {
        self.location
    }

    /// Folder for a category. Not created.
    pub fn folder(&self, category: &DocumentCategory) -> Result<PathBuf> {
        let folder = validate_name(category.folder_name())?;
        Ok(self.root.join(folder))
    }

    /// Write `<name>.<ext>` into the category folder, creating it on demand.
    /// An existing file with the same name is overwritten.
    #[instrument(skip(self, document), fields(format = ?document.format, bytes = document.bytes.len()))]
    pub fn save(
        &self,
        document: &EncodedDocument,
        category: &DocumentCategory,
        name: &str,
    ) -> Result<PathBuf> {
        let stem = validate_name(name)?;
        let folder = self.folder(category)?;
        std::fs::create_dir_all(&folder)?;

        let path = folder.join(document.file_name(stem));
        if path.exists() {
            debug!(path = %path.display(), "Overwriting existing document");
        }
        std::fs::write(&path, &document.bytes)?;
        info!(path = %path.display(), location = ?self.location, "Document saved");
        Ok(path)
    }

    /// Documents of one format in a category, sorted by file name.
    /// A missing folder is an empty list.
    pub fn list(
        &self,
        category: &DocumentCategory,
        format: ExportFormat,
    ) -> Result<Vec<StoredDocument>> {
        let folder = self.folder(category)?;
        if !folder.is_dir() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in std::fs::read_dir(&folder)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(format.extension()));
            if !matches {
                continue;
            }
            documents.push(StoredDocument {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size_bytes: metadata.len(),
            });
        }
        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(documents)
    }
}

/// Sink that files every document in a store under one category.
#[derive(Debug, Clone)]
pub struct StoreSink {
    store: DocumentStore,
    category: DocumentCategory,
    name: Option<String>,
}

impl StoreSink {
    pub fn new(store: DocumentStore, category: DocumentCategory) -> Self {
        Self {
            store,
            category,
            name: None,
        }
    }

    /// Use a fixed file name instead of the capture time.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl DocumentSink for StoreSink {
    fn accept(&self, document: EncodedDocument) -> Result<()> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None => default_file_name(chrono::Local::now().naive_local()),
        };
        self.store.save(&document, &self.category, &name)?;
        Ok(())
    }
}
