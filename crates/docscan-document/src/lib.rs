// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-document: pixel work for the Docscan capture pipeline.
//
// Provides frame decoding (BGRA / NV12), the portable rectangle detector,
// perspective correction, the fixed-profile image enhancer, and export to
// PDF / PNG / JPEG with a category-foldered document store.

pub mod export;
pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `docscan_document::ImageEnhancer` etc.
pub use export::{
    DocumentSink, DocumentStore, EncodedDocument, ExportEncoder, StoreSink, StoredDocument,
    default_file_name,
};
pub use crate::image::frame::{frame_to_luma, frame_to_rgba};
pub use crate::image::processor::ImageProcessor;
pub use pdf::writer::PdfWriter;
pub use scan::detect::{ContourRectangleDetector, RectangleDetector};
pub use scan::enhance::ImageEnhancer;
pub use scan::perspective::{CapturedStill, CorrectedDocumentImage, PerspectiveCorrector};
