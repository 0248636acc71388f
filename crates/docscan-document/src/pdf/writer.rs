// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: wrap a scanned image in a single-page PDF using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use docscan_core::error::DocscanError;
use docscan_core::types::{PageLayout, PaperSize};
use image::RgbImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

/// Resolution at which scan pixels are mapped to page units.
pub const EXPORT_DPI: f32 = 150.0;

/// Margin around the image on paper-sized pages.
const PAPER_MARGIN_MM: f32 = 15.0;

/// Creates single-page PDFs from scanned images.
pub struct PdfWriter {
    layout: PageLayout,
    title: Option<String>,
}

impl PdfWriter {
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            title: None,
        }
    }

    /// A writer whose page is exactly the size of the image.
    pub fn fit_image() -> Self {
        Self::new(PageLayout::FitImage)
    }

    /// A writer that centres the image on a paper-sized page.
    pub fn paper(paper_size: PaperSize) -> Self {
        Self::new(PageLayout::Paper(paper_size))
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Create a single-page PDF containing `image`.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn create_from_image(&self, image: &RgbImage) -> Result<Vec<u8>, DocscanError> {
        let (img_width, img_height) = image.dimensions();
        if img_width == 0 || img_height == 0 {
            return Err(DocscanError::PdfError("cannot place an empty image".into()));
        }
        let title = self.title.as_deref().unwrap_or("Docscan Document");
        info!(layout = ?self.layout, title, "Creating image PDF");

        let raw = RawImage {
            pixels: RawImageData::U8(image.as_raw().clone()),
            width: img_width as usize,
            height: img_height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(title);
        let xobject_id = doc.add_image(&raw);

        // Image native size at the export DPI.
        let img_w_pt = img_width as f32 / EXPORT_DPI * 72.0;
        let img_h_pt = img_height as f32 / EXPORT_DPI * 72.0;

        let (page_w, page_h, x_offset, y_offset, scale) = match self.layout {
            PageLayout::FitImage => (
                Mm(img_width as f32 / EXPORT_DPI * 25.4),
                Mm(img_height as f32 / EXPORT_DPI * 25.4),
                0.0,
                0.0,
                1.0,
            ),
            PageLayout::Paper(paper) => {
                let (w_mm, h_mm) = paper.dimensions_mm();
                let (page_w, page_h) = (Mm(w_mm as f32), Mm(h_mm as f32));
                let usable_w_pt = Mm(page_w.0 - 2.0 * PAPER_MARGIN_MM).into_pt().0;
                let usable_h_pt = Mm(page_h.0 - 2.0 * PAPER_MARGIN_MM).into_pt().0;
                if usable_w_pt <= 0.0 || usable_h_pt <= 0.0 {
                    return Err(DocscanError::PdfError(format!(
                        "paper {paper:?} is smaller than its margins"
                    )));
                }

                // Scale to fit while preserving aspect ratio; do not upscale.
                let scale = (usable_w_pt / img_w_pt).min(usable_h_pt / img_h_pt).min(1.0);
                let margin_pt = Mm(PAPER_MARGIN_MM).into_pt().0;
                let x = margin_pt + (usable_w_pt - img_w_pt * scale) / 2.0;
                let y = margin_pt + (usable_h_pt - img_h_pt * scale) / 2.0;
                (page_w, page_h, x, y, scale)
            }
        };

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(EXPORT_DPI),
                rotate: None,
            },
        }];

        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
        debug!(page_w = page_w.0, page_h = page_h.0, scale, "Image placed on page");

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "PDF serialisation produced warnings");
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes)
            .expect("output must parse as PDF")
            .get_pages()
            .len()
    }

    #[test]
    fn fit_image_is_single_page() {
        let img = RgbImage::from_pixel(300, 450, Rgb([240, 240, 240]));
        let pdf = PdfWriter::fit_image().create_from_image(&img).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn paper_layout_is_single_page() {
        let img = RgbImage::from_pixel(1200, 900, Rgb([10, 10, 10]));
        let mut writer = PdfWriter::paper(PaperSize::Letter);
        writer.set_title("Receipt");
        assert_eq!(page_count(&writer.create_from_image(&img).unwrap()), 1);
    }

    #[test]
    fn empty_image_rejected() {
        let img = RgbImage::new(0, 0);
        assert!(matches!(
            PdfWriter::fit_image().create_from_image(&img),
            Err(DocscanError::PdfError(_))
        ));
    }
}
