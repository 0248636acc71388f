// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture pipeline: one still, corrected, enhanced, encoded and handed to
// the export collaborator.
//
// The torch is turned off as soon as the still request returns, whether or
// not it succeeded. Nothing reaches the sink unless correction succeeds.

use std::sync::Arc;

use chrono::Local;
use docscan_bridge::{NativeCamera, NativeShare, PlatformBridge};
use docscan_core::error::{DocscanError, Result};
use docscan_core::geometry::RectangleObservation;
use docscan_core::types::ExportFormat;
use docscan_document::{
    CapturedStill, DocumentSink, EncodedDocument, ExportEncoder, ImageEnhancer,
    PerspectiveCorrector, RectangleDetector, default_file_name, frame_to_rgba,
};
use image::DynamicImage;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::torch::TorchController;

/// Where the observation used for correction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObservationSource {
    /// Detected on the still itself.
    Still,
    /// The live tracker's observation at capture time.
    Tracked,
}

/// Summary of a successful capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureReport {
    pub observation: RectangleObservation,
    pub source: ObservationSource,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
    pub size_bytes: usize,
}

/// Still → detect → correct → enhance → encode → sink.
#[derive(Clone)]
pub struct CapturePipeline {
    bridge: Arc<dyn PlatformBridge>,
    detector: Arc<dyn RectangleDetector>,
    torch: TorchController,
    corrector: PerspectiveCorrector,
    enhancer: ImageEnhancer,
    encoder: ExportEncoder,
    format: ExportFormat,
}

impl CapturePipeline {
    pub fn new(
        bridge: Arc<dyn PlatformBridge>,
        detector: Arc<dyn RectangleDetector>,
        torch: TorchController,
        enhancer: ImageEnhancer,
        encoder: ExportEncoder,
        format: ExportFormat,
    ) -> Self {
        Self {
            bridge,
            detector,
            torch,
            corrector: PerspectiveCorrector::new(),
            enhancer,
            encoder,
            format,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Capture one still and export it.
    ///
    /// The still is searched for a document first; if none is found the
    /// `tracked` observation is used. With neither, the capture fails with
    /// [`DocscanError::NoDocumentDetected`] and `sink` is not called.
    #[instrument(skip_all, fields(format = ?self.format, tracked = tracked.is_some()))]
    pub fn capture(
        &self,
        tracked: Option<RectangleObservation>,
        sink: &dyn DocumentSink,
    ) -> Result<CaptureReport> {
        let frame = {
            let _torch = self.torch.guard();
            self.bridge.capture_still()
        }?;
        let image = DynamicImage::ImageRgba8(frame_to_rgba(&frame)?);
        info!(width = image.width(), height = image.height(), "Still captured");

        let (observation, source) = match self.detect_on_still(&image) {
            Some(observation) => (observation, ObservationSource::Still),
            None => match tracked {
                Some(observation) => (observation, ObservationSource::Tracked),
                None => {
                    info!("No document on still and none tracked");
                    return Err(DocscanError::NoDocumentDetected);
                }
            },
        };

        let corrected = self
            .corrector
            .correct(CapturedStill::new(image, Some(observation)))?;
        let enhanced = self.enhancer.enhance(corrected);
        let document = self.encoder.encode(&enhanced, self.format)?;

        let report = CaptureReport {
            observation,
            source,
            width: enhanced.width(),
            height: enhanced.height(),
            format: document.format,
            size_bytes: document.bytes.len(),
        };
        sink.accept(document)?;
        info!(?source, width = report.width, height = report.height, "Document exported");
        Ok(report)
    }

    /// Detector failures on the still fall back to the tracked observation.
    fn detect_on_still(&self, image: &DynamicImage) -> Option<RectangleObservation> {
        match self.detector.detect_image(image) {
            Ok(found) => found.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Detection on still failed");
                None
            }
        }
    }
}

/// Sink that presents each document on the platform share sheet.
pub struct ShareSink {
    bridge: Arc<dyn PlatformBridge>,
    name: Option<String>,
}

impl ShareSink {
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Self {
        Self { bridge, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl DocumentSink for ShareSink {
    fn accept(&self, document: EncodedDocument) -> Result<()> {
        let stem = match &self.name {
            Some(name) => name.clone(),
            None => default_file_name(Local::now().naive_local()),
        };
        self.bridge
            .share_document(&document.bytes, document.mime_type(), &document.file_name(&stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use docscan_bridge::{NativeDeviceDiscovery, NativeTorch, ReplayBridge};
    use docscan_core::geometry::Point;
    use docscan_core::types::TorchMode;
    use docscan_document::ContourRectangleDetector;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point as Vertex;

    #[derive(Default)]
    struct RecordingSink {
        accepted: Mutex<Vec<EncodedDocument>>,
    }

    impl DocumentSink for RecordingSink {
        fn accept(&self, document: EncodedDocument) -> Result<()> {
            self.accepted
                .lock()
                .map_err(|_| DocscanError::Export("poisoned".into()))?
                .push(document);
            Ok(())
        }
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.accepted.lock().unwrap().len()
        }
    }

    fn write_scene(path: &Path, with_document: bool) {
        let mut img = RgbImage::from_pixel(400, 300, Rgb([30, 30, 30]));
        if with_document {
            let poly = [(60, 50), (340, 70), (330, 250), (70, 240)]
                .map(|(x, y)| Vertex::new(x, y));
            draw_polygon_mut(&mut img, &poly, Rgb([230, 230, 230]));
        }
        img.save(path).unwrap();
    }

    fn pipeline(bridge: Arc<ReplayBridge>) -> CapturePipeline {
        let torch = TorchController::new(bridge.clone(), 0.1);
        CapturePipeline::new(
            bridge,
            Arc::new(ContourRectangleDetector::default()),
            torch,
            ImageEnhancer::default(),
            ExportEncoder::default(),
            ExportFormat::Png,
        )
    }

    fn tracked() -> RectangleObservation {
        RectangleObservation {
            top_left: Point::new(0.1, 0.9),
            top_right: Point::new(0.9, 0.9),
            bottom_left: Point::new(0.1, 0.1),
            bottom_right: Point::new(0.9, 0.1),
            confidence: 1.0,
        }
    }

    #[test]
    fn no_detection_never_reaches_sink() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.png");
        write_scene(&blank, false);
        let bridge = Arc::new(ReplayBridge::new(vec![blank]));
        let sink = RecordingSink::default();

        let result = pipeline(bridge).capture(None, &sink);
        assert!(matches!(result, Err(DocscanError::NoDocumentDetected)));
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn still_detection_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.png");
        write_scene(&page, true);
        let bridge = Arc::new(ReplayBridge::new(vec![page]));
        let sink = RecordingSink::default();

        let report = pipeline(bridge).capture(Some(tracked()), &sink).unwrap();
        assert_eq!(report.source, ObservationSource::Still);
        assert_eq!(sink.count(), 1);
        assert!(report.width > 250 && report.height > 150, "{report:?}");
    }

    #[test]
    fn tracked_observation_is_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.png");
        write_scene(&blank, false);
        let bridge = Arc::new(ReplayBridge::new(vec![blank]));
        let sink = RecordingSink::default();

        let report = pipeline(bridge).capture(Some(tracked()), &sink).unwrap();
        assert_eq!(report.source, ObservationSource::Tracked);
        assert_eq!((report.width, report.height), (320, 240));
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn torch_is_off_after_failed_capture() {
        let dir = tempfile::tempdir().unwrap();
        let blank = dir.path().join("blank.png");
        write_scene(&blank, false);
        let bridge = Arc::new(ReplayBridge::new(vec![blank]));
        bridge.set_torch(TorchMode::On { level: 0.1 }).unwrap();

        let _ = pipeline(bridge.clone()).capture(None, &RecordingSink::default());
        assert!(!bridge.torch_mode().is_on());
    }

    #[test]
    fn torch_is_off_when_still_request_fails() {
        let bridge = Arc::new(ReplayBridge::new(Vec::new()));
        bridge.set_torch(TorchMode::On { level: 0.1 }).unwrap();
        assert!(bridge.back_cameras().is_ok());
        assert!(bridge.capture_still().is_err());

        let sink = RecordingSink::default();
        assert!(pipeline(bridge.clone()).capture(Some(tracked()), &sink).is_err());
        assert!(!bridge.torch_mode().is_on());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn share_sink_writes_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let bridge: Arc<dyn PlatformBridge> =
            Arc::new(ReplayBridge::new(Vec::new()).with_share_dir(dir.path()));
        let sink = ShareSink::new(bridge).with_name("receipt");
        sink.accept(EncodedDocument {
            bytes: vec![0x89, b'P', b'N', b'G'],
            format: ExportFormat::Png,
        })
        .unwrap();
        assert!(dir.path().join("receipt.png").is_file());
    }
}
