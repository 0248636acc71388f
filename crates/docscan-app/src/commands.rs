// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docscan_bridge::{NativeDeviceDiscovery, ReplayBridge};
use docscan_core::config::{EnhancementProfile, ScannerConfig};
use docscan_core::error::{DocscanError, Result};
use docscan_core::geometry::Size;
use docscan_core::human_errors::{CAPTURE_TIPS, humanize_error};
use docscan_core::types::{DeviceOrientation, DocumentCategory};
use docscan_document::{
    ContourRectangleDetector, DocumentSink, DocumentStore, ExportEncoder, ImageEnhancer,
    ImageProcessor, RectangleDetector, StoreSink,
};
use docscan_session::{CapturePipeline, SessionEvent, SessionHandle, ShareSink, TorchController};
use tracing::info;

use crate::services::data_dir::{data_dir, documents_dir};
use crate::services::settings::{config_path, load_config};
use crate::{ReplayArgs, ScanArgs};

/// Resolved data directory and settings.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: ScannerConfig,
}

impl Context {
    pub fn init(data_dir_override: Option<&Path>, config_override: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir(data_dir_override)?;
        let path = config_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_path(&data_dir));
        let config = load_config(&path);
        info!(data_dir = %data_dir.display(), "Context ready");
        Ok(Self { data_dir, config })
    }

    fn detector(&self) -> Arc<dyn RectangleDetector> {
        Arc::new(ContourRectangleDetector::new(self.config.detector.clone()))
    }

    fn store(&self, root: Option<PathBuf>) -> DocumentStore {
        DocumentStore::local(root.unwrap_or_else(|| documents_dir(&self.data_dir)))
    }
}

fn category(name: Option<&str>) -> DocumentCategory {
    name.map(DocumentCategory::parse).unwrap_or_default()
}

pub fn detect(ctx: &Context, image: &Path) -> Result<()> {
    let image = ImageProcessor::open(image)?.into_dynamic();
    let found = ctx.detector().detect_image(&image)?;
    if found.is_empty() {
        return Err(DocscanError::NoDocumentDetected);
    }
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

pub fn scan(ctx: &Context, args: ScanArgs) -> Result<()> {
    let profile = match args.profile.as_deref() {
        Some(name) => EnhancementProfile::named(name)
            .ok_or_else(|| DocscanError::Config(format!("unknown enhancement profile {name:?}")))?,
        None => ctx.config.enhancement.resolve()?,
    };
    let format = args
        .format
        .map(|f| f.export_format(ctx.config.export.jpeg_quality))
        .unwrap_or(ctx.config.export.default_format);

    let mut bridge = ReplayBridge::new(vec![args.image]);
    if let Some(dir) = &args.share {
        bridge = bridge.with_share_dir(dir);
    }
    let bridge = Arc::new(bridge);

    let category = category(args.category.as_deref());
    let store = ctx.store(args.out);
    let sink: Box<dyn DocumentSink> = match (&args.share, args.name) {
        (Some(_), Some(name)) => Box::new(ShareSink::new(bridge.clone()).with_name(name)),
        (Some(_), None) => Box::new(ShareSink::new(bridge.clone())),
        (None, Some(name)) => Box::new(StoreSink::new(store.clone(), category.clone()).with_name(name)),
        (None, None) => Box::new(StoreSink::new(store.clone(), category.clone())),
    };

    let pipeline = CapturePipeline::new(
        bridge.clone(),
        ctx.detector(),
        TorchController::new(bridge, ctx.config.torch_level),
        ImageEnhancer::new(profile),
        ExportEncoder::new(ctx.config.export.page_layout),
        format,
    );
    let report = pipeline.capture(None, sink.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    match &args.share {
        Some(dir) => eprintln!("Shared to {}", dir.display()),
        None => eprintln!("Saved to {}", store.folder(&category)?.display()),
    }
    Ok(())
}

pub async fn replay(ctx: &Context, args: ReplayArgs) -> Result<()> {
    let orientation = DeviceOrientation::from(args.orientation);
    let bridge = Arc::new(
        ReplayBridge::from_dir(&args.dir)?
            .paced(args.pace)
            .with_orientation(orientation),
    );
    let preview = match args.preview {
        Some(size) => size,
        None => default_preview(&bridge, orientation)?,
    };

    let (session, mut events) = SessionHandle::start(
        bridge,
        ctx.detector(),
        &ctx.config,
        preview,
        orientation,
    )?;

    let mut frames_with_overlay = 0usize;
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Overlay(Some(quad)) => {
                frames_with_overlay += 1;
                println!("overlay {}", serde_json::to_string(&quad)?);
            }
            SessionEvent::Overlay(None) => println!("overlay hidden"),
            SessionEvent::RecognitionFailed(human) => {
                eprintln!("{}: {}", human.title, human.message);
            }
            SessionEvent::Ended => break,
        }
    }
    info!(updates = frames_with_overlay, "Replay finished");

    if args.capture {
        let sink = Arc::new(StoreSink::new(ctx.store(None), category(args.category.as_deref())));
        match session.capture(sink).await {
            Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            Err(e) => {
                let human = humanize_error(&e);
                eprintln!("{}: {}", human.title, human.message);
                eprintln!("{}", human.suggestion);
            }
        }
    }
    session.shutdown().await;
    Ok(())
}

/// The first frame's size, transposed for portrait.
fn default_preview(bridge: &ReplayBridge, orientation: DeviceOrientation) -> Result<Size> {
    let device = bridge
        .back_cameras()?
        .into_iter()
        .next()
        .ok_or(DocscanError::CameraNotFound)?;
    let format = bridge
        .formats(&device)?
        .into_iter()
        .next()
        .ok_or(DocscanError::CameraNotFound)?;
    let size = Size::from_pixels(format.video_width, format.video_height);
    Ok(if orientation.is_portrait() {
        size.transposed()
    } else {
        size
    })
}

pub fn profiles(ctx: &Context) -> Result<()> {
    let active = ctx.config.enhancement.resolve()?;
    for (name, profile) in EnhancementProfile::builtin() {
        let marker = if profile == active { "*" } else { " " };
        let sharpen = match profile.sharpen {
            Some(s) => format!("sigma {} threshold {}", s.sigma, s.threshold),
            None => "none".into(),
        };
        println!(
            "{marker} {name:<10} document {:.2}  brightness {:+.2}  contrast {:.2}  sharpen {sharpen}",
            profile.document_amount, profile.brightness, profile.contrast
        );
    }
    Ok(())
}

pub fn tips() {
    for (i, tip) in CAPTURE_TIPS.iter().enumerate() {
        println!("{}. {tip}", i + 1);
    }
}
