// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay bridge: drives the capture pipeline from image files on disk.
//
// Each file is one preview frame, delivered as a BGRA buffer. Stills are the
// most recently delivered frame (or a dedicated still image) at full
// resolution. Torch state is simulated; shared documents are written to an
// outbox directory when one is configured.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use docscan_core::error::{DocscanError, Result};
use docscan_core::types::{
    AccessStatus, CameraDevice, CameraFormat, CameraKind, DeviceOrientation, Frame, PixelFormat,
    TorchMode,
};
use image::DynamicImage;
use tracing::{debug, info, instrument};

use crate::traits::*;

/// File extensions picked up by [`ReplayBridge::from_dir`].
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Default pacing, roughly 30 fps.
const DEFAULT_INTERVAL: Duration = Duration::from_millis(33);

/// Encode a decoded image as a tightly packed BGRA frame.
pub fn frame_from_image(image: &DynamicImage, orientation: DeviceOrientation) -> Frame {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    let mut frame = Frame::new(width, height, PixelFormat::Bgra8, data);
    frame.orientation = orientation;
    frame
}

fn decode(path: &Path, orientation: DeviceOrientation) -> Result<Frame> {
    let image = image::open(path).map_err(|err| {
        DocscanError::ImageError(format!("failed to open {}: {}", path.display(), err))
    })?;
    Ok(frame_from_image(&image, orientation))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Camera bridge backed by a list of image files.
pub struct ReplayBridge {
    frames: Vec<PathBuf>,
    still: Option<PathBuf>,
    interval: Duration,
    paced: bool,
    looping: bool,
    orientation: DeviceOrientation,
    access: AccessStatus,
    has_torch: bool,
    torch: Mutex<TorchMode>,
    share_dir: Option<PathBuf>,
    last_delivered: Arc<Mutex<Option<PathBuf>>>,
}

impl ReplayBridge {
    pub fn new(frames: Vec<PathBuf>) -> Self {
        Self {
            frames,
            still: None,
            interval: DEFAULT_INTERVAL,
            paced: false,
            looping: false,
            orientation: DeviceOrientation::LandscapeLeft,
            access: AccessStatus::Authorized,
            has_torch: true,
            torch: Mutex::new(TorchMode::Off),
            share_dir: None,
            last_delivered: Arc::new(Mutex::new(None)),
        }
    }

    /// Every PNG/JPEG file in `dir`, in file-name order.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    FRAME_EXTENSIONS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
                });
            if path.is_file() && is_frame {
                frames.push(path);
            }
        }
        frames.sort();
        info!(frames = frames.len(), "Replay frames found");
        Ok(Self::new(frames))
    }

    /// Use a dedicated high-resolution image for stills.
    pub fn with_still(mut self, path: impl Into<PathBuf>) -> Self {
        self.still = Some(path.into());
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sleep for the frame interval between frames, like a live camera.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Restart from the first frame instead of ending the stream.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_orientation(mut self, orientation: DeviceOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_access(mut self, access: AccessStatus) -> Self {
        self.access = access;
        self
    }

    pub fn with_torch(mut self, has_torch: bool) -> Self {
        self.has_torch = has_torch;
        self
    }

    /// Write shared documents into `dir`.
    pub fn with_share_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.share_dir = Some(dir.into());
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn device() -> CameraDevice {
        CameraDevice {
            id: "replay-wide".into(),
            kind: CameraKind::Wide,
            has_torch: true,
        }
    }
}

impl PlatformBridge for ReplayBridge {
    fn platform_name(&self) -> &str {
        "Replay"
    }
}

impl NativeCamera for ReplayBridge {
    fn open_frame_source(
        &self,
        device: &CameraDevice,
        _format: Option<&CameraFormat>,
    ) -> Result<Box<dyn FrameSource>> {
        if device.id != Self::device().id {
            return Err(DocscanError::CameraNotFound);
        }
        Ok(Box::new(ReplayFrameSource {
            paths: self.frames.clone(),
            next: 0,
            interval: self.interval,
            paced: self.paced,
            looping: self.looping,
            orientation: self.orientation,
            last_delivered: Arc::clone(&self.last_delivered),
        }))
    }

    #[instrument(skip(self))]
    fn capture_still(&self) -> Result<Frame> {
        let path = match &self.still {
            Some(still) => still.clone(),
            None => lock(&self.last_delivered)
                .clone()
                .or_else(|| self.frames.first().cloned())
                .ok_or(DocscanError::CameraNotFound)?,
        };
        debug!(path = %path.display(), "Capturing still");
        decode(&path, self.orientation)
    }
}

impl NativeTorch for ReplayBridge {
    fn has_torch(&self) -> bool {
        self.has_torch
    }

    fn torch_mode(&self) -> TorchMode {
        *lock(&self.torch)
    }

    fn set_torch(&self, mode: TorchMode) -> Result<()> {
        if !self.has_torch {
            return Err(DocscanError::Torch("device has no torch".into()));
        }
        *lock(&self.torch) = mode;
        debug!(?mode, "Torch set");
        Ok(())
    }
}

impl NativeCameraAccess for ReplayBridge {
    fn camera_access(&self) -> AccessStatus {
        self.access
    }
}

impl NativeDeviceDiscovery for ReplayBridge {
    fn back_cameras(&self) -> Result<Vec<CameraDevice>> {
        let mut device = Self::device();
        device.has_torch = self.has_torch;
        Ok(vec![device])
    }

    fn formats(&self, _device: &CameraDevice) -> Result<Vec<CameraFormat>> {
        let Some(first) = self.frames.first() else {
            return Ok(Vec::new());
        };
        let (width, height) = image::image_dimensions(first).map_err(|err| {
            DocscanError::ImageError(format!("failed to read {}: {}", first.display(), err))
        })?;
        let (still_width, still_height) = match &self.still {
            Some(still) => image::image_dimensions(still).map_err(|err| {
                DocscanError::ImageError(format!("failed to read {}: {}", still.display(), err))
            })?,
            None => (width, height),
        };
        Ok(vec![CameraFormat {
            id: format!("replay-{width}x{height}"),
            video_width: width,
            video_height: height,
            still_width,
            still_height,
            max_frame_rate: 1.0 / self.interval.as_secs_f64().max(f64::EPSILON),
            multi_cam_supported: false,
            hdr_supported: false,
            binned: false,
        }])
    }

    fn multi_cam_supported(&self) -> bool {
        false
    }
}

impl NativeShare for ReplayBridge {
    fn share_document(&self, document: &[u8], mime_type: &str, file_name: &str) -> Result<()> {
        let dir = self
            .share_dir
            .as_ref()
            .ok_or(DocscanError::PlatformUnavailable)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        std::fs::write(&path, document)?;
        info!(path = %path.display(), mime_type, "Document shared");
        Ok(())
    }
}

/// Frame source over a list of image files.
pub struct ReplayFrameSource {
    paths: Vec<PathBuf>,
    next: usize,
    interval: Duration,
    paced: bool,
    looping: bool,
    orientation: DeviceOrientation,
    last_delivered: Arc<Mutex<Option<PathBuf>>>,
}

impl FrameSource for ReplayFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.next >= self.paths.len() {
            if !self.looping || self.paths.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }
        if self.paced && self.next > 0 {
            std::thread::sleep(self.interval);
        }

        let path = &self.paths[self.next];
        let frame = decode(path, self.orientation)?;
        *lock(&self.last_delivered) = Some(path.clone());
        self.next += 1;
        Ok(Some(frame))
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }
}
