// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live scanning session.
//
// A blocking frame pump pulls preview frames, runs the detector on each one
// while the session is active and sends the result over a bounded channel.
// A single state task owns the tracker and the overlay mapper; nothing else
// mutates them. The UI collaborator receives `SessionEvent`s.

use std::sync::Arc;
use std::time::Instant;

use docscan_bridge::{FrameSource, NativeCamera, PlatformBridge};
use docscan_core::config::ScannerConfig;
use docscan_core::error::{DocscanError, Result};
use docscan_core::geometry::{Quad, RectangleObservation, Size};
use docscan_core::human_errors::{HumanError, humanize_error};
use docscan_core::types::{DeviceOrientation, PreviewGravity, SessionId, TorchMode};
use docscan_document::{DocumentSink, ExportEncoder, ImageEnhancer, RectangleDetector};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::capture::{CapturePipeline, CaptureReport};
use crate::configure::{SessionConfiguration, configure};
use crate::mapper::CoordinateMapper;
use crate::torch::TorchController;
use crate::tracker::DetectionTracker;

/// Whether the live loop may touch detection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionLifecycle {
    Active,
    /// A result or detail screen is presented; detections are discarded.
    Suspended,
    /// Terminal.
    Terminated,
}

/// Updates for the UI collaborator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Draw this outline, or hide the overlay when `None`.
    Overlay(Option<Quad>),
    /// The detector could not run on a frame. The next frame retries.
    RecognitionFailed(HumanError),
    /// The frame source has no more frames.
    Ended,
}

struct Detection {
    result: Result<Vec<RectangleObservation>>,
    buffer: Size,
}

enum Command {
    Reset,
    SetOrientation(DeviceOrientation),
    SetPreview(Size, PreviewGravity),
    Snapshot(oneshot::Sender<Option<RectangleObservation>>),
}

/// Handle to a running session.
pub struct SessionHandle {
    id: SessionId,
    configuration: SessionConfiguration,
    lifecycle: watch::Sender<SessionLifecycle>,
    commands: mpsc::UnboundedSender<Command>,
    pipeline: CapturePipeline,
    torch: TorchController,
    pump: JoinHandle<()>,
    state: JoinHandle<()>,
}

impl SessionHandle {
    /// Configure the camera and start streaming. Must be called inside a
    /// Tokio runtime.
    #[instrument(skip_all, fields(platform = bridge.platform_name()))]
    pub fn start(
        bridge: Arc<dyn PlatformBridge>,
        detector: Arc<dyn RectangleDetector>,
        config: &ScannerConfig,
        preview: Size,
        orientation: DeviceOrientation,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        config.validate()?;
        let configuration = configure(bridge.as_ref())?;
        let source =
            bridge.open_frame_source(configuration.layout.wide(), configuration.wide_format.as_ref())?;

        let torch = TorchController::new(bridge.clone(), config.torch_level);
        let pipeline = CapturePipeline::new(
            bridge,
            detector.clone(),
            torch.clone(),
            ImageEnhancer::new(config.enhancement.resolve()?),
            ExportEncoder::new(config.export.page_layout),
            config.export.default_format,
        );

        let id = SessionId::new();
        let (lifecycle, lifecycle_rx) = watch::channel(SessionLifecycle::Active);
        let (detections_tx, detections_rx) = mpsc::channel(config.frame_queue_depth.max(1));
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let pump_lifecycle = lifecycle_rx.clone();
        let runtime = tokio::runtime::Handle::current();
        let pump = tokio::task::spawn_blocking(move || {
            run_pump(source, detector, pump_lifecycle, detections_tx, runtime)
        });

        let state = tokio::spawn(
            StateTask {
                tracker: DetectionTracker::new(config.tracker.clone()),
                mapper: CoordinateMapper::new(preview, orientation),
                events: events_tx,
            }
            .run(detections_rx, commands_rx, lifecycle_rx),
        );

        info!(session = %id, "Scanning session started");
        Ok((
            Self {
                id,
                configuration,
                lifecycle,
                commands,
                pipeline,
                torch,
                pump,
                state,
            },
            events_rx,
        ))
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn configuration(&self) -> &SessionConfiguration {
        &self.configuration
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        *self.lifecycle.borrow()
    }

    /// Stop the live loop from touching detection state. Resets the tracker.
    ///
    /// The reset travels on the command channel, so it is applied even when
    /// a `resume` follows before the state task sees the lifecycle change.
    pub fn suspend(&self) {
        if self.transition(SessionLifecycle::Active, SessionLifecycle::Suspended) {
            // A closed channel means the state task, and the tracker, are gone.
            let _ = self.send(Command::Reset);
        }
    }

    pub fn resume(&self) {
        self.transition(SessionLifecycle::Suspended, SessionLifecycle::Active);
    }

    fn transition(&self, from: SessionLifecycle, to: SessionLifecycle) -> bool {
        let changed = self.lifecycle.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            debug!(session = %self.id, ?to, "Lifecycle changed");
        }
        changed
    }

    /// End the session. The torch is turned off.
    pub fn terminate(&self) {
        self.lifecycle.send_replace(SessionLifecycle::Terminated);
        if let Err(e) = self.torch.turn_off() {
            warn!(error = %e, "Failed to turn torch off on terminate");
        }
        info!(session = %self.id, "Scanning session terminated");
    }

    /// Clear the tracked observation regardless of the miss counter.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    pub fn set_orientation(&self, orientation: DeviceOrientation) -> Result<()> {
        self.send(Command::SetOrientation(orientation))
    }

    pub fn set_preview(&self, preview: Size, gravity: PreviewGravity) -> Result<()> {
        self.send(Command::SetPreview(preview, gravity))
    }

    pub fn toggle_torch(&self) -> Result<TorchMode> {
        self.torch.toggle(self.lifecycle())
    }

    pub async fn current_observation(&self) -> Result<Option<RectangleObservation>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| DocscanError::SessionClosed)
    }

    /// Snapshot the tracked observation, suspend the session and run the
    /// capture pipeline. The caller resumes the session when done.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn capture(&self, sink: Arc<dyn DocumentSink>) -> Result<CaptureReport> {
        if self.lifecycle() == SessionLifecycle::Terminated {
            return Err(DocscanError::SessionClosed);
        }
        let tracked = self.current_observation().await?;
        self.suspend();

        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || pipeline.capture(tracked, sink.as_ref()))
            .await
            .map_err(|e| DocscanError::Export(format!("capture task failed: {e}")))?
    }

    /// Terminate and wait for both tasks to finish.
    pub async fn shutdown(self) {
        self.terminate();
        if let Err(e) = self.state.await {
            warn!(error = %e, "Session state task failed");
        }
        if let Err(e) = self.pump.await {
            warn!(error = %e, "Frame pump failed");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| DocscanError::SessionClosed)
    }
}

/// Pull frames and detect until the source ends, the session terminates or
/// the state task goes away.
///
/// Requests are neither coalesced nor cancelled; the bounded channel blocks
/// the pump when the state task falls behind. While suspended the pump parks
/// on the lifecycle channel and pulls no frames.
fn run_pump(
    mut source: Box<dyn FrameSource>,
    detector: Arc<dyn RectangleDetector>,
    mut lifecycle: watch::Receiver<SessionLifecycle>,
    detections: mpsc::Sender<Detection>,
    runtime: tokio::runtime::Handle,
) {
    let interval = source.frame_interval();
    let mut frames = 0u64;
    let mut overruns = 0u64;

    loop {
        let state = *lifecycle.borrow_and_update();
        match state {
            SessionLifecycle::Terminated => break,
            SessionLifecycle::Suspended => {
                debug!("Frame pump parked");
                if runtime.block_on(lifecycle.changed()).is_err() {
                    break;
                }
                continue;
            }
            SessionLifecycle::Active => {}
        }
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Frame source failed");
                break;
            }
        };
        frames += 1;

        let started = Instant::now();
        let result = detector.detect_frame(&frame);
        let elapsed = started.elapsed();
        if elapsed > interval {
            overruns += 1;
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = interval.as_millis() as u64,
                "Detection slower than frame interval"
            );
        }

        let detection = Detection {
            result,
            buffer: Size::from_pixels(frame.width, frame.height),
        };
        if detections.blocking_send(detection).is_err() {
            break;
        }
    }
    info!(frames, overruns, "Frame pump stopped");
}

/// Sole owner of the tracker and the mapper.
struct StateTask {
    tracker: DetectionTracker,
    mapper: CoordinateMapper,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl StateTask {
    async fn run(
        mut self,
        mut detections: mpsc::Receiver<Detection>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut lifecycle: watch::Receiver<SessionLifecycle>,
    ) {
        let mut pump_running = true;
        loop {
            tokio::select! {
                changed = lifecycle.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *lifecycle.borrow_and_update();
                    match state {
                        SessionLifecycle::Terminated => break,
                        SessionLifecycle::Suspended => self.reset(),
                        SessionLifecycle::Active => {}
                    }
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                detection = detections.recv(), if pump_running => match detection {
                    Some(detection) => {
                        if *lifecycle.borrow() == SessionLifecycle::Active {
                            self.apply(detection);
                        }
                    }
                    None => {
                        pump_running = false;
                        self.emit(SessionEvent::Ended);
                    }
                },
            }
        }
        debug!("Session state task stopped");
    }

    fn apply(&mut self, detection: Detection) {
        match detection.result {
            Ok(observations) => {
                self.mapper.set_buffer(Some(detection.buffer));
                if self.tracker.update(&observations).changes_overlay() {
                    self.draw_overlay();
                }
            }
            Err(e) => {
                warn!(error = %e, "Rectangle recognition failed");
                self.emit(SessionEvent::RecognitionFailed(humanize_error(&e)));
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Reset => self.reset(),
            Command::SetOrientation(orientation) => {
                self.mapper.set_orientation(orientation);
                self.draw_overlay();
            }
            Command::SetPreview(preview, gravity) => {
                self.mapper.set_preview(preview);
                self.mapper.set_gravity(gravity);
                self.draw_overlay();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.tracker.observation());
            }
        }
    }

    fn reset(&mut self) {
        let had_observation = self.tracker.observation().is_some();
        self.tracker.reset();
        if had_observation {
            self.emit(SessionEvent::Overlay(None));
        }
    }

    fn draw_overlay(&self) {
        let quad = self.tracker.observation().map(|obs| self.mapper.map(&obs));
        self.emit(SessionEvent::Overlay(quad));
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have gone away; the session keeps running regardless.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use docscan_bridge::ReplayBridge;
    use docscan_core::geometry::Point;
    use docscan_core::human_errors::Severity;
    use docscan_document::{ContourRectangleDetector, EncodedDocument};
    use image::GrayImage;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_polygon_mut;
    use imageproc::point::Point as Vertex;

    fn write_frame(dir: &Path, index: usize, with_document: bool) -> PathBuf {
        let mut img = RgbImage::from_pixel(400, 300, Rgb([30, 30, 30]));
        if with_document {
            let poly = [(60, 50), (340, 70), (330, 250), (70, 240)]
                .map(|(x, y)| Vertex::new(x, y));
            draw_polygon_mut(&mut img, &poly, Rgb([230, 230, 230]));
        }
        let path = dir.join(format!("frame-{index:03}.png"));
        img.save(&path).unwrap();
        path
    }

    /// One document frame followed by `blanks` empty frames.
    fn start(dir: &Path, blanks: usize) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        write_frame(dir, 0, true);
        for i in 1..=blanks {
            write_frame(dir, i, false);
        }
        let bridge = Arc::new(ReplayBridge::from_dir(dir).unwrap());
        SessionHandle::start(
            bridge,
            Arc::new(ContourRectangleDetector::default()),
            &ScannerConfig::default(),
            Size::new(400.0, 300.0),
            DeviceOrientation::LandscapeLeft,
        )
        .unwrap()
    }

    async fn events_until_end(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            if matches!(event, SessionEvent::Ended) {
                break;
            }
            seen.push(event);
        }
        seen
    }

    /// Fails on the listed calls and finds a fixed page otherwise.
    #[derive(Default)]
    struct ScriptedDetector {
        calls: AtomicUsize,
        failing: Vec<usize>,
    }

    impl ScriptedDetector {
        fn failing_on(calls: &[usize]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: calls.to_vec(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RectangleDetector for ScriptedDetector {
        fn detect_luma(&self, _image: &GrayImage) -> Result<Vec<RectangleObservation>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&call) {
                return Err(DocscanError::Recognition("request could not run".into()));
            }
            Ok(vec![RectangleObservation {
                top_left: Point::new(0.2, 0.8),
                top_right: Point::new(0.8, 0.8),
                bottom_left: Point::new(0.2, 0.2),
                bottom_right: Point::new(0.8, 0.2),
                confidence: 1.0,
            }])
        }
    }

    fn start_with(
        bridge: ReplayBridge,
        detector: Arc<dyn RectangleDetector>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        SessionHandle::start(
            Arc::new(bridge),
            detector,
            &ScannerConfig::default(),
            Size::new(400.0, 300.0),
            DeviceOrientation::LandscapeLeft,
        )
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingSink {
        accepted: Mutex<Vec<EncodedDocument>>,
    }

    impl DocumentSink for RecordingSink {
        fn accept(&self, document: EncodedDocument) -> Result<()> {
            self.accepted.lock().unwrap().push(document);
            Ok(())
        }
    }

    #[tokio::test]
    async fn overlay_survives_five_dropouts() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 5);

        let seen = events_until_end(&mut events).await;
        assert_eq!(seen.len(), 1, "{seen:?}");
        assert!(matches!(seen[0], SessionEvent::Overlay(Some(_))));
        assert!(session.current_observation().await.unwrap().is_some());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn overlay_clears_on_sixth_dropout() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 6);

        let seen = events_until_end(&mut events).await;
        assert_eq!(seen.len(), 2, "{seen:?}");
        assert!(matches!(seen[0], SessionEvent::Overlay(Some(_))));
        assert!(matches!(seen[1], SessionEvent::Overlay(None)));
        assert!(session.current_observation().await.unwrap().is_none());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn overlay_is_in_preview_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);

        let seen = events_until_end(&mut events).await;
        let Some(SessionEvent::Overlay(Some(quad))) = seen.first() else {
            panic!("no overlay: {seen:?}");
        };
        // Preview matches the buffer, so the outline lands on the drawn corners.
        assert!((quad.top_left.x - 60.0).abs() < 4.0, "{quad:?}");
        assert!((quad.top_left.y - 50.0).abs() < 4.0, "{quad:?}");
        session.shutdown().await;
    }

    #[tokio::test]
    async fn suspend_and_reset_clear_the_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);
        events_until_end(&mut events).await;

        session.suspend();
        assert!(matches!(events.recv().await, Some(SessionEvent::Overlay(None))));
        assert_eq!(session.lifecycle(), SessionLifecycle::Suspended);
        assert!(session.current_observation().await.unwrap().is_none());

        session.resume();
        assert_eq!(session.lifecycle(), SessionLifecycle::Active);
        session.reset().unwrap();
        assert!(session.current_observation().await.unwrap().is_none());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn suspend_then_immediate_resume_still_resets() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);
        events_until_end(&mut events).await;
        assert!(session.current_observation().await.unwrap().is_some());

        session.suspend();
        session.resume();
        assert_eq!(session.lifecycle(), SessionLifecycle::Active);
        assert_eq!(session.current_observation().await.unwrap(), None);
        assert!(matches!(events.recv().await, Some(SessionEvent::Overlay(None))));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn recognition_failure_is_reported_and_next_frame_recovers() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), 0, true);
        write_frame(dir.path(), 1, true);
        let detector = Arc::new(ScriptedDetector::failing_on(&[0]));
        let (session, mut events) =
            start_with(ReplayBridge::from_dir(dir.path()).unwrap(), detector.clone());

        let seen = events_until_end(&mut events).await;
        assert_eq!(seen.len(), 2, "{seen:?}");
        let SessionEvent::RecognitionFailed(human) = &seen[0] else {
            panic!("expected a recognition failure first: {seen:?}");
        };
        assert_eq!(human.severity, Severity::Informational);
        assert!(matches!(seen[1], SessionEvent::Overlay(Some(_))));
        assert_eq!(detector.calls(), 2);
        assert!(session.current_observation().await.unwrap().is_some());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn suspended_pump_stops_detecting_and_wakes_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), 0, true);
        let detector = Arc::new(ScriptedDetector::default());
        let bridge = ReplayBridge::from_dir(dir.path()).unwrap().looping(true);
        let (session, mut events) = start_with(bridge, detector.clone());

        assert!(matches!(events.recv().await, Some(SessionEvent::Overlay(Some(_)))));
        session.suspend();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let parked = detector.calls();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(detector.calls(), parked);

        session.resume();
        let woke = tokio::time::timeout(Duration::from_secs(5), async {
            while detector.calls() == parked {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(woke.is_ok(), "pump did not resume");

        // Terminating must also release a pump that is running or parked.
        session.suspend();
        tokio::time::timeout(Duration::from_secs(5), session.shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn orientation_change_redraws_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);
        let seen = events_until_end(&mut events).await;
        let Some(SessionEvent::Overlay(Some(before))) = seen.first().cloned() else {
            panic!("no overlay");
        };

        session
            .set_orientation(DeviceOrientation::LandscapeRight)
            .unwrap();
        let Some(SessionEvent::Overlay(Some(after))) = events.recv().await else {
            panic!("no redraw");
        };
        assert!((after.top_left.x - (400.0 - before.top_left.x)).abs() < 1e-6);
        assert!((after.top_left.y - (300.0 - before.top_left.y)).abs() < 1e-6);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn capture_exports_once_and_leaves_session_suspended() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);
        events_until_end(&mut events).await;

        let sink = Arc::new(RecordingSink::default());
        let report = session.capture(sink.clone()).await.unwrap();
        assert_eq!(sink.accepted.lock().unwrap().len(), 1);
        assert!(report.width > 250, "{report:?}");
        assert_eq!(session.lifecycle(), SessionLifecycle::Suspended);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn terminated_session_rejects_capture() {
        let dir = tempfile::tempdir().unwrap();
        let (session, mut events) = start(dir.path(), 0);
        events_until_end(&mut events).await;

        session.terminate();
        let sink = Arc::new(RecordingSink::default());
        assert!(matches!(
            session.capture(sink.clone()).await,
            Err(DocscanError::SessionClosed)
        ));
        assert!(sink.accepted.lock().unwrap().is_empty());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn denied_access_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), 0, true);
        let bridge = Arc::new(
            ReplayBridge::from_dir(dir.path())
                .unwrap()
                .with_access(docscan_core::types::AccessStatus::Denied),
        );
        let result = SessionHandle::start(
            bridge,
            Arc::new(ContourRectangleDetector::default()),
            &ScannerConfig::default(),
            Size::new(400.0, 300.0),
            DeviceOrientation::LandscapeLeft,
        );
        assert!(matches!(result, Err(DocscanError::CameraAccess(_))));
    }
}
