use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::capture::best_face::{BestFace, BestFaceRecord};
use crate::capture::capture_cycle::{CaptureCycle, CaptureMode, CycleEvent, CyclePhase, CycleTiming};
use crate::pipeline::capture_faces_use_case::CaptureFacesUseCase;
use crate::pipeline::capture_logger::CaptureLogger;
use crate::source::domain::frame_source::{FrameSource, SourceError};
use crate::upload::domain::face_uploader::{FaceUploader, UploadPayload};
use crate::upload::infrastructure::background_uploader::{BackgroundUploader, UploadOutcome};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Time source for the capture cycle.
pub trait Clock: Send {
    /// Monotonic time since the clock started.
    fn now(&self) -> Duration;

    /// Wall-clock time for upload timestamps.
    fn timestamp_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UploadStatus {
    /// The cycle ended without an acceptable face.
    NoFace,
    /// A face was found but uploading is disabled.
    Skipped,
    Pending,
    Sent(String),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub cycle: u32,
    pub frames_with_faces: u32,
    pub faces_processed: u32,
    pub best_score: Option<f64>,
    pub upload: UploadStatus,
}

#[derive(Debug, Default)]
pub struct CaptureSummary {
    pub frames_read: usize,
    pub frames_detected: usize,
    pub cycles: Vec<CycleReport>,
    /// Highest-scoring face across all cycles.
    pub best: Option<BestFaceRecord>,
}

/// Drives a frame source through capture cycles and uploads each cycle's
/// best face in the background.
pub struct RunCaptureUseCase {
    capture: CaptureFacesUseCase,
    uploader: Option<BackgroundUploader>,
    clock: Box<dyn Clock>,
    logger: Box<dyn CaptureLogger>,
    timing: CycleTiming,
    blur_threshold: f64,
}

struct RunState {
    cycle: CaptureCycle,
    best: BestFace,
    summary: CaptureSummary,
}

impl RunCaptureUseCase {
    pub fn new(
        capture: CaptureFacesUseCase,
        uploader: Option<Box<dyn FaceUploader>>,
        clock: Box<dyn Clock>,
        logger: Box<dyn CaptureLogger>,
        timing: CycleTiming,
        blur_threshold: f64,
    ) -> Self {
        Self {
            capture,
            uploader: uploader.map(BackgroundUploader::new),
            clock,
            logger,
            timing,
            blur_threshold,
        }
    }

    /// Run until the source is exhausted or `max_cycles` cycles have
    /// finished (including their upload).
    pub fn execute(
        &mut self,
        source: &mut dyn FrameSource,
        input: &Path,
        mode: CaptureMode,
        max_cycles: Option<u32>,
    ) -> Result<CaptureSummary, CaptureError> {
        let metadata = source.open(input)?;
        let mode = if mode == CaptureMode::Cycle && metadata.total_frames == 1 {
            self.logger
                .info("Single frame input, detecting without warmup");
            CaptureMode::Sequence
        } else {
            mode
        };
        self.logger.info(&format!(
            "Capturing from {} ({} frames, {}x{}, {:?} mode)",
            input.display(),
            metadata.total_frames,
            metadata.width,
            metadata.height,
            mode
        ));

        let mut state = RunState {
            cycle: CaptureCycle::new(self.timing, mode, self.clock.now()),
            best: BestFace::new(self.blur_threshold),
            summary: CaptureSummary::default(),
        };

        for frame_result in source.frames() {
            let now = self.clock.now();
            state.summary.frames_read += 1;
            self.logger
                .progress(state.summary.frames_read, metadata.total_frames);

            self.collect_uploads(&mut state, now);

            match state.cycle.tick(now) {
                CycleEvent::Started => self.start_cycle(&mut state),
                CycleEvent::Ended => self.end_cycle(&mut state, now),
                CycleEvent::None => {}
            }

            if max_cycles.is_some_and(|max| finished(&state, max)) {
                break;
            }

            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    self.logger.info(&format!("Skipping frame: {e}"));
                    continue;
                }
            };

            if !state.cycle.try_begin_detection(now) {
                continue;
            }
            state.summary.frames_detected += 1;
            match self
                .capture
                .process_frame(&frame, &mut state.best, self.logger.as_mut())
            {
                Ok(report) => state.cycle.record_pass(report.detections, report.processed),
                Err(e) => {
                    self.logger.info(&format!("Detection error: {e}"));
                    state.cycle.record_pass(0, 0);
                }
            }
            state.cycle.finish_detection();
        }
        source.close();

        if state.cycle.cycles_completed() == 0 && state.cycle.phase() == CyclePhase::Waiting {
            self.logger.warn(&format!(
                "Source ended after {} frames, before the {:.1}s warmup finished; no faces were checked",
                state.summary.frames_read,
                self.timing.warmup.as_secs_f64()
            ));
        }

        let now = self.clock.now();
        if state.cycle.end() == CycleEvent::Ended {
            self.end_cycle(&mut state, now);
        }
        if let Some(uploader) = self.uploader.as_mut() {
            while let Some(outcome) = uploader.wait() {
                apply_outcome(&mut state, outcome, self.logger.as_mut(), now);
            }
        }

        self.logger.summary();
        Ok(state.summary)
    }

    fn start_cycle(&mut self, state: &mut RunState) {
        state.best.reset();
        self.logger.info("Detection cycle started");
    }

    fn end_cycle(&mut self, state: &mut RunState, now: Duration) {
        let cycle = state.cycle.cycles_completed();
        let processed = state.cycle.faces_processed();
        self.logger
            .info(&format!("Detection cycle ended. Processed {processed} faces"));

        let mut report = CycleReport {
            cycle,
            frames_with_faces: state.cycle.frames_with_faces(),
            faces_processed: processed,
            best_score: None,
            upload: UploadStatus::NoFace,
        };

        let Some(record) = state.best.take() else {
            self.logger.info("No best face found in this cycle");
            state.summary.cycles.push(report);
            state.cycle.skip_sending(now);
            return;
        };
        report.best_score = Some(record.analysis.overall_score);

        report.upload = match self.uploader.as_mut() {
            None => UploadStatus::Skipped,
            Some(uploader) => {
                let submitted = UploadPayload::from_record(&record, processed, self.clock.timestamp_ms())
                    .and_then(|payload| uploader.submit(cycle, payload));
                match submitted {
                    Ok(()) => {
                        self.logger.info("Sending best face to server...");
                        UploadStatus::Pending
                    }
                    Err(e) => {
                        self.logger.info(&format!("Server request failed: {e}"));
                        UploadStatus::Failed(e.to_string())
                    }
                }
            }
        };
        if report.upload != UploadStatus::Pending {
            state.cycle.skip_sending(now);
        }

        let better = state
            .summary
            .best
            .as_ref()
            .map_or(true, |b| record.analysis.overall_score > b.analysis.overall_score);
        if better {
            state.summary.best = Some(record);
        }
        state.summary.cycles.push(report);
    }

    fn collect_uploads(&mut self, state: &mut RunState, now: Duration) {
        let Some(uploader) = self.uploader.as_mut() else {
            return;
        };
        while let Some(outcome) = uploader.poll() {
            apply_outcome(state, outcome, self.logger.as_mut(), now);
        }
    }
}

fn finished(state: &RunState, max_cycles: u32) -> bool {
    state.cycle.cycles_completed() >= max_cycles
        && state
            .summary
            .cycles
            .iter()
            .all(|c| c.upload != UploadStatus::Pending)
}

fn apply_outcome(
    state: &mut RunState,
    outcome: UploadOutcome,
    logger: &mut dyn CaptureLogger,
    now: Duration,
) {
    let status = match outcome.result {
        Ok(body) => {
            logger.info("Server request completed successfully");
            UploadStatus::Sent(body)
        }
        Err(e) => {
            logger.info(&format!("Server request failed: {e}"));
            UploadStatus::Failed(e.to_string())
        }
    };
    if let Some(report) = state
        .summary
        .cycles
        .iter_mut()
        .find(|c| c.cycle == outcome.cycle && c.upload == UploadStatus::Pending)
    {
        report.upload = status;
    }
    state.cycle.finish_sending(now);
}
