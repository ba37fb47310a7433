//! Timed capture cycle: wait, detect for a fixed window, send the best face,
//! then wait again.
//!
//! Every method takes the current time as a `Duration` since some fixed
//! start, so callers own the clock.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclePhase {
    Waiting,
    Detecting,
    Sending,
}

/// Phase transition reported by [`CaptureCycle::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleEvent {
    None,
    Started,
    Ended,
}

/// How the end of a detection window is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Repeating timed windows over a live source.
    #[default]
    Cycle,
    /// One window spanning the whole source; every frame is detected.
    Sequence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleTiming {
    pub warmup: Duration,
    pub detection: Duration,
    pub min_detection_interval: Duration,
    pub resend_delay: Duration,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            warmup: Duration::from_millis(2000),
            detection: Duration::from_millis(5000),
            min_detection_interval: Duration::from_millis(100),
            resend_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug)]
pub struct CaptureCycle {
    timing: CycleTiming,
    mode: CaptureMode,
    phase: CyclePhase,
    phase_started: Duration,
    last_detection: Option<Duration>,
    in_flight: bool,
    frames_with_faces: u32,
    faces_processed: u32,
    cycles_completed: u32,
}

impl CaptureCycle {
    pub fn new(timing: CycleTiming, mode: CaptureMode, now: Duration) -> Self {
        Self {
            timing,
            mode,
            phase: CyclePhase::Waiting,
            phase_started: now,
            last_detection: None,
            in_flight: false,
            frames_with_faces: 0,
            faces_processed: 0,
            cycles_completed: 0,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn timing(&self) -> &CycleTiming {
        &self.timing
    }

    pub fn frames_with_faces(&self) -> u32 {
        self.frames_with_faces
    }

    pub fn faces_processed(&self) -> u32 {
        self.faces_processed
    }

    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    /// Advance the phase clock.
    ///
    /// Sequence mode skips the warmup and never ends a window on time;
    /// see [`CaptureCycle::end`].
    pub fn tick(&mut self, now: Duration) -> CycleEvent {
        let elapsed = now.saturating_sub(self.phase_started);
        match (self.phase, self.mode) {
            (CyclePhase::Waiting, CaptureMode::Sequence) => self.start(now),
            (CyclePhase::Waiting, CaptureMode::Cycle) if elapsed >= self.timing.warmup => {
                self.start(now)
            }
            (CyclePhase::Detecting, CaptureMode::Cycle) if elapsed >= self.timing.detection => {
                self.end()
            }
            _ => CycleEvent::None,
        }
    }

    /// End the detection window early, e.g. because the source ran out.
    pub fn end(&mut self) -> CycleEvent {
        if self.phase != CyclePhase::Detecting {
            return CycleEvent::None;
        }
        self.phase = CyclePhase::Sending;
        self.cycles_completed += 1;
        CycleEvent::Ended
    }

    fn start(&mut self, now: Duration) -> CycleEvent {
        self.phase = CyclePhase::Detecting;
        self.phase_started = now;
        self.frames_with_faces = 0;
        self.faces_processed = 0;
        CycleEvent::Started
    }

    /// Claim a detection pass for the current frame.
    ///
    /// Fails outside the detection window, while a pass is already in flight,
    /// or (in cycle mode) sooner than the minimum interval after the last pass.
    pub fn try_begin_detection(&mut self, now: Duration) -> bool {
        if self.phase != CyclePhase::Detecting || self.in_flight {
            return false;
        }
        if self.mode == CaptureMode::Cycle {
            if let Some(last) = self.last_detection {
                if now.saturating_sub(last) < self.timing.min_detection_interval {
                    return false;
                }
            }
        }
        self.in_flight = true;
        self.last_detection = Some(now);
        true
    }

    pub fn finish_detection(&mut self) {
        self.in_flight = false;
    }

    pub fn is_detection_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Count one finished pass: `detected` faces, of which `processed` had
    /// landmarks and were scored.
    pub fn record_pass(&mut self, detected: usize, processed: usize) {
        if detected > 0 {
            self.frames_with_faces += 1;
        }
        self.faces_processed += processed as u32;
    }

    /// Leave the sending phase after an upload attempt. The next warmup
    /// starts once the resend delay has passed.
    pub fn finish_sending(&mut self, now: Duration) {
        self.restart(now + self.timing.resend_delay);
    }

    /// Leave the sending phase with nothing sent; the warmup starts now.
    pub fn skip_sending(&mut self, now: Duration) {
        self.restart(now);
    }

    fn restart(&mut self, from: Duration) {
        if self.phase == CyclePhase::Sending {
            self.phase = CyclePhase::Waiting;
            self.phase_started = from;
        }
    }

    /// Time left in the current detection window (cycle mode).
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.phase {
            CyclePhase::Detecting => (self.phase_started + self.timing.detection).saturating_sub(now),
            _ => Duration::ZERO,
        }
    }

    /// Percent of the detection window elapsed. Sequence windows have no
    /// fixed length and report 0 until they end.
    pub fn progress(&self, now: Duration) -> f64 {
        match (self.phase, self.mode) {
            (CyclePhase::Waiting, _) => 0.0,
            (CyclePhase::Sending, _) => 100.0,
            (CyclePhase::Detecting, CaptureMode::Sequence) => 0.0,
            (CyclePhase::Detecting, CaptureMode::Cycle) => {
                let total = self.timing.detection.as_secs_f64();
                if total == 0.0 {
                    return 100.0;
                }
                let elapsed = now.saturating_sub(self.phase_started).as_secs_f64();
                (elapsed / total * 100.0).min(100.0)
            }
        }
    }
}
