use std::collections::VecDeque;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::upload::domain::face_uploader::{FaceUploader, UploadError, UploadPayload};

/// Result of one background upload, tagged with the cycle it belongs to.
#[derive(Debug)]
pub struct UploadOutcome {
    pub cycle: u32,
    pub result: Result<String, UploadError>,
}

struct UploadJob {
    cycle: u32,
    payload: UploadPayload,
}

/// Runs uploads on a dedicated thread so frame processing never waits on
/// the network.
///
/// Layout: `caller → [jobs] → worker → [outcomes] → caller`
pub struct BackgroundUploader {
    job_tx: Option<Sender<UploadJob>>,
    outcome_rx: Receiver<UploadOutcome>,
    handle: Option<JoinHandle<()>>,
    /// Cycles submitted and not yet collected, oldest first.
    pending: VecDeque<u32>,
}

impl BackgroundUploader {
    pub fn new(uploader: Box<dyn FaceUploader>) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<UploadJob>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<UploadOutcome>();
        let handle = spawn_worker(uploader, job_rx, outcome_tx);
        Self {
            job_tx: Some(job_tx),
            outcome_rx,
            handle: Some(handle),
            pending: VecDeque::new(),
        }
    }

    pub fn submit(&mut self, cycle: u32, payload: UploadPayload) -> Result<(), UploadError> {
        let tx = self.job_tx.as_ref().ok_or(UploadError::WorkerGone)?;
        tx.send(UploadJob { cycle, payload })
            .map_err(|_| UploadError::WorkerGone)?;
        self.pending.push_back(cycle);
        Ok(())
    }

    /// Uploads submitted but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// A finished upload, if one is ready. Never blocks.
    pub fn poll(&mut self) -> Option<UploadOutcome> {
        match self.outcome_rx.try_recv() {
            Ok(outcome) => Some(self.collected(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.worker_lost(),
        }
    }

    /// Block until the next submitted upload finishes. `None` when nothing
    /// is pending.
    pub fn wait(&mut self) -> Option<UploadOutcome> {
        if self.pending.is_empty() {
            return None;
        }
        match self.outcome_rx.recv() {
            Ok(outcome) => Some(self.collected(outcome)),
            Err(_) => self.worker_lost(),
        }
    }

    fn collected(&mut self, outcome: UploadOutcome) -> UploadOutcome {
        if let Some(pos) = self.pending.iter().position(|&c| c == outcome.cycle) {
            self.pending.remove(pos);
        }
        outcome
    }

    /// Fails the oldest pending upload. Called once per pending cycle, so a
    /// dead worker drains every outstanding cycle as `WorkerGone`.
    fn worker_lost(&mut self) -> Option<UploadOutcome> {
        let cycle = self.pending.pop_front()?;
        log::error!("Upload worker exited before cycle {cycle} was sent");
        Some(UploadOutcome {
            cycle,
            result: Err(UploadError::WorkerGone),
        })
    }
}

impl Drop for BackgroundUploader {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop
        self.job_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Upload worker panicked");
            }
        }
    }
}

fn spawn_worker(
    uploader: Box<dyn FaceUploader>,
    job_rx: Receiver<UploadJob>,
    outcome_tx: Sender<UploadOutcome>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let result = uploader.upload(&job.payload);
            if let Err(e) = &result {
                log::warn!("Upload for cycle {} failed: {e}", job.cycle);
            }
            let outcome = UploadOutcome {
                cycle: job.cycle,
                result,
            };
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct RecordingUploader {
        seen: Arc<Mutex<Vec<u64>>>,
        fail: bool,
    }

    impl FaceUploader for RecordingUploader {
        fn upload(&self, payload: &UploadPayload) -> Result<String, UploadError> {
            self.seen.lock().unwrap().push(payload.timestamp_ms);
            if self.fail {
                Err(UploadError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(format!("ok {}", payload.timestamp_ms))
            }
        }
    }

    struct SlowUploader(Duration);

    impl FaceUploader for SlowUploader {
        fn upload(&self, _payload: &UploadPayload) -> Result<String, UploadError> {
            std::thread::sleep(self.0);
            Ok("late".into())
        }
    }

    fn payload(ts: u64) -> UploadPayload {
        UploadPayload {
            png: vec![1],
            score: 1.0,
            processed_count: 1,
            blur_score: 60.0,
            quality_score: 1.0,
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_uploads_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bg = BackgroundUploader::new(Box::new(RecordingUploader {
            seen: seen.clone(),
            fail: false,
        }));
        bg.submit(1, payload(10)).unwrap();
        bg.submit(2, payload(20)).unwrap();
        assert_eq!(bg.pending(), 2);

        let first = bg.wait().unwrap();
        let second = bg.wait().unwrap();
        assert_eq!(first.cycle, 1);
        assert_eq!(first.result.unwrap(), "ok 10");
        assert_eq!(second.cycle, 2);
        assert_eq!(bg.pending(), 0);
        assert!(bg.wait().is_none());
        assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_failures_are_reported_not_fatal() {
        let mut bg = BackgroundUploader::new(Box::new(RecordingUploader {
            seen: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }));
        bg.submit(3, payload(1)).unwrap();
        let outcome = bg.wait().unwrap();
        assert!(matches!(outcome.result, Err(UploadError::Status { status: 500, .. })));
        bg.submit(4, payload(2)).unwrap();
        assert_eq!(bg.wait().unwrap().cycle, 4);
    }

    #[test]
    fn test_poll_does_not_block() {
        let mut bg = BackgroundUploader::new(Box::new(SlowUploader(Duration::from_millis(200))));
        bg.submit(1, payload(1)).unwrap();
        assert!(bg.poll().is_none());
        assert_eq!(bg.pending(), 1);
        assert_eq!(bg.wait().unwrap().result.unwrap(), "late");
    }

    /// Blocks until released, then panics and takes the worker down.
    struct DyingUploader(crossbeam_channel::Receiver<()>);

    impl FaceUploader for DyingUploader {
        fn upload(&self, _payload: &UploadPayload) -> Result<String, UploadError> {
            let _ = self.0.recv();
            panic!("uploader crashed");
        }
    }

    #[test]
    fn test_lost_worker_fails_every_pending_cycle() {
        let (release_tx, release_rx) = crossbeam_channel::bounded(1);
        let mut bg = BackgroundUploader::new(Box::new(DyingUploader(release_rx)));
        bg.submit(4, payload(1)).unwrap();
        bg.submit(5, payload(2)).unwrap();
        release_tx.send(()).unwrap();

        let first = bg.wait().unwrap();
        let second = bg.wait().unwrap();
        assert_eq!(first.cycle, 4);
        assert!(matches!(first.result, Err(UploadError::WorkerGone)));
        assert_eq!(second.cycle, 5);
        assert!(matches!(second.result, Err(UploadError::WorkerGone)));
        assert_eq!(bg.pending(), 0);
        assert!(bg.wait().is_none());
    }

    #[test]
    fn test_poll_with_nothing_submitted() {
        let mut bg = BackgroundUploader::new(Box::new(SlowUploader(Duration::ZERO)));
        assert!(bg.poll().is_none());
    }
}
