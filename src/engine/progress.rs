//! Pass progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Pass;
use crate::utils::Utils;

/// Shared cancellation flag, polled at the top of every per-frame loop
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running pass
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress callback trait for frontends
pub trait ProgressCallback: Send + Sync {
    /// Called when a pass starts
    fn on_start(&self, pass: Pass, total_frames: Option<u64>);

    /// Called while a pass processes frames
    fn on_progress(&self, pass: Pass, frames: u64, total_frames: Option<u64>);

    /// Called when a pass finished
    fn on_complete(&self, pass: Pass, info: &ProgressInfo);

    /// Called when a pass returned early through the abort flag
    fn on_cancel(&self, pass: Pass);
}

/// Snapshot of a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub pass: Pass,
    /// Frames read from the decode service
    pub frames: u64,
    pub total_frames: Option<u64>,
    pub elapsed: Duration,
    /// Frames per second of wall time
    pub throughput: Option<f64>,
}

/// Progress tracker for one pass
pub struct PassProgress {
    pass: Pass,
    frames: u64,
    total_frames: Option<u64>,
    start_time: Instant,
    last_update: Instant,
    update_interval: Duration,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

impl PassProgress {
    /// Start tracking a pass
    pub fn start(
        pass: Pass,
        total_frames: Option<u64>,
        callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
    ) -> Self {
        let progress = Self {
            pass,
            frames: 0,
            total_frames,
            start_time: Instant::now(),
            last_update: Instant::now(),
            update_interval: Duration::from_millis(500),
            callbacks,
        };
        progress.notify(|cb| cb.on_start(pass, total_frames));
        progress
    }

    /// Count one frame; callbacks fire at most twice per second
    pub fn tick(&mut self) {
        self.frames += 1;
        if self.last_update.elapsed() < self.update_interval {
            return;
        }
        self.last_update = Instant::now();
        let (pass, frames, total) = (self.pass, self.frames, self.total_frames);
        self.notify(|cb| cb.on_progress(pass, frames, total));
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn info(&self) -> ProgressInfo {
        let elapsed = self.start_time.elapsed();
        let secs = elapsed.as_secs_f64();
        ProgressInfo {
            pass: self.pass,
            frames: self.frames,
            total_frames: self.total_frames,
            elapsed,
            throughput: (secs > 0.0).then(|| self.frames as f64 / secs),
        }
    }

    /// Finish the pass
    pub fn complete(self) -> ProgressInfo {
        let info = self.info();
        self.notify(|cb| cb.on_complete(info.pass, &info));
        info
    }

    /// Finish the pass after an abort request
    pub fn cancel(self) -> ProgressInfo {
        let info = self.info();
        self.notify(|cb| cb.on_cancel(info.pass));
        info
    }

    fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

/// Callback writing pass progress to the log
pub struct TracingProgressCallback;

impl ProgressCallback for TracingProgressCallback {
    fn on_start(&self, pass: Pass, total_frames: Option<u64>) {
        match total_frames {
            Some(total) => info!("Starting {} over {} frames", pass, total),
            None => info!("Starting {}", pass),
        }
    }

    fn on_progress(&self, pass: Pass, frames: u64, total_frames: Option<u64>) {
        match total_frames {
            Some(total) if total > 0 => {
                debug!("{}: {} frames ({:.1}%)", pass, frames, Utils::calculate_progress(frames, total));
            }
            _ => debug!("{}: {} frames", pass, frames),
        }
    }

    fn on_complete(&self, pass: Pass, info: &ProgressInfo) {
        match info.throughput {
            Some(fps) => info!(
                "Finished {} after {} frames in {} ({:.0} frames/s)",
                pass,
                info.frames,
                Utils::format_duration(info.elapsed),
                fps
            ),
            None => info!("Finished {} after {} frames", pass, info.frames),
        }
    }

    fn on_cancel(&self, pass: Pass) {
        warn!("{} aborted", pass);
    }
}
