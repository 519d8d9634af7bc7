//!
//! src/progress.rs  Andrew Belles  Oct 5th, 2025
//!
//! Progress events of a running conversion, delivered over a bounded
//! channel so the pipeline never depends on whoever renders them
//!

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc::{self, error::TrySendError}, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parsing,
    Fetching,
    Matching,
    Creating,
    Adding,
    Complete
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionProgress {
    pub stage: Stage,
    pub message: String,
    pub percent: f32,
    pub tracks_processed: Option<usize>,
    pub total_tracks: Option<usize>,
    pub success_count: Option<usize>,
    pub failed_count: Option<usize>
}

impl ConversionProgress {
    pub fn new(stage: Stage, message: impl Into<String>, percent: f32) -> Self {
        Self {
            stage,
            message: message.into(),
            percent,
            tracks_processed: None,
            total_tracks: None,
            success_count: None,
            failed_count: None
        }
    }

    pub fn total(mut self, total: usize) -> Self {
        self.total_tracks = Some(total);
        self
    }

    pub fn processed(mut self, processed: usize, succeeded: usize) -> Self {
        self.tracks_processed = Some(processed);
        self.success_count = Some(succeeded);
        self
    }

    pub fn outcome(mut self, succeeded: usize, failed: usize) -> Self {
        self.success_count = Some(succeeded);
        self.failed_count = Some(failed);
        self
    }
}

/// Write-only end of the progress channel. Cloning is cheap and clones share
/// the percent floor, so every event seen downstream is non-decreasing.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::Sender<ConversionProgress>>,
    floor: Arc<Mutex<f32>>
}

impl ProgressSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ConversionProgress>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self { tx: Some(tx), floor: Arc::new(Mutex::new(0.0)) };
        (sink, rx)
    }

    /// Sink that drops every event
    pub fn disabled() -> Self {
        Self { tx: None, floor: Arc::new(Mutex::new(0.0)) }
    }

    /// Deliver an event without waiting. A full channel drops the event and
    /// a closed receiver is ignored; the pipeline never blocks on a reader.
    pub async fn emit(&self, mut event: ConversionProgress) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };

        // floor lock is held across send so concurrent emitters stay ordered
        let mut floor = self.floor.lock().await;
        let percent = if event.percent.is_nan() { *floor } else { event.percent };
        event.percent = percent.clamp(*floor, 100.0);
        *floor = event.percent;

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::trace!(stage = ?dropped.stage, percent = dropped.percent, "progress.dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("progress.receiver.closed");
            }
        }
    }
}
