use crate::core::error::SearchError;
use crate::core::progress::{
    CancellationToken, ProgressEvent, ProgressReceiver, ProgressSender,
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scan,
    Detection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Scan => f.write_str("folder scan"),
            Stage::Detection => f.write_str("duplicate detection"),
        }
    }
}

/// The single run a controller may have in flight.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunSlot(Arc<Mutex<Option<Stage>>>);

impl RunSlot {
    pub(crate) fn acquire(&self, stage: Stage) -> Result<RunGuard, SearchError> {
        let mut active = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *active {
            log::warn!("Rejected {} request: {} still running", stage, running);
            return Err(SearchError::Busy { stage: running });
        }
        *active = Some(stage);
        log::debug!("Started {}", stage);
        Ok(RunGuard(Arc::new(ActiveRun { slot: self.clone() })))
    }

    pub(crate) fn active(&self) -> Option<Stage> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, stage: Option<Stage>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }
}

/// Keeps the slot occupied; it is released when the last clone is dropped.
#[derive(Debug, Clone)]
pub(crate) struct RunGuard(Arc<ActiveRun>);

impl RunGuard {
    pub(crate) fn advance(&self, stage: Stage) {
        self.0.slot.set(Some(stage));
    }
}

#[derive(Debug)]
struct ActiveRun {
    slot: RunSlot,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.slot.set(None);
    }
}

/// Handle on one background run: a stream of progress events and a single completion value.
pub struct RunHandle<T> {
    stage: Stage,
    progress: ProgressReceiver,
    task: JoinHandle<Result<T, SearchError>>,
    cancellation_token: CancellationToken,
}

impl<T> RunHandle<T> {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Next progress event, or `None` once the run has finished and every event was consumed.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// Ask the run to stop at its next checkpoint. A cancelled run completes with
    /// [`SearchError::Cancelled`] and its partial results are discarded.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Wait for the completion value. Progress not yet consumed is dropped.
    pub async fn wait(self) -> Result<T, SearchError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SearchError::Worker(e.to_string())),
        }
    }

    /// Relay every progress event to `sink` as it arrives, then wait for completion.
    pub async fn forward_to(mut self, sink: Option<&ProgressSender>) -> Result<T, SearchError> {
        while let Some(event) = self.progress.recv().await {
            if let Some(sink) = sink {
                let _ = sink.send(event);
            }
        }
        self.wait().await
    }
}

/// Run `job` on tokio's blocking pool. Must be called from within a tokio runtime.
pub(crate) fn spawn_run<T, F>(
    stage: Stage,
    guard: RunGuard,
    cancellation_token: CancellationToken,
    job: F,
) -> RunHandle<T>
where
    T: Send + 'static,
    F: FnOnce(ProgressSender, CancellationToken) -> Result<T, SearchError> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let job_token = cancellation_token.clone();

    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let result = job(tx, job_token);
        if let Err(e) = &result {
            log::warn!("{} ended without a result: {}", stage, e);
        }
        result
    });

    RunHandle {
        stage,
        progress: rx,
        task,
        cancellation_token,
    }
}
