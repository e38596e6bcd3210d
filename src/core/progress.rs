use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Incremental status of a run. `Display` renders the line a front-end shows to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Scanning {
        path: PathBuf,
    },
    Skipped {
        path: PathBuf,
        reason: String,
    },
    ScanComplete {
        images: usize,
    },
    Hashing {
        path: PathBuf,
        index: usize,
        total: usize,
    },
    DecodeFailed {
        path: PathBuf,
        reason: String,
    },
    Comparing {
        path: PathBuf,
        index: usize,
        total: usize,
    },
    DetectionComplete {
        hashed: usize,
        duplicates: usize,
    },
}

impl ProgressEvent {
    /// True for recoverable per-item failures a front-end should surface as warnings.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Skipped { .. } | ProgressEvent::DecodeFailed { .. }
        )
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Scanning { path } => write!(f, "scanning: {}", path.display()),
            ProgressEvent::Skipped { path, reason } => {
                write!(f, "warning: skipped {}: {}", path.display(), reason)
            }
            ProgressEvent::ScanComplete { images } => {
                write!(f, "scan complete: {} image(s) found", images)
            }
            ProgressEvent::Hashing { path, index, total } => {
                write!(f, "hashing ({}/{}): {}", index + 1, total, path.display())
            }
            ProgressEvent::DecodeFailed { path, reason } => {
                write!(f, "warning: cannot decode {}: {}", path.display(), reason)
            }
            ProgressEvent::Comparing { path, index, total } => {
                write!(f, "comparing ({}/{}): {}", index + 1, total, path.display())
            }
            ProgressEvent::DetectionComplete { hashed, duplicates } => write!(
                f,
                "search complete: {} duplicate(s) among {} image(s)",
                duplicates, hashed
            ),
        }
    }
}

/// Cooperative stop flag shared between a run and whoever started it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional progress sink shared by the scanner and the detector.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgressSink(Option<ProgressSender>);

impl ProgressSink {
    pub(crate) fn new(sender: ProgressSender) -> Self {
        Self(Some(sender))
    }

    /// Send an event; a closed receiver only means nobody is listening any more.
    pub(crate) fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.0 {
            let _ = sender.send(event);
        }
    }
}
