use crate::core::duplicate::{DetectionReport, DuplicateDetector};
use crate::core::error::SearchError;
use crate::core::hash::{HashConfig, PerceptualHasher};
use crate::core::progress::{CancellationToken, ProgressSender};
use crate::core::scanner::{FolderScanner, ScanOptions, ScanReport};
use crate::core::worker::{RunGuard, RunHandle, RunSlot, Stage, spawn_run};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub roots: Vec<PathBuf>,
    pub scan: ScanOptions,
    pub hash: HashConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub scan: ScanReport,
    pub detection: DetectionReport,
}

/// Starts scans and detections, allowing at most one run at a time.
///
/// Cloning shares the run slot, so every clone sees the same active run.
#[derive(Debug, Clone, Default)]
pub struct SearchController {
    slot: RunSlot,
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_stage(&self) -> Option<Stage> {
        self.slot.active()
    }

    pub fn is_busy(&self) -> bool {
        self.active_stage().is_some()
    }

    pub fn start_scan(
        &self,
        roots: Vec<PathBuf>,
        options: ScanOptions,
    ) -> Result<RunHandle<ScanReport>, SearchError> {
        let guard = self.slot.acquire(Stage::Scan)?;
        Ok(spawn_scan(guard, CancellationToken::new(), roots, options))
    }

    /// Configuration is validated here, before the slot is taken or any work is spawned.
    pub fn start_detection(
        &self,
        config: &HashConfig,
        paths: Vec<PathBuf>,
    ) -> Result<RunHandle<DetectionReport>, SearchError> {
        let hasher = PerceptualHasher::from_config(config)?;
        let guard = self.slot.acquire(Stage::Detection)?;
        Ok(spawn_detection(guard, CancellationToken::new(), hasher, paths))
    }

    /// Scan, then detect on the completed scan output, holding the slot throughout.
    pub async fn search(
        &self,
        request: SearchRequest,
        progress: Option<ProgressSender>,
    ) -> Result<SearchOutcome, SearchError> {
        self.search_with_token(request, progress, CancellationToken::new())
            .await
    }

    pub async fn search_with_token(
        &self,
        request: SearchRequest,
        progress: Option<ProgressSender>,
        cancellation_token: CancellationToken,
    ) -> Result<SearchOutcome, SearchError> {
        let hasher = PerceptualHasher::from_config(&request.hash)?;
        let guard = self.slot.acquire(Stage::Scan)?;

        let scan = spawn_scan(
            guard.clone(),
            cancellation_token.clone(),
            request.roots,
            request.scan,
        )
        .forward_to(progress.as_ref())
        .await?;

        guard.advance(Stage::Detection);
        let detection = spawn_detection(guard, cancellation_token, hasher, scan.paths.clone())
            .forward_to(progress.as_ref())
            .await?;

        Ok(SearchOutcome { scan, detection })
    }
}

fn spawn_scan(
    guard: RunGuard,
    cancellation_token: CancellationToken,
    roots: Vec<PathBuf>,
    options: ScanOptions,
) -> RunHandle<ScanReport> {
    spawn_run(Stage::Scan, guard, cancellation_token, move |tx, token| {
        FolderScanner::new(options)
            .with_progress_sender(tx)
            .with_cancellation_token(token)
            .scan(&roots)
    })
}

fn spawn_detection(
    guard: RunGuard,
    cancellation_token: CancellationToken,
    hasher: PerceptualHasher,
    paths: Vec<PathBuf>,
) -> RunHandle<DetectionReport> {
    spawn_run(Stage::Detection, guard, cancellation_token, move |tx, token| {
        DuplicateDetector::with_hasher(hasher)
            .with_progress_sender(tx)
            .with_cancellation_token(token)
            .find_duplicates(&paths)
    })
}
