use crate::core::error::SearchError;
use crate::core::formats::is_supported_format;
use crate::core::progress::{CancellationToken, ProgressEvent, ProgressSender, ProgressSink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Descend into subdirectories of each root.
    pub recursive: bool,
    /// Levels of subdirectories to descend when recursive; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Follow symbolic links. Loops are detected and skipped.
    pub follow_links: bool,
}

impl ScanOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Self::default()
        }
    }

    fn walk_depth(&self) -> usize {
        if self.recursive {
            self.max_depth
                .map(|depth| depth.saturating_add(1))
                .unwrap_or(usize::MAX)
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    pub path: PathBuf,
    pub reason: String,
}

/// Completion value of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Absolute, unique image paths in discovery order.
    pub paths: Vec<PathBuf>,
    /// Roots and entries that could not be read.
    pub skipped: Vec<SkippedPath>,
}

pub struct FolderScanner {
    options: ScanOptions,
    progress: ProgressSink,
    cancellation_token: CancellationToken,
}

impl FolderScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            progress: ProgressSink::default(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_progress_sender(mut self, sender: ProgressSender) -> Self {
        self.progress = ProgressSink::new(sender);
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn get_cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn cancel_scan(&self) {
        self.cancellation_token.cancel();
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Enumerate supported image files under `roots`.
    ///
    /// Unreadable roots and entries are skipped with a warning. The only error is
    /// [`SearchError::Cancelled`], in which case everything found so far is discarded.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<ScanReport, SearchError> {
        log::info!(
            "Scanning {} root(s), recursive: {}",
            roots.len(),
            self.options.recursive
        );

        let mut report = ScanReport::default();
        let mut seen = HashSet::new();

        for root in roots {
            self.check_cancelled()?;

            let root = match self.resolve_root(root) {
                Ok(root) => root,
                Err(reason) => {
                    self.skip(&mut report, root.clone(), reason);
                    continue;
                }
            };

            self.scan_root(&root, &mut seen, &mut report)?;
        }

        log::info!(
            "Scan complete: {} image(s), {} skipped",
            report.paths.len(),
            report.skipped.len()
        );
        self.progress.send(ProgressEvent::ScanComplete {
            images: report.paths.len(),
        });

        Ok(report)
    }

    fn resolve_root(&self, root: &Path) -> Result<PathBuf, String> {
        let canonical = fs::canonicalize(root).map_err(|e| e.to_string())?;
        if !canonical.is_dir() {
            return Err("not a directory".to_string());
        }
        Ok(canonical)
    }

    fn scan_root(
        &self,
        root: &Path,
        seen: &mut HashSet<PathBuf>,
        report: &mut ScanReport,
    ) -> Result<(), SearchError> {
        let walk_depth = self.options.walk_depth();
        let walker = WalkDir::new(root)
            .max_depth(walk_depth)
            .follow_links(self.options.follow_links)
            .sort_by_file_name();

        for entry in walker {
            self.check_cancelled()?;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    self.skip(report, path, e.to_string());
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_dir() {
                if entry.depth() < walk_depth {
                    self.progress.send(ProgressEvent::Scanning {
                        path: path.to_path_buf(),
                    });
                }
                continue;
            }

            if entry.path_is_symlink() && !self.options.follow_links {
                continue;
            }
            if !path.is_file() || !is_supported_format(path) {
                continue;
            }

            // One file reached through several links is listed once, under its real path.
            let path = match fs::canonicalize(path) {
                Ok(path) => path,
                Err(e) => {
                    self.skip(report, path.to_path_buf(), e.to_string());
                    continue;
                }
            };
            if seen.insert(path.clone()) {
                log::debug!("Found image {}", path.display());
                report.paths.push(path);
            }
        }

        Ok(())
    }

    fn skip(&self, report: &mut ScanReport, path: PathBuf, reason: String) {
        log::warn!("Skipping {}: {}", path.display(), reason);
        self.progress.send(ProgressEvent::Skipped {
            path: path.clone(),
            reason: reason.clone(),
        });
        report.skipped.push(SkippedPath { path, reason });
    }

    fn check_cancelled(&self) -> Result<(), SearchError> {
        if self.cancellation_token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        Ok(())
    }
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}
