//! Near-duplicate image search across directory trees.
//!
//! A search is two background stages run one after the other: the
//! [`FolderScanner`](core::scanner::FolderScanner) enumerates image files under a set of roots,
//! and the [`DuplicateDetector`](core::duplicate::DuplicateDetector) hashes them perceptually and
//! pairs each duplicate with the first-seen original it resembles. The
//! [`SearchController`](core::controller::SearchController) owns the single active run.

pub mod config;
pub mod core;

pub use crate::config::Settings;
pub use crate::core::controller::{SearchController, SearchOutcome, SearchRequest};
pub use crate::core::duplicate::{DetectionReport, DuplicateDetector, DuplicatePairs};
pub use crate::core::error::SearchError;
pub use crate::core::hash::{HashAlgorithm, HashConfig, PerceptualHasher};
pub use crate::core::progress::{CancellationToken, ProgressEvent};
pub use crate::core::scanner::{FolderScanner, ScanOptions, ScanReport, SkippedPath};
pub use crate::core::worker::{RunHandle, Stage};
