use crate::core::error::SearchError;
use crate::core::hash::{HashAlgorithm, HashConfig, PerceptualHasher};
use crate::core::progress::{CancellationToken, ProgressEvent, ProgressSender, ProgressSink};
use crate::core::scanner::SkippedPath;
use image_hasher::ImageHash;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::convert::Infallible;
use std::path::{Path, PathBuf};

/// Index-aligned duplicate pairs: `originals[i]` is the original of `duplicates[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicatePairs {
    pub originals: Vec<PathBuf>,
    pub duplicates: Vec<PathBuf>,
}

impl DuplicatePairs {
    pub fn len(&self) -> usize {
        self.duplicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.originals
            .iter()
            .zip(&self.duplicates)
            .map(|(o, d)| (o.as_path(), d.as_path()))
    }

    fn push(&mut self, original: PathBuf, duplicate: PathBuf) {
        self.originals.push(original);
        self.duplicates.push(duplicate);
    }
}

/// Completion value of a detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    pub pairs: DuplicatePairs,
    /// Number of images that were hashed and took part in the comparison.
    pub hashed: usize,
    pub undecodable: Vec<SkippedPath>,
}

/// Pair every item with the first-seen original it resembles.
///
/// Items are visited in order. The first item not yet consumed becomes an original; every later
/// unconsumed item similar to the original, or to anything already pulled into its group, becomes
/// one of its duplicates and is consumed. Returns `(original, duplicate)` index pairs.
pub fn group_similar<T, F>(items: &[T], is_similar: F) -> Vec<(usize, usize)>
where
    T: Sync,
    F: Fn(&T, &T) -> bool + Sync,
{
    match group_with(items, is_similar, |_, _| Ok::<(), Infallible>(())) {
        Ok(pairs) => pairs,
        Err(never) => match never {},
    }
}

/// `visit(original, member)` runs before each group member is compared against the remaining
/// items, the original first; an error stops the grouping.
fn group_with<T, F, V, E>(
    items: &[T],
    is_similar: F,
    mut visit: V,
) -> Result<Vec<(usize, usize)>, E>
where
    T: Sync,
    F: Fn(&T, &T) -> bool + Sync,
    V: FnMut(usize, usize) -> Result<(), E>,
{
    let n = items.len();
    let mut consumed = vec![false; n];
    let mut pairs = Vec::new();

    for original in 0..n {
        if consumed[original] {
            continue;
        }
        let mut group = vec![original];
        let mut cursor = 0;
        while cursor < group.len() {
            let member = group[cursor];
            cursor += 1;
            visit(original, member)?;

            let candidates: Vec<usize> = (original + 1..n).filter(|&j| !consumed[j]).collect();
            let matched: Vec<usize> = candidates
                .par_iter()
                .copied()
                .filter(|&j| is_similar(&items[member], &items[j]))
                .collect();

            for j in matched {
                consumed[j] = true;
                pairs.push((original, j));
                group.push(j);
            }
        }
    }

    Ok(pairs)
}

pub struct DuplicateDetector {
    hasher: PerceptualHasher,
    progress: ProgressSink,
    cancellation_token: CancellationToken,
}

impl DuplicateDetector {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self::with_hasher(PerceptualHasher::new(algorithm))
    }

    /// Fails fast on an invalid configuration, before any image is touched.
    pub fn from_config(config: &HashConfig) -> Result<Self, SearchError> {
        Ok(Self::with_hasher(PerceptualHasher::from_config(config)?))
    }

    pub fn with_hasher(hasher: PerceptualHasher) -> Self {
        Self {
            hasher,
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

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    /// Hash every path in order, then pair similar images.
    ///
    /// Files that cannot be opened or decoded are left out and reported as warnings. The only
    /// error is [`SearchError::Cancelled`].
    pub fn find_duplicates(&self, paths: &[PathBuf]) -> Result<DetectionReport, SearchError> {
        log::info!(
            "Hashing {} image(s) with {}",
            paths.len(),
            self.hasher.algorithm()
        );

        let HashedImages { images, failed } = self.hash_all(paths)?;
        let mut report = DetectionReport {
            hashed: images.len(),
            undecodable: failed,
            ..DetectionReport::default()
        };

        let total = images.len();
        let matches = group_with(
            &images,
            |a, b| self.hasher.is_similar(&a.1, &b.1),
            |original, member| -> Result<(), SearchError> {
                self.check_cancelled()?;
                if member == original {
                    self.progress.send(ProgressEvent::Comparing {
                        path: images[original].0.clone(),
                        index: original,
                        total,
                    });
                }
                Ok(())
            },
        )?;

        for (original, duplicate) in matches {
            log::debug!(
                "{} duplicates {}",
                images[duplicate].0.display(),
                images[original].0.display()
            );
            report
                .pairs
                .push(images[original].0.clone(), images[duplicate].0.clone());
        }

        log::info!(
            "Detection complete: {} duplicate(s) among {} image(s)",
            report.pairs.len(),
            report.hashed
        );
        self.progress.send(ProgressEvent::DetectionComplete {
            hashed: report.hashed,
            duplicates: report.pairs.len(),
        });

        Ok(report)
    }

    fn hash_all(&self, paths: &[PathBuf]) -> Result<HashedImages, SearchError> {
        let mut seen = HashSet::new();
        let unique: Vec<&PathBuf> = paths
            .iter()
            .filter(|path| seen.insert(path.as_path()))
            .collect();
        let total = unique.len();
        let mut hashed = HashedImages::default();

        for (index, path) in unique.into_iter().enumerate() {
            self.check_cancelled()?;
            self.progress.send(ProgressEvent::Hashing {
                path: path.clone(),
                index,
                total,
            });

            match self.hasher.hash_file(path) {
                Ok(hash) => hashed.images.push((path.clone(), hash)),
                Err(e) => {
                    log::warn!("Failed to hash {}: {}", path.display(), e);
                    self.progress.send(ProgressEvent::DecodeFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    hashed.failed.push(SkippedPath {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(hashed)
    }

    fn check_cancelled(&self) -> Result<(), SearchError> {
        if self.cancellation_token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        Ok(())
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

#[derive(Default)]
struct HashedImages {
    images: Vec<(PathBuf, ImageHash)>,
    failed: Vec<SkippedPath>,
}
