use crate::core::error::SearchError;
use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// Perceptual hash algorithms a detection run can use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    /// Mean brightness per grid cell.
    #[default]
    Average,
    /// Mean hash over DCT coefficients.
    Perceptual,
    Median,
    /// Horizontal gradient between adjacent cells.
    Difference,
    /// Horizontal and vertical gradients.
    DoubleDifference,
    Block,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Average,
        HashAlgorithm::Perceptual,
        HashAlgorithm::Median,
        HashAlgorithm::Difference,
        HashAlgorithm::DoubleDifference,
        HashAlgorithm::Block,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Average => "average-hash",
            HashAlgorithm::Perceptual => "perceptual-hash",
            HashAlgorithm::Median => "median-hash",
            HashAlgorithm::Difference => "difference-hash",
            HashAlgorithm::DoubleDifference => "double-difference-hash",
            HashAlgorithm::Block => "block-hash",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            HashAlgorithm::Average => &["average", "ahash", "mean"],
            HashAlgorithm::Perceptual => &["perceptual", "phash", "dct"],
            HashAlgorithm::Median => &["median"],
            HashAlgorithm::Difference => &["difference", "dhash", "gradient"],
            HashAlgorithm::DoubleDifference => &["double-difference", "double-gradient"],
            HashAlgorithm::Block => &["block", "blockhash", "block-mean"],
        }
    }

    /// Share of the hash's bits that may differ for two images to count as similar.
    pub fn similarity_ratio(self) -> f64 {
        match self {
            HashAlgorithm::Average | HashAlgorithm::Median | HashAlgorithm::Difference => 0.08,
            HashAlgorithm::DoubleDifference | HashAlgorithm::Block => 0.1,
            HashAlgorithm::Perceptual => 0.125,
        }
    }

    fn hasher_config(self, hash_size: u32) -> HasherConfig {
        let config = HasherConfig::new().hash_size(hash_size, hash_size);
        match self {
            HashAlgorithm::Average => config.hash_alg(HashAlg::Mean),
            HashAlgorithm::Perceptual => config.hash_alg(HashAlg::Mean).preproc_dct(),
            HashAlgorithm::Median => config.hash_alg(HashAlg::Median),
            HashAlgorithm::Difference => config.hash_alg(HashAlg::Gradient),
            HashAlgorithm::DoubleDifference => config.hash_alg(HashAlg::DoubleGradient),
            HashAlgorithm::Block => config.hash_alg(HashAlg::Blockhash),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        HashAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.name() == wanted || alg.aliases().contains(&wanted.as_str()))
            .ok_or_else(|| SearchError::UnknownAlgorithm {
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(alg: HashAlgorithm) -> Self {
        alg.name().to_string()
    }
}

pub const MIN_HASH_SIZE: u32 = 2;
pub const MAX_HASH_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    pub algorithm: HashAlgorithm,
    /// Side of the downsampled grid; an 8x8 grid yields a 64-bit mean hash.
    pub hash_size: u32,
    /// Hamming cut-off overriding the algorithm's own threshold.
    pub max_distance: Option<u32>,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            hash_size: 8,
            max_distance: None,
        }
    }
}

impl HashConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&self.hash_size) {
            return Err(SearchError::invalid_config(format!(
                "hash size must be between {} and {}, got {}",
                MIN_HASH_SIZE, MAX_HASH_SIZE, self.hash_size
            )));
        }
        Ok(())
    }
}

/// Computes perceptual hashes with one algorithm and decides whether two hashes match.
pub struct PerceptualHasher {
    algorithm: HashAlgorithm,
    hasher: Hasher,
    max_distance: Option<u32>,
}

impl PerceptualHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let config = HashConfig {
            algorithm,
            ..HashConfig::default()
        };
        Self::build(&config)
    }

    pub fn from_config(config: &HashConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: &HashConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            hasher: config.algorithm.hasher_config(config.hash_size).to_hasher(),
            max_distance: config.max_distance,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Load, decode and hash one file. The decoded image is dropped before returning.
    pub fn hash_file(&self, path: &Path) -> Result<ImageHash, HashError> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(self.hash_image(&img))
    }

    pub fn hash_image(&self, img: &DynamicImage) -> ImageHash {
        self.hasher.hash_image(img)
    }

    pub fn distance(&self, a: &ImageHash, b: &ImageHash) -> u32 {
        a.dist(b)
    }

    /// Largest Hamming distance still counted as a match for hashes like `hash`.
    pub fn max_distance_for(&self, hash: &ImageHash) -> u32 {
        self.max_distance.unwrap_or_else(|| {
            let bits = hash.as_bytes().len() * 8;
            (bits as f64 * self.algorithm.similarity_ratio()).round() as u32
        })
    }

    pub fn is_similar(&self, a: &ImageHash, b: &ImageHash) -> bool {
        self.distance(a, b) <= self.max_distance_for(a)
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}
