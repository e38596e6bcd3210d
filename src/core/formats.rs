use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raster formats the scanner accepts, recognized by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Bmp,
    Jpeg,
    Png,
    Tiff,
    WebP,
    Gif,
    Pnm,
}

/// Lowercase extensions on the allowlist, in the order they are documented.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "bmp", "dib", "jpg", "jpeg", "jpe", "jfif", "png", "tif", "tiff", "webp", "gif", "pbm", "pgm",
    "ppm", "pnm",
];

impl ImageFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bmp" | "dib" => Some(ImageFormat::Bmp),
            "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "webp" => Some(ImageFormat::WebP),
            "gif" => Some(ImageFormat::Gif),
            "pbm" | "pgm" | "ppm" | "pnm" => Some(ImageFormat::Pnm),
            _ => None,
        }
    }

    /// Detect the format of `path` from its extension.
    pub fn detect(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

pub fn is_supported_format(path: &Path) -> bool {
    ImageFormat::detect(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_format_detection() {
        assert!(is_supported_format(Path::new("test.jpg")));
        assert!(is_supported_format(Path::new("test.JPEG")));
        assert!(is_supported_format(Path::new("dir/test.png")));
        assert!(is_supported_format(Path::new("scan.TIF")));
        assert!(is_supported_format(Path::new("old.dib")));
        assert!(!is_supported_format(Path::new("test.txt")));
        assert!(!is_supported_format(Path::new("test")));
        assert!(!is_supported_format(Path::new("archive.png.zip")));
    }

    #[test]
    fn test_every_listed_extension_maps_to_a_format() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(
                ImageFormat::from_extension(ext).is_some(),
                "{ext} is listed but not recognized"
            );
        }
    }

    #[test]
    fn test_format_families() {
        assert_eq!(ImageFormat::detect(Path::new("a.jpe")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(Path::new("a.pgm")), Some(ImageFormat::Pnm));
        assert_eq!(ImageFormat::detect(Path::new("a.heic")), None);
    }
}
