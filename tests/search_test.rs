use image::{ImageBuffer, Rgb};
use simpics::{
    DuplicateDetector, FolderScanner, HashAlgorithm, HashConfig, ProgressEvent, ScanOptions,
    SearchController, SearchError, SearchRequest,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Quadrant pattern; `variant` picks which quadrants are white, so different variants hash apart.
fn save_pattern(path: &Path, size: u32, variant: u8) {
    let img = ImageBuffer::from_fn(size, size, |x, y| {
        let quadrant = (x >= size / 2) as u8 | (((y >= size / 2) as u8) << 1);
        let white = match variant {
            0 => quadrant & 1 == 0,
            1 => quadrant & 2 == 0,
            _ => quadrant == 0 || quadrant == 3,
        };
        let v = if white { 255u8 } else { 0u8 };
        Rgb([v, v, v])
    });
    img.save(path).unwrap();
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// root/
    ///   a.png        pattern 0
    ///   broken.jpg   garbage bytes
    ///   readme.md
    ///   sub/
    ///     b.png      pattern 1
    ///     c.bmp      pattern 0, larger
    ///     deeper/
    ///       d.png    pattern 2
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        let deeper = sub.join("deeper");
        fs::create_dir_all(&deeper).unwrap();

        save_pattern(&dir.path().join("a.png"), 64, 0);
        fs::write(dir.path().join("broken.jpg"), b"\xff\xd8 truncated").unwrap();
        fs::write(dir.path().join("readme.md"), b"# not an image").unwrap();
        save_pattern(&sub.join("b.png"), 64, 1);
        save_pattern(&sub.join("c.bmp"), 128, 0);
        save_pattern(&deeper.join("d.png"), 64, 2);

        Self { dir }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn path(&self, relative: &str) -> PathBuf {
        canonical(self.dir.path()).join(relative)
    }
}

#[test]
fn scanner_output_is_filtered_and_unique() {
    let fixture = Fixture::new();
    let roots = vec![
        fixture.root(),
        fixture.root().join("sub"),
        fixture.root().join("sub").join("deeper"),
    ];

    let report = FolderScanner::new(ScanOptions::recursive())
        .scan(&roots)
        .unwrap();

    let unique: HashSet<_> = report.paths.iter().collect();
    assert_eq!(unique.len(), report.paths.len());
    assert_eq!(
        report.paths,
        vec![
            fixture.path("a.png"),
            fixture.path("broken.jpg"),
            fixture.path("sub/b.png"),
            fixture.path("sub/c.bmp"),
            fixture.path("sub/deeper/d.png"),
        ]
    );
}

#[test]
fn shallow_scan_stays_in_root() {
    let fixture = Fixture::new();

    let report = FolderScanner::new(ScanOptions::default())
        .scan(&[fixture.root()])
        .unwrap();

    assert_eq!(
        report.paths,
        vec![fixture.path("a.png"), fixture.path("broken.jpg")]
    );
}

#[test]
fn scan_order_is_deterministic() {
    let fixture = Fixture::new();
    let scanner = FolderScanner::new(ScanOptions::recursive());

    let first = scanner.scan(&[fixture.root()]).unwrap();
    let second = scanner.scan(&[fixture.root()]).unwrap();

    assert_eq!(first, second);
}

#[test]
fn detector_isolates_undecodable_files() {
    let fixture = Fixture::new();
    let paths = FolderScanner::new(ScanOptions::recursive())
        .scan(&[fixture.root()])
        .unwrap()
        .paths;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = DuplicateDetector::new(HashAlgorithm::Average)
        .with_progress_sender(tx)
        .find_duplicates(&paths)
        .unwrap();

    assert_eq!(report.hashed, 4);
    assert_eq!(report.undecodable.len(), 1);
    assert_eq!(report.undecodable[0].path, fixture.path("broken.jpg"));
    assert_eq!(report.pairs.originals, vec![fixture.path("a.png")]);
    assert_eq!(report.pairs.duplicates, vec![fixture.path("sub/c.bmp")]);

    let mut warnings = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.is_warning() {
            warnings.push(event);
        }
    }
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        ProgressEvent::DecodeFailed { path, .. } if *path == fixture.path("broken.jpg")
    ));
}

#[test]
fn pairs_are_aligned_and_never_self_matched() {
    let dir = TempDir::new().unwrap();
    for i in 0..6u8 {
        let size = 32 + 32 * u32::from(i % 2);
        save_pattern(&dir.path().join(format!("img{i}.png")), size, i % 3);
    }
    let paths = FolderScanner::default()
        .scan(&[dir.path().to_path_buf()])
        .unwrap()
        .paths;

    let report = DuplicateDetector::default().find_duplicates(&paths).unwrap();

    assert_eq!(report.pairs.originals.len(), report.pairs.duplicates.len());
    assert_eq!(report.pairs.len(), 3);
    for (original, duplicate) in report.pairs.iter() {
        assert_ne!(original, duplicate);
    }
    let originals: HashSet<_> = report.pairs.originals.iter().collect();
    assert!(report.pairs.duplicates.iter().all(|d| !originals.contains(d)));
}

#[test]
fn empty_inputs_succeed() {
    let scan = FolderScanner::default().scan(&[]).unwrap();
    assert!(scan.paths.is_empty());

    let detection = DuplicateDetector::default().find_duplicates(&[]).unwrap();
    assert!(detection.pairs.is_empty());
    assert!(detection.undecodable.is_empty());
}

#[tokio::test]
async fn full_search_through_controller() {
    let fixture = Fixture::new();
    let controller = SearchController::new();
    let request = SearchRequest {
        roots: vec![fixture.root(), PathBuf::from("/definitely/not/here")],
        scan: ScanOptions::recursive(),
        hash: HashConfig::default(),
    };

    let outcome = controller.search(request, None).await.unwrap();

    assert_eq!(outcome.scan.skipped.len(), 1);
    assert_eq!(outcome.scan.paths.len(), 5);
    assert_eq!(outcome.detection.pairs.len(), 1);
    assert!(!controller.is_busy());
}

#[tokio::test]
async fn unknown_algorithm_is_a_precondition_failure() {
    let err = "radial-variance".parse::<HashAlgorithm>().unwrap_err();
    assert!(matches!(err, SearchError::UnknownAlgorithm { .. }));

    let controller = SearchController::new();
    let config = HashConfig {
        hash_size: 99,
        ..HashConfig::default()
    };
    let result = controller.start_detection(&config, vec![]);
    assert!(matches!(result, Err(SearchError::InvalidConfig { .. })));
    assert!(!controller.is_busy());
}
