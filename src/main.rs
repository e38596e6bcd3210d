use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use simpics::core::progress::ProgressReceiver;
use simpics::{
    DuplicatePairs, HashAlgorithm, ProgressEvent, ScanOptions, SearchController, SearchOutcome,
    SearchRequest, Settings,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simpics", version, about = "Find visually similar images")]
struct Cli {
    /// Settings file (default: `<config dir>/simpics/config.json` when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the images a search would compare
    Scan {
        #[command(flatten)]
        roots: RootArgs,
    },

    /// Find near-duplicate images
    Find {
        #[command(flatten)]
        roots: RootArgs,
        /// Hash algorithm (see `simpics algorithms`)
        #[arg(short, long, value_name = "NAME")]
        algorithm: Option<HashAlgorithm>,
        /// Side of the hash grid
        #[arg(long, value_name = "N")]
        hash_size: Option<u32>,
        /// Largest Hamming distance still counted as a duplicate
        #[arg(long, value_name = "N")]
        max_distance: Option<u32>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported hash algorithms
    Algorithms,
}

#[derive(Args, Debug)]
struct RootArgs {
    /// Directories to search
    #[arg(value_name = "DIR", required = true)]
    dirs: Vec<PathBuf>,
    /// Also scan subdirectories
    #[arg(short, long)]
    recursive: bool,
    /// Levels of subdirectories to descend
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
    /// Follow symbolic links
    #[arg(long)]
    follow_links: bool,
}

impl RootArgs {
    fn apply(&self, options: &mut ScanOptions) {
        options.recursive |= self.recursive;
        options.follow_links |= self.follow_links;
        if self.max_depth.is_some() {
            options.max_depth = self.max_depth;
        }
    }
}

#[derive(Serialize)]
struct FindReport<'a> {
    finished_at: String,
    algorithm: HashAlgorithm,
    #[serde(flatten)]
    outcome: &'a SearchOutcome,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings =
        Settings::discover(cli.config.as_deref()).context("Failed to load settings")?;
    let controller = SearchController::new();

    match cli.command {
        Commands::Scan { roots } => {
            roots.apply(&mut settings.scan);
            println!("▶ Scanning {} folder(s)…", roots.dirs.len());

            let start = Instant::now();
            let mut handle = controller.start_scan(roots.dirs, settings.scan)?;
            let spinner = spinner()?;
            while let Some(event) = handle.next_progress().await {
                show(&spinner, event);
            }
            let report = handle.wait().await.context("Scan failed")?;
            spinner.finish_with_message(format!("Scan complete in {:.2?}", start.elapsed()));

            for path in &report.paths {
                println!("{}", path.display());
            }
            println!("Found {} image(s).", report.paths.len());
        }

        Commands::Find {
            roots,
            algorithm,
            hash_size,
            max_distance,
            json,
        } => {
            roots.apply(&mut settings.scan);
            if let Some(algorithm) = algorithm {
                settings.hash.algorithm = algorithm;
            }
            if let Some(hash_size) = hash_size {
                settings.hash.hash_size = hash_size;
            }
            if max_distance.is_some() {
                settings.hash.max_distance = max_distance;
            }
            settings.validate()?;

            let algorithm = settings.hash.algorithm;
            let request = SearchRequest {
                roots: roots.dirs,
                scan: settings.scan,
                hash: settings.hash,
            };

            let start = Instant::now();
            let spinner = spinner()?;
            let (tx, rx) = mpsc::unbounded_channel();
            let renderer = tokio::spawn(render(spinner.clone(), rx));
            let outcome = controller.search(request, Some(tx)).await;
            renderer.await.context("Progress renderer failed")?;
            let outcome = outcome.context("Search failed")?;
            spinner.finish_with_message(format!("Search complete in {:.2?}", start.elapsed()));

            if json {
                let report = FindReport {
                    finished_at: Utc::now().to_rfc3339(),
                    algorithm,
                    outcome: &outcome,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_pairs(&outcome.detection.pairs, outcome.detection.hashed);
            }
        }

        Commands::Algorithms => {
            for alg in HashAlgorithm::ALL {
                println!("{:<24} {}", alg.name(), alg.aliases().join(", "));
            }
        }
    }

    Ok(())
}

fn spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn show(spinner: &ProgressBar, event: ProgressEvent) {
    if event.is_warning() {
        spinner.println(format!("⚠️  {}", event));
    } else {
        spinner.set_message(event.to_string());
    }
}

async fn render(spinner: ProgressBar, mut rx: ProgressReceiver) {
    while let Some(event) = rx.recv().await {
        show(&spinner, event);
    }
}

/// Print pairs grouped by original; pairs of one original are always adjacent.
fn print_pairs(pairs: &DuplicatePairs, hashed: usize) {
    if pairs.is_empty() {
        println!("No duplicates found among {} image(s).", hashed);
        return;
    }

    println!(
        "Found {} duplicate(s) among {} image(s):",
        pairs.len(),
        hashed
    );
    let mut current: Option<&Path> = None;
    let mut group = 0;
    for (original, duplicate) in pairs.iter() {
        if current != Some(original) {
            group += 1;
            current = Some(original);
            println!("\n✨ Group {}:", group);
            println!("   🏆 {}", original.display());
        }
        println!("   📦 {}", duplicate.display());
    }
}
