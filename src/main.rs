use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use earprint::audio::decode;
use earprint::config::resolve_config;
use earprint::fingerprint::library::track_name;
use earprint::report::{self, Summary};
use earprint::{
    compare_against, compare_all, most_and_least_similar, Analyzer, Comparison, Library, Profile,
    Track,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "earprint")]
#[command(author, version, about = "Perceptual audio fingerprints and similarity scores")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./earprint.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of saved fingerprints (overrides the config)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Re-analyze files even if a saved fingerprint exists
    #[arg(long, global = true)]
    no_cache: bool,

    /// Only show summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fingerprint files and save them to the library
    Analyze {
        /// Files or directories to analyze
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compare fingerprints
    ///
    /// No paths: every saved fingerprint against each other.
    /// One path: that file against every saved fingerprint.
    /// Several paths: those files against each other.
    Compare {
        /// Files or directories to compare
        paths: Vec<PathBuf>,

        /// Output report file (.csv, .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// List every pair instead of only each track's best and worst match
        #[arg(long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    let config = resolve_config(args.config.as_deref()).context("Failed to load config")?;

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let library_dir = args.library.clone().unwrap_or_else(|| config.library.dir.clone());
    let library = Library::open(&library_dir)
        .with_context(|| format!("Cannot open library {}", library_dir.display()))?;

    // Records and scores carry no temporal data; `inspect --temporal` shows it
    let analyzer = config.analyzer().with_temporal(false);

    match &args.command {
        Command::Analyze { paths } => {
            let files = collect_files(paths)?;
            let tracks = analyze_files(&files, &library, &analyzer, &args);

            if !args.quiet {
                for track in &tracks {
                    println!(
                        "{:<8} {}",
                        if track.fingerprint.is_stereo() { "stereo" } else { "mono" },
                        track.name
                    );
                }
                eprintln!("\n{}", "─".repeat(70));
                eprintln!(
                    "Fingerprinted {} of {} file(s) into {}",
                    tracks.len(),
                    files.len(),
                    library.dir().display()
                );
            }

            if tracks.len() < files.len() {
                std::process::exit(1);
            }
        }

        Command::Compare { paths, output, all } => {
            let results = run_compare(paths, *all, &library, &analyzer, &config.comparison, &args)?;

            if !args.quiet {
                print_results(&results);
            }

            let summary = Summary::from_results(&results);
            if !args.quiet {
                eprintln!("\n{}", "─".repeat(70));
                eprintln!("\x1b[1mSummary:\x1b[0m");
                eprintln!("  Pairs:   {}", summary.total);
                eprintln!("  Tracks:  {}", summary.tracks);
                eprintln!("  Mean:    {}", report::percent(summary.mean_score));
                eprintln!("  Best:    {}", report::percent(summary.best_score));
                eprintln!("  Worst:   {}", report::percent(summary.worst_score));
            }

            if let Some(path) = output {
                report::generate(path, &results)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                if !args.quiet {
                    eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", path.display());
                }
            }
        }
    }

    Ok(())
}

/// Supported audio files under every path, directories walked recursively
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && decode::is_supported(e.path()))
                    .map(|e| e.path().to_path_buf()),
            );
        } else if path.exists() {
            files.push(path.clone());
        } else {
            bail!("Path not found: {}", path.display());
        }
    }

    if files.is_empty() {
        bail!(
            "No audio files found (supported: {})",
            decode::SUPPORTED_EXTENSIONS.join(", ")
        );
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Fingerprint files in parallel, logging and skipping the ones that fail
fn analyze_files(
    files: &[PathBuf],
    library: &Library,
    analyzer: &Analyzer,
    args: &Args,
) -> Vec<Track<Profile>> {
    if !args.quiet {
        eprintln!("\x1b[1mEarprint - Perceptual Audio Fingerprints\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} audio file(s)\n", files.len());
    }

    let pb = if !args.quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let tracks: Vec<Track<Profile>> = files
        .par_iter()
        .filter_map(|path| {
            let result = fingerprint(path, library, analyzer, args.no_cache);
            if let Some(ref pb) = pb {
                pb.inc(1);
                pb.set_message(track_name(path));
            }
            match result {
                Ok(profile) => Some(Track::new(track_name(path), profile)),
                Err(e) => {
                    log::error!("Skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    tracks
}

fn fingerprint(
    path: &Path,
    library: &Library,
    analyzer: &Analyzer,
    no_cache: bool,
) -> earprint::Result<Profile> {
    if no_cache {
        let profile = analyzer.analyze_file(path)?;
        library.save(path, &profile)?;
        Ok(profile)
    } else {
        library.load_or_analyze(path, analyzer)
    }
}

fn run_compare(
    paths: &[PathBuf],
    all: bool,
    library: &Library,
    analyzer: &Analyzer,
    weights: &earprint::ComparisonWeights,
    args: &Args,
) -> Result<Vec<Comparison>> {
    let filter = |results: Vec<Comparison>| {
        if all {
            results
        } else {
            most_and_least_similar(&results)
        }
    };

    if paths.is_empty() {
        let saved = library.list_saved().context("Failed to load saved fingerprints")?;
        if saved.len() < 2 {
            bail!(
                "Need at least two saved fingerprints in {} to compare",
                library.dir().display()
            );
        }
        return Ok(filter(compare_all(&saved, weights)));
    }

    let files = collect_files(paths)?;
    let tracks = analyze_files(&files, library, analyzer, args);

    if files.len() == 1 {
        if tracks.is_empty() {
            bail!("Could not fingerprint {}", files[0].display());
        }
        let saved = library.list_saved().context("Failed to load saved fingerprints")?;
        return Ok(compare_against(&tracks, &saved, weights));
    }

    if tracks.len() < 2 {
        bail!("Need at least two fingerprinted files to compare");
    }
    Ok(filter(compare_all(&tracks, weights)))
}

fn print_results(results: &[Comparison]) {
    for r in results {
        let color = if r.score >= 0.99 {
            "\x1b[32m" // Green
        } else if r.score >= 0.9 {
            "\x1b[33m" // Yellow
        } else {
            "\x1b[90m" // Gray
        };
        let reset = "\x1b[0m";

        println!(
            "{}{:>8}{}  {}  <->  {}",
            color,
            report::percent(r.score),
            reset,
            truncate(&r.first, 40),
            truncate(&r.second, 40)
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
