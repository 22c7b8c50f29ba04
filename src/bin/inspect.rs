//! Per-bin diagnostic dump of every analysis stage for one or more files
//!
//! Usage: `inspect [--contours] [--temporal] <file1> [file2 ...]`
//!
//! `--temporal` also runs the correlation and tempo analysis and prints each
//! bin's best tempo plus a lag-0 correlation grid, one row and column per
//! octave.

use anyhow::{Context, Result};
use earprint::analyzer::loudness::phons_to_db;
use earprint::analyzer::normalizer;
use earprint::analyzer::temporal::TemporalProfile;
use earprint::analyzer::transform::{self, frequency_at_bin, FREQUENCY_RESOLUTION};
use earprint::audio::{decode, Channel};
use earprint::config::resolve_config;
use earprint::{Analyzer, ChannelProfile, Feature};
use std::env;
use std::path::Path;
use std::time::Instant;

/// Bins per octave, the step of the correlation grid
const OCTAVE: usize = 12;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let contours = args.iter().any(|a| a == "--contours");
    let temporal = args.iter().any(|a| a == "--temporal");
    let files: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    if files.is_empty() && !contours {
        eprintln!("Usage: inspect [--contours] [--temporal] <file1> [file2 ...]");
        std::process::exit(1);
    }

    if contours {
        print_contours();
    }

    let config = resolve_config(None).context("Failed to load config")?;
    let analyzer = config
        .analyzer()
        .with_temporal(config.characteristics.temporal || temporal);

    for file in files {
        println!("\n{}", "=".repeat(60));
        println!("FILE: {}", file);
        println!("{}", "=".repeat(60));
        inspect_file(Path::new(file), &analyzer)?;
    }

    Ok(())
}

/// dB SPL needed for equal loudness, one column per 20 phons
fn print_contours() {
    println!("\nEqual-loudness contours (dB SPL)");
    print!("{:>10}", "Hz");
    for phons in (0..=100).step_by(20) {
        print!("{:>9}", format!("{}ph", phons));
    }
    println!();
    for bin in (0..FREQUENCY_RESOLUTION).step_by(6) {
        let frequency = frequency_at_bin(bin);
        print!("{:>10.1}", frequency);
        for phons in (0..=100).step_by(20) {
            print!("{:>9.1}", phons_to_db(phons as f64, frequency));
        }
        println!();
    }
}

fn inspect_file(path: &Path, analyzer: &Analyzer) -> Result<()> {
    let signal = decode::decode_file(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    println!("Sample rate: {} Hz", signal.sample_rate());
    println!("Samples: {} ({:.2}s)", signal.len(), signal.duration());

    // Stage timings on the left channel
    let samples = signal
        .channel(Channel::Left)
        .context("Signal has no channels")?;
    let start = Instant::now();
    let amplitudes = transform::transform(
        samples,
        signal.sample_rate(),
        transform::frame_count(signal.duration()),
    )?;
    println!("Transform: {} frames in {:.2}s", amplitudes.len(), start.elapsed().as_secs_f64());

    let start = Instant::now();
    let config = analyzer.normalizer();
    let loudness = normalizer::normalize(&amplitudes, config)?;
    println!(
        "Normalize: volume {:.3} -> {:.3} in {:.2}s",
        normalizer::perceptual_volume(&amplitudes, config.db_of_max),
        loudness.mean(),
        start.elapsed().as_secs_f64()
    );

    let start = Instant::now();
    let profile = analyzer.analyze(&signal)?;
    println!(
        "Full analysis ({} channel(s)): {:.2}s",
        if profile.is_stereo() { 2 } else { 1 },
        start.elapsed().as_secs_f64()
    );

    for channel in [Channel::Left, Channel::Right] {
        if let Some(characteristics) = profile.channel(channel) {
            println!("\n{:?} channel:", channel);
            print_characteristics(characteristics);
            if let Some(temporal) = &characteristics.temporal {
                print_temporal(temporal);
            }
        }
    }

    Ok(())
}

fn print_characteristics(channel: &ChannelProfile) {
    print!("{:>4} {:>9}", "bin", "Hz");
    for feature in Feature::ALL {
        print!(" {:>11}", feature.name());
    }
    println!();

    for bin in 0..FREQUENCY_RESOLUTION {
        print!("{:>4} {:>9.1}", bin, frequency_at_bin(bin));
        for feature in Feature::ALL {
            print!(" {:>11.4e}", channel.feature(feature)[bin]);
        }
        println!();
    }
}

fn print_temporal(temporal: &TemporalProfile) {
    println!("\nBest tempo per bin:");
    println!("{:>4} {:>9} {:>5} {:>10}", "bin", "Hz", "bpm", "match");
    for bin in 0..FREQUENCY_RESOLUTION {
        let (bpm, score) = temporal.best_tempo(bin);
        println!("{:>4} {:>9.1} {:>5} {:>10.4}", bin, frequency_at_bin(bin), bpm, score);
    }

    println!("\nLag-0 correlation between octaves:");
    print!("{:>9}", "Hz");
    for b in (0..FREQUENCY_RESOLUTION).step_by(OCTAVE) {
        print!(" {:>9.0}", frequency_at_bin(b));
    }
    println!();
    for a in (0..FREQUENCY_RESOLUTION).step_by(OCTAVE) {
        print!("{:>9.0}", frequency_at_bin(a));
        for b in (0..FREQUENCY_RESOLUTION).step_by(OCTAVE) {
            print!(" {:>9.3e}", temporal.correlation(a, b, 0));
        }
        println!();
    }
}
