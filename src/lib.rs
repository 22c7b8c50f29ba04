//! Earprint - perceptual audio fingerprints
//!
//! Earprint reduces a recording to a compact fingerprint of how it *sounds*
//! and scores how alike two fingerprints are, for finding duplicates, covers
//! and remasters in a music library.
//!
//! # Overview
//!
//! Byte-level or waveform comparison fails as soon as a song is re-encoded,
//! remastered louder, or converted to mono. Earprint instead measures what a
//! listener hears:
//!
//! 1. **Constant-Q transform**: 120 frequency bins, one per semitone from
//!    20 Hz to 20 kHz, 20 frames per second.
//! 2. **Equal-loudness model**: amplitudes become perceived loudness using
//!    the ear's frequency-dependent sensitivity.
//! 3. **Normalization**: every recording is rescaled to the same perceived
//!    volume, so mastering level does not matter.
//! 4. **Characteristics**: per bin, the average loudness, how sharply it
//!    rises and falls, and how peaky it is.
//! 5. **Comparison**: a multi-scale difference between two fingerprints,
//!    squashed into a score from 0 to 1.
//!
//! # Quick Start
//!
//! ```no_run
//! use earprint::{Analyzer, ComparisonWeights, Fingerprint};
//! use std::path::Path;
//!
//! let analyzer = Analyzer::new();
//! let a = analyzer.analyze_file(Path::new("original.flac"))?;
//! let b = analyzer.analyze_file(Path::new("remaster.mp3"))?;
//!
//! let score = a.similarity(&b, &ComparisonWeights::default());
//! println!("{:.1}% match", score * 100.0);
//! # Ok::<(), earprint::Error>(())
//! ```
//!
//! # Scores
//!
//! | Score | Meaning |
//! |-------|---------|
//! | 1.0 | Identical fingerprints |
//! | 0.99+ | Same recording, different encode or level |
//! | 0.9-0.99 | Closely related (remaster, live take) |
//! | below 0.9 | Different material |
//!
//! # Modules
//!
//! - [`audio`]: PCM input and file decoding
//! - [`analyzer`]: Transform, loudness model, normalizer and characteristics
//! - [`fingerprint`]: Fingerprint types, their text record and the library cache
//! - [`compare`]: Similarity scoring and batch comparison
//! - [`config`]: TOML settings
//! - [`report`]: Output formatters (JSON, CSV)

pub mod analyzer;
pub mod audio;
pub mod compare;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod report;

pub use analyzer::Analyzer;
pub use audio::{AudioSignal, Channel};
pub use compare::{
    compare_against, compare_all, most_and_least_similar, Comparison, ComparisonWeights,
    Fingerprint, Track,
};
pub use config::Config;
pub use error::{Error, Result};
pub use fingerprint::library::Library;
pub use fingerprint::{ChannelProfile, Feature, Profile};

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // The crate root re-exports everything a caller needs to go from samples
    // to a score without reaching into submodules.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _analyzer = Analyzer::new();
        let _weights = ComparisonWeights::default();
        let _config = Config::default();
        let _ = Channel::Left;
        let _ = Feature::Volume;
    }

    #[test]
    fn test_samples_to_score() {
        let signal = AudioSignal::mono(vec![0; 4000], 8000);
        let profile = Analyzer::new().analyze(&signal).unwrap();
        let tracks = vec![Track::new("x", profile.clone()), Track::new("y", profile)];
        let results = compare_all(&tracks, &ComparisonWeights::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
    }
}
