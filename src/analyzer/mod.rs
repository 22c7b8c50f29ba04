//! Signal analysis pipeline
//!
//! ```text
//! samples ─► transform ─► normalizer ─► characteristics ─► Profile
//!            (amplitude)   (loudness)    (per-bin vectors)
//! ```
//!
//! Each channel runs through the pipeline on its own. [`Analyzer`] wires the
//! stages together with their settings.

pub mod characteristics;
pub mod loudness;
pub mod normalizer;
pub mod temporal;
pub mod transform;

use crate::audio::{decode, AudioSignal, Channel};
use crate::error::{Error, Result};
use crate::fingerprint::{ChannelProfile, Profile};
use characteristics::CharacteristicsConfig;
use normalizer::NormalizerConfig;
use std::path::Path;

/// Builds fingerprints from audio
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    normalizer: NormalizerConfig,
    characteristics: CharacteristicsConfig,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(mut self, config: NormalizerConfig) -> Self {
        self.normalizer = config;
        self
    }

    pub fn with_characteristics(mut self, config: CharacteristicsConfig) -> Self {
        self.characteristics = config;
        self
    }

    /// Toggle cross-bin correlation and tempo matching
    pub fn with_temporal(mut self, temporal: bool) -> Self {
        self.characteristics.temporal = temporal;
        self
    }

    pub fn normalizer(&self) -> &NormalizerConfig {
        &self.normalizer
    }

    pub fn characteristics(&self) -> &CharacteristicsConfig {
        &self.characteristics
    }

    /// Fingerprint of one channel of samples
    pub fn analyze_channel(&self, samples: &[i16], sample_rate: u32) -> Result<ChannelProfile> {
        let duration = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / sample_rate as f64
        };

        let amplitudes = transform::transform(samples, sample_rate, transform::frame_count(duration))?;
        let loudness = normalizer::normalize(&amplitudes, &self.normalizer)?;
        Ok(characteristics::extract(&loudness, &self.characteristics))
    }

    /// Fingerprint of a whole signal, mono or stereo
    pub fn analyze(&self, signal: &AudioSignal) -> Result<Profile> {
        log::info!(
            "Analyzing {:.1}s of {} audio at {}Hz",
            signal.duration(),
            if signal.is_stereo() { "stereo" } else { "mono" },
            signal.sample_rate()
        );

        let left = signal
            .channel(Channel::Left)
            .ok_or_else(|| Error::Decode("signal has no channels".to_string()))?;
        let left = self.analyze_channel(left, signal.sample_rate())?;

        match signal.channel(Channel::Right) {
            Some(right) => {
                let right = self.analyze_channel(right, signal.sample_rate())?;
                Ok(Profile::stereo(left, right))
            }
            None => Ok(Profile::mono(left)),
        }
    }

    /// Decode and fingerprint a file
    pub fn analyze_file(&self, path: &Path) -> Result<Profile> {
        let signal = decode::decode_file(path)?;
        self.analyze(&signal)
    }
}
