//! Perceptual volume normalization
//!
//! Two recordings of the same song mastered at different levels should
//! fingerprint the same. The normalizer converts raw amplitudes into
//! perceived loudness and rescales the input until the average loudness hits
//! a fixed target.
//!
//! # Amplitude to Loudness
//!
//! ```text
//! amplitude ──► dB SPL ──► phons ──► loudness
//!              90 + 10·log10(a / 32767)
//!                         equal-loudness contour at the bin frequency
//!                                   2^(phons / 10)
//! ```
//!
//! `2^(phons/10)` doubles every 10 phons, matching the rule of thumb that a
//! 10 dB increase sounds twice as loud.
//!
//! # Why Iterate
//!
//! Loudness is not proportional to amplitude (the contours bend differently
//! per frequency), so a single rescale cannot land exactly on the target. Each
//! round scales the raw amplitudes by `1 + (target - current) / current` and
//! recomputes. For typical program material loudness grows slower than
//! amplitude, and the sequence settles in 30-40 rounds. Near the hearing
//! threshold the contours are steep enough for a step to overshoot, so the
//! loop is capped at `max_iterations` and reports non-convergence past it.

use super::loudness::db_to_phons;
use super::transform::{frequency_at_bin, SpectralMatrix};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Full-scale 16-bit amplitude
const INT16_MAX: f64 = i16::MAX as f64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Average loudness every recording is scaled to
    #[serde(default = "default_target_volume")]
    pub target_volume: f64,
    /// Stop once the average loudness is this close to the target
    #[serde(default = "default_error_bound")]
    pub error_bound: f64,
    /// Damping on each rescale step, 1.0 takes the full step
    #[serde(default = "default_ratio_multiplier")]
    pub ratio_multiplier: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// dB SPL that a full-scale sample is assumed to play at
    #[serde(default = "default_db_of_max")]
    pub db_of_max: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_volume: default_target_volume(),
            error_bound: default_error_bound(),
            ratio_multiplier: default_ratio_multiplier(),
            max_iterations: default_max_iterations(),
            db_of_max: default_db_of_max(),
        }
    }
}

fn default_target_volume() -> f64 { 128.0 }
fn default_error_bound() -> f64 { 0.001 }
fn default_ratio_multiplier() -> f64 { 1.0 }
fn default_max_iterations() -> usize { 500 }
fn default_db_of_max() -> f64 { 90.0 }

/// Perceived loudness of one amplitude at one frequency
///
/// Zero (and anything the contour model cannot place) is silent.
pub fn loudness(amplitude: f64, frequency: f64, db_of_max: f64) -> f64 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    let db = db_of_max + 10.0 * (amplitude / INT16_MAX).log10();
    let value = 2f64.powf(db_to_phons(db, frequency) / 10.0);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Loudness matrix of `matrix` with every amplitude scaled by `multiplier`
fn loudness_matrix(matrix: &SpectralMatrix, multiplier: f64, db_of_max: f64) -> SpectralMatrix {
    matrix.map(|bin, amplitude| loudness(amplitude * multiplier, frequency_at_bin(bin), db_of_max))
}

/// Mean perceived loudness over every cell of an amplitude matrix
pub fn perceptual_volume(matrix: &SpectralMatrix, db_of_max: f64) -> f64 {
    loudness_matrix(matrix, 1.0, db_of_max).mean()
}

/// Rescale an amplitude matrix to the target loudness and return the
/// resulting loudness matrix
///
/// The input is left untouched. Silence (average loudness exactly 0) comes
/// back as-is since no multiplier can change it.
pub fn normalize(matrix: &SpectralMatrix, config: &NormalizerConfig) -> Result<SpectralMatrix> {
    let mut multiplier = 1.0;
    let mut volume = 0.0;

    for iteration in 0..config.max_iterations {
        let current = loudness_matrix(matrix, multiplier, config.db_of_max);
        volume = current.mean();

        if volume == 0.0 {
            log::debug!("Normalizer: silent input, passing through");
            return Ok(matrix.clone());
        }
        if (volume - config.target_volume).abs() <= config.error_bound {
            log::debug!(
                "Normalizer: converged after {} iteration(s), multiplier {:.4}",
                iteration + 1,
                multiplier
            );
            return Ok(current);
        }

        multiplier *= 1.0 + ((config.target_volume - volume) / volume) * config.ratio_multiplier;
        log::debug!(
            "Normalizer: iteration {} volume {:.4}, next multiplier {:.4}",
            iteration,
            volume,
            multiplier
        );

        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::NormalizerNonConvergence {
                iterations: iteration + 1,
                volume,
                target: config.target_volume,
            });
        }
    }

    Err(Error::NormalizerNonConvergence {
        iterations: config.max_iterations,
        volume,
        target: config.target_volume,
    })
}
