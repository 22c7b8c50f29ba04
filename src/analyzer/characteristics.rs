//! Per-bin characteristics of a loudness matrix
//!
//! Reduces a `[frame][bin]` loudness matrix to five 120-value vectors that make
//! up one channel of a fingerprint:
//!
//! ```text
//! volume      how loud the bin is on average
//! rise        how sharply the bin gets louder
//! fall        how sharply the bin gets quieter
//! peak_ratio  how tall its peaks are relative to the dips around them
//! peak_rate   how many peaks and dips per second
//! ```
//!
//! Every bin only reads its own column, so bins are computed in parallel.

use super::temporal;
use super::transform::{frequency_at_bin, SpectralMatrix, FREQUENCY_RESOLUTION, TIME_RESOLUTION};
use crate::fingerprint::{BinVector, ChannelProfile};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicsConfig {
    /// Power applied to each frame-to-frame change. Above 1 favors sudden
    /// jumps over slow swells.
    #[serde(default = "default_rise_fall_exponent")]
    pub rise_fall_exponent: f64,
    #[serde(default = "default_rise_fall_weight")]
    pub rise_fall_weight: f64,
    /// Also compute cross-bin correlation and tempo matching (slow).
    /// Read by `inspect`; saved records never include the result.
    #[serde(default)]
    pub temporal: bool,
}

impl Default for CharacteristicsConfig {
    fn default() -> Self {
        Self {
            rise_fall_exponent: default_rise_fall_exponent(),
            rise_fall_weight: default_rise_fall_weight(),
            temporal: false,
        }
    }
}

fn default_rise_fall_exponent() -> f64 { 3.0 }
fn default_rise_fall_weight() -> f64 { 0.01 }

/// Statistics of one bin's time series
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BinStats {
    volume: f64,
    rise: f64,
    fall: f64,
    peak_ratio: f64,
    peak_rate: f64,
}

impl BinStats {
    fn compute(series: &[f64], frequency: f64, config: &CharacteristicsConfig) -> Self {
        let (rise, fall) = rise_fall(series, frequency, config);
        let extrema = extrema(series);
        Self {
            volume: average_volume(series),
            rise,
            fall,
            peak_ratio: peak_ratio(&extrema),
            peak_rate: peak_rate(extrema.len(), series.len()),
        }
    }
}

/// Time mean of a bin, 0 for an empty series
pub fn average_volume(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Accumulated rises and falls, each change raised to the configured power
/// and scaled down by series length and bin frequency
///
/// Higher bins naturally flicker faster, so dividing by frequency keeps them
/// from dominating.
pub fn rise_fall(series: &[f64], frequency: f64, config: &CharacteristicsConfig) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 0.0);
    }

    let mut rise = 0.0;
    let mut fall = 0.0;
    for pair in series.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            rise += delta.powf(config.rise_fall_exponent);
        } else if delta < 0.0 {
            fall += (-delta).powf(config.rise_fall_exponent);
        }
    }

    let scale = config.rise_fall_weight / (series.len() as f64 * frequency);
    (rise * scale, fall * scale)
}

/// A local maximum or minimum of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extremum {
    Peak(f64),
    Dip(f64),
}

impl Extremum {
    pub fn value(&self) -> f64 {
        match self {
            Extremum::Peak(v) | Extremum::Dip(v) => *v,
        }
    }
}

/// Local maxima and minima in time order
///
/// An extremum is wherever the direction of travel flips. Flat stretches keep
/// the previous direction, so a plateau top counts once.
pub fn extrema(series: &[f64]) -> Vec<Extremum> {
    let mut result = Vec::new();
    let mut direction = 0i8;

    for (i, pair) in series.windows(2).enumerate() {
        let step = if pair[1] > pair[0] {
            1
        } else if pair[1] < pair[0] {
            -1
        } else {
            0
        };
        if step == 0 {
            continue;
        }

        if direction != 0 && step != direction {
            let value = series[i];
            result.push(if direction > 0 {
                Extremum::Peak(value)
            } else {
                Extremum::Dip(value)
            });
        }
        direction = step;
    }

    result
}

/// Mean height ratio between consecutive extrema
///
/// A peak contributes `peak / previous dip`, a dip contributes
/// `previous peak / dip`, so both are at least 1 for a well-formed series.
/// Ratios whose denominator is not positive are left out. 0 when nothing
/// qualifies.
pub fn peak_ratio(extrema: &[Extremum]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;

    for pair in extrema.windows(2) {
        let previous = pair[0].value();
        let (numerator, denominator) = match pair[1] {
            Extremum::Peak(current) => (current, previous),
            Extremum::Dip(current) => (previous, current),
        };
        // TODO: a dip to exact silence is dropped here; decide whether it
        // should instead count as a capped ratio
        if denominator <= 0.0 {
            continue;
        }
        sum += numerator / denominator;
        count += 1;
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Extrema per second of audio
pub fn peak_rate(extremum_count: usize, frames: usize) -> f64 {
    if frames == 0 {
        return 0.0;
    }
    extremum_count as f64 / (frames as f64 / TIME_RESOLUTION)
}

/// Characteristics of one channel's loudness matrix
pub fn extract(loudness: &SpectralMatrix, config: &CharacteristicsConfig) -> ChannelProfile {
    let stats: Vec<BinStats> = (0..FREQUENCY_RESOLUTION)
        .into_par_iter()
        .map(|bin| BinStats::compute(&loudness.bin_series(bin), frequency_at_bin(bin), config))
        .collect();

    let mut volume: BinVector = [0.0; FREQUENCY_RESOLUTION];
    let mut rise: BinVector = [0.0; FREQUENCY_RESOLUTION];
    let mut fall: BinVector = [0.0; FREQUENCY_RESOLUTION];
    let mut peak_ratio: BinVector = [0.0; FREQUENCY_RESOLUTION];
    let mut peak_rate: BinVector = [0.0; FREQUENCY_RESOLUTION];
    for (bin, s) in stats.iter().enumerate() {
        volume[bin] = s.volume;
        rise[bin] = s.rise;
        fall[bin] = s.fall;
        peak_ratio[bin] = s.peak_ratio;
        peak_rate[bin] = s.peak_rate;
    }

    let temporal = if config.temporal {
        Some(temporal::extract(loudness, &volume))
    } else {
        None
    };

    ChannelProfile {
        volume,
        rise,
        fall,
        peak_ratio,
        peak_rate,
        temporal,
    }
}
