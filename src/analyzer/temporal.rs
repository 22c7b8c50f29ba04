//! Cross-bin correlation and tempo matching
//!
//! Optional, slower characteristics that look at how bins move over time
//! rather than at their averages.
//!
//! ## Correlation
//!
//! For every pair of bins `(a, b)` and every lag up to two seconds, how much
//! the frame-to-frame change of `a` predicts the change of `b` `lag` frames
//! later. A kick drum lights up the low bins together at lag 0; a delay effect
//! shows up as correlation at its delay time.
//!
//! ## Tempo
//!
//! For every bin and every candidate BPM, a peak-detection kernel one beat
//! long is slid over the bin's series. Sampling the result once per beat, at
//! the best phase, scores how well the bin pulses at that tempo.

use super::transform::{SpectralMatrix, FREQUENCY_RESOLUTION, TIME_RESOLUTION};
use crate::fingerprint::BinVector;
use rayon::prelude::*;

/// Lags checked by the correlation, 0 to 2 seconds of frames
pub const CORRELATION_LAGS: usize = (TIME_RESOLUTION * 2.0) as usize;
/// Slowest tempo checked
pub const MIN_BPM: usize = 30;
/// Fastest tempo checked. Keeps the kernel at least 4 frames long.
pub const MAX_BPM: usize = 300;
const BPM_COUNT: usize = MAX_BPM - MIN_BPM + 1;

/// Correlation tensor and tempo matrix of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalProfile {
    /// `[bin_a][bin_b][lag]`, flattened
    correlation: Vec<f64>,
    /// `[bin][bpm - MIN_BPM]`, flattened
    tempo: Vec<f64>,
}

impl TemporalProfile {
    /// Change correlation of `bin_a` with `bin_b` lagging by `lag` frames
    pub fn correlation(&self, bin_a: usize, bin_b: usize, lag: usize) -> f64 {
        self.correlation[(bin_a * FREQUENCY_RESOLUTION + bin_b) * CORRELATION_LAGS + lag]
    }

    /// Tempo match of `bin` at `bpm`, `None` outside the checked range
    pub fn tempo(&self, bin: usize, bpm: usize) -> Option<f64> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return None;
        }
        Some(self.tempo[bin * BPM_COUNT + bpm - MIN_BPM])
    }

    /// Best matching BPM of a bin and its score
    pub fn best_tempo(&self, bin: usize) -> (usize, f64) {
        let row = &self.tempo[bin * BPM_COUNT..(bin + 1) * BPM_COUNT];
        row.iter()
            .enumerate()
            .fold((MIN_BPM, f64::MIN), |best, (i, &score)| {
                if score > best.1 {
                    (MIN_BPM + i, score)
                } else {
                    best
                }
            })
    }
}

/// Mean product of the changes of two series, `series_b` shifted by `lag`,
/// relative to the average volume of `series_a`
pub fn correlation(series_a: &[f64], series_b: &[f64], lag: usize, average_a: f64) -> f64 {
    let len = series_a.len().min(series_b.len());
    if len < lag + 2 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 1..len - lag {
        let a = series_a[i] - series_a[i - 1];
        let b = series_b[i + lag] - series_b[i + lag - 1];
        sum += a * b;
    }

    let denominator = (len - lag - 1) as f64 * average_a;
    if denominator == 0.0 {
        0.0
    } else {
        sum / denominator
    }
}

/// Frames per beat at `bpm`
fn frames_per_beat(bpm: usize) -> f64 {
    TIME_RESOLUTION * 60.0 / bpm as f64
}

/// Peak-detection kernel one beat long: two 1s in the middle, the rest
/// sharing a weight of -1
pub fn peak_kernel(bpm: usize) -> Vec<f64> {
    let mut length = frames_per_beat(bpm).ceil() as usize;
    if length % 2 == 1 {
        length += 1;
    }
    let length = length.max(4);

    let mut kernel = vec![-1.0 / (length - 2) as f64; length];
    kernel[(length - 1) / 2] = 1.0;
    kernel[length / 2] = 1.0;
    kernel
}

/// Kernel response at every frame, 0 where the kernel would hang off an edge
fn peak_scores(series: &[f64], kernel: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0; series.len()];
    let half = kernel.len() / 2;
    if series.len() < kernel.len() {
        return result;
    }

    for i in half..series.len() - half {
        result[i] = kernel
            .iter()
            .enumerate()
            .map(|(j, k)| k * series[i + j - half])
            .sum();
    }
    result
}

fn interpolate(values: &[f64], index: f64) -> f64 {
    let bottom = index.floor() as usize;
    let top = index.ceil() as usize;
    values[bottom] + (values[top] - values[bottom]) * (index - bottom as f64)
}

/// How strongly a series pulses at `bpm`
pub fn tempo_match(series: &[f64], bpm: usize, average: f64) -> f64 {
    let len = series.len();
    if len < 2 || average == 0.0 {
        return 0.0;
    }

    let spacing = frames_per_beat(bpm);
    let kernel = peak_kernel(bpm);
    let scores = peak_scores(series, &kernel);

    let mut best = 0.0f64;
    for phase in 0..kernel.len() {
        let mut sum = 0.0;
        let mut position = phase as f64;
        while position < (len - 1) as f64 {
            sum += interpolate(&scores, position);
            position += spacing;
        }
        best = best.max(sum);
    }

    best * spacing / (len as f64 * average)
}

/// Correlation tensor and tempo matrix of a loudness matrix
pub fn extract(loudness: &SpectralMatrix, average_volume: &BinVector) -> TemporalProfile {
    log::debug!("Temporal: {} frames, {} lags", loudness.len(), CORRELATION_LAGS);

    let series: Vec<Vec<f64>> = (0..FREQUENCY_RESOLUTION)
        .map(|bin| loudness.bin_series(bin))
        .collect();

    let correlation: Vec<f64> = (0..FREQUENCY_RESOLUTION)
        .into_par_iter()
        .flat_map_iter(|a| {
            let series = &series;
            (0..FREQUENCY_RESOLUTION).flat_map(move |b| {
                (0..CORRELATION_LAGS)
                    .map(move |lag| correlation(&series[a], &series[b], lag, average_volume[a]))
            })
        })
        .collect();

    let tempo: Vec<f64> = (0..FREQUENCY_RESOLUTION)
        .into_par_iter()
        .flat_map_iter(|bin| {
            let series = &series;
            (MIN_BPM..=MAX_BPM).map(move |bpm| tempo_match(&series[bin], bpm, average_volume[bin]))
        })
        .collect();

    TemporalProfile { correlation, tempo }
}
