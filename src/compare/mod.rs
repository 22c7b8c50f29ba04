//! Fingerprint similarity
//!
//! # Hierarchical Difference
//!
//! Comparing two 120-bin vectors bin by bin misses shape: two profiles that
//! are each a little louder in different neighbouring bins look identical
//! once summed, and very different bin by bin. The hierarchical difference
//! scores both at once:
//!
//! ```text
//! level 0   |Σ a[0..120]  - Σ b[0..120]|^p
//! level 1   |Σ a[0..60]   - Σ b[0..60]|^p  + |Σ a[60..120] - Σ b[60..120]|^p   × decay/2
//! level 2   four quarters                                                      × (decay/2)^2
//! ...       down to single bins
//! ```
//!
//! Coarse differences (the overall tilt of the spectrum) dominate, fine ones
//! still count.
//!
//! # Score
//!
//! Each feature's difference is weighted and summed into an unbounded `D`,
//! then squashed into `[0, 1]`:
//!
//! ```text
//! score = 1 - (2/π)·atan(D)
//!
//!   D = 0     → 1.0  (identical)
//!   D = 1     → 0.5
//!   D → ∞     → 0.0
//! ```

use crate::fingerprint::{ChannelProfile, Feature, Profile};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::FRAC_2_PI;

/// Something two recordings can be compared by
///
/// Comparison is only defined between two fingerprints of the same type.
pub trait Fingerprint: Sync {
    /// Tuning for [`Fingerprint::similarity`]
    type Weights: Sync;

    /// Score in `[0, 1]`, exactly 1.0 for identical fingerprints and the same
    /// in both directions
    fn similarity(&self, other: &Self, weights: &Self::Weights) -> f64;
}

/// How much one feature counts, and how sharply large differences are
/// punished relative to small ones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub weight: f64,
    pub exponent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonWeights {
    #[serde(default = "default_volume")]
    pub volume: FeatureWeight,
    #[serde(default = "default_rise_fall")]
    pub rise: FeatureWeight,
    #[serde(default = "default_rise_fall")]
    pub fall: FeatureWeight,
    #[serde(default = "default_peak_ratio")]
    pub peak_ratio: FeatureWeight,
    #[serde(default = "default_peak_rate")]
    pub peak_rate: FeatureWeight,
    /// Weight of each finer level of the hierarchy relative to the one above
    #[serde(default = "default_recursion_decay")]
    pub recursion_decay: f64,
}

impl Default for ComparisonWeights {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            rise: default_rise_fall(),
            fall: default_rise_fall(),
            peak_ratio: default_peak_ratio(),
            peak_rate: default_peak_rate(),
            recursion_decay: default_recursion_decay(),
        }
    }
}

impl ComparisonWeights {
    pub fn for_feature(&self, feature: Feature) -> FeatureWeight {
        match feature {
            Feature::Volume => self.volume,
            Feature::Rise => self.rise,
            Feature::Fall => self.fall,
            Feature::PeakRatio => self.peak_ratio,
            Feature::PeakRate => self.peak_rate,
        }
    }
}

// Empirically tuned against a small reference library
fn default_volume() -> FeatureWeight { FeatureWeight { weight: 2e-8, exponent: 2.5 } }
fn default_rise_fall() -> FeatureWeight { FeatureWeight { weight: 2e-7, exponent: 1.5 } }
fn default_peak_ratio() -> FeatureWeight { FeatureWeight { weight: 1e-3, exponent: 2.0 } }
fn default_peak_rate() -> FeatureWeight { FeatureWeight { weight: 1e-4, exponent: 1.5 } }
fn default_recursion_decay() -> f64 { 0.75 }

/// Multi-scale difference between two equal-length vectors
///
/// Extra values in the longer vector are ignored.
pub fn hierarchical_difference(a: &[f64], b: &[f64], exponent: f64, decay: f64) -> f64 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    match len {
        0 => 0.0,
        1 => (a[0] - b[0]).abs().powf(exponent),
        _ => {
            let sum_a: f64 = a.iter().sum();
            let sum_b: f64 = b.iter().sum();
            let mut result = (sum_a - sum_b).abs().powf(exponent);

            let middle = (len + 1) / 2;
            let halves = hierarchical_difference(&a[..middle], &b[..middle], exponent, decay)
                + hierarchical_difference(&a[middle..], &b[middle..], exponent, decay);
            result += decay / 2.0 * halves;
            result
        }
    }
}

/// Squash an unbounded difference into a `[0, 1]` match score
pub fn match_score(difference: f64) -> f64 {
    1.0 - FRAC_2_PI * difference.atan()
}

/// Weighted difference summed over every feature of two channels
pub fn channel_difference(a: &ChannelProfile, b: &ChannelProfile, weights: &ComparisonWeights) -> f64 {
    Feature::ALL
        .iter()
        .map(|&feature| {
            let w = weights.for_feature(feature);
            w.weight
                * hierarchical_difference(
                    a.feature(feature),
                    b.feature(feature),
                    w.exponent,
                    weights.recursion_decay,
                )
        })
        .sum()
}

fn channel_score(a: &ChannelProfile, b: &ChannelProfile, weights: &ComparisonWeights) -> f64 {
    match_score(channel_difference(a, b, weights))
}

impl Fingerprint for Profile {
    type Weights = ComparisonWeights;

    /// Stereo against stereo pairs up the channels. Mono against stereo
    /// compares the mono channel with both sides.
    fn similarity(&self, other: &Self, weights: &ComparisonWeights) -> f64 {
        let (a, b) = (self.left(), other.left());
        match (self.right(), other.right()) {
            (Some(a_right), Some(b_right)) => {
                0.5 * channel_score(a, b, weights) + 0.5 * channel_score(a_right, b_right, weights)
            }
            (Some(a_right), None) => {
                0.5 * channel_score(a, b, weights) + 0.5 * channel_score(a_right, b, weights)
            }
            (None, Some(b_right)) => {
                0.5 * channel_score(a, b, weights) + 0.5 * channel_score(a, b_right, weights)
            }
            (None, None) => channel_score(a, b, weights),
        }
    }
}

/// A named fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct Track<F> {
    pub name: String,
    pub fingerprint: F,
}

impl<F> Track<F> {
    pub fn new(name: impl Into<String>, fingerprint: F) -> Self {
        Self {
            name: name.into(),
            fingerprint,
        }
    }
}

/// Score of one pair of tracks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub first: String,
    pub second: String,
    pub score: f64,
}

impl Comparison {
    fn between<F: Fingerprint>(a: &Track<F>, b: &Track<F>, weights: &F::Weights) -> Self {
        Self {
            first: a.name.clone(),
            second: b.name.clone(),
            score: a.fingerprint.similarity(&b.fingerprint, weights),
        }
    }

    pub fn involves(&self, name: &str) -> bool {
        self.first == name || self.second == name
    }
}

fn sort_descending(results: &mut [Comparison]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Every unordered pair of `tracks`, best match first
pub fn compare_all<F: Fingerprint>(tracks: &[Track<F>], weights: &F::Weights) -> Vec<Comparison> {
    let pairs: Vec<(usize, usize)> = (0..tracks.len())
        .flat_map(|i| (i + 1..tracks.len()).map(move |j| (i, j)))
        .collect();

    let mut results: Vec<Comparison> = pairs
        .par_iter()
        .map(|&(i, j)| Comparison::between(&tracks[i], &tracks[j], weights))
        .collect();
    sort_descending(&mut results);
    results
}

/// Every track of `tracks` against every track of `others`, best match first
pub fn compare_against<F: Fingerprint>(
    tracks: &[Track<F>],
    others: &[Track<F>],
    weights: &F::Weights,
) -> Vec<Comparison> {
    let mut results: Vec<Comparison> = tracks
        .par_iter()
        .flat_map_iter(|track| others.iter().map(move |other| Comparison::between(track, other, weights)))
        .collect();
    sort_descending(&mut results);
    results
}

/// The best and the worst match of every track that appears in `results`
///
/// At most two entries per track, fewer when they coincide or are shared with
/// another track. Best match first.
pub fn most_and_least_similar(results: &[Comparison]) -> Vec<Comparison> {
    let mut sorted = results.to_vec();
    sort_descending(&mut sorted);

    let mut names: Vec<&str> = Vec::new();
    for result in &sorted {
        for name in [result.first.as_str(), result.second.as_str()] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let mut keep = BTreeSet::new();
    for name in names {
        if let Some(best) = sorted.iter().position(|r| r.involves(name)) {
            keep.insert(best);
        }
        if let Some(worst) = sorted.iter().rposition(|r| r.involves(name)) {
            keep.insert(worst);
        }
    }

    keep.into_iter().map(|i| sorted[i].clone()).collect()
}
