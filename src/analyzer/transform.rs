//! Constant-Q spectral transform
//!
//! Turns 16-bit PCM samples into a time/frequency amplitude matrix with 120
//! logarithmically spaced frequency bins and 20 output frames per second.
//!
//! # How the Constant-Q Transform Works
//!
//! A plain FFT uses one window length for every frequency, so every bin is the
//! same number of Hz wide. Music is organized in octaves, not Hz: the gap
//! between two bass notes is a few Hz, between two treble notes hundreds.
//! The constant-Q transform gives every bin the same width *relative to its
//! frequency*:
//!
//! ```text
//! Bin    | Frequency | Window (44.1kHz) | Bandwidth
//! -------|-----------|------------------|----------
//!   0    |     20 Hz |  22050 samples   |    2 Hz
//!  60    |    640 Hz |    690 samples   |   64 Hz
//! 119    | 19,330 Hz |     23 samples   | 1,933 Hz
//! ```
//!
//! 120 bins over 10 octaves is 12 bins per octave, one per semitone.
//!
//! ## Per-bin correlation
//!
//! For every output frame and bin, the signal around the frame center is
//! multiplied by a Nuttall-windowed cosine and sine at the bin frequency and
//! summed. The magnitude of that complex sum divided by the window length is
//! the amplitude. A full-scale sine lands at half its peak amplitude in its
//! bin.
//!
//! ## Edges
//!
//! Low bins use windows up to half a second long, so frames near the start or
//! end read past the signal. Those reads are mirrored back inside the signal
//! and sign-inverted (odd reflection), which keeps the waveform continuous
//! through the edge instead of introducing a step.
//!
//! ## Parallelism
//!
//! Frames are independent of each other. The frame range is split in half
//! recursively with `rayon::join` until a range covers at most one second of
//! output, computed sequentially, and the halves are concatenated in order.

use crate::error::{Error, Result};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::OnceLock;

/// Output frames per second of audio
pub const TIME_RESOLUTION: f64 = 20.0;
/// Number of frequency bins (10 octaves * 12 notes per octave)
pub const FREQUENCY_RESOLUTION: usize = 120;
/// Lowest audible pitch in Hz
pub const BOTTOM_FREQUENCY: f64 = 20.0;
/// Slightly over the highest audible pitch, a convenient 20 * 2^10
pub const TOP_FREQUENCY: f64 = 20480.0;
const TOP_BOTTOM_RATIO: f64 = TOP_FREQUENCY / BOTTOM_FREQUENCY;

/// Filter width of the bottom bin in Hz. Smaller means less leaking between
/// bins but longer windows.
const BOTTOM_FILTER_WIDTH: f64 = 2.0;

/// Entries per full cycle in the sine lookup table. Higher is more accurate
/// but uses more memory (10000 entries = 80kB).
pub const ANGLE_RESOLUTION: usize = 10000;

/// Frame ranges at or below this many frames (one second) are not split
const SEQUENTIAL_THRESHOLD: usize = TIME_RESOLUTION as usize;

// Nuttall window coefficients
const WINDOW_A0: f64 = 0.355768;
const WINDOW_A1: f64 = 0.4891775;
const WINDOW_A2: f64 = 0.1365995;
const WINDOW_A3: f64 = 0.0106411;

/// One output frame: a value per frequency bin
pub type Frame = [f64; FREQUENCY_RESOLUTION];

/// Time/frequency matrix, indexed `[frame][bin]`
///
/// Holds raw amplitudes straight out of [`transform`] and perceived loudness
/// after normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralMatrix {
    frames: Vec<Frame>,
}

impl SpectralMatrix {
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Seconds of audio covered by the matrix
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / TIME_RESOLUTION
    }

    /// Values of one frequency bin over time
    pub fn bin_series(&self, bin: usize) -> Vec<f64> {
        self.frames.iter().map(|frame| frame[bin]).collect()
    }

    /// Mean over every cell, 0 for an empty matrix
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.frames.iter().flat_map(|frame| frame.iter()).sum();
        sum / (self.frames.len() * FREQUENCY_RESOLUTION) as f64
    }

    /// New matrix with `f(bin, value)` applied to every cell
    pub fn map<F>(&self, f: F) -> SpectralMatrix
    where
        F: Fn(usize, f64) -> f64,
    {
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                let mut out = [0.0; FREQUENCY_RESOLUTION];
                for (bin, value) in frame.iter().enumerate() {
                    out[bin] = f(bin, *value);
                }
                out
            })
            .collect();
        SpectralMatrix { frames }
    }
}

/// Center frequency of a bin in Hz
pub fn frequency_at_bin(bin: usize) -> f64 {
    BOTTOM_FREQUENCY * TOP_BOTTOM_RATIO.powf(bin as f64 / FREQUENCY_RESOLUTION as f64)
}

fn filter_width(bin: usize) -> f64 {
    BOTTOM_FILTER_WIDTH * TOP_BOTTOM_RATIO.powf(bin as f64 / FREQUENCY_RESOLUTION as f64)
}

/// Window length in samples for a bin, shrinking as frequency rises
pub fn window_length(bin: usize, sample_rate: u32) -> usize {
    (sample_rate as f64 / filter_width(bin)).ceil() as usize
}

/// Output frames for a signal of `duration` seconds
pub fn frame_count(duration: f64) -> usize {
    (TIME_RESOLUTION * duration) as usize
}

fn sine_table() -> &'static [f64] {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        (0..ANGLE_RESOLUTION)
            .map(|i| (TAU * i as f64 / ANGLE_RESOLUTION as f64).sin())
            .collect()
    })
}

/// Table-driven sine for non-negative angles
fn fast_sin(radians: f64) -> f64 {
    let index = (radians * ANGLE_RESOLUTION as f64 / TAU) as usize % ANGLE_RESOLUTION;
    sine_table()[index]
}

fn fast_cos(radians: f64) -> f64 {
    fast_sin(radians + FRAC_PI_2)
}

/// Nuttall window value at `index` of a window `length` samples long,
/// scaled so the window averages to 1
pub fn window(index: usize, length: usize) -> f64 {
    let angle = TAU * index as f64 / length as f64;
    (WINDOW_A0 - WINDOW_A1 * fast_cos(angle) + WINDOW_A2 * fast_cos(2.0 * angle)
        - WINDOW_A3 * fast_cos(3.0 * angle))
        / WINDOW_A0
}

/// Sample at `index`, reading past either edge by odd reflection
///
/// `-1` reads `-samples[1]`, `len` reads `-samples[len - 2]`. Reads more than
/// a full signal length out keep folding back in.
pub fn mirror_bounds(samples: &[i16], index: i64) -> f64 {
    let len = samples.len() as i64;
    if len == 0 {
        return 0.0;
    }

    let mut index = index;
    let mut sign = 1.0;
    while index < 0 || index >= len {
        if len < 2 {
            return 0.0;
        }
        index = if index < 0 { -index } else { 2 * len - index - 2 };
        sign = -sign;
    }

    sign * samples[index as usize] as f64
}

/// Windowed quadrature kernel of one frequency bin
#[derive(Debug, Clone)]
struct Kernel {
    cosines: Vec<f64>,
    sines: Vec<f64>,
}

impl Kernel {
    fn new(bin: usize, sample_rate: u32) -> Self {
        let length = window_length(bin, sample_rate);
        let step = TAU * frequency_at_bin(bin) / sample_rate as f64;

        let mut cosines = Vec::with_capacity(length);
        let mut sines = Vec::with_capacity(length);
        for k in 0..length {
            let w = window(k, length);
            let angle = k as f64 * step;
            cosines.push(w * fast_cos(angle));
            sines.push(w * fast_sin(angle));
        }

        Self { cosines, sines }
    }

    fn len(&self) -> usize {
        self.cosines.len()
    }

    /// Amplitude of the signal at this bin for a window starting at `start`
    fn amplitude(&self, samples: &[i16], start: i64) -> f64 {
        let length = self.len();
        let mut real = 0.0;
        let mut imag = 0.0;

        let inside = start >= 0 && start + length as i64 <= samples.len() as i64;
        if inside {
            let window = &samples[start as usize..start as usize + length];
            for ((&s, c), s_k) in window.iter().zip(&self.cosines).zip(&self.sines) {
                let s = s as f64;
                real += c * s;
                imag += s_k * s;
            }
        } else {
            for k in 0..length {
                let s = mirror_bounds(samples, start + k as i64);
                real += self.cosines[k] * s;
                imag += self.sines[k] * s;
            }
        }

        (real * real + imag * imag).sqrt() / length as f64
    }
}

/// Shared read-only state for one transform run
struct Plan<'a> {
    samples: &'a [i16],
    kernels: Vec<Kernel>,
    samples_per_frame: f64,
}

impl Plan<'_> {
    /// Frames `start..end`, split recursively across the rayon pool
    fn compute(&self, start: usize, end: usize) -> Vec<Frame> {
        if end - start <= SEQUENTIAL_THRESHOLD {
            return self.compute_sequential(start, end);
        }

        let middle = start + (end - start) / 2;
        let (mut first, second) = rayon::join(
            || self.compute(start, middle),
            || self.compute(middle, end),
        );
        first.extend(second);
        first
    }

    fn compute_sequential(&self, start: usize, end: usize) -> Vec<Frame> {
        let mut result = vec![[0.0; FREQUENCY_RESOLUTION]; end - start];

        for (bin, kernel) in self.kernels.iter().enumerate() {
            let half = (kernel.len() / 2) as i64;
            for frame in start..end {
                let center = (frame as f64 * self.samples_per_frame) as i64;
                result[frame - start][bin] = kernel.amplitude(self.samples, center - half);
            }
        }

        result
    }
}

/// Constant-Q transform of one channel into `frame_count` frames
///
/// Fails with [`Error::InputTooShort`] when the signal is shorter than one
/// output frame.
pub fn transform(samples: &[i16], sample_rate: u32, frame_count: usize) -> Result<SpectralMatrix> {
    let minimum_secs = 1.0 / TIME_RESOLUTION;
    let duration_secs = if sample_rate == 0 {
        0.0
    } else {
        samples.len() as f64 / sample_rate as f64
    };
    if duration_secs < minimum_secs || frame_count == 0 {
        return Err(Error::InputTooShort {
            duration_secs,
            minimum_secs,
        });
    }

    let plan = Plan {
        samples,
        kernels: (0..FREQUENCY_RESOLUTION)
            .map(|bin| Kernel::new(bin, sample_rate))
            .collect(),
        samples_per_frame: samples.len() as f64 / frame_count as f64,
    };

    Ok(SpectralMatrix::from_frames(plan.compute(0, frame_count)))
}
