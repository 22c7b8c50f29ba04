//! Raw PCM input for the analysis pipeline
//!
//! The pipeline never parses container formats itself. It consumes an
//! [`AudioSignal`]: one or two channels of 16-bit signed samples plus the
//! sample rate. [`decode`] is a thin adapter that produces one from a file.

pub mod decode;

use crate::error::{Error, Result};

/// Left or right ear. Mono signals only have `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

/// Decoded audio, immutable once built
#[derive(Debug, Clone)]
pub struct AudioSignal {
    left: Vec<i16>,
    right: Option<Vec<i16>>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn mono(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            left: samples,
            right: None,
            sample_rate,
        }
    }

    /// Both channels must hold the same number of samples.
    pub fn stereo(left: Vec<i16>, right: Vec<i16>, sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::Decode(format!(
                "stereo channels differ in length ({} vs {})",
                left.len(),
                right.len()
            )));
        }
        Ok(Self {
            left,
            right: Some(right),
            sample_rate,
        })
    }

    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    /// Samples of one channel. Asking a mono signal for `Right` returns `None`.
    pub fn channel(&self, channel: Channel) -> Option<&[i16]> {
        match channel {
            Channel::Left => Some(&self.left),
            Channel::Right => self.right.as_deref(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.left.len() as f64 / self.sample_rate as f64
    }
}
