//! Fingerprint data and its on-disk record
//!
//! A [`Profile`] is one or two [`ChannelProfile`]s, each holding five
//! 120-value vectors (one value per frequency bin). Profiles are built once by
//! the analyzer and then only read.
//!
//! # Record Layout
//!
//! Plain text, one value per line:
//!
//! ```text
//! Stereo            <- or "Mono"
//! 41.27             <- left volume, bin 0
//! ...                  (120 lines)
//! 0.0031            <- left rise, bin 0
//! ...                  (rise, fall, peak ratio, peak rate: 120 lines each)
//! 39.80             <- right volume, bin 0 (stereo only)
//! ...
//! ```
//!
//! Mono records are 601 lines, stereo 1201. Temporal data is never written.

pub mod library;

use crate::analyzer::temporal::TemporalProfile;
use crate::analyzer::transform::FREQUENCY_RESOLUTION;
use crate::audio::Channel;
use crate::error::{Error, Result};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

/// One value per frequency bin
pub type BinVector = [f64; FREQUENCY_RESOLUTION];

/// The per-bin vectors of a channel, in record order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Volume,
    Rise,
    Fall,
    PeakRatio,
    PeakRate,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Volume,
        Feature::Rise,
        Feature::Fall,
        Feature::PeakRatio,
        Feature::PeakRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Volume => "volume",
            Feature::Rise => "rise",
            Feature::Fall => "fall",
            Feature::PeakRatio => "peak_ratio",
            Feature::PeakRate => "peak_rate",
        }
    }
}

/// Lines of one channel in a record
const CHANNEL_LINES: usize = Feature::ALL.len() * FREQUENCY_RESOLUTION;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProfile {
    pub volume: BinVector,
    pub rise: BinVector,
    pub fall: BinVector,
    pub peak_ratio: BinVector,
    pub peak_rate: BinVector,
    /// Only present when temporal analysis was requested; not persisted
    pub temporal: Option<TemporalProfile>,
}

impl ChannelProfile {
    /// All-zero profile, what silence analyzes to
    pub fn silent() -> Self {
        Self {
            volume: [0.0; FREQUENCY_RESOLUTION],
            rise: [0.0; FREQUENCY_RESOLUTION],
            fall: [0.0; FREQUENCY_RESOLUTION],
            peak_ratio: [0.0; FREQUENCY_RESOLUTION],
            peak_rate: [0.0; FREQUENCY_RESOLUTION],
            temporal: None,
        }
    }

    pub fn feature(&self, feature: Feature) -> &BinVector {
        match feature {
            Feature::Volume => &self.volume,
            Feature::Rise => &self.rise,
            Feature::Fall => &self.fall,
            Feature::PeakRatio => &self.peak_ratio,
            Feature::PeakRate => &self.peak_rate,
        }
    }

    fn feature_mut(&mut self, feature: Feature) -> &mut BinVector {
        match feature {
            Feature::Volume => &mut self.volume,
            Feature::Rise => &mut self.rise,
            Feature::Fall => &mut self.fall,
            Feature::PeakRatio => &mut self.peak_ratio,
            Feature::PeakRate => &mut self.peak_rate,
        }
    }
}

/// Perceptual fingerprint of a recording
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    left: ChannelProfile,
    right: Option<ChannelProfile>,
}

impl Profile {
    pub fn mono(channel: ChannelProfile) -> Self {
        Self {
            left: channel,
            right: None,
        }
    }

    pub fn stereo(left: ChannelProfile, right: ChannelProfile) -> Self {
        Self {
            left,
            right: Some(right),
        }
    }

    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    pub fn left(&self) -> &ChannelProfile {
        &self.left
    }

    pub fn right(&self) -> Option<&ChannelProfile> {
        self.right.as_ref()
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelProfile> {
        match channel {
            Channel::Left => Some(&self.left),
            Channel::Right => self.right.as_ref(),
        }
    }

    fn channels(&self) -> impl Iterator<Item = &ChannelProfile> {
        std::iter::once(&self.left).chain(self.right.iter())
    }

    /// Write the text record
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        writeln!(writer, "{}", if self.is_stereo() { "Stereo" } else { "Mono" })?;
        for channel in self.channels() {
            for feature in Feature::ALL {
                for value in channel.feature(feature) {
                    writeln!(writer, "{}", value)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse a text record
    ///
    /// Fails with [`Error::MalformedRecord`] on an unknown header, a value
    /// that is not a finite float, text that is not UTF-8, or a line count that
    /// does not match the header.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = next_line(&mut lines, 1, 1 + CHANNEL_LINES)?.unwrap_or_default();
        let stereo = match header.trim() {
            "Stereo" => true,
            "Mono" => false,
            other => {
                return Err(Error::MalformedRecord {
                    line: 1,
                    expected_lines: 1 + CHANNEL_LINES,
                    reason: format!("unknown header {:?}", other),
                })
            }
        };
        let channel_count = if stereo { 2 } else { 1 };
        let expected_lines = 1 + channel_count * CHANNEL_LINES;
        let malformed = |line: usize, reason: String| Error::MalformedRecord {
            line,
            expected_lines,
            reason,
        };

        let mut line_number = 1;
        let mut channels = Vec::with_capacity(channel_count);
        for _ in 0..channel_count {
            let mut channel = ChannelProfile::silent();
            for feature in Feature::ALL {
                for slot in channel.feature_mut(feature).iter_mut() {
                    line_number += 1;
                    let line = next_line(&mut lines, line_number, expected_lines)?
                        .ok_or_else(|| malformed(line_number, "record ends early".to_string()))?;
                    let value = line.trim().parse::<f64>().map_err(|e| {
                        malformed(line_number, format!("{:?} is not a number: {}", line.trim(), e))
                    })?;
                    if !value.is_finite() {
                        return Err(malformed(line_number, "not a finite number".to_string()));
                    }
                    *slot = value;
                }
            }
            channels.push(channel);
        }

        while let Some(line) = next_line(&mut lines, line_number + 1, expected_lines)? {
            line_number += 1;
            if !line.trim().is_empty() {
                return Err(malformed(
                    line_number,
                    "unexpected data after the last value".to_string(),
                ));
            }
        }

        let mut channels = channels.into_iter();
        let left = channels.next().unwrap_or_else(ChannelProfile::silent);
        Ok(Self {
            left,
            right: channels.next(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}

/// Next record line; text that is not UTF-8 is a malformed record, not an I/O failure
fn next_line<R: BufRead>(
    lines: &mut Lines<R>,
    line: usize,
    expected_lines: usize,
) -> Result<Option<String>> {
    match lines.next() {
        None => Ok(None),
        Some(Ok(text)) => Ok(Some(text)),
        Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => Err(Error::MalformedRecord {
            line,
            expected_lines,
            reason: "not valid UTF-8".to_string(),
        }),
        Some(Err(e)) => Err(e.into()),
    }
}
