//! Container decoding via symphonia
//!
//! Turns an audio file (MP3, WAV, FLAC) into an [`AudioSignal`] of 16-bit
//! samples. Only the first two channels are kept apart; files with more than
//! two channels are rejected rather than downmixed.

use super::AudioSignal;
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Extensions the decoder is built for
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "wave", "flac"];

/// True if the path has one of [`SUPPORTED_EXTENSIONS`]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode a whole file into 16-bit PCM
pub fn decode_file(path: &Path) -> Result<AudioSignal> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode(format!("no audio track in {}", path.display())))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode(format!("unknown sample rate in {}", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("no decoder for {}: {}", path.display(), e)))?;

    let mut left: Vec<i16> = Vec::new();
    let mut right: Vec<i16> = Vec::new();
    let mut channel_count = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt frames are skipped, the rest of the stream is still usable
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        if channels == 0 || channels > 2 {
            return Err(Error::UnsupportedChannels(channels));
        }
        channel_count = channels;

        let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks(channels) {
            left.push(frame[0]);
            if channels == 2 {
                right.push(frame[1]);
            }
        }
    }

    let signal = if channel_count == 2 {
        AudioSignal::stereo(left, right, sample_rate)?
    } else {
        AudioSignal::mono(left, sample_rate)
    };
    if signal.is_empty() {
        return Err(Error::Decode(format!("no samples decoded from {}", path.display())));
    }

    log::info!(
        "Decoded {}: {} samples, {}Hz, {} channel(s), {:.1}s",
        path.display(),
        signal.len(),
        sample_rate,
        channel_count,
        signal.duration()
    );
    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(&PathBuf::from("song.mp3")));
        assert!(is_supported(&PathBuf::from("song.WAV")));
        assert!(is_supported(&PathBuf::from("/music/a/b.flac")));
        assert!(!is_supported(&PathBuf::from("notes.txt")));
        assert!(!is_supported(&PathBuf::from("no_extension")));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = decode_file(&PathBuf::from("/definitely/not/here.wav"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..800i16 {
            writer.write_sample(i).unwrap();
            writer.write_sample(-i).unwrap();
        }
        writer.finalize().unwrap();

        let signal = decode_file(&path).unwrap();
        assert!(signal.is_stereo());
        assert_eq!(signal.sample_rate(), 8000);
        assert_eq!(signal.len(), 800);
        let left = signal.channel(crate::audio::Channel::Left).unwrap();
        let right = signal.channel(crate::audio::Channel::Right).unwrap();
        assert_eq!(left[10], 10);
        assert_eq!(right[10], -10);
    }

    #[test]
    fn test_decode_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..1600 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();

        let signal = decode_file(&path).unwrap();
        assert!(!signal.is_stereo());
        assert_eq!(signal.len(), 1600);
        assert!((signal.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        hound::WavWriter::create(&path, spec).unwrap().finalize().unwrap();

        let result = decode_file(&path);
        assert!(matches!(result, Err(Error::Decode(_))), "got {:?}", result);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"this is not a riff header at all").unwrap();
        let result = decode_file(&path);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
