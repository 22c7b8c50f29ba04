//! End-to-end: samples and WAV files in, fingerprints and scores out

use earprint::{
    compare_all, most_and_least_similar, Analyzer, AudioSignal, ComparisonWeights, Fingerprint,
    Library, Profile, Track,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::path::Path;

const SAMPLE_RATE: u32 = 22050;

/// Two tones over a bed of noise, `seconds` long
fn music(seconds: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..(SAMPLE_RATE as f64 * seconds) as usize)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            // 2 Hz tremolo gives the bins something to rise and fall with
            let tremolo = 0.6 + 0.4 * (TAU * 2.0 * t).sin();
            tremolo * (6000.0 * (TAU * 220.0 * t).sin() + 3000.0 * (TAU * 660.0 * t).sin())
                + rng.gen_range(-1500.0..1500.0)
        })
        .collect()
}

fn to_pcm(samples: &[f64], gain: f64) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s * gain).round().clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect()
}

fn analyze(samples: Vec<i16>) -> Profile {
    Analyzer::new()
        .analyze(&AudioSignal::mono(samples, SAMPLE_RATE))
        .unwrap()
}

fn score(a: &Profile, b: &Profile) -> f64 {
    a.similarity(b, &ComparisonWeights::default())
}

fn write_wav(path: &Path, left: &[i16], right: Option<&[i16]>) {
    let spec = hound::WavSpec {
        channels: if right.is_some() { 2 } else { 1 },
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for (i, &sample) in left.iter().enumerate() {
        writer.write_sample(sample).unwrap();
        if let Some(right) = right {
            writer.write_sample(right[i]).unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn test_monotonic_degradation() {
    let source = music(2.0, 1);
    let base = analyze(to_pcm(&source, 1.0));

    // Mild: a little extra hiss. Heavy: a loud 3 kHz whistle on top.
    let mut rng = StdRng::seed_from_u64(99);
    let mild: Vec<f64> = source.iter().map(|s| s + rng.gen_range(-300.0..300.0)).collect();
    let heavy: Vec<f64> = source
        .iter()
        .enumerate()
        .map(|(i, s)| s + 12000.0 * (TAU * 3000.0 * i as f64 / SAMPLE_RATE as f64).sin())
        .collect();

    let mild_score = score(&base, &analyze(to_pcm(&mild, 1.0)));
    let heavy_score = score(&base, &analyze(to_pcm(&heavy, 1.0)));
    assert!(
        mild_score > heavy_score,
        "mild {} should beat heavy {}",
        mild_score,
        heavy_score
    );
}

#[test]
fn test_level_change_beats_different_content() {
    let source = music(2.0, 2);
    let loud = analyze(to_pcm(&source, 1.0));
    let quiet = analyze(to_pcm(&source, 0.25));

    let other: Vec<f64> = (0..source.len())
        .map(|i| 8000.0 * (TAU * 1500.0 * i as f64 / SAMPLE_RATE as f64).sin())
        .collect();
    let different = analyze(to_pcm(&other, 1.0));

    assert!(score(&loud, &quiet) > score(&loud, &different));
}

#[test]
fn test_silence_of_any_length_matches() {
    let short = analyze(vec![0; SAMPLE_RATE as usize / 2]);
    let long = analyze(vec![0; SAMPLE_RATE as usize * 3]);
    assert_eq!(score(&short, &long), 1.0);
}

#[test]
fn test_reflexive_and_symmetric_on_real_profiles() {
    let a = analyze(to_pcm(&music(1.0, 3), 1.0));
    let b = analyze(to_pcm(&music(1.0, 4), 0.5));
    assert_eq!(score(&a, &a), 1.0);
    assert_eq!(score(&a, &b), score(&b, &a));
    let s = score(&a, &b);
    assert!((0.0..=1.0).contains(&s));
}

#[test]
fn test_files_through_library() {
    let dir = tempfile::tempdir().unwrap();
    let library = Library::open(dir.path().join("library")).unwrap();
    let analyzer = Analyzer::new();

    let left = to_pcm(&music(1.0, 5), 1.0);
    let right = to_pcm(&music(1.0, 6), 1.0);
    let stereo_path = dir.path().join("stereo.wav");
    let mono_path = dir.path().join("mono.wav");
    write_wav(&stereo_path, &left, Some(&right));
    write_wav(&mono_path, &left, None);

    let stereo = library.load_or_analyze(&stereo_path, &analyzer).unwrap();
    let mono = library.load_or_analyze(&mono_path, &analyzer).unwrap();
    assert!(stereo.is_stereo());
    assert!(!mono.is_stereo());

    // Mono is scored against both sides; the shared left side alone is worth 0.5
    assert_eq!(stereo.left(), mono.left());
    assert!(score(&mono, &stereo) > 0.5);

    // Second run comes from the saved records
    std::fs::remove_file(&stereo_path).unwrap();
    assert_eq!(library.load_or_analyze(&stereo_path, &analyzer).unwrap(), stereo);

    let saved = library.list_saved().unwrap();
    assert_eq!(saved.len(), 2);
    let results = compare_all(&saved, &ComparisonWeights::default());
    assert_eq!(results.len(), 1);
    assert_eq!(most_and_least_similar(&results).len(), 1);
}

#[test]
fn test_batch_ranking() {
    let source = music(1.0, 7);
    let tracks = vec![
        Track::new("original", analyze(to_pcm(&source, 1.0))),
        Track::new("quieter", analyze(to_pcm(&source, 0.5))),
        Track::new("other", analyze(to_pcm(&music(1.0, 8), 1.0).iter().rev().copied().collect())),
    ];
    let results = compare_all(&tracks, &ComparisonWeights::default());
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
}
