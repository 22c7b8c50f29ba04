//! Directory of saved fingerprints
//!
//! Each analyzed file gets one record named after the file and keyed by its
//! full path: `/music/a/song.mp3` is stored as
//! `<library>/song.mp3.<key>.earprint`, where `<key>` is the start of the
//! SHA-256 of the absolute path. Files with the same name in different
//! directories get different records. Re-analyzing a file whose record loads
//! is skipped.

use super::Profile;
use crate::analyzer::Analyzer;
use crate::compare::Track;
use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File extension of saved records
pub const RECORD_EXTENSION: &str = "earprint";

/// Hex digits of the path digest kept in a record name
const KEY_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
}

impl Library {
    /// Open a library, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the record for an audio file lives
    pub fn record_path(&self, audio_path: &Path) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{}",
            track_name(audio_path),
            path_key(audio_path),
            RECORD_EXTENSION
        ))
    }

    /// Write the record next to its final name, then rename it into place
    pub fn save(&self, audio_path: &Path, profile: &Profile) -> Result<PathBuf> {
        let path = self.record_path(audio_path);
        let partial = path.with_extension(format!("{}.partial", RECORD_EXTENSION));
        profile.save(&partial)?;
        std::fs::rename(&partial, &path)?;
        log::debug!("Saved fingerprint to {}", path.display());
        Ok(path)
    }

    pub fn load(&self, audio_path: &Path) -> Result<Profile> {
        Profile::load(&self.record_path(audio_path))
    }

    /// Saved fingerprint if one loads, otherwise analyze and save
    ///
    /// A record that exists but fails to load is logged and replaced.
    pub fn load_or_analyze(&self, audio_path: &Path, analyzer: &Analyzer) -> Result<Profile> {
        let record = self.record_path(audio_path);
        if record.exists() {
            match Profile::load(&record) {
                Ok(profile) => {
                    log::info!("Loaded saved fingerprint for {}", audio_path.display());
                    return Ok(profile);
                }
                Err(e) => log::warn!(
                    "Could not load {}, analyzing again: {}",
                    record.display(),
                    e
                ),
            }
        }

        let profile = analyzer.analyze_file(audio_path)?;
        self.save(audio_path, &profile)?;
        Ok(profile)
    }

    /// Every record in the library, sorted by name
    ///
    /// Records that fail to load are logged and left out.
    pub fn list_saved(&self) -> Result<Vec<Track<Profile>>> {
        let mut tracks = Vec::new();

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => display_name(stem).to_string(),
                None => continue,
            };

            match Profile::load(&path) {
                Ok(profile) => tracks.push(Track::new(name, profile)),
                Err(e) => log::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }

        tracks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tracks)
    }
}

/// Display name of an audio file, its file name with extension
pub fn track_name(audio_path: &Path) -> String {
    audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| audio_path.display().to_string())
}

/// Stable key of an audio file's location
///
/// Keyed on the absolute path without touching the file, so a record still
/// resolves after the audio it came from has been deleted.
fn path_key(audio_path: &Path) -> String {
    let path = std::path::absolute(audio_path).unwrap_or_else(|_| audio_path.to_path_buf());
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut key = format!("{:x}", digest);
    key.truncate(KEY_LEN);
    key
}

/// Record stem without its path key, `song.mp3.0123abcd...` -> `song.mp3`
fn display_name(stem: &str) -> &str {
    match stem.rsplit_once('.') {
        Some((name, key)) if key.len() == KEY_LEN && key.chars().all(|c| c.is_ascii_hexdigit()) => {
            name
        }
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::ChannelProfile;

    fn profile(level: f64) -> Profile {
        let mut channel = ChannelProfile::silent();
        channel.volume = [level; 120];
        Profile::mono(channel)
    }

    fn write_wav(path: &Path, seconds: f64, frequency: f64) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(8000.0 * seconds) as usize {
            let t = i as f64 / 8000.0;
            writer
                .write_sample((6000.0 * (std::f64::consts::TAU * frequency * t).sin()) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }

    // ==========================================================================
    // RECORD NAMING TESTS
    // ==========================================================================
    //
    // Records carry the file name for people and a digest of the full path for
    // uniqueness. Two `song.wav` files in different folders must never share
    // a record, or the second would be served the first one's fingerprint.
    // ==========================================================================

    #[test]
    fn test_record_path() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path().join("lib")).unwrap();
        assert!(library.dir().is_dir());

        let record = library.record_path(Path::new("/music/album/song.mp3"));
        assert_eq!(record.parent(), Some(dir.path().join("lib").as_path()));
        let file_name = record.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("song.mp3."));
        assert!(file_name.ends_with(".earprint"));
        assert_eq!(file_name.len(), "song.mp3.".len() + KEY_LEN + ".earprint".len());

        // Same path, same record
        assert_eq!(record, library.record_path(Path::new("/music/album/song.mp3")));
    }

    #[test]
    fn test_same_name_different_directories() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path().join("lib")).unwrap();
        let analyzer = Analyzer::new();

        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        let low = dir.path().join("a").join("song.wav");
        let high = dir.path().join("b").join("song.wav");
        write_wav(&low, 1.0, 200.0);
        write_wav(&high, 1.0, 3000.0);

        assert_ne!(library.record_path(&low), library.record_path(&high));

        let low_profile = library.load_or_analyze(&low, &analyzer).unwrap();
        let high_profile = library.load_or_analyze(&high, &analyzer).unwrap();
        assert_ne!(low_profile, high_profile);
        assert_eq!(high_profile, analyzer.analyze_file(&high).unwrap());

        // Both records are listed under the readable name
        let saved = library.list_saved().unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|t| t.name == "song.wav"));
    }

    #[test]
    fn test_save_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path()).unwrap();
        let record = library.save(Path::new("a.mp3"), &profile(1.0)).unwrap();

        let files: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files, vec![record]);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("song.mp3.0123456789abcdef"), "song.mp3");
        // Not a key: wrong length or not hex
        assert_eq!(display_name("song.mp3"), "song.mp3");
        assert_eq!(display_name("live.set.0123456789abcdeg"), "live.set.0123456789abcdeg");
    }

    #[test]
    fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path()).unwrap();
        library.save(Path::new("b.wav"), &profile(2.0)).unwrap();
        library.save(Path::new("a.mp3"), &profile(1.0)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a record").unwrap();
        std::fs::write(dir.path().join("broken.wav.earprint"), "Mono\n1\n").unwrap();

        assert_eq!(library.load(Path::new("a.mp3")).unwrap(), profile(1.0));

        let saved = library.list_saved().unwrap();
        let names: Vec<&str> = saved.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a.mp3", "b.wav"]);
        assert_eq!(saved[1].fingerprint, profile(2.0));
    }

    #[test]
    fn test_load_or_analyze_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path().join("lib")).unwrap();
        // The audio file does not exist, so only the cache can answer
        let audio = dir.path().join("missing.wav");
        library.save(&audio, &profile(3.0)).unwrap();

        let loaded = library.load_or_analyze(&audio, &Analyzer::new()).unwrap();
        assert_eq!(loaded, profile(3.0));
    }

    #[test]
    fn test_load_or_analyze_replaces_broken_record() {
        let dir = tempfile::tempdir().unwrap();
        let library = Library::open(dir.path().join("lib")).unwrap();
        let audio = dir.path().join("tone.wav");
        write_wav(&audio, 0.5, 440.0);
        std::fs::write(library.record_path(&audio), "garbage").unwrap();

        let profile = library.load_or_analyze(&audio, &Analyzer::new()).unwrap();
        assert_eq!(library.load(&audio).unwrap(), profile);
    }

    #[test]
    fn test_track_name() {
        assert_eq!(track_name(Path::new("/a/b/song.flac")), "song.flac");
    }
}
