//! Report generation for comparison results
//!
//! - **JSON**: machine-readable, with a summary block and a timestamp
//! - **CSV**: one row per compared pair, spreadsheet friendly
//!
//! # Usage
//!
//! ```ignore
//! use earprint::report;
//!
//! // Picks the format from the extension
//! report::generate("matches.json", &results)?;
//! report::generate("matches.csv", &results)?;
//! ```

pub mod csv;
pub mod json;

use crate::compare::Comparison;
use serde::Serialize;
use std::io;
use std::path::Path;

/// Write a report, JSON for `.json` and CSV for anything else
pub fn generate<P: AsRef<Path>>(path: P, results: &[Comparison]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, results),
        _ => csv::write(&mut file, results),
    }
}

/// Summary statistics for a batch of comparisons
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub tracks: usize,
    pub mean_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
}

impl Summary {
    pub fn from_results(results: &[Comparison]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let mut names: Vec<&str> = results
            .iter()
            .flat_map(|r| [r.first.as_str(), r.second.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();

        let scores = results.iter().map(|r| r.score);
        Self {
            total: results.len(),
            tracks: names.len(),
            mean_score: scores.clone().sum::<f64>() / results.len() as f64,
            best_score: scores.clone().fold(f64::MIN, f64::max),
            worst_score: scores.fold(f64::MAX, f64::min),
        }
    }
}

/// Score as a match percentage, `0.8734` → `"87.34%"`
pub fn percent(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(first: &str, second: &str, score: f64) -> Comparison {
        Comparison {
            first: first.to_string(),
            second: second.to_string(),
            score,
        }
    }

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================
    //
    // The summary goes at the top of JSON reports and at the end of the CLI
    // output: how many pairs, how many distinct tracks, and the score spread.
    // ==========================================================================

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_results(&[]);
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_summary_mixed() {
        let results = vec![
            comparison("a", "b", 0.9),
            comparison("a", "c", 0.5),
            comparison("b", "c", 0.1),
        ];
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.tracks, 3);
        assert!((summary.mean_score - 0.5).abs() < 1e-12);
        assert_eq!(summary.best_score, 0.9);
        assert_eq!(summary.worst_score, 0.1);
    }

    #[test]
    fn test_summary_counts_self_comparison_once() {
        let summary = Summary::from_results(&[comparison("a", "a", 1.0)]);
        assert_eq!(summary.tracks, 1);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.87341), "87.34%");
        assert_eq!(percent(1.0), "100.00%");
    }

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![comparison("a.mp3", "b.mp3", 0.75)];

        let json_path = dir.path().join("out.JSON");
        generate(&json_path, &results).unwrap();
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert!(json.trim_start().starts_with('{'));

        let csv_path = dir.path().join("out.csv");
        generate(&csv_path, &results).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("first,second,score,match"));
    }
}
