use super::Summary;
use crate::compare::Comparison;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    summary: Summary,
    comparisons: &'a [Comparison],
}

pub fn write<W: Write>(writer: &mut W, results: &[Comparison]) -> io::Result<()> {
    let report = Report {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_results(results),
        comparisons: results,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_structure() {
        let results = vec![
            Comparison {
                first: "a.mp3".to_string(),
                second: "b.flac".to_string(),
                score: 0.5,
            },
            Comparison {
                first: "a.mp3".to_string(),
                second: "c.wav".to_string(),
                score: 0.25,
            },
        ];
        let mut buffer = Vec::new();
        write(&mut buffer, &results).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["tracks"], 3);
        assert_eq!(value["comparisons"][0]["second"], "b.flac");
        assert_eq!(value["comparisons"][1]["score"], 0.25);
        assert!(value["generated_at"].as_str().is_some());
    }
}
