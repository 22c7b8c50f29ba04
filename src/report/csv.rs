use crate::compare::Comparison;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, results: &[Comparison]) -> io::Result<()> {
    writeln!(writer, "first,second,score,match")?;
    for r in results {
        writeln!(
            writer,
            "{},{},{:.6},{}",
            escape(&r.first),
            escape(&r.second),
            r.score,
            super::percent(r.score)
        )?;
    }
    Ok(())
}

/// Quote a field if it holds a separator, a quote or a line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain.mp3"), "plain.mp3");
        assert_eq!(escape("Hello, World.mp3"), "\"Hello, World.mp3\"");
        assert_eq!(escape("12\" Mix.flac"), "\"12\"\" Mix.flac\"");
    }

    #[test]
    fn test_rows() {
        let results = vec![Comparison {
            first: "a.mp3".to_string(),
            second: "b, live.mp3".to_string(),
            score: 0.875,
        }];
        let mut buffer = Vec::new();
        write(&mut buffer, &results).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "a.mp3,\"b, live.mp3\",0.875000,87.50%");
    }
}
