use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::Record;

/// Parse a newline-delimited JSON record stream, ignoring blank and comment
/// lines. An empty stream is legitimate and decodes to no records.
pub fn parse_records(text: &str) -> Result<Vec<Record>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: Record = serde_json::from_str(trimmed)
            .with_context(|| format!("line {} is not a record: {}", idx + 1, trimmed))?;
        out.push(record);
    }
    Ok(out)
}

/// Read a newline-delimited JSON record stream from disk.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_records(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EventKind;

    #[test]
    fn parses_records_and_skips_noise() {
        let text = "\
# treadmill warmup
{\"type\":\"telemetry\",\"heart_rate\":62}

{\"type\":\"event\",\"kind\":\"start\"}
{\"type\":\"hrv\",\"rr_s\":[0.8,null,0.81]}
";
        let records = parse_records(text).unwrap();
        assert_eq!(records.len(), 3);
        match &records[1] {
            Record::Event { kind } => assert_eq!(*kind, EventKind::Start),
            other => panic!("unexpected record {other:?}"),
        }
        match &records[2] {
            Record::Hrv { rr_s } => assert_eq!(rr_s, &vec![Some(0.8), None, Some(0.81)]),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let text = "{\"type\":\"event\",\"kind\":\"start\"}\n\nnot json\n";
        let err = parse_records(text).unwrap_err();
        assert!(format!("{err}").contains("line 3"));
    }
}
