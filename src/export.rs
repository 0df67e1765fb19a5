//! One-way JSON dump of the search history for the user to keep.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::pattern::PatternKey;
use crate::session::Stats;
use crate::store::RejectedSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub invalid_patterns: Vec<PatternKey>,
    pub stats: Stats,
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    pub fn new(rejected: &RejectedSet, stats: Stats, export_date: DateTime<Utc>) -> Self {
        Self {
            invalid_patterns: rejected.iter().cloned().collect(),
            stats,
            export_date,
        }
    }

    pub fn file_name(&self) -> String {
        format!("pattern-memory-{}.json", self.export_date.timestamp_millis())
    }

    /// Writes the document into `dir`, returning the created file's path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        info!(path = %path.display(), patterns = self.invalid_patterns.len(), "history exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn rejected() -> RejectedSet {
        ["0-1-2-5-8", "6-4-2-1"]
            .into_iter()
            .map(|raw| raw.parse().unwrap())
            .collect()
    }

    #[test]
    fn document_uses_camel_case_fields() {
        let date = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let doc = ExportDocument::new(&rejected(), Stats { tested: 3, invalid: 2 }, date);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["invalidPatterns"], serde_json::json!(["0-1-2-5-8", "6-4-2-1"]));
        assert_eq!(value["stats"]["tested"], 3);
        assert_eq!(value["stats"]["invalid"], 2);
        assert_eq!(value["exportDate"], "2026-10-19T12:00:00Z");
    }

    #[test]
    fn write_to_dir_creates_timestamped_file() {
        let dir = tempdir().unwrap();
        let date = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let doc = ExportDocument::new(&rejected(), Stats { tested: 2, invalid: 2 }, date);

        let path = doc.write_to_dir(&dir.path().join("out")).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("pattern-memory-{}.json", date.timestamp_millis())
        );

        let loaded: ExportDocument = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(loaded, doc);
    }
}
