// src/storage/mod.rs
use crate::normalize::records::{date_format, RowKind, SubstRecord};
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

const JSON_FILENAME: &str = "untis_subst_normalized.json";
const CSV_FILENAME: &str = "untis_subst_normalized.csv";

/// Byte-order mark so spreadsheet imports pick up UTF-8.
const UTF8_BOM: &str = "\u{FEFF}";

const CSV_COLUMNS: [&str; 9] =
    ["group", "kind", "date", "source_table_index", "class", "period", "subject", "teacher", "text"];

/// Writes the normalized record set in both output encodings.
///
/// Writes are atomic: content goes to a temporary file in the target
/// directory first and is renamed into place, so concurrent readers
/// never observe a partial file.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Saves the record set as a pretty-printed JSON array.
    pub fn save_json(&self, records: &[SubstRecord]) -> Result<PathBuf, StorageError> {
        let body = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let file_path = self.base_dir.join(JSON_FILENAME);
        self.write_atomic(&file_path, &body)?;

        tracing::info!("Saved {} record(s) to {}", records.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves the record set as delimited text with identical row order.
    pub fn save_csv(&self, records: &[SubstRecord]) -> Result<PathBuf, StorageError> {
        let mut body = String::from(UTF8_BOM);
        write_csv_row(&mut body, CSV_COLUMNS.iter().map(|c| c.to_string()));
        for record in records {
            write_csv_row(&mut body, csv_fields(record));
        }

        let file_path = self.base_dir.join(CSV_FILENAME);
        self.write_atomic(&file_path, &body)?;

        tracing::info!("Saved {} record(s) to {}", records.len(), file_path.display());
        Ok(file_path)
    }

    fn write_atomic(&self, target: &Path, content: &str) -> Result<(), StorageError> {
        let mut tmp = target.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp_path = PathBuf::from(tmp);
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, target)?;
        Ok(())
    }
}

fn csv_fields(record: &SubstRecord) -> impl Iterator<Item = String> {
    let kind = match record.kind {
        RowKind::Info => "info",
        RowKind::Data => "data",
    };
    [
        record.group.to_string(),
        kind.to_string(),
        record.date.format(date_format::FORMAT).to_string(),
        record.source_table_index.map(|i| i.to_string()).unwrap_or_default(),
        record.class.clone(),
        record.period.clone(),
        record.subject.clone(),
        record.teacher.clone(),
        record.text.clone(),
    ]
    .into_iter()
}

fn write_csv_row<I: Iterator<Item = String>>(out: &mut String, fields: I) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
        {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(&field);
        }
    }
    out.push('\n');
}
