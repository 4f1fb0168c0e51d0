// src/normalize/records.rs

// --- Imports ---
use crate::extract::sanitize::{collapse_ws, strip_markup};
use crate::normalize::columns::{Dataset, DatasetRow, ResolvedColumns};
use crate::normalize::groups::DayGroup;
use crate::vocab::{SemanticField, SiteVocabulary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Data Structures ---

/// Row classification surviving into the output. Header rows never
/// materialize as records; everything else that classifies is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Info,
    Data,
}

/// One normalized substitution entry.
///
/// `subject`, `teacher` and `text` may carry the sanitizer's allow-listed
/// inline markup; `class` and `period` are plain text. All fields are
/// whitespace-collapsed and trimmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstRecord {
    pub group: usize,
    pub kind: RowKind,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table_index: Option<usize>,
    pub class: String,
    pub period: String,
    pub subject: String,
    pub teacher: String,
    pub text: String,
}

/// `dd.mm.yyyy`, the rendering the monitor itself uses.
pub mod date_format {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d.%m.%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

// --- Normalizer ---

/// Turns a day-group's rows into classified, whitespace-cleaned records.
pub struct RecordNormalizer {
    vocab: SiteVocabulary,
}

enum RowClass {
    Header,
    Info(String),
    Data,
    Discard,
}

impl RecordNormalizer {
    pub fn new(vocab: SiteVocabulary) -> Self {
        Self { vocab }
    }

    /// Normalizes one group under `group_id`. Rows classify into exactly
    /// one of header / info / data / discard.
    pub fn normalize_group(&self, group: &DayGroup, group_id: usize) -> Vec<SubstRecord> {
        let dataset = Dataset::from_tables(group.all_tables());
        let resolved = dataset.resolve(&self.vocab);

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for row in &dataset.rows {
            match self.classify(row, &dataset, &resolved) {
                RowClass::Header | RowClass::Discard => dropped += 1,
                RowClass::Info(class_text) => records.push(SubstRecord {
                    group: group_id,
                    kind: RowKind::Info,
                    date: group.date,
                    source_table_index: Some(row.table_index),
                    class: collapse_ws(&class_text),
                    period: String::new(),
                    subject: String::new(),
                    teacher: String::new(),
                    text: String::new(),
                }),
                RowClass::Data => records.push(SubstRecord {
                    group: group_id,
                    kind: RowKind::Data,
                    date: group.date,
                    source_table_index: Some(row.table_index),
                    class: self.field_text(row, &resolved, SemanticField::Class),
                    period: self.field_text(row, &resolved, SemanticField::Period),
                    subject: self.field_html(row, &resolved, SemanticField::Subject),
                    teacher: self.field_html(row, &resolved, SemanticField::Teacher),
                    text: self.field_html(row, &resolved, SemanticField::Text),
                }),
            }
        }

        tracing::debug!(
            "Group {}: {} record(s) kept, {} row(s) dropped",
            group_id,
            records.len(),
            dropped
        );
        records
    }

    fn classify(&self, row: &DatasetRow, dataset: &Dataset, resolved: &ResolvedColumns) -> RowClass {
        let period = self.field_text(row, resolved, SemanticField::Period);
        let class = self.field_text(row, resolved, SemanticField::Class);

        // Repeated header rows inside table data.
        if period.to_lowercase() == self.vocab.period_header_literal.to_lowercase()
            && class.to_lowercase() == self.vocab.class_header_literal.to_lowercase()
        {
            return RowClass::Header;
        }

        // Free-text info rows, wherever the cell sits.
        for column in &dataset.columns {
            let text = row.text(column).trim();
            if text.starts_with(self.vocab.info_prefix.as_str()) {
                return RowClass::Info(text.to_string());
            }
        }

        // Substantive rows need at least one populated semantic field.
        let any_content = SemanticField::ALL
            .iter()
            .any(|&f| !self.field_text(row, resolved, f).is_empty());
        if any_content {
            RowClass::Data
        } else {
            RowClass::Discard
        }
    }

    fn field_text(&self, row: &DatasetRow, resolved: &ResolvedColumns, field: SemanticField) -> String {
        match resolved.get(field) {
            Some(column) => collapse_ws(row.text(column)),
            None => String::new(),
        }
    }

    fn field_html(&self, row: &DatasetRow, resolved: &ResolvedColumns, field: SemanticField) -> String {
        match resolved.get(field) {
            Some(column) => collapse_ws(row.html(column)),
            None => String::new(),
        }
    }
}

// --- Canonical Sort ---

/// Sorts for final presentation: date, class, period (numeric, blanks and
/// non-numeric last), then subject and teacher compared with markup
/// stripped.
pub fn sort_records(records: &mut [SubstRecord]) {
    records.sort_by_cached_key(|r| {
        (
            r.date,
            r.class.clone(),
            period_sort_key(&r.period),
            strip_markup(&r.subject),
            strip_markup(&r.teacher),
        )
    });
}

fn period_sort_key(period: &str) -> (bool, u32) {
    match period.trim().parse::<u32>() {
        Ok(n) => (false, n),
        Err(_) => (true, 0),
    }
}
