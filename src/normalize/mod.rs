// src/normalize/mod.rs
pub mod columns;
pub mod dedupe;
pub mod groups;
pub mod records;

// Re-export key normalization types for convenience
pub use groups::{DayGroup, GroupSegmenter};
pub use records::{RowKind, SubstRecord};

use crate::extract::RawTable;
use crate::vocab::SiteVocabulary;
use chrono::NaiveDate;

/// One captured rendering of the monitor page plus its metadata.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tables: Vec<RawTable>,
    /// Fallback used by synthetic date sequencing and short date tokens.
    pub hint_date: NaiveDate,
    /// Date already known for this snapshot (e.g. "today"/"tomorrow"
    /// stamped by the caller); overrides any inference when set.
    pub explicit_date: Option<NaiveDate>,
}

/// Runs the full normalization pass over one or more snapshots: segment
/// into day-groups, resolve columns, classify rows, sort canonically,
/// deduplicate. Groups are numbered consecutively across snapshots.
pub fn normalize_snapshots(snapshots: Vec<Snapshot>, vocab: &SiteVocabulary) -> Vec<SubstRecord> {
    let segmenter = GroupSegmenter::new(vocab.clone());
    let normalizer = records::RecordNormalizer::new(vocab.clone());

    let mut all_records = Vec::new();
    let mut group_id = 0usize;
    for snapshot in snapshots {
        for group in segmenter.segment(snapshot) {
            all_records.extend(normalizer.normalize_group(&group, group_id));
            group_id += 1;
        }
    }

    records::sort_records(&mut all_records);
    let result = dedupe::dedupe_records(all_records);
    tracing::info!("Normalization produced {} record(s) in {} group(s)", result.len(), group_id);
    result
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{CellSanitizer, TableExtractor};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// End to end over raw HTML: the monitor's usual shape of a header
    /// table followed by a positionally-shifted body table.
    #[test]
    fn html_to_records_pipeline() {
        let html = r#"
            <div>Vertretungen Dienstag, 16.09.2025</div>
            <table>
              <tr><td>Stunde</td><td>Klassen</td><td>Fach</td><td>Lehrkraft</td><td>Vertretungstext</td></tr>
            </table>
            <table>
              <tr><td>x</td><td>y</td><td>3</td><td>8c</td><td><strike>Mathe</strike></td><td>Müller</td><td>entfällt</td></tr>
              <tr><td>x</td><td>y</td><td>3</td><td>8c</td><td>Mathe</td><td>Müller</td><td>entfällt</td></tr>
            </table>
        "#;
        let vocab = SiteVocabulary::default();
        let extractor = TableExtractor::new(vocab.clone(), CellSanitizer::default());
        let snapshot = Snapshot {
            tables: extractor.extract(html),
            hint_date: date(2025, 1, 1),
            explicit_date: None,
        };
        let records = normalize_snapshots(vec![snapshot], &vocab);

        // strikethrough variant and plain variant collapse to one record
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.date, date(2025, 9, 16));
        assert_eq!(r.class, "8c");
        assert_eq!(r.period, "3");
        assert_eq!(r.subject, "<s>Mathe</s>");
        assert_eq!(r.teacher, "Müller");
        assert_eq!(r.text, "entfällt");
    }

    #[test]
    fn groups_are_numbered_across_snapshots() {
        let html = r#"
            <table><tr><td>Stunde</td><td>Klassen</td><td>Fach</td></tr></table>
            <table><tr><td></td><td></td><td>1</td><td>5a</td><td>Deutsch</td><td></td><td></td></tr></table>
        "#;
        let vocab = SiteVocabulary::default();
        let extractor = TableExtractor::new(vocab.clone(), CellSanitizer::default());
        let today = Snapshot {
            tables: extractor.extract(html),
            hint_date: date(2025, 9, 16),
            explicit_date: Some(date(2025, 9, 16)),
        };
        let tomorrow = Snapshot {
            tables: extractor.extract(html),
            hint_date: date(2025, 9, 17),
            explicit_date: Some(date(2025, 9, 17)),
        };
        let records = normalize_snapshots(vec![today, tomorrow], &vocab);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].group, 0);
        assert_eq!(records[1].group, 1);
        assert_eq!(records[0].date, date(2025, 9, 16));
        assert_eq!(records[1].date, date(2025, 9, 17));
    }
}
