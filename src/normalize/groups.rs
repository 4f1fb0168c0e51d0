// src/normalize/groups.rs

// --- Imports ---
use crate::extract::RawTable;
use crate::normalize::Snapshot;
use crate::vocab::SiteVocabulary;
use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// A header table opening a group has at most this many data rows.
const HEADER_TABLE_MAX_ROWS: usize = 2;

// --- Regex Patterns for Date Tokens (Lazy Static) ---
static DATE_FULL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("Failed to compile DATE_FULL_RE")
});

static DATE_SHORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.").expect("Failed to compile DATE_SHORT_RE")
});

// --- Data Structures ---

/// The block of tables believed to correspond to one calendar day.
#[derive(Debug, Clone)]
pub struct DayGroup {
    /// Position of the group within its snapshot.
    pub sequence_index: usize,
    /// The header table that opened the group, if any.
    pub header: Option<RawTable>,
    /// Data tables assigned to the group.
    pub tables: Vec<RawTable>,
    /// Resolved calendar date; never unresolved.
    pub date: NaiveDate,
}

impl DayGroup {
    /// Header table plus data tables, in appearance order.
    pub fn all_tables(&self) -> impl Iterator<Item = &RawTable> {
        self.header.iter().chain(self.tables.iter())
    }
}

// --- Segmenter ---

/// Splits a snapshot's ordered table list into day-groups and resolves a
/// definite date per group.
pub struct GroupSegmenter {
    vocab: SiteVocabulary,
}

impl GroupSegmenter {
    pub fn new(vocab: SiteVocabulary) -> Self {
        Self { vocab }
    }

    /// Segments `snapshot` into ordered `DayGroup`s. Every table ends up
    /// in exactly one group; every group ends up with a date.
    pub fn segment(&self, snapshot: Snapshot) -> Vec<DayGroup> {
        let Snapshot { tables, hint_date, explicit_date } = snapshot;

        // Pass 1: partition tables into groups at header-table boundaries.
        let mut partitions: Vec<(Option<RawTable>, Vec<RawTable>)> = Vec::new();
        for table in tables {
            if self.is_header_table(&table) {
                partitions.push((Some(table), Vec::new()));
            } else {
                if partitions.is_empty() {
                    // Defensive: the snapshot opens without a header table.
                    tracing::debug!("Snapshot starts with a non-header table; opening headerless group");
                    partitions.push((None, Vec::new()));
                }
                partitions.last_mut().expect("group open").1.push(table);
            }
        }

        // Pass 2: direct date resolution per group.
        let mut dates: Vec<Option<NaiveDate>> = partitions
            .iter()
            .map(|(header, _)| {
                explicit_date.or_else(|| {
                    header.as_ref().and_then(|h| scan_preceding_for_date(&h.preceding_text, hint_date))
                })
            })
            .collect();

        // Pass 3: fill the gaps with a monotonic synthetic sequence.
        fill_unresolved_dates(&mut dates, hint_date);

        let groups: Vec<DayGroup> = partitions
            .into_iter()
            .zip(dates)
            .enumerate()
            .map(|(sequence_index, ((header, tables), date))| DayGroup {
                sequence_index,
                header,
                tables,
                date: date.expect("all dates resolved"),
            })
            .collect();

        tracing::info!(
            "Segmented snapshot into {} day-group(s): {:?}",
            groups.len(),
            groups.iter().map(|g| g.date).collect::<Vec<_>>()
        );
        groups
    }

    /// A header table carries column-name metadata rather than rows: it is
    /// short and at least one of its column names reads like the expected
    /// vocabulary.
    fn is_header_table(&self, table: &RawTable) -> bool {
        table.rows.len() <= HEADER_TABLE_MAX_ROWS
            && table.columns.iter().any(|c| self.vocab.contains_header_token(c))
    }
}

// --- Date Inference ---

/// Scans the captured preceding sibling texts (nearest first) for a date
/// token. A `dd.mm.yyyy` match wins; a bare `dd.mm.` falls back to the
/// hint date's year.
fn scan_preceding_for_date(preceding: &[String], hint_date: NaiveDate) -> Option<NaiveDate> {
    for text in preceding {
        if let Some(caps) = DATE_FULL_RE.captures(text) {
            let (d, m, y) = (parse_num(&caps[1]), parse_num(&caps[2]), parse_num(&caps[3]));
            if let Some(date) = NaiveDate::from_ymd_opt(y as i32, m, d) {
                tracing::debug!("Resolved group date {} from sibling text {:?}", date, text);
                return Some(date);
            }
        }
        if let Some(caps) = DATE_SHORT_RE.captures(text) {
            let (d, m) = (parse_num(&caps[1]), parse_num(&caps[2]));
            if let Some(date) = NaiveDate::from_ymd_opt(hint_date.year(), m, d) {
                tracing::debug!("Resolved group date {} (year from hint) from sibling text {:?}", date, text);
                return Some(date);
            }
        }
    }
    None
}

fn parse_num(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}

/// Unresolved groups inherit the nearest resolved group's date shifted by
/// their positional distance; with no anchors at all, the sequence starts
/// at the hint date. Document order stays monotonically increasing.
fn fill_unresolved_dates(dates: &mut [Option<NaiveDate>], hint_date: NaiveDate) {
    if dates.iter().all(Option::is_none) {
        for (i, slot) in dates.iter_mut().enumerate() {
            *slot = hint_date.checked_add_days(Days::new(i as u64));
        }
        return;
    }

    let anchors: Vec<(usize, NaiveDate)> = dates
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.map(|d| (i, d)))
        .collect();

    for i in 0..dates.len() {
        if dates[i].is_some() {
            continue;
        }
        // Nearest anchor, earlier one on ties.
        let (j, anchor) = anchors
            .iter()
            .min_by_key(|(j, _)| (i.abs_diff(*j), *j))
            .copied()
            .expect("at least one anchor");
        let offset = i as i64 - j as i64;
        dates[i] = if offset >= 0 {
            anchor.checked_add_days(Days::new(offset as u64))
        } else {
            anchor.checked_sub_days(Days::new(offset.unsigned_abs()))
        };
        tracing::debug!("Group {} date inferred from group {} (offset {})", i, j, offset);
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RawCell;

    fn table(index: usize, columns: &[&str], n_rows: usize) -> RawTable {
        RawTable {
            table_index: index,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: (0..n_rows)
                .map(|r| columns.iter().map(|_| RawCell::from_text(&format!("r{}", r))).collect())
                .collect(),
            preceding_text: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn segmenter() -> GroupSegmenter {
        GroupSegmenter::new(SiteVocabulary::default())
    }

    #[test]
    fn header_table_opens_a_group() {
        let tables = vec![
            table(0, &["Stunde", "Klassen"], 1),
            table(1, &["col_1", "col_2"], 5),
            table(2, &["Stunde", "Klassen"], 0),
            table(3, &["col_1", "col_2"], 4),
        ];
        let snapshot = Snapshot { tables, hint_date: date(2025, 9, 16), explicit_date: None };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].header.is_some());
        assert_eq!(groups[0].tables.len(), 1);
        assert_eq!(groups[1].tables.len(), 1);
        assert_eq!(groups[1].sequence_index, 1);
    }

    #[test]
    fn long_table_with_named_columns_is_not_a_header() {
        // Named columns but too many rows: a body table, not a header.
        let tables = vec![table(0, &["Stunde", "Klassen"], 10)];
        let snapshot = Snapshot { tables, hint_date: date(2025, 9, 16), explicit_date: None };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].header.is_none());
    }

    #[test]
    fn headerless_snapshot_gets_a_defensive_group() {
        let tables = vec![table(0, &["col_1"], 3), table(1, &["col_1"], 2)];
        let snapshot = Snapshot { tables, hint_date: date(2025, 9, 16), explicit_date: None };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].header.is_none());
        assert_eq!(groups[0].tables.len(), 2);
    }

    #[test]
    fn explicit_snapshot_date_wins() {
        let mut header = table(0, &["Stunde", "Klassen"], 0);
        header.preceding_text = vec!["Mittwoch 24.12.2025".to_string()];
        let snapshot = Snapshot {
            tables: vec![header, table(1, &["col_1"], 2)],
            hint_date: date(2025, 9, 16),
            explicit_date: Some(date(2025, 9, 20)),
        };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups[0].date, date(2025, 9, 20));
    }

    #[test]
    fn date_scanned_from_preceding_siblings() {
        let mut header = table(0, &["Stunde", "Klassen"], 0);
        header.preceding_text =
            vec!["".to_string(), "Vertretungen Dienstag, 17.09.2025".to_string()];
        let snapshot = Snapshot {
            tables: vec![header, table(1, &["col_1"], 2)],
            hint_date: date(2025, 1, 1),
            explicit_date: None,
        };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups[0].date, date(2025, 9, 17));
    }

    #[test]
    fn short_date_token_defaults_to_hint_year() {
        let mut header = table(0, &["Stunde", "Klassen"], 0);
        header.preceding_text = vec!["Montag, 22.09.".to_string()];
        let snapshot = Snapshot {
            tables: vec![header, table(1, &["col_1"], 2)],
            hint_date: date(2026, 3, 1),
            explicit_date: None,
        };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups[0].date, date(2026, 9, 22));
    }

    #[test]
    fn unresolvable_dates_follow_hint_sequence() {
        // Scenario: nothing resolves anywhere; hint 16.09.2025; the second
        // group must land on 17.09.2025.
        let tables = vec![
            table(0, &["Stunde", "Klassen"], 0),
            table(1, &["col_1"], 2),
            table(2, &["Stunde", "Klassen"], 0),
            table(3, &["col_1"], 2),
        ];
        let snapshot = Snapshot { tables, hint_date: date(2025, 9, 16), explicit_date: None };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, date(2025, 9, 16));
        assert_eq!(groups[1].date, date(2025, 9, 17));
    }

    #[test]
    fn unresolved_group_inherits_from_nearest_anchor() {
        let mut anchored = table(2, &["Stunde", "Klassen"], 0);
        anchored.preceding_text = vec!["18.09.2025".to_string()];
        let tables = vec![
            table(0, &["Stunde", "Klassen"], 0), // no date
            table(1, &["col_1"], 2),
            anchored, // resolves 18.09.
            table(3, &["col_1"], 2),
        ];
        let snapshot = Snapshot { tables, hint_date: date(2025, 1, 1), explicit_date: None };
        let groups = segmenter().segment(snapshot);
        // group 0 sits one position before the anchor
        assert_eq!(groups[0].date, date(2025, 9, 17));
        assert_eq!(groups[1].date, date(2025, 9, 18));
    }

    #[test]
    fn invalid_date_tokens_are_skipped() {
        let mut header = table(0, &["Stunde", "Klassen"], 0);
        header.preceding_text =
            vec!["99.99.2025".to_string(), "gültig: 03.10.2025".to_string()];
        let snapshot = Snapshot {
            tables: vec![header, table(1, &["col_1"], 1)],
            hint_date: date(2025, 1, 1),
            explicit_date: None,
        };
        let groups = segmenter().segment(snapshot);
        assert_eq!(groups[0].date, date(2025, 10, 3));
    }
}
