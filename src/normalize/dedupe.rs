// src/normalize/dedupe.rs

use crate::extract::sanitize::strip_markup;
use crate::normalize::records::SubstRecord;
use chrono::NaiveDate;
use std::collections::HashSet;

type DedupeKey = (NaiveDate, String, String, String, String, String);

/// Drops records identical in normalized text content, keeping the first
/// per key in the incoming order. Formatting-only differences (one copy
/// struck through, one not) collapse onto the same key, so the operation
/// is idempotent and order-preserving among survivors.
pub fn dedupe_records(records: Vec<SubstRecord>) -> Vec<SubstRecord> {
    let before = records.len();
    let mut seen: HashSet<DedupeKey> = HashSet::new();
    let deduped: Vec<SubstRecord> =
        records.into_iter().filter(|r| seen.insert(dedupe_key(r))).collect();
    if deduped.len() < before {
        tracing::info!("Deduplication removed {} duplicate record(s)", before - deduped.len());
    }
    deduped
}

fn dedupe_key(record: &SubstRecord) -> DedupeKey {
    (
        record.date,
        record.class.clone(),
        record.period.clone(),
        strip_markup(&record.subject),
        strip_markup(&record.teacher),
        strip_markup(&record.text),
    )
}
