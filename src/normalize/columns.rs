// src/normalize/columns.rs

// --- Imports ---
use crate::extract::{RawCell, RawTable};
use crate::vocab::{SemanticField, SiteVocabulary};
use std::collections::HashMap;

// --- Data Structures ---

/// The concatenated row set of one day-group's tables, rows addressed by
/// column name. This is what column resolution and classification run on.
#[derive(Debug, Default)]
pub struct Dataset {
    /// Union of all column names, first-appearance order.
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

#[derive(Debug)]
pub struct DatasetRow {
    pub table_index: usize,
    cells: HashMap<String, RawCell>,
}

impl DatasetRow {
    /// Plain-text value of `column`, empty when the row's table lacks it.
    pub fn text(&self, column: &str) -> &str {
        self.cells.get(column).map(|c| c.text.as_str()).unwrap_or("")
    }

    /// Sanitized-markup value of `column`, empty when absent.
    pub fn html(&self, column: &str) -> &str {
        self.cells.get(column).map(|c| c.html.as_str()).unwrap_or("")
    }
}

/// The concrete source column each semantic field resolved to. `None`
/// reads as an all-empty column downstream, never as an error.
#[derive(Debug, Default)]
pub struct ResolvedColumns {
    map: HashMap<SemanticField, String>,
}

impl ResolvedColumns {
    pub fn get(&self, field: SemanticField) -> Option<&str> {
        self.map.get(&field).map(String::as_str)
    }
}

// --- Resolution ---

impl Dataset {
    /// Flattens a group's tables into one addressable row set.
    pub fn from_tables<'a, I: IntoIterator<Item = &'a RawTable>>(tables: I) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for table in tables {
            for name in &table.columns {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
            for row in &table.rows {
                let cells = table
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                rows.push(DatasetRow { table_index: table.table_index, cells });
            }
        }
        Dataset { columns, rows }
    }

    /// Resolves every semantic field against this dataset.
    pub fn resolve(&self, vocab: &SiteVocabulary) -> ResolvedColumns {
        let mut resolved = ResolvedColumns::default();
        for field in SemanticField::ALL {
            if let Some(column) = self.resolve_column(vocab.candidates(field)) {
                tracing::debug!("Field {:?} resolved to source column {:?}", field, column);
                resolved.map.insert(field, column);
            } else {
                tracing::debug!("Field {:?} has no matching source column", field);
            }
        }
        resolved
    }

    /// Picks the best source column for one candidate list.
    ///
    /// Header-only tables expose the "correct" name with zero populated
    /// values while body tables hide the same data under positional
    /// names, so candidates are scored by their count of non-empty values
    /// rather than bound first-match. Ties break toward the earlier
    /// candidate, then toward first appearance in the dataset.
    pub fn resolve_column(&self, candidates: &[String]) -> Option<String> {
        let mut best: Option<(usize, usize, usize, &String)> = None; // (score, cand_pos, col_pos, name)

        for (col_pos, column) in self.columns.iter().enumerate() {
            let Some(cand_pos) = candidate_rank(candidates, column) else {
                continue;
            };
            let score = self.rows.iter().filter(|r| !r.text(column).trim().is_empty()).count();
            let better = match best {
                None => true,
                Some((s, cp, xp, _)) => {
                    (score > s)
                        || (score == s && cand_pos < cp)
                        || (score == s && cand_pos == cp && col_pos < xp)
                }
            };
            if better {
                best = Some((score, cand_pos, col_pos, column));
            }
        }

        best.map(|(_, _, _, name)| name.clone())
    }
}

/// Position of the first candidate matching `column` (case-insensitive
/// exact first, then case-insensitive prefix), if any.
fn candidate_rank(candidates: &[String], column: &str) -> Option<usize> {
    let lower = column.to_lowercase();
    if let Some(pos) = candidates.iter().position(|c| c.to_lowercase() == lower) {
        return Some(pos);
    }
    candidates.iter().position(|c| lower.starts_with(&c.to_lowercase()))
}
