// src/extract/tables.rs

// --- Imports ---
use crate::extract::sanitize::CellSanitizer;
use crate::vocab::SiteVocabulary;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Number of preceding sibling DOM nodes captured per table for date
/// inference further down the pipeline.
const PRECEDING_NODE_LIMIT: usize = 8;

// --- CSS Selectors (Lazy Static) ---
static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("Failed to compile TABLE_SELECTOR"));

static THEAD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead").expect("Failed to compile THEAD_SELECTOR"));

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Failed to compile ROW_SELECTOR"));

static HEADER_CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("Failed to compile HEADER_CELL_SELECTOR"));

// --- Data Structures ---

/// One table cell in both renditions the pipeline needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    /// Markup fully stripped, whitespace collapsed.
    pub text: String,
    /// Sanitized markup (allow-listed inline tags preserved).
    pub html: String,
}

impl RawCell {
    pub fn from_text(text: &str) -> Self {
        Self { text: text.to_string(), html: text.to_string() }
    }
}

/// One `<table>` as found in a snapshot, with resolved or synthesized
/// headers and uniform-width rows. Immutable after extraction.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Position among all `<table>` elements of the document.
    pub table_index: usize,
    /// Unique column names, explicit or synthesized `col_N`.
    pub columns: Vec<String>,
    /// Data rows, each padded to `columns.len()` cells.
    pub rows: Vec<Vec<RawCell>>,
    /// Text of up to 8 preceding sibling DOM nodes, nearest first.
    pub preceding_text: Vec<String>,
}

// --- Extractor ---

/// Pulls every `<table>` of one snapshot into `RawTable`s.
///
/// Header metadata on the source is unreliable by design, so row shape is
/// always trusted over header markup: mismatched headers are padded,
/// truncated, or replaced with positional names.
pub struct TableExtractor {
    vocab: SiteVocabulary,
    sanitizer: CellSanitizer,
}

impl TableExtractor {
    pub fn new(vocab: SiteVocabulary, sanitizer: CellSanitizer) -> Self {
        Self { vocab, sanitizer }
    }

    /// Extracts all tables of `html` in document order.
    pub fn extract(&self, html: &str) -> Vec<RawTable> {
        let document = Html::parse_document(html);
        let mut tables = Vec::new();

        for (table_index, table_el) in document.select(&TABLE_SELECTOR).enumerate() {
            match self.extract_table(table_el, table_index) {
                Some(table) => tables.push(table),
                None => tracing::debug!("Dropping empty table at index {}", table_index),
            }
        }

        tracing::info!("Extracted {} non-empty tables from snapshot", tables.len());
        tables
    }

    fn extract_table(&self, table_el: ElementRef<'_>, table_index: usize) -> Option<RawTable> {
        // Header resolution (a): explicit <thead> markup.
        let mut headers: Vec<String> = Vec::new();
        let thead = table_el.select(&THEAD_SELECTOR).next();
        if let Some(thead_el) = thead {
            headers = thead_el
                .select(&HEADER_CELL_SELECTOR)
                .map(|c| self.sanitizer.sanitize_text(&c.inner_html()))
                .collect();
        }

        // Body rows, skipping anything living under <thead>.
        let mut body_rows: Vec<Vec<ElementRef<'_>>> = Vec::new();
        for row_el in table_el.select(&ROW_SELECTOR) {
            if in_thead(row_el) {
                continue;
            }
            let cells = row_cells(row_el);
            if !cells.is_empty() {
                body_rows.push(cells);
            }
        }

        let mut start_idx = 0;
        if headers.is_empty() && !body_rows.is_empty() {
            // Header resolution (a), continued: a leading all-<th> row.
            let first = &body_rows[0];
            if first.iter().all(|c| c.value().name() == "th") {
                headers = first
                    .iter()
                    .map(|c| self.sanitizer.sanitize_text(&c.inner_html()))
                    .collect();
                start_idx = 1;
            }
        }
        if headers.is_empty() && !body_rows.is_empty() {
            // Header resolution (b): the first row reads like the expected
            // vocabulary in at least two cells.
            let texts: Vec<String> = body_rows[0]
                .iter()
                .map(|c| self.sanitizer.sanitize_text(&c.inner_html()))
                .collect();
            let hits = texts.iter().filter(|t| self.vocab.contains_header_token(t)).count();
            if hits >= 2 {
                headers = texts;
                start_idx = 1;
            }
        }
        let had_explicit_header = !headers.is_empty();

        // Materialize data rows, dropping all-empty ones.
        let mut rows: Vec<Vec<RawCell>> = Vec::new();
        for cells in &body_rows[start_idx.min(body_rows.len())..] {
            let row: Vec<RawCell> = cells
                .iter()
                .map(|c| {
                    let inner = c.inner_html();
                    RawCell {
                        text: self.sanitizer.sanitize_text(&inner),
                        html: self.sanitizer.sanitize_html(&inner),
                    }
                })
                .collect();
            if row.iter().any(|c| !c.text.trim().is_empty()) {
                rows.push(row);
            }
        }

        // A table with neither data rows nor resolved headers carries
        // nothing; header-only tables stay (they anchor day-groups and
        // participate in column resolution with zero score).
        if rows.is_empty() && !had_explicit_header {
            return None;
        }

        // Header resolution (c) + width repair: row shape wins.
        let width = rows.iter().map(Vec::len).max().unwrap_or(headers.len());
        if headers.is_empty() {
            headers = synthesized_headers(width);
        } else if headers.len() < width {
            for i in headers.len()..width {
                headers.push(format!("col_{}", i + 1));
            }
        } else if headers.len() > width && !rows.is_empty() {
            headers.truncate(width);
        }
        if headers.len() != width && !rows.is_empty() {
            // Still structurally off; trust the rows entirely.
            headers = synthesized_headers(width);
        }
        let columns = uniquify_headers(headers);

        // Pad short rows on the right.
        for row in &mut rows {
            while row.len() < columns.len() {
                row.push(RawCell::default());
            }
        }

        Some(RawTable {
            table_index,
            columns,
            rows,
            preceding_text: preceding_sibling_texts(table_el),
        })
    }
}

/// Direct `th`/`td` children of a row, in order.
fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

fn in_thead(row: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "thead")
}

fn synthesized_headers(width: usize) -> Vec<String> {
    (0..width).map(|i| format!("col_{}", i + 1)).collect()
}

/// Empty names become positional, duplicates get a numeric suffix.
fn uniquify_headers(headers: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(headers.len());
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for (i, h) in headers.into_iter().enumerate() {
        let mut name = h.trim().to_string();
        if name.is_empty() {
            name = format!("col_{}", i + 1);
        }
        let count = {
            let entry = seen.entry(name.clone()).and_modify(|c| *c += 1).or_insert(1);
            *entry
        };
        if count > 1 {
            name = format!("{}_{}", name, count);
            seen.insert(name.clone(), 1);
        }
        out.push(name);
    }
    out
}

/// Text of up to `PRECEDING_NODE_LIMIT` preceding sibling nodes of the
/// table element, nearest first. Feeds date inference.
fn preceding_sibling_texts(table_el: ElementRef<'_>) -> Vec<String> {
    table_el
        .prev_siblings()
        .take(PRECEDING_NODE_LIMIT)
        .map(|node| match ElementRef::wrap(node) {
            Some(el) => el.text().collect::<Vec<_>>().join(" "),
            None => match node.value() {
                scraper::node::Node::Text(t) => t.text.to_string(),
                _ => String::new(),
            },
        })
        .collect()
}
