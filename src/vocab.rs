// src/vocab.rs
//! Site-specific vocabulary for the substitution monitor.
//!
//! Everything the pipeline knows about the source site's naming lives here
//! as explicit configuration values, handed to each component at
//! construction. A different monitor (other language, other column set)
//! only needs another `SiteVocabulary` instance.

/// The five semantic fields every normalized record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticField {
    Class,
    Period,
    Subject,
    Teacher,
    Text,
}

impl SemanticField {
    pub const ALL: [SemanticField; 5] = [
        SemanticField::Class,
        SemanticField::Period,
        SemanticField::Subject,
        SemanticField::Teacher,
        SemanticField::Text,
    ];
}

/// Fixed naming knowledge about one source site.
#[derive(Debug, Clone)]
pub struct SiteVocabulary {
    /// Lowercase tokens that identify header metadata, matched as
    /// case-insensitive substrings against cell texts and column names.
    pub header_tokens: Vec<String>,
    /// Candidate source columns per semantic field, best-known name first.
    /// Positional `col_N` fallbacks cover body tables whose header row
    /// never rendered.
    pub class_columns: Vec<String>,
    pub period_columns: Vec<String>,
    pub subject_columns: Vec<String>,
    pub teacher_columns: Vec<String>,
    pub text_columns: Vec<String>,
    /// Literal cell texts marking a repeated header row inside table data.
    pub period_header_literal: String,
    pub class_header_literal: String,
    /// Prefix marking a free-text info row ("Klassen: 5a, 5b, ...").
    pub info_prefix: String,
}

impl Default for SiteVocabulary {
    fn default() -> Self {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect();
        Self {
            header_tokens: s(&["stunde", "klasse", "fach", "lehrkraft", "vertretungstext"]),
            class_columns: s(&["Klassen", "Klasse(n)", "col_4"]),
            period_columns: s(&["Stunde", "col_3"]),
            subject_columns: s(&["Fach", "col_5"]),
            teacher_columns: s(&["Lehrkraft", "col_6"]),
            text_columns: s(&["Vertretungstext", "col_7"]),
            period_header_literal: "Stunde".to_string(),
            class_header_literal: "Klassen".to_string(),
            info_prefix: "Klassen:".to_string(),
        }
    }
}

impl SiteVocabulary {
    /// Candidate column names for one semantic field, in preference order.
    pub fn candidates(&self, field: SemanticField) -> &[String] {
        match field {
            SemanticField::Class => &self.class_columns,
            SemanticField::Period => &self.period_columns,
            SemanticField::Subject => &self.subject_columns,
            SemanticField::Teacher => &self.teacher_columns,
            SemanticField::Text => &self.text_columns,
        }
    }

    /// Does `name` contain one of the expected header tokens?
    pub fn contains_header_token(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.header_tokens.iter().any(|tok| lower.contains(tok.as_str()))
    }
}
