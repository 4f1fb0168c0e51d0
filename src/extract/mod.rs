// src/extract/mod.rs
pub mod sanitize;
pub mod tables;

// Re-export key extraction types for convenience
pub use sanitize::CellSanitizer;
pub use tables::{RawCell, RawTable, TableExtractor};
