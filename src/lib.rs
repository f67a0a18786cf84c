//! Heuristic PDF structure extraction using lopdf
//!
//! This crate provides:
//! - Positioned span extraction and line collection from PDF content streams
//! - Outline extraction (title, H1, H2) from absolute font-size rules
//! - Section segmentation relative to the document's body font size
//! - Relevance ranking of sections against a "job to be done"

pub mod collection;
pub mod extractor;
pub mod outline;
pub mod ranker;
pub mod sections;

pub use collection::{process_collections, CollectionReport, DocumentCollection};
pub use extractor::{
    extract_layout, extract_layout_mem, group_into_lines, BBox, PageLayout, PdfLayout, TextItem,
    TextLine,
};
pub use outline::{
    extract_outline, extract_outline_mem, write_outlines, DocumentOutline, HeadingLevel,
    OutlineEntry, OutlineOptions,
};
pub use ranker::{rank_sections, similarity, RankedSection, RankingOptions};
pub use sections::{assemble_sections, extract_sections, Section};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Collection descriptor not found: {}", .0.display())]
    MissingDescriptor(PathBuf),
    #[error("Input folder not found: {}", .0.display())]
    NoInputRoot(PathBuf),
    #[error("No collections found in {}", .0.display())]
    NoCollections(PathBuf),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}
