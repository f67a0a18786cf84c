//! Document collections: a folder of PDFs plus an `input.json` descriptor
//!
//! Each collection yields one `<collection>_analysis.json` report holding the
//! top ranked sections across all of its documents.

use crate::outline::list_pdfs;
use crate::ranker::{rank_sections, RankedSection, RankingOptions};
use crate::sections::{extract_sections, Section};
use crate::PdfError;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the descriptor inside a collection folder
pub const DESCRIPTOR_FILE: &str = "input.json";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    #[serde(default = "unknown_persona")]
    pub role: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            role: unknown_persona(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobToBeDone {
    #[serde(default = "unknown_job")]
    pub task: String,
}

impl Default for JobToBeDone {
    fn default() -> Self {
        Self {
            task: unknown_job(),
        }
    }
}

fn unknown_persona() -> String {
    "Unknown Persona".to_string()
}

fn unknown_job() -> String {
    "Unknown Job".to_string()
}

/// Contents of `input.json`; other fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionDescriptor {
    #[serde(default)]
    pub persona: Persona,
    #[serde(default)]
    pub job_to_be_done: JobToBeDone,
}

/// A named group of PDFs with the persona and job they are ranked for
#[derive(Debug, Clone)]
pub struct DocumentCollection {
    pub name: String,
    pub dir: PathBuf,
    /// PDF file names, sorted
    pub documents: Vec<String>,
    pub persona: String,
    pub job: String,
}

impl DocumentCollection {
    /// Load a collection folder and its descriptor
    pub fn load(dir: &Path) -> Result<Self, PdfError> {
        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        if !descriptor_path.is_file() {
            return Err(PdfError::MissingDescriptor(descriptor_path));
        }
        let descriptor: CollectionDescriptor =
            serde_json::from_str(&fs::read_to_string(&descriptor_path)?)?;

        Ok(Self {
            name: dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            dir: dir.to_path_buf(),
            documents: list_pdfs(dir)?,
            persona: descriptor.persona.role,
            job: descriptor.job_to_be_done.task,
        })
    }

    /// Sections of every document; unreadable documents contribute nothing
    pub fn sections(&self) -> Vec<Section> {
        let mut all_sections = Vec::new();
        for name in &self.documents {
            log::info!("Processing: {}", name);
            match extract_sections(self.dir.join(name)) {
                Ok(sections) => all_sections.extend(sections),
                Err(e) => log::warn!("Skipping {}: {}", name, e),
            }
        }
        all_sections
    }

    /// Rank the collection's sections and build its report
    pub fn analyze(&self, options: &RankingOptions) -> CollectionReport {
        let ranked = rank_sections(self.sections(), &self.job, options);
        CollectionReport::new(self, &ranked, Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    /// 1-based
    pub importance_rank: usize,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: u32,
}

/// Ranked output of one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub metadata: ReportMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

impl CollectionReport {
    pub fn new(
        collection: &DocumentCollection,
        ranked: &[RankedSection],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut input_documents = collection.documents.clone();
        input_documents.sort();

        let extracted_sections = ranked
            .iter()
            .enumerate()
            .map(|(i, r)| ExtractedSection {
                document: r.section.document.clone(),
                section_title: r.section.title.clone(),
                importance_rank: i + 1,
                page_number: r.section.page,
            })
            .collect();

        let subsection_analysis = ranked
            .iter()
            .map(|r| SubsectionAnalysis {
                document: r.section.document.clone(),
                refined_text: refine_text(&r.section),
                page_number: r.section.page,
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                input_documents,
                persona: collection.persona.clone(),
                job_to_be_done: collection.job.clone(),
                processing_timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            },
            extracted_sections,
            subsection_analysis,
        }
    }

    /// Serialize with four-space indentation
    pub fn to_json(&self) -> Result<String, PdfError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// `"{title}: {content}"` with whitespace runs collapsed
fn refine_text(section: &Section) -> String {
    let text = format!("{}: {}", section.title, section.content);
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Analyze every collection folder under `input_root`.
///
/// Collections whose descriptor is missing or unreadable are skipped.
/// Returns the number of reports written to `output_dir`.
pub fn process_collections(
    input_root: &Path,
    output_dir: &Path,
    options: &RankingOptions,
) -> Result<usize, PdfError> {
    if !input_root.is_dir() {
        return Err(PdfError::NoInputRoot(input_root.to_path_buf()));
    }

    let mut collection_dirs = Vec::new();
    for entry in fs::read_dir(input_root)? {
        let path = entry?.path();
        if path.is_dir() {
            collection_dirs.push(path);
        }
    }
    collection_dirs.sort();
    if collection_dirs.is_empty() {
        return Err(PdfError::NoCollections(input_root.to_path_buf()));
    }

    fs::create_dir_all(output_dir)?;

    let mut written = 0;
    for dir in &collection_dirs {
        let collection = match DocumentCollection::load(dir) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Skipping collection {}: {}", dir.display(), e);
                continue;
            }
        };

        let report = collection.analyze(options);
        let output_path = output_dir.join(format!("{}_analysis.json", collection.name));
        fs::write(&output_path, report.to_json()?)?;
        log::info!(
            "Saved: {} ({} sections)",
            output_path.display(),
            report.extracted_sections.len()
        );
        written += 1;
    }

    Ok(written)
}
