//! Section segmentation relative to the document's body font size
//!
//! Every collected line becomes a block. The most frequent whole-point size
//! is taken as body text; larger blocks, and bold blocks at body size, are
//! headings. Each heading owns the body blocks in the vertical band between
//! its bottom edge and the next heading on the same page (or the page end).

use crate::extractor::{extract_layout, BBox, PdfLayout};
use crate::PdfError;
use std::collections::HashMap;
use std::path::Path;

/// A collected line with the style facts section mode looks at
#[derive(Debug, Clone)]
pub struct SectionBlock {
    pub text: String,
    /// Page index (0-based)
    pub page: u32,
    pub bbox: BBox,
    /// Font size rounded to whole points
    pub size: i32,
    pub is_bold: bool,
}

fn larger_than_body(block: &SectionBlock, body_size: i32) -> bool {
    block.size > body_size
}

fn bold_at_body_size(block: &SectionBlock, body_size: i32) -> bool {
    block.size == body_size && block.is_bold
}

/// Heading predicates, any match makes a heading
const HEADING_RULES: [fn(&SectionBlock, i32) -> bool; 2] = [larger_than_body, bold_at_body_size];

impl SectionBlock {
    pub fn is_heading(&self, body_size: i32) -> bool {
        HEADING_RULES.iter().any(|rule| rule(self, body_size))
    }
}

/// A heading with the body text of its content band
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// File name of the source document
    pub document: String,
    pub title: String,
    /// Page index (0-based)
    pub page: u32,
    pub bbox: BBox,
    /// Whole-point size of the heading line
    pub level: i32,
    pub content: String,
}

/// Collect every line of the document as a block, in page then stream order
pub fn collect_blocks(layout: &PdfLayout) -> Vec<SectionBlock> {
    layout
        .pages
        .iter()
        .flat_map(|page| page.lines())
        .map(|line| SectionBlock {
            text: line.text(),
            page: line.page,
            bbox: line.bbox(),
            size: line.first().map(|i| i.size_points()).unwrap_or(0),
            is_bold: line.is_bold(),
        })
        .collect()
}

/// Most frequent block size.
///
/// Ties go to the size encountered first in document order.
pub fn body_size(blocks: &[SectionBlock]) -> Option<i32> {
    let mut counts: HashMap<i32, (usize, usize)> = HashMap::new();
    for (order, block) in blocks.iter().enumerate() {
        counts.entry(block.size).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(size, _)| size)
}

/// Split a document into heading-scoped sections.
///
/// Headings whose title or content band is empty are dropped.
pub fn assemble_sections(document: &str, layout: &PdfLayout) -> Vec<Section> {
    let blocks = collect_blocks(layout);
    let Some(body_size) = body_size(&blocks) else {
        return Vec::new();
    };
    log::debug!("{}: {} blocks, body size {}", document, blocks.len(), body_size);

    let (headings, body): (Vec<&SectionBlock>, Vec<&SectionBlock>) =
        blocks.iter().partition(|b| b.is_heading(body_size));

    let mut sections = Vec::new();
    for (i, heading) in headings.iter().enumerate() {
        let start_y = heading.bbox.y1;
        let end_y = match headings.get(i + 1) {
            Some(next) if next.page == heading.page => next.bbox.y0,
            _ => layout.page_height(heading.page).unwrap_or(f32::MAX),
        };

        let content = body
            .iter()
            .filter(|b| b.page == heading.page && start_y < b.bbox.y0 && b.bbox.y0 < end_y)
            .map(|b| b.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let title = heading.text.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            continue;
        }

        sections.push(Section {
            document: document.to_string(),
            title: title.to_string(),
            page: heading.page,
            bbox: heading.bbox,
            level: heading.size,
            content: content.to_string(),
        });
    }

    sections
}

/// Extract the sections of a PDF file, named after its file name
pub fn extract_sections<P: AsRef<Path>>(path: P) -> Result<Vec<Section>, PdfError> {
    let path = path.as_ref();
    let layout = extract_layout(path)?;
    let document = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(assemble_sections(&document, &layout))
}
