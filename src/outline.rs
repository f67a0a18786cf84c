//! Outline extraction: document title plus H1/H2 headings
//!
//! Two passes over a document:
//! 1. The largest span size (one decimal) becomes the title threshold.
//! 2. Lines are matched page by page against an ordered rule table. The first
//!    rule that starts on a line absorbs the following lines it continues on,
//!    so multi-line headings come out as one entry.

use crate::extractor::{extract_layout, extract_layout_mem, round_tenths, PdfLayout, TextLine};
use crate::PdfError;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Role assigned to a run of lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeadingLevel {
    Title,
    H1,
    H2,
}

/// A heading in the document outline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    /// Page index (0-based)
    pub page: u32,
}

/// Title and headings of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

/// Options for outline extraction
#[derive(Debug, Clone)]
pub struct OutlineOptions {
    /// Exact size of H1 lines
    pub h1_size: f32,
    /// Exact size of H2 lines
    pub h2_size: f32,
    /// Lowercase fragment the heading font name must contain
    pub heading_family: String,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            h1_size: 16.0,
            h2_size: 14.0,
            heading_family: "arial".to_string(),
        }
    }
}

/// The style facts rules look at
#[derive(Debug, Clone)]
struct LineStyle {
    text: String,
    size_tenths: i32,
    family_matches: bool,
}

impl LineStyle {
    fn from_line(line: &TextLine, options: &OutlineOptions) -> Self {
        Self {
            text: line.text(),
            size_tenths: round_tenths(line.font_size()),
            family_matches: line
                .font()
                .to_lowercase()
                .contains(options.heading_family.as_str()),
        }
    }
}

/// Scan state threaded through the second pass
#[derive(Debug)]
struct ScanState {
    title_threshold: i32,
    title_resolved: bool,
    h1_tenths: i32,
    h2_tenths: i32,
}

/// One row of the rule table
struct OutlineRule {
    level: HeadingLevel,
    /// Whether a run may start on this line
    starts: fn(&LineStyle, &ScanState) -> bool,
    /// Whether a following line joins the run
    continues: fn(&LineStyle, &ScanState) -> bool,
}

fn is_title_size(line: &LineStyle, state: &ScanState) -> bool {
    line.size_tenths == state.title_threshold
}

fn starts_title(line: &LineStyle, state: &ScanState) -> bool {
    !state.title_resolved && is_title_size(line, state)
}

fn is_h1(line: &LineStyle, state: &ScanState) -> bool {
    line.family_matches && line.size_tenths == state.h1_tenths
}

fn is_h2(line: &LineStyle, state: &ScanState) -> bool {
    line.family_matches && line.size_tenths == state.h2_tenths
}

/// Priority order: first match wins
static RULES: [OutlineRule; 3] = [
    OutlineRule {
        level: HeadingLevel::Title,
        starts: starts_title,
        continues: is_title_size,
    },
    OutlineRule {
        level: HeadingLevel::H1,
        starts: is_h1,
        continues: is_h1,
    },
    OutlineRule {
        level: HeadingLevel::H2,
        starts: is_h2,
        continues: is_h2,
    },
];

/// Largest span size in the document, in tenths of a point
pub fn title_threshold(layout: &PdfLayout) -> Option<i32> {
    layout.items().map(|item| item.size_tenths()).max()
}

/// Build the outline of an extracted document.
///
/// `fallback_title` is used when no line reaches the title threshold.
pub fn build_outline(
    layout: &PdfLayout,
    fallback_title: &str,
    options: &OutlineOptions,
) -> DocumentOutline {
    let mut state = ScanState {
        title_threshold: title_threshold(layout).unwrap_or(0),
        title_resolved: false,
        h1_tenths: round_tenths(options.h1_size),
        h2_tenths: round_tenths(options.h2_size),
    };
    log::debug!("title threshold: {:.1}", state.title_threshold as f32 / 10.0);

    let mut title = None;
    let mut outline = Vec::new();

    for page in &layout.pages {
        let styles: Vec<LineStyle> = page
            .lines()
            .iter()
            .map(|line| LineStyle::from_line(line, options))
            .collect();

        let mut i = 0;
        while i < styles.len() {
            let Some(rule) = RULES.iter().find(|rule| (rule.starts)(&styles[i], &state)) else {
                i += 1;
                continue;
            };

            let mut j = i + 1;
            while j < styles.len() && (rule.continues)(&styles[j], &state) {
                j += 1;
            }
            let text = styles[i..j]
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();

            match rule.level {
                HeadingLevel::Title => {
                    state.title_resolved = true;
                    title = Some(text);
                }
                level => outline.push(OutlineEntry {
                    level,
                    text,
                    page: page.index,
                }),
            }
            i = j;
        }
    }

    DocumentOutline {
        title: title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title.to_string()),
        outline,
    }
}

/// Extract the outline of a PDF file, falling back to its file name as title
pub fn extract_outline<P: AsRef<Path>>(path: P) -> Result<DocumentOutline, PdfError> {
    let layout = extract_layout(&path)?;
    Ok(build_outline(
        &layout,
        &file_name(path.as_ref()),
        &OutlineOptions::default(),
    ))
}

/// Extract the outline of a PDF held in memory
pub fn extract_outline_mem(
    buffer: &[u8],
    fallback_title: &str,
) -> Result<DocumentOutline, PdfError> {
    let layout = extract_layout_mem(buffer)?;
    Ok(build_outline(
        &layout,
        fallback_title,
        &OutlineOptions::default(),
    ))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `.pdf` files of a directory, sorted by name
pub(crate) fn list_pdfs(dir: &Path) -> Result<Vec<String>, PdfError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_file() && name.to_lowercase().ends_with(".pdf") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Write one `<name>.json` outline per PDF found in `input_dir`.
///
/// A PDF that cannot be read still gets an outline holding only its file
/// name as title. Returns the number of files written.
pub fn write_outlines(
    input_dir: &Path,
    output_dir: &Path,
    options: &OutlineOptions,
) -> Result<usize, PdfError> {
    if !input_dir.is_dir() {
        return Err(PdfError::NoInputRoot(input_dir.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let pdfs = list_pdfs(input_dir)?;
    log::info!("Found {} PDFs in {}", pdfs.len(), input_dir.display());

    for name in &pdfs {
        let pdf_path = input_dir.join(name);
        log::info!("Processing: {}", name);

        let outline = match extract_layout(&pdf_path) {
            Ok(layout) => build_outline(&layout, name, options),
            Err(e) => {
                log::warn!("Could not read {}: {}", pdf_path.display(), e);
                DocumentOutline {
                    title: name.clone(),
                    outline: Vec::new(),
                }
            }
        };

        let json_path = output_dir.join(Path::new(name).with_extension("json"));
        fs::write(&json_path, serde_json::to_string_pretty(&outline)?)?;
        log::info!("JSON saved: {}", json_path.display());
    }

    Ok(pdfs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{BBox, PageLayout, TextItem};

    fn line(text: &str, font: &str, size: f32, baseline: f32) -> TextItem {
        TextItem {
            text: text.into(),
            bbox: BBox::new(72.0, baseline - size * 0.8, 300.0, baseline + size * 0.2),
            font: font.into(),
            font_size: size,
            is_bold: false,
            page: 0,
        }
    }

    fn layout(pages: Vec<Vec<TextItem>>) -> PdfLayout {
        PdfLayout {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(index, mut items)| {
                    for item in &mut items {
                        item.page = index as u32;
                    }
                    PageLayout {
                        index: index as u32,
                        width: 612.0,
                        height: 792.0,
                        items,
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_title_and_headings() {
        let doc = layout(vec![vec![
            line("Annual Report 2024", "Arial", 24.0, 80.0),
            line("Introduction", "Arial", 16.0, 130.0),
            line("Some body text", "Arial", 11.0, 160.0),
            line("Methods", "Arial", 16.0, 200.0),
            line("More body text", "Arial", 11.0, 230.0),
        ]]);

        let outline = build_outline(&doc, "report.pdf", &OutlineOptions::default());
        assert_eq!(outline.title, "Annual Report 2024");
        assert_eq!(
            outline.outline,
            vec![
                OutlineEntry {
                    level: HeadingLevel::H1,
                    text: "Introduction".into(),
                    page: 0
                },
                OutlineEntry {
                    level: HeadingLevel::H1,
                    text: "Methods".into(),
                    page: 0
                },
            ]
        );
    }

    #[test]
    fn test_multi_line_title_ignores_family() {
        let doc = layout(vec![vec![
            line("Overview of the", "Times", 20.0, 80.0),
            line("Foundation Level", "Arial", 20.0, 105.0),
            line("Body", "Times", 10.0, 140.0),
        ]]);
        let outline = build_outline(&doc, "x.pdf", &OutlineOptions::default());
        assert_eq!(outline.title, "Overview of the Foundation Level");
    }

    #[test]
    fn test_title_fires_once() {
        let doc = layout(vec![
            vec![line("First", "Arial", 20.0, 80.0)],
            vec![line("Second", "Arial", 20.0, 80.0)],
        ]);
        let outline = build_outline(&doc, "x.pdf", &OutlineOptions::default());
        assert_eq!(outline.title, "First");
        assert!(outline.outline.is_empty());
    }

    #[test]
    fn test_consecutive_h2_merge_and_role_change_splits() {
        let doc = layout(vec![vec![
            line("Big", "Arial", 30.0, 60.0),
            line("Part one", "Arial", 14.0, 100.0),
            line("continued", "ArialMT", 14.0, 120.0),
            line("Chapter", "Arial", 16.0, 150.0),
            line("Part two", "Arial", 14.0, 180.0),
        ]]);
        let outline = build_outline(&doc, "x.pdf", &OutlineOptions::default());
        let texts: Vec<_> = outline
            .outline
            .iter()
            .map(|e| (e.level, e.text.as_str()))
            .collect();
        assert_eq!(
            texts,
            vec![
                (HeadingLevel::H2, "Part one continued"),
                (HeadingLevel::H1, "Chapter"),
                (HeadingLevel::H2, "Part two"),
            ]
        );
    }

    #[test]
    fn test_non_arial_heading_sizes_are_body() {
        let doc = layout(vec![vec![
            line("Title", "Arial", 24.0, 60.0),
            line("Helvetica sixteen", "Helvetica", 16.0, 100.0),
        ]]);
        let outline = build_outline(&doc, "x.pdf", &OutlineOptions::default());
        assert!(outline.outline.is_empty());
    }

    #[test]
    fn test_fallback_title() {
        let mut doc = layout(vec![vec![line("Only body", "Arial", 16.0, 60.0)]]);
        // A tiny span elsewhere sets a larger threshold than any full line
        doc.pages[0].items.push(line("", "Arial", 30.0, 700.0));
        let outline = build_outline(&doc, "file01.pdf", &OutlineOptions::default());
        assert_eq!(outline.title, "file01.pdf");
        assert_eq!(outline.outline.len(), 1);
    }

    #[test]
    fn test_title_threshold_tracks_maximum() {
        let mut doc = layout(vec![vec![
            line("a", "Arial", 12.04, 60.0),
            line("b", "Arial", 18.26, 90.0),
        ]]);
        assert_eq!(title_threshold(&doc), Some(183));
        doc.pages[0].items[0].font_size = 19.0;
        assert_eq!(title_threshold(&doc), Some(190));
    }

    #[test]
    fn test_threshold_equal_to_h1_size_title_first() {
        let doc = layout(vec![vec![
            line("Heading one", "Arial", 16.0, 60.0),
            line("Body", "Arial", 10.0, 90.0),
            line("Heading two", "Arial", 16.0, 120.0),
        ]]);
        let outline = build_outline(&doc, "x.pdf", &OutlineOptions::default());
        assert_eq!(outline.title, "Heading one");
        assert_eq!(outline.outline.len(), 1);
        assert_eq!(outline.outline[0].text, "Heading two");
        assert_eq!(outline.outline[0].level, HeadingLevel::H1);
    }

    #[test]
    fn test_outline_json_shape() {
        let outline = DocumentOutline {
            title: "T".into(),
            outline: vec![OutlineEntry {
                level: HeadingLevel::H2,
                text: "Café".into(),
                page: 3,
            }],
        };
        let json = serde_json::to_string(&outline).unwrap();
        assert_eq!(
            json,
            r#"{"title":"T","outline":[{"level":"H2","text":"Café","page":3}]}"#
        );
    }
}
