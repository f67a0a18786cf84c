//! Span extraction from PDF using lopdf
//!
//! This module walks page content streams and produces positioned text spans
//! with their font metadata, then groups them into physical text lines.
//! All boxes are in page space with the origin at the top-left corner.

use crate::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// US Letter, used when a page carries no MediaBox anywhere in its tree
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Fraction of the font size above the baseline
const ASCENT_RATIO: f32 = 0.8;
/// Fraction of the font size below the baseline
const DESCENT_RATIO: f32 = 0.2;

/// Average glyph advance as a fraction of the font size (no glyph widths)
const AVG_CHAR_WIDTH: f32 = 0.5;

/// Baselines closer than this belong to the same line
const LINE_Y_TOLERANCE: f32 = 3.0;

/// TJ adjustments more negative than this are rendered as a word gap
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Page trees deeper than this are treated as cyclic
const MAX_TREE_DEPTH: usize = 32;

/// Axis-aligned bounding box, origin at the top-left of the page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// A styled text run (span) with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// Bounding box on the page
    pub bbox: BBox,
    /// Base font name with any subset prefix removed
    pub font: String,
    /// Rendered font size
    pub font_size: f32,
    /// Font name marks the face as bold
    pub is_bold: bool,
    /// Page index (0-based)
    pub page: u32,
}

impl TextItem {
    /// Font size rounded to one decimal, in tenths of a point
    pub fn size_tenths(&self) -> i32 {
        round_tenths(self.font_size)
    }

    /// Font size rounded to the nearest whole point
    pub fn size_points(&self) -> i32 {
        round_points(self.font_size)
    }

    /// Baseline position, measured from the top of the page
    pub fn baseline(&self) -> f32 {
        self.bbox.y1 - self.font_size * DESCENT_RATIO
    }

    /// Whether the span shows only whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Round a size to one decimal and return it in tenths.
///
/// Halfway cases round to even so that 10.25 and 10.35 stay stable across runs.
pub fn round_tenths(size: f32) -> i32 {
    (f64::from(size) * 10.0).round_ties_even() as i32
}

/// Round a size to a whole point, halfway cases to even
pub fn round_points(size: f32) -> i32 {
    f64::from(size).round_ties_even() as i32
}

/// Check if a font name indicates a bold face
pub fn is_bold_font(font_name: &str) -> bool {
    font_name.to_lowercase().contains("bold")
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub page: u32,
}

impl TextLine {
    /// Span texts joined by single spaces, blank spans dropped
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The span whose style stands for the whole line
    pub fn first(&self) -> Option<&TextItem> {
        self.items.first()
    }

    pub fn font(&self) -> &str {
        self.first().map(|i| i.font.as_str()).unwrap_or("")
    }

    pub fn font_size(&self) -> f32 {
        self.first().map(|i| i.font_size).unwrap_or(0.0)
    }

    pub fn is_bold(&self) -> bool {
        self.first().map(|i| i.is_bold).unwrap_or(false)
    }

    pub fn bbox(&self) -> BBox {
        let mut iter = self.items.iter();
        match iter.next() {
            Some(first) => iter.fold(first.bbox, |acc, i| acc.union(&i.bbox)),
            None => BBox::default(),
        }
    }
}

/// Spans and geometry of a single page
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Page index (0-based)
    pub index: u32,
    pub width: f32,
    pub height: f32,
    /// Spans in content stream order, whitespace-only spans included
    pub items: Vec<TextItem>,
}

impl PageLayout {
    /// Collect the page's spans into lines
    pub fn lines(&self) -> Vec<TextLine> {
        group_into_lines(self.items.clone())
    }
}

/// Per-page layout of a whole document
#[derive(Debug, Clone, Default)]
pub struct PdfLayout {
    pub pages: Vec<PageLayout>,
}

impl PdfLayout {
    /// Every span on every page, in page order
    pub fn items(&self) -> impl Iterator<Item = &TextItem> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn page_height(&self, page: u32) -> Option<f32> {
        self.pages.get(page as usize).map(|p| p.height)
    }
}

/// Extract the span layout of a PDF file
pub fn extract_layout<P: AsRef<Path>>(path: P) -> Result<PdfLayout, PdfError> {
    let doc = Document::load(path)?;
    extract_layout_from_doc(&doc)
}

/// Extract the span layout from a memory buffer
pub fn extract_layout_mem(buffer: &[u8]) -> Result<PdfLayout, PdfError> {
    let doc = Document::load_mem(buffer)?;
    extract_layout_from_doc(&doc)
}

fn extract_layout_from_doc(doc: &Document) -> Result<PdfLayout, PdfError> {
    let pages = doc.get_pages();
    let mut layout = PdfLayout::default();

    for (index, &page_id) in pages.values().enumerate() {
        let index = index as u32;
        let media_box = page_media_box(doc, page_id);
        let items = extract_page_text_items(doc, page_id, index, &media_box)?;
        log::trace!("page {}: {} spans", index, items.len());
        layout.pages.push(PageLayout {
            index,
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
            items,
        });
    }

    Ok(layout)
}

/// MediaBox of a page, walking up the page tree for inherited values
fn page_media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let mut dict = doc.get_dictionary(page_id).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(current) = dict else {
            break;
        };
        if let Some(array) = current.get(b"MediaBox").ok().and_then(|o| resolve_array(doc, o)) {
            if array.len() >= 4 {
                let mut media_box = DEFAULT_MEDIA_BOX;
                for (slot, value) in media_box.iter_mut().zip(array.iter()) {
                    if let Some(n) = get_number(value) {
                        *slot = n;
                    }
                }
                return media_box;
            }
        }
        dict = current
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    DEFAULT_MEDIA_BOX
}

fn resolve_array<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Vec<Object>> {
    match obj {
        Object::Array(array) => Some(array),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok(),
        _ => None,
    }
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Text state while walking a content stream
struct TextState {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    font_key: String,
    font_size: f32,
    leading: Option<f32>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            font_key: String::new(),
            font_size: 12.0,
            leading: None,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text_block: false,
        }
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        // Td operands are in text space, scaled by the line matrix
        self.line_matrix[4] += tx * self.line_matrix[0] + ty * self.line_matrix[2];
        self.line_matrix[5] += tx * self.line_matrix[1] + ty * self.line_matrix[3];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading.unwrap_or(self.font_size * 1.2);
        self.translate_line(0.0, -leading);
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Resolved page fonts: resource name -> (base font name, font dictionary)
type PageFonts<'a> = HashMap<Vec<u8>, (String, &'a Dictionary)>;

fn page_fonts(doc: &Document, page_id: ObjectId) -> PageFonts<'_> {
    let fonts: BTreeMap<Vec<u8>, &Dictionary> = doc.get_page_fonts(page_id).unwrap_or_default();

    fonts
        .into_iter()
        .map(|(key, dict)| {
            let base_font = dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
                .unwrap_or_else(|| String::from_utf8_lossy(&key).to_string());
            (key, (base_font, dict))
        })
        .collect()
}

/// Remove the "ABCDEF+" tag embedded subsets carry
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Extract text items from a single page
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page_index: u32,
    media_box: &[f32; 4],
) -> Result<Vec<TextItem>, PdfError> {
    use lopdf::content::Content;

    let fonts = page_fonts(doc, page_id);

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let mut items = Vec::new();
    let mut state = TextState::new();

    for op in &content.operations {
        let operands = &op.operands;
        let shown: Option<String> = match op.operator.as_str() {
            "q" => {
                state.ctm_stack.push(state.ctm);
                None
            }
            "Q" => {
                if let Some(saved) = state.ctm_stack.pop() {
                    state.ctm = saved;
                }
                None
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
                None
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
                None
            }
            "ET" => {
                state.in_text_block = false;
                None
            }
            "Tf" => {
                if operands.len() >= 2 {
                    if let Ok(name) = operands[0].as_name() {
                        state.font_key = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&operands[1]) {
                        state.font_size = size;
                    }
                }
                None
            }
            "TL" => {
                state.leading = operands.first().and_then(get_number);
                None
            }
            "Td" | "TD" => {
                if operands.len() >= 2 {
                    let tx = get_number(&operands[0]).unwrap_or(0.0);
                    let ty = get_number(&operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = Some(-ty);
                    }
                    state.translate_line(tx, ty);
                }
                None
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
                None
            }
            "T*" => {
                state.next_line();
                None
            }
            "Tj" => operands
                .first()
                .and_then(|o| decode_operand(o, doc, &fonts, &state.font_key)),
            "TJ" => operands
                .first()
                .and_then(|o| o.as_array().ok())
                .map(|array| decode_tj_array(array, doc, &fonts, &state.font_key)),
            "'" => {
                state.next_line();
                operands
                    .first()
                    .and_then(|o| decode_operand(o, doc, &fonts, &state.font_key))
            }
            "\"" => {
                state.next_line();
                operands
                    .get(2)
                    .and_then(|o| decode_operand(o, doc, &fonts, &state.font_key))
            }
            _ => None,
        };

        if let Some(text) = shown {
            if state.in_text_block && !text.is_empty() {
                items.push(make_item(text, &state, &fonts, page_index, media_box));
            }
        }
    }

    Ok(items)
}

fn make_item(
    text: String,
    state: &TextState,
    fonts: &PageFonts<'_>,
    page_index: u32,
    media_box: &[f32; 4],
) -> TextItem {
    let combined = multiply_matrices(&state.text_matrix, &state.ctm);
    let size = effective_font_size(state.font_size, &combined);
    let font = fonts
        .get(state.font_key.as_bytes())
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| state.font_key.clone());

    // Flip to a top-left origin
    let x0 = combined[4] - media_box[0];
    let baseline = media_box[3] - combined[5];
    let width = text.chars().count() as f32 * size * AVG_CHAR_WIDTH;

    TextItem {
        bbox: BBox::new(
            x0,
            baseline - size * ASCENT_RATIO,
            x0 + width,
            baseline + size * DESCENT_RATIO,
        ),
        is_bold: is_bold_font(&font),
        font,
        font_size: size,
        page: page_index,
        text,
    }
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn matrix_operands(operands: &[Object]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        m[i] = get_number(operand).unwrap_or(IDENTITY[i]);
    }
    Some(m)
}

/// Compute effective font size from base size and the text rendering matrix
/// Matrix is [a, b, c, d, tx, ty]; the vertical scale is the length of (c, d)
fn effective_font_size(base_size: f32, matrix: &[f32; 6]) -> f32 {
    let scale_x = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
    let scale_y = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
    // Use the larger of the two scales (usually they're equal for non-rotated text)
    base_size.abs() * scale_x.max(scale_y)
}

fn decode_tj_array(
    array: &[Object],
    doc: &Document,
    fonts: &PageFonts<'_>,
    current_font: &str,
) -> String {
    let mut combined = String::new();
    for item in array {
        match get_number(item) {
            Some(adjust) if adjust < TJ_SPACE_THRESHOLD => {
                if !combined.ends_with(' ') {
                    combined.push(' ');
                }
            }
            Some(_) => {}
            None => {
                if let Some(text) = decode_operand(item, doc, fonts, current_font) {
                    combined.push_str(&text);
                }
            }
        }
    }
    combined
}

/// Extract text from a text operand, handling encoding
fn decode_operand(
    obj: &Object,
    doc: &Document,
    fonts: &PageFonts<'_>,
    current_font: &str,
) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };

    if let Some((_, font_dict)) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return Some(text);
            }
        }
    }

    // Fallback: try UTF-16BE then Latin-1
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }

    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Group text items into lines.
///
/// Preserves stream order, which is usually reading order, and only merges
/// consecutive spans of one page whose baselines sit within tolerance.
/// Whitespace-only spans never take part in a line.
pub fn group_into_lines(items: Vec<TextItem>) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();

    for item in items.into_iter().filter(|i| !i.is_blank()) {
        match lines.last_mut() {
            Some(last) if same_line(last, &item) => last.items.push(item),
            _ => {
                let page = item.page;
                lines.push(TextLine {
                    items: vec![item],
                    page,
                });
            }
        }
    }

    // Sort items within each line by X position (left to right)
    for line in &mut lines {
        line.items.sort_by(|a, b| {
            a.bbox
                .x0
                .partial_cmp(&b.bbox.x0)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    lines.retain(|line| !line.text().is_empty());
    lines
}

fn same_line(line: &TextLine, item: &TextItem) -> bool {
    line.page == item.page
        && line
            .items
            .last()
            .map_or(false, |last| (last.baseline() - item.baseline()).abs() < LINE_Y_TOLERANCE)
}
