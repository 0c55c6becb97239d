//! Résumé text extraction — turns an uploaded DOCX into plain text.
//!
//! Output order is fixed: every body paragraph first, then every table row.
//! This does not follow visual order when tables sit between paragraphs.
//!
//! Extraction never fails past this boundary: `extract_or_fallback` converts
//! any parse error into a diagnostic string that flows on into the prompt.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, warn};

const DOCUMENT_PART: &str = "word/document.xml";
const CELL_DELIMITER: &str = " | ";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a readable DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("could not read document part: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document has no body")]
    MissingBody,
}

/// Result of extraction as seen by the rest of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Text(String),
    /// The document could not be parsed; carries the diagnostic fed to the prompt.
    Fallback(String),
}

impl Extraction {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Extraction::Text(text) | Extraction::Fallback(text) => text,
        }
    }
}

/// Extracts résumé text, degrading any failure into a fallback diagnostic.
pub fn extract_or_fallback(bytes: &[u8]) -> Extraction {
    match extract_text(bytes) {
        Ok(text) => {
            debug!("Extracted {} chars of resume text", text.chars().count());
            Extraction::Text(text)
        }
        Err(e) => {
            warn!("Resume extraction failed, using fallback text: {e}");
            Extraction::Fallback(format!("Error reading file: {e}"))
        }
    }
}

/// Extracts paragraph lines followed by table-row lines from a DOCX payload.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_part(bytes)?;
    let content = parse_body(&xml)?;
    Ok(content.into_plain_text())
}

fn read_document_part(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut part = archive.by_name(DOCUMENT_PART)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

// ────────────────────────────────────────────────────────────────────────────
// Body model
// ────────────────────────────────────────────────────────────────────────────

type Row = Vec<String>;
type Table = Vec<Row>;

#[derive(Debug, Default)]
struct BodyContent {
    paragraphs: Vec<String>,
    tables: Vec<Table>,
}

impl BodyContent {
    fn into_plain_text(self) -> String {
        let paragraph_lines = self
            .paragraphs
            .into_iter()
            .filter(|p| !p.trim().is_empty());

        let row_lines = self.tables.into_iter().flatten().filter_map(|row| {
            let cells: Vec<&str> = row
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect();
            (!cells.is_empty()).then(|| cells.join(CELL_DELIMITER))
        });

        paragraph_lines
            .chain(row_lines)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// WordprocessingML walker
// ────────────────────────────────────────────────────────────────────────────

/// The elements the walker cares about; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Body,
    Paragraph,
    Run,
    Text,
    Table,
    Row,
    Cell,
    CellProps,
    TextBox,
    Other,
}

impl Tag {
    fn of(element: &BytesStart<'_>) -> Self {
        match element.local_name().as_ref() {
            b"body" => Tag::Body,
            b"p" => Tag::Paragraph,
            b"r" => Tag::Run,
            b"t" => Tag::Text,
            b"tbl" => Tag::Table,
            b"tr" => Tag::Row,
            b"tc" => Tag::Cell,
            b"tcPr" => Tag::CellProps,
            b"txbxContent" => Tag::TextBox,
            _ => Tag::Other,
        }
    }
}

/// A `w:tc` being collected, with the merge properties from its `w:tcPr`.
#[derive(Debug)]
struct CellBuilder {
    paragraphs: Vec<String>,
    /// Grid columns covered (`w:gridSpan`).
    span: usize,
    /// Continuation of a vertical merge (`w:vMerge` without `restart`).
    continues_above: bool,
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            span: 1,
            continues_above: false,
        }
    }
}

/// Tracks open elements and the paragraph/table currently being collected.
///
/// Only body-level paragraphs and paragraphs that are direct children of a
/// top-level table's cells are collected. Nested tables and text boxes are
/// skipped.
///
/// Rows are stored per grid column: a cell spanning several columns repeats
/// its text in each, and a vertical-merge continuation repeats the text of
/// the cell above it.
#[derive(Default)]
struct Walker {
    stack: Vec<Tag>,
    saw_body: bool,
    content: BodyContent,
    table: Option<Table>,
    row: Option<Row>,
    cell: Option<CellBuilder>,
    paragraph: Option<String>,
    /// Stack length at the moment the collected paragraph opened.
    paragraph_depth: usize,
}

impl Walker {
    fn parent(&self) -> Option<Tag> {
        self.stack.last().copied()
    }

    fn table_depth(&self) -> usize {
        self.stack.iter().filter(|t| **t == Tag::Table).count()
    }

    fn collecting_run_text(&self) -> bool {
        self.paragraph.is_some()
            && !self.stack[self.paragraph_depth + 1..]
                .iter()
                .any(|t| matches!(t, Tag::TextBox | Tag::Paragraph))
    }

    fn open(&mut self, tag: Tag) {
        let parent = self.parent();
        match tag {
            Tag::Body => self.saw_body = true,
            Tag::Table if self.table_depth() == 0 && parent == Some(Tag::Body) => {
                self.table = Some(Vec::new());
            }
            Tag::Row if self.table_depth() == 1 && parent == Some(Tag::Table) => {
                self.row = Some(Vec::new());
            }
            Tag::Cell if self.table_depth() == 1 && parent == Some(Tag::Row) => {
                self.cell = Some(CellBuilder::default());
            }
            Tag::Paragraph if self.paragraph.is_none() => {
                let body_level = parent == Some(Tag::Body);
                let cell_level = parent == Some(Tag::Cell)
                    && self.table_depth() == 1
                    && self.cell.is_some();
                if body_level || cell_level {
                    self.paragraph = Some(String::new());
                    self.paragraph_depth = self.stack.len();
                }
            }
            _ => {}
        }
        self.stack.push(tag);
    }

    fn close(&mut self) {
        let Some(tag) = self.stack.pop() else {
            return;
        };
        let parent = self.parent();
        match tag {
            Tag::Paragraph if self.stack.len() == self.paragraph_depth => {
                if let Some(text) = self.paragraph.take() {
                    match parent {
                        Some(Tag::Body) => self.content.paragraphs.push(text),
                        Some(Tag::Cell) => {
                            if let Some(cell) = self.cell.as_mut() {
                                cell.paragraphs.push(text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Tag::Cell if self.table_depth() == 1 && parent == Some(Tag::Row) => {
                if let Some(cell) = self.cell.take() {
                    self.finish_cell(cell);
                }
            }
            Tag::Row if self.table_depth() == 1 && parent == Some(Tag::Table) => {
                if let (Some(row), Some(table)) = (self.row.take(), self.table.as_mut()) {
                    table.push(row);
                }
            }
            Tag::Table if self.table_depth() == 0 && parent == Some(Tag::Body) => {
                if let Some(table) = self.table.take() {
                    self.content.tables.push(table);
                }
            }
            _ => {}
        }
    }

    /// Appends a finished cell to the current row, once per grid column.
    fn finish_cell(&mut self, cell: CellBuilder) {
        let Some(row) = self.row.as_mut() else {
            return;
        };
        let text = if cell.continues_above {
            let column = row.len();
            self.table
                .as_ref()
                .and_then(|table| table.last())
                .and_then(|above| above.get(column))
                .cloned()
                .unwrap_or_default()
        } else {
            cell.paragraphs.join("\n")
        };
        row.extend(std::iter::repeat(text).take(cell.span.max(1)));
    }

    fn in_own_cell_props(&self) -> bool {
        self.cell.is_some() && self.table_depth() == 1 && self.parent() == Some(Tag::CellProps)
    }

    /// Self-closing elements: run-level breaks and tabs, cell merge
    /// properties, and empty cells.
    fn empty(&mut self, element: &BytesStart<'_>) {
        let in_run = self.parent() == Some(Tag::Run);
        match element.local_name().as_ref() {
            b"tab" if in_run && self.collecting_run_text() => self.push_text("\t"),
            b"br" | b"cr" if in_run && self.collecting_run_text() => self.push_text("\n"),
            b"gridSpan" if self.in_own_cell_props() => {
                let span = attribute(element, b"val").and_then(|v| v.parse().ok());
                if let (Some(cell), Some(span)) = (self.cell.as_mut(), span) {
                    cell.span = span;
                }
            }
            b"vMerge" if self.in_own_cell_props() => {
                let restart = attribute(element, b"val").as_deref() == Some("restart");
                if let Some(cell) = self.cell.as_mut() {
                    cell.continues_above = !restart;
                }
            }
            b"tc" if self.table_depth() == 1 && self.parent() == Some(Tag::Row) => {
                self.finish_cell(CellBuilder::default());
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.parent() == Some(Tag::Text) && self.collecting_run_text() {
            self.push_text(text);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_str(text);
        }
    }
}

/// Value of the attribute with the given local name, namespace ignored.
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn parse_body(xml: &str) -> Result<BodyContent, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = Walker::default();

    loop {
        match reader.read_event()? {
            Event::Start(element) => walker.open(Tag::of(&element)),
            Event::End(_) => walker.close(),
            Event::Empty(element) => walker.empty(&element),
            Event::Text(text) => {
                walker.text(&text.unescape().map_err(quick_xml::Error::from)?)
            }
            Event::CData(data) => walker.text(&String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
    }

    if !walker.saw_body {
        return Err(ExtractError::MissingBody);
    }
    Ok(walker.content)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{docx, para, table};
    use super::*;

    #[test]
    fn test_single_paragraph() {
        let bytes = docx(&para("5 years backend experience"));
        assert_eq!(extract_text(&bytes).unwrap(), "5 years backend experience");
    }

    #[test]
    fn test_blank_document_extracts_to_empty_string() {
        let body = format!(
            "{}{}<w:p/>{}",
            para("   "),
            para(""),
            table(&[&["", "  "], &["\t", ""]])
        );
        assert_eq!(extract_text(&docx(&body)).unwrap(), "");
    }

    #[test]
    fn test_paragraphs_precede_tables_regardless_of_position() {
        let body = format!(
            "{}{}{}",
            para("Summary"),
            table(&[&["Skill", "Years"], &["Rust", "4"]]),
            para("References on request")
        );
        assert_eq!(
            extract_text(&docx(&body)).unwrap(),
            "Summary\nReferences on request\nSkill | Years\nRust | 4"
        );
    }

    #[test]
    fn test_empty_cells_are_skipped_and_empty_rows_dropped() {
        let body = table(&[&["", "Go", " "], &["", ""], &["Kafka", ""]]);
        assert_eq!(extract_text(&docx(&body)).unwrap(), "Go\nKafka");
    }

    #[test]
    fn test_runs_tabs_and_breaks_are_joined() {
        let body = r#"<w:p><w:r><w:t>Senior</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> Engineer</w:t><w:br/><w:t>2019 &amp; 2020</w:t></w:r></w:p>"#;
        assert_eq!(
            extract_text(&docx(body)).unwrap(),
            "Senior\t Engineer\n2019 & 2020"
        );
    }

    #[test]
    fn test_nested_tables_do_not_leak_into_outer_cells() {
        let inner = table(&[&["inner"]]);
        let body = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para("outer"),
            inner,
            para("right")
        );
        assert_eq!(extract_text(&docx(&body)).unwrap(), "outer | right");
    }

    #[test]
    fn test_multi_paragraph_cell_keeps_line_break() {
        let body = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            para("Line one"),
            para("Line two")
        );
        assert_eq!(extract_text(&docx(&body)).unwrap(), "Line one\nLine two");
    }

    #[test]
    fn test_horizontally_merged_cell_repeats_per_column() {
        let body = format!(
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>"#,
            para("Skills"),
            para("Rust")
        );
        assert_eq!(extract_text(&docx(&body)).unwrap(), "Skills | Skills | Rust");
    }

    #[test]
    fn test_vertical_merge_continuation_repeats_cell_above() {
        let body = format!(
            concat!(
                "<w:tbl>",
                r#"<w:tr><w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr>{}</w:tc><w:tc>{}</w:tc></w:tr>"#,
                "<w:tr><w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc><w:tc>{}</w:tc></w:tr>",
                r#"<w:tr><w:tc><w:tcPr><w:vMerge w:val="continue"/></w:tcPr><w:p/></w:tc><w:tc/></w:tr>"#,
                "</w:tbl>"
            ),
            para("Acme Corp"),
            para("2019"),
            para("2020")
        );
        assert_eq!(
            extract_text(&docx(&body)).unwrap(),
            "Acme Corp | 2019\nAcme Corp | 2020\nAcme Corp"
        );
    }

    #[test]
    fn test_vertical_merge_below_spanning_cell_keeps_columns_aligned() {
        let body = format!(
            concat!(
                "<w:tbl>",
                r#"<w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/><w:vMerge w:val="restart"/></w:tcPr>{}</w:tc><w:tc>{}</w:tc></w:tr>"#,
                r#"<w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/><w:vMerge/></w:tcPr><w:p/></w:tc><w:tc>{}</w:tc></w:tr>"#,
                "</w:tbl>"
            ),
            para("Projects"),
            para("a"),
            para("b")
        );
        assert_eq!(
            extract_text(&docx(&body)).unwrap(),
            "Projects | Projects | a\nProjects | Projects | b"
        );
    }

    #[test]
    fn test_deleted_text_is_ignored() {
        let body = r#"<w:p><w:del><w:r><w:delText>old</w:delText></w:r></w:del><w:r><w:t>new</w:t></w:r></w:p>"#;
        assert_eq!(extract_text(&docx(body)).unwrap(), "new");
    }

    #[test]
    fn test_garbage_bytes_fall_back_to_diagnostic() {
        let extraction = extract_or_fallback(b"definitely not a zip archive");
        assert!(extraction.is_fallback());
        let text = extraction.into_text();
        assert!(!text.is_empty());
        assert!(text.starts_with("Error reading file:"));
    }

    #[test]
    fn test_zip_without_document_part_falls_back() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("notes.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(extract_text(&bytes).is_err());
        assert!(extract_or_fallback(&bytes).is_fallback());
    }

    #[test]
    fn test_document_without_body_is_an_error() {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:document xmlns:w=\"x\"/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(extract_text(&bytes), Err(ExtractError::MissingBody)));
    }

    #[test]
    fn test_empty_upload_falls_back() {
        assert!(extract_or_fallback(&[]).is_fallback());
    }
}
