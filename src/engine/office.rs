//! Office Open XML and spreadsheet readers.
//!
//! - `.docx`: `word/document.xml` streamed with `quick-xml`. Paragraph
//!   styles map to headings, numbered/list paragraphs to `- ` items, and
//!   bold/italic runs to emphasis. Tables become GFM tables.
//! - `.pptx`: `ppt/slides/slideN.xml` in slide order, each introduced by a
//!   `<!-- Slide number: N -->` marker. Title placeholders become `# `.
//! - spreadsheets: every sheet through `calamine`, one `## <sheet>`
//!   section with a table per sheet.

use crate::engine::table::markdown_table;
use crate::error::EngineFault;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex"));

fn parse_fault(format: &str, detail: impl ToString) -> EngineFault {
    EngineFault::Parse {
        format: format.to_string(),
        detail: detail.to_string(),
    }
}

fn open_package<'a>(bytes: &'a [u8], format: &str) -> Result<ZipArchive<Cursor<&'a [u8]>>, EngineFault> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| parse_fault(format, e))
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: &str,
) -> Result<String, EngineFault> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| parse_fault(format, format!("{name}: {e}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| parse_fault(format, format!("{name}: {e}")))?;
    Ok(xml)
}

/// Value of the attribute whose local name is `key`, e.g. `w:val` → `val`.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| {
            std::str::from_utf8(&a.value)
                .ok()
                .and_then(|s| quick_xml::escape::unescape(s).ok().map(|v| v.into_owned()))
        })
}

/// `<w:b/>` and `<w:b w:val="true"/>` switch a toggle on; `0`/`false` off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(attr(e, b"val").as_deref(), Some("0" | "false" | "off"))
}

/// Heading level for a paragraph style id such as `Heading2` or `Title`.
fn heading_level(style: &str) -> Option<usize> {
    let s: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if s == "title" {
        return Some(1);
    }
    let level: usize = s.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

// ── docx ─────────────────────────────────────────────────────────────────────

/// Emphasised text segment of a paragraph.
#[derive(Debug, Default)]
struct Segment {
    text: String,
    bold: bool,
    italic: bool,
}

impl Segment {
    fn render(&self, out: &mut String) {
        let core = self.text.trim();
        if core.is_empty() || !(self.bold || self.italic) {
            out.push_str(&self.text);
            return;
        }
        let marker = match (self.bold, self.italic) {
            (true, true) => "***",
            (true, false) => "**",
            _ => "*",
        };
        let lead = &self.text[..self.text.len() - self.text.trim_start().len()];
        let trail = &self.text[self.text.trim_end().len()..];
        out.push_str(lead);
        out.push_str(marker);
        out.push_str(core);
        out.push_str(marker);
        out.push_str(trail);
    }
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    list: bool,
    segments: Vec<Segment>,
}

impl Paragraph {
    fn push(&mut self, text: &str, bold: bool, italic: bool) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.bold == bold && last.italic == italic => last.text.push_str(text),
            _ => self.segments.push(Segment {
                text: text.to_string(),
                bold,
                italic,
            }),
        }
    }

    fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    fn markdown(&self) -> String {
        let mut body = String::new();
        for seg in &self.segments {
            seg.render(&mut body);
        }
        let body = body.trim();
        if body.is_empty() {
            return String::new();
        }
        let style = self.style.as_deref().unwrap_or("");
        if let Some(level) = heading_level(style) {
            // headings carry their own weight
            let plain = self.plain_text();
            return format!("{} {}", "#".repeat(level), plain.trim());
        }
        if self.list || style.eq_ignore_ascii_case("ListParagraph") {
            return format!("- {body}");
        }
        body.to_string()
    }

    fn is_list(&self) -> bool {
        self.list
            || self
                .style
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("ListParagraph"))
    }
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

enum Block {
    Text(String),
    ListItem(String),
}

#[derive(Default)]
struct DocxWriter {
    blocks: Vec<Block>,
    tables: Vec<Table>,
    paragraph: Option<Paragraph>,
    in_run: bool,
    in_text: bool,
    bold: bool,
    italic: bool,
}

impl DocxWriter {
    fn open(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"p" => self.paragraph = Some(Paragraph::default()),
            b"pStyle" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style = attr(e, b"val");
                }
            }
            b"numPr" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.list = true;
                }
            }
            b"r" => {
                self.in_run = true;
                self.bold = false;
                self.italic = false;
            }
            b"b" if self.in_run => self.bold = toggle_on(e),
            b"i" if self.in_run => self.italic = toggle_on(e),
            b"t" if self.in_run => self.in_text = true,
            b"tab" if self.in_run => self.run_text("\t"),
            b"br" | b"cr" if self.in_run => self.run_text("\n"),
            b"tbl" => self.tables.push(Table::default()),
            b"tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.row.clear();
                }
            }
            b"tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text = false,
            b"r" => self.in_run = false,
            b"p" => self.finish_paragraph(),
            b"tc" => {
                if let Some(t) = self.tables.last_mut() {
                    let cell = std::mem::take(&mut t.cell).join(" ");
                    t.row.push(cell);
                }
            }
            b"tr" => {
                if let Some(t) = self.tables.last_mut() {
                    let row = std::mem::take(&mut t.row);
                    t.rows.push(row);
                }
            }
            b"tbl" => self.finish_table(),
            _ => {}
        }
    }

    fn run_text(&mut self, text: &str) {
        let (bold, italic) = (self.bold, self.italic);
        if let Some(p) = self.paragraph.as_mut() {
            p.push(text, bold, italic);
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text {
            self.run_text(text);
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(p) = self.paragraph.take() else {
            return;
        };
        let md = p.markdown();
        if md.is_empty() {
            return;
        }
        match self.tables.last_mut() {
            Some(t) => t.cell.push(md),
            None if p.is_list() => self.blocks.push(Block::ListItem(md)),
            None => self.blocks.push(Block::Text(md)),
        }
    }

    fn finish_table(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };
        match self.tables.last_mut() {
            // nested tables flatten into the enclosing cell
            Some(parent) => {
                let flat = table
                    .rows
                    .iter()
                    .map(|r| r.join(" "))
                    .collect::<Vec<_>>()
                    .join(" ");
                parent.cell.push(flat);
            }
            None => {
                let md = markdown_table(&table.rows);
                if !md.is_empty() {
                    self.blocks.push(Block::Text(md.trim_end().to_string()));
                }
            }
        }
    }

    fn finish(self) -> String {
        let mut out = String::new();
        let mut prev_list = false;
        for block in self.blocks {
            let (text, is_list) = match block {
                Block::Text(t) => (t, false),
                Block::ListItem(t) => (t, true),
            };
            if !out.is_empty() {
                out.push_str(if prev_list && is_list { "\n" } else { "\n\n" });
            }
            out.push_str(&text);
            prev_list = is_list;
        }
        out
    }
}

/// Convert a `.docx` package to Markdown.
pub fn docx_to_markdown(bytes: &[u8]) -> Result<String, EngineFault> {
    let mut archive = open_package(bytes, "docx")?;
    let xml = read_part(&mut archive, "word/document.xml", "docx")?;

    let mut reader = Reader::from_str(&xml);
    let mut writer = DocxWriter::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => writer.open(&e),
            Ok(Event::Empty(e)) => {
                writer.open(&e);
                writer.close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => writer.close(e.local_name().as_ref()),
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| parse_fault("docx", e))?;
                writer.text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_fault("docx", e)),
        }
        buf.clear();
    }
    Ok(writer.finish())
}

// ── pptx ─────────────────────────────────────────────────────────────────────

/// Slide part names ordered by slide number (`slide10` after `slide9`).
fn slide_parts(archive: &ZipArchive<Cursor<&[u8]>>) -> Vec<(u32, String)> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = SLIDE_PART.captures(name)?;
            let n = caps.get(1)?.as_str().parse().ok()?;
            Some((n, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(n, _)| *n);
    slides
}

fn slide_paragraphs(xml: &str) -> Result<Vec<String>, EngineFault> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut title_shape = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => title_shape = false,
                b"t" => in_text = true,
                b"p" => current.clear(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"ph" => {
                    title_shape = matches!(attr(&e, b"type").as_deref(), Some("title" | "ctrTitle"))
                }
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = current.trim();
                    if !text.is_empty() {
                        paragraphs.push(if title_shape {
                            format!("# {text}")
                        } else {
                            text.to_string()
                        });
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| parse_fault("pptx", e))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(parse_fault("pptx", e)),
        }
        buf.clear();
    }
    Ok(paragraphs)
}

/// Convert a `.pptx` package to Markdown.
pub fn pptx_to_markdown(bytes: &[u8]) -> Result<String, EngineFault> {
    let mut archive = open_package(bytes, "pptx")?;
    let mut sections = Vec::new();
    for (number, part) in slide_parts(&archive) {
        let xml = read_part(&mut archive, &part, "pptx")?;
        let mut section = format!("<!-- Slide number: {number} -->");
        for paragraph in slide_paragraphs(&xml)? {
            section.push('\n');
            section.push_str(&paragraph);
        }
        sections.push(section);
    }
    Ok(sections.join("\n\n"))
}

// ── spreadsheets ─────────────────────────────────────────────────────────────

/// Convert every sheet of a workbook at `path` (format chosen by extension).
pub fn spreadsheet_to_markdown(path: &Path) -> Result<String, EngineFault> {
    use calamine::{open_workbook_auto, Reader as _};

    let mut workbook = open_workbook_auto(path).map_err(|e| parse_fault("spreadsheet", e))?;
    let mut sections = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| parse_fault("spreadsheet", format!("{name}: {e}")))?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .collect();
        let mut section = format!("## {name}");
        let table = markdown_table(&rows);
        if !table.is_empty() {
            section.push_str("\n\n");
            section.push_str(table.trim_end());
        }
        sections.push(section);
    }
    Ok(sections.join("\n\n"))
}
