//! 最小化的 OOXML (.docx) 編碼器
//!
//! 只寫出 Word 開檔所需的四個部件：`[Content_Types].xml`、`_rels/.rels`、
//! `word/document.xml`、`docProps/core.xml`。

use crate::domain::model::{AssemblyResult, StyledBlock, TextRun};
use crate::domain::ports::DocumentEncoder;
use crate::utils::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// 版面設定，單位與 Word 相同 (twip / 半點)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DocxLayout {
    margin_twips: u32,
    header_font_half_points: u32,
    header_spacing_after: u32,
    paragraph_spacing_after: u32,
}

impl Default for DocxLayout {
    fn default() -> Self {
        Self {
            // 1 inch
            margin_twips: 1440,
            header_font_half_points: 28,
            header_spacing_after: 200,
            paragraph_spacing_after: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocxEncoder {
    title: String,
    created: DateTime<Utc>,
    layout: DocxLayout,
}

impl DocxEncoder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            created: Utc::now(),
            layout: DocxLayout::default(),
        }
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    fn document_xml(&self, document: &AssemblyResult) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_decl(&mut writer)?;

        let mut root = BytesStart::new("w:document");
        root.push_attribute(("xmlns:w", W_NS));
        writer.write_event(Event::Start(root))?;
        writer.write_event(Event::Start(BytesStart::new("w:body")))?;

        for block in document {
            self.write_paragraph(&mut writer, block)?;
        }

        self.write_section(&mut writer)?;

        writer.write_event(Event::End(BytesEnd::new("w:body")))?;
        writer.write_event(Event::End(BytesEnd::new("w:document")))?;

        Ok(writer.into_inner().into_inner())
    }

    fn write_paragraph<W: Write>(&self, writer: &mut Writer<W>, block: &StyledBlock) -> Result<()> {
        if block.is_spacer() {
            writer.write_event(Event::Empty(BytesStart::new("w:p")))?;
            return Ok(());
        }

        let (spacing_after, font_size) = match block {
            StyledBlock::Header { .. } => (
                Some(self.layout.header_spacing_after),
                Some(self.layout.header_font_half_points),
            ),
            StyledBlock::LabelValue { .. } | StyledBlock::Plain { .. } => {
                (Some(self.layout.paragraph_spacing_after), None)
            }
            StyledBlock::Error { .. } | StyledBlock::Spacer => (None, None),
        };

        writer.write_event(Event::Start(BytesStart::new("w:p")))?;

        if let Some(after) = spacing_after {
            writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
            let mut spacing = BytesStart::new("w:spacing");
            spacing.push_attribute(("w:after", after.to_string().as_str()));
            writer.write_event(Event::Empty(spacing))?;
            writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
        }

        for run in block.runs() {
            write_run(writer, &run, font_size)?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
        Ok(())
    }

    fn write_section<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let margin = self.layout.margin_twips.to_string();

        writer.write_event(Event::Start(BytesStart::new("w:sectPr")))?;

        // US Letter
        let mut size = BytesStart::new("w:pgSz");
        size.push_attribute(("w:w", "12240"));
        size.push_attribute(("w:h", "15840"));
        writer.write_event(Event::Empty(size))?;

        let mut margins = BytesStart::new("w:pgMar");
        for side in ["w:top", "w:right", "w:bottom", "w:left"] {
            margins.push_attribute((side, margin.as_str()));
        }
        margins.push_attribute(("w:header", "720"));
        margins.push_attribute(("w:footer", "720"));
        margins.push_attribute(("w:gutter", "0"));
        writer.write_event(Event::Empty(margins))?;

        writer.write_event(Event::End(BytesEnd::new("w:sectPr")))?;
        Ok(())
    }

    fn core_properties_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_decl(&mut writer)?;

        let mut root = BytesStart::new("cp:coreProperties");
        root.push_attribute((
            "xmlns:cp",
            "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
        ));
        root.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
        root.push_attribute(("xmlns:dcterms", "http://purl.org/dc/terms/"));
        root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
        writer.write_event(Event::Start(root))?;

        write_simple_element(&mut writer, "dc:title", &self.title)?;
        write_simple_element(&mut writer, "dc:creator", env!("CARGO_PKG_NAME"))?;

        let created = self.created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut created_elem = BytesStart::new("dcterms:created");
        created_elem.push_attribute(("xsi:type", "dcterms:W3CDTF"));
        writer.write_event(Event::Start(created_elem))?;
        writer.write_event(Event::Text(BytesText::new(&created)))?;
        writer.write_event(Event::End(BytesEnd::new("dcterms:created")))?;

        writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
        Ok(writer.into_inner().into_inner())
    }
}

impl DocumentEncoder for DocxEncoder {
    fn encode(&self, document: &AssemblyResult) -> Result<Vec<u8>> {
        tracing::debug!("Encoding {} blocks as DOCX", document.len());

        let document_xml = self.document_xml(document)?;
        let core_xml = self.core_properties_xml()?;

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file::<_, ()>("[Content_Types].xml", FileOptions::default())?;
        zip.write_all(content_types_xml()?.as_slice())?;

        zip.start_file::<_, ()>("_rels/.rels", FileOptions::default())?;
        zip.write_all(package_rels_xml()?.as_slice())?;

        zip.start_file::<_, ()>("word/document.xml", FileOptions::default())?;
        zip.write_all(&document_xml)?;

        zip.start_file::<_, ()>("docProps/core.xml", FileOptions::default())?;
        zip.write_all(&core_xml)?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    fn content_type(&self) -> &'static str {
        DOCX_CONTENT_TYPE
    }
}

fn write_decl<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(())
}

fn write_simple_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&xml_safe(value))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_run<W: Write>(writer: &mut Writer<W>, run: &TextRun, font_size: Option<u32>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("w:r")))?;

    if run.bold || run.color.is_some() || font_size.is_some() {
        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        if run.bold {
            writer.write_event(Event::Empty(BytesStart::new("w:b")))?;
        }
        if let Some(color) = &run.color {
            let mut elem = BytesStart::new("w:color");
            elem.push_attribute(("w:val", color.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        if let Some(size) = font_size {
            let mut elem = BytesStart::new("w:sz");
            elem.push_attribute(("w:val", size.to_string().as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
    }

    // 值的前導空白必須保留
    let mut text = BytesStart::new("w:t");
    text.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(text))?;
    writer.write_event(Event::Text(BytesText::new(&xml_safe(&run.text))))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;

    writer.write_event(Event::End(BytesEnd::new("w:r")))?;
    Ok(())
}

/// XML 1.0 不允許的字元 (C0 控制字元、U+FFFE、U+FFFF) 換成空白；
/// quick-xml 只跳脫 `& < > " '`
fn xml_safe(text: &str) -> Cow<'_, str> {
    fn forbidden(c: char) -> bool {
        (c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')) || matches!(c, '\u{FFFE}' | '\u{FFFF}')
    }

    if text.chars().any(forbidden) {
        Cow::Owned(
            text.chars()
                .map(|c| if forbidden(c) { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

fn content_types_xml() -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_decl(&mut writer)?;

    let mut root = BytesStart::new("Types");
    root.push_attribute((
        "xmlns",
        "http://schemas.openxmlformats.org/package/2006/content-types",
    ));
    writer.write_event(Event::Start(root))?;

    for (extension, content_type) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
    ] {
        let mut elem = BytesStart::new("Default");
        elem.push_attribute(("Extension", extension));
        elem.push_attribute(("ContentType", content_type));
        writer.write_event(Event::Empty(elem))?;
    }

    for (part, content_type) in [
        (
            "/word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        ),
        (
            "/docProps/core.xml",
            "application/vnd.openxmlformats-package.core-properties+xml",
        ),
    ] {
        let mut elem = BytesStart::new("Override");
        elem.push_attribute(("PartName", part));
        elem.push_attribute(("ContentType", content_type));
        writer.write_event(Event::Empty(elem))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(writer.into_inner().into_inner())
}

fn package_rels_xml() -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_decl(&mut writer)?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute((
        "xmlns",
        "http://schemas.openxmlformats.org/package/2006/relationships",
    ));
    writer.write_event(Event::Start(root))?;

    for (id, rel_type, target) in [
        (
            "rId1",
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            "word/document.xml",
        ),
        (
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            "docProps/core.xml",
        ),
    ] {
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Id", id));
        elem.push_attribute(("Type", rel_type));
        elem.push_attribute(("Target", target));
        writer.write_event(Event::Empty(elem))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner().into_inner())
}
