//! Packs a [`Workbook`] into an OOXML zip

use std::fmt::Write as _;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{escape_xml_attr, XlsxStyleTable};
use sheetmap_core::{CellAddress, CellError, CellValue, Workbook, Worksheet};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const PKG_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const DOC_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_PREFIX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml";

/// Stateless entry point; every call writes a complete package
pub struct XlsxWriter;

impl XlsxWriter {
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        Self::write(workbook, File::create(path)?)
    }

    /// Fails on a workbook without sheets, which no reader accepts
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one sheet".into(),
            ));
        }
        let styles = XlsxStyleTable::build(workbook);
        let sheets = workbook.sheet_count();

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types(sheets)),
            ("_rels/.rels".to_string(), root_rels()),
            ("xl/workbook.xml".to_string(), workbook_part(workbook)),
            ("xl/_rels/workbook.xml.rels".to_string(), workbook_rels(sheets)),
            ("xl/styles.xml".to_string(), styles.to_styles_xml()),
        ];
        for (i, sheet) in workbook.worksheets().enumerate() {
            parts.push((
                format!("xl/worksheets/sheet{}.xml", i + 1),
                worksheet_part(sheet, i, &styles),
            ));
            log::debug!("wrote sheet '{}' ({} cells)", sheet.name(), sheet.cell_count());
        }

        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default();
        for (name, xml) in &parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(xml.as_bytes())?;
        }
        zip.finish()?;
        Ok(())
    }
}

fn content_types(sheets: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\n<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"{CT_PREFIX}.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"{CT_PREFIX}.styles+xml\"/>"
    );
    for n in 1..=sheets {
        let _ = write!(
            xml,
            "<Override PartName=\"/xl/worksheets/sheet{n}.xml\" ContentType=\"{CT_PREFIX}.worksheet+xml\"/>"
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    format!(
        "{XML_DECL}\n<Relationships xmlns=\"{PKG_RELS_NS}\">\
         <Relationship Id=\"rId1\" Type=\"{DOC_RELS}/officeDocument\" Target=\"xl/workbook.xml\"/>\
         </Relationships>"
    )
}

fn workbook_part(workbook: &Workbook) -> String {
    let mut xml = format!("{XML_DECL}\n<workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{DOC_RELS}\">");
    if workbook.settings().date_1904 {
        xml.push_str("<workbookPr date1904=\"1\"/>");
    }
    xml.push_str("<sheets>");
    for (i, sheet) in workbook.worksheets().enumerate() {
        let _ = write!(
            xml,
            "<sheet name=\"{}\" sheetId=\"{n}\" r:id=\"rId{n}\"/>",
            escape_xml_attr(sheet.name()),
            n = i + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

/// Sheets take `rId1..=rIdN`; styles follow them
fn workbook_rels(sheets: usize) -> String {
    let mut xml = format!("{XML_DECL}\n<Relationships xmlns=\"{PKG_RELS_NS}\">");
    for n in 1..=sheets {
        let _ = write!(
            xml,
            "<Relationship Id=\"rId{n}\" Type=\"{DOC_RELS}/worksheet\" Target=\"worksheets/sheet{n}.xml\"/>"
        );
    }
    let _ = write!(
        xml,
        "<Relationship Id=\"rId{}\" Type=\"{DOC_RELS}/styles\" Target=\"styles.xml\"/></Relationships>",
        sheets + 1
    );
    xml
}

fn worksheet_part(sheet: &Worksheet, index: usize, styles: &XlsxStyleTable) -> String {
    let mut xml = format!("{XML_DECL}\n<worksheet xmlns=\"{MAIN_NS}\"><sheetData>");

    let mut open_row = None;
    for (row, col, cell) in sheet.iter_cells() {
        if open_row != Some(row) {
            if open_row.is_some() {
                xml.push_str("</row>");
            }
            let _ = write!(xml, "<row r=\"{}\">", row + 1);
            open_row = Some(row);
        }

        let xf = styles.xf_id_for(index, cell.style_index);
        let attrs = match xf {
            0 => format!("r=\"{}\"", CellAddress::new(row, col)),
            xf => format!("r=\"{}\" s=\"{}\"", CellAddress::new(row, col), xf),
        };
        let _ = match &cell.value {
            // style-only cells keep their formatting
            CellValue::Empty if xf == 0 => Ok(()),
            CellValue::Empty => write!(xml, "<c {attrs}/>"),
            CellValue::String(s) => write!(xml, "<c {attrs} t=\"inlineStr\"><is>{}</is></c>", inline_text(s)),
            CellValue::Formula { text, cached_value } => {
                let (kind, cached) = cached_value
                    .as_deref()
                    .map(scalar_parts)
                    .unwrap_or_default();
                let formula = escape_xml_text(text.trim_start_matches('='));
                write!(xml, "<c {attrs}{kind}><f>{formula}</f>{cached}</c>")
            }
            scalar => {
                let (kind, value) = scalar_parts(scalar);
                write!(xml, "<c {attrs}{kind}>{value}</c>")
            }
        };
    }
    if open_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    let merges = sheet.merged_regions();
    if !merges.is_empty() {
        let _ = write!(xml, "<mergeCells count=\"{}\">", merges.len());
        for range in merges {
            let _ = write!(xml, "<mergeCell ref=\"{range}\"/>");
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    xml
}

/// Type attribute and `<v>` element for a plain (non-formula) value
fn scalar_parts(value: &CellValue) -> (String, String) {
    match value {
        CellValue::Number(n) if n.is_finite() => (String::new(), format!("<v>{}</v>", n)),
        CellValue::Number(_) => (
            " t=\"e\"".to_string(),
            format!("<v>{}</v>", CellError::Num.as_str()),
        ),
        CellValue::Boolean(b) => (" t=\"b\"".to_string(), format!("<v>{}</v>", u8::from(*b))),
        CellValue::Error(e) => (
            " t=\"e\"".to_string(),
            format!("<v>{}</v>", escape_xml_text(e.as_str())),
        ),
        CellValue::String(s) => (
            " t=\"str\"".to_string(),
            format!("<v>{}</v>", escape_xml_text(&encode_excel_escapes(s))),
        ),
        CellValue::Formula { .. } | CellValue::Empty => (String::new(), String::new()),
    }
}

/// `<t>` element for an inline string, preserving edge whitespace
fn inline_text(s: &str) -> String {
    let escaped = escape_xml_text(&encode_excel_escapes(s));
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        format!("<t xml:space=\"preserve\">{}</t>", escaped)
    } else {
        format!("<t>{}</t>", escaped)
    }
}

fn escape_xml_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Encode characters XML cannot carry literally as `_xHHHH_`.
///
/// A literal `_x` is escaped too so that reading decodes it back unchanged.
fn encode_excel_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s.chars().peekable();
    while let Some(c) = rest.next() {
        match c {
            '_' if rest.peek() == Some(&'x') => out.push_str("_x005F_"),
            '\r' => out.push_str("_x000D_"),
            '\t' | '\n' => out.push(c),
            c if (c as u32) < 0x20 => out.push_str(&format!("_x{:04X}_", c as u32)),
            c => out.push(c),
        }
    }
    out
}
