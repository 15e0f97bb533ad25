//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{read_styles_xml, ParsedStyles};
use sheetmap_core::style::Style;
use sheetmap_core::{CellAddress, CellError, CellRange, CellValue, Workbook, Worksheet};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// `_x000d_` is CR, `_x000a_` LF, `_x0009_` tab and `_x005f_` an underscore.
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// First value of attribute `key`, unescaped
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Open a part the package cannot do without
fn required_part<'a, R: Read + Seek>(
    archive: &'a mut zip::ZipArchive<R>,
    name: &str,
) -> XlsxResult<impl Read + 'a> {
    archive
        .by_name(name)
        .map_err(|_| XlsxError::MissingPart(name.to_string()))
}

/// Call `visit` for every start and empty element of a small part
fn scan_elements<R: Read>(part: R, mut visit: impl FnMut(&BytesStart<'_>)) -> XlsxResult<()> {
    let mut xml_reader = Reader::from_reader(BufReader::new(part));
    xml_reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => visit(&e),
            Event::Eof => return Ok(()),
            _ => {}
        }
        buf.clear();
    }
}

/// Sheet entry of workbook.xml
#[derive(Debug)]
struct SheetEntry {
    name: String,
    r_id: String,
}

/// Workbook-level facts from workbook.xml
#[derive(Debug, Default)]
struct WorkbookPart {
    sheets: Vec<SheetEntry>,
    date_1904: bool,
}

/// Attributes and content of the `<c>` element being read
#[derive(Debug, Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

impl PendingCell {
    fn from_element(e: &BytesStart<'_>) -> Self {
        Self {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
            value: None,
            formula: None,
        }
    }
}

/// Which text-bearing element of a cell is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellText {
    None,
    Value,
    Formula,
    InlineText,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let styles = Self::read_styles(&mut archive)?;
        let workbook_part = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();
        workbook.settings_mut().date_1904 = workbook_part.date_1904;

        for entry in &workbook_part.sheets {
            let Some(path) = sheet_paths.get(&entry.r_id) else {
                log::warn!(
                    "sheet '{}' has no worksheet relationship {}; skipped",
                    entry.name,
                    entry.r_id
                );
                continue;
            };
            let sheet_idx = workbook.add_worksheet_with_name(&entry.name)?;
            let worksheet = workbook.worksheet_mut(sheet_idx).ok_or_else(|| {
                XlsxError::InvalidFormat(format!("sheet '{}' vanished while reading", entry.name))
            })?;
            Self::read_worksheet(
                &mut archive,
                path,
                worksheet,
                &shared_strings,
                &styles.cell_styles,
            )?;
            log::debug!(
                "read sheet '{}' from {} ({} cells)",
                entry.name,
                path,
                worksheet.cell_count()
            );
        }

        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // phonetic runs repeat the text and must not be concatenated
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<ParsedStyles> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(ParsedStyles::default()),
        }
    }

    /// Sheet names, relationship ids and the date system
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookPart> {
        let mut part = WorkbookPart::default();
        scan_elements(required_part(archive, "xl/workbook.xml")?, |e| {
            match e.name().as_ref() {
                b"sheet" => {
                    if let (Some(name), Some(r_id)) =
                        (attr_value(e, b"name"), attr_value(e, b"r:id"))
                    {
                        part.sheets.push(SheetEntry { name, r_id });
                    }
                }
                b"workbookPr" => {
                    let flag = attr_value(e, b"date1904");
                    part.date_1904 = matches!(flag.as_deref(), Some("1" | "true"));
                }
                _ => {}
            }
        })?;
        Ok(part)
    }

    /// Worksheet part paths keyed by relationship id. Targets are relative
    /// to `xl/` unless they start with `/`.
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let mut rels = HashMap::new();
        let file = required_part(archive, "xl/_rels/workbook.xml.rels")?;
        scan_elements(file, |e| {
            if e.name().as_ref() != b"Relationship" {
                return;
            }
            let is_sheet = attr_value(e, b"Type").is_some_and(|t| t.ends_with("/worksheet"));
            if let (true, Some(id), Some(target)) =
                (is_sheet, attr_value(e, b"Id"), attr_value(e, b"Target"))
            {
                let path = target
                    .strip_prefix('/')
                    .map_or_else(|| format!("xl/{}", target), str::to_string);
                rels.insert(id, path);
            }
        })?;
        Ok(rels)
    }

    /// Read a worksheet part into `worksheet`
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[Style],
    ) -> XlsxResult<()> {
        let mut xml_reader = Reader::from_reader(BufReader::new(required_part(archive, path)?));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut cell: Option<PendingCell> = None;
        let mut text = CellText::None;
        let mut in_inline_str = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => cell = Some(PendingCell::from_element(&e)),
                    b"v" if cell.is_some() => text = CellText::Value,
                    b"f" if cell.is_some() => text = CellText::Formula,
                    b"is" if cell.is_some() => in_inline_str = true,
                    b"t" if in_inline_str => text = CellText::InlineText,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            Self::process_cell(
                                worksheet,
                                path,
                                pending,
                                shared_strings,
                                cell_styles,
                            )?;
                        }
                        text = CellText::None;
                    }
                    b"v" | b"f" => text = CellText::None,
                    b"is" => in_inline_str = false,
                    b"t" if in_inline_str => text = CellText::None,
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let (Some(pending), Ok(content)) = (cell.as_mut(), e.unescape()) {
                        match text {
                            CellText::Value => pending.value = Some(content.into_owned()),
                            CellText::Formula => pending.formula = Some(content.into_owned()),
                            CellText::InlineText => {
                                // rich inline strings arrive as several runs
                                pending
                                    .value
                                    .get_or_insert_with(String::new)
                                    .push_str(&content);
                                pending.cell_type = Some("inlineStr".to_string());
                            }
                            CellText::None => {}
                        }
                    }
                }
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    // style-only cell
                    b"c" => Self::process_cell(
                        worksheet,
                        path,
                        PendingCell::from_element(&e),
                        shared_strings,
                        cell_styles,
                    )?,
                    b"mergeCell" => {
                        let Some(reference) = attr_value(&e, b"ref") else {
                            continue;
                        };
                        match CellRange::parse(&reference) {
                            Ok(range) => {
                                if let Err(err) = worksheet.merge_cells(&range) {
                                    log::warn!("{}: merge {} ignored: {}", path, reference, err);
                                }
                            }
                            Err(err) => {
                                log::warn!("{}: malformed merge ref '{}': {}", path, reference, err)
                            }
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Store one parsed `<c>` element in the worksheet
    fn process_cell(
        worksheet: &mut Worksheet,
        part: &str,
        cell: PendingCell,
        shared_strings: &[String],
        styles: &[Style],
    ) -> XlsxResult<()> {
        let parse_error = |message: String| XlsxError::Parse {
            part: part.to_string(),
            message,
        };

        let Some(reference) = cell.reference.as_deref() else {
            log::warn!("{}: cell without reference skipped", part);
            return Ok(());
        };
        let addr = CellAddress::parse(reference)
            .map_err(|e| parse_error(format!("invalid cell reference '{}': {}", reference, e)))?;
        let cell_type = cell.cell_type.as_deref();

        if let Some(formula) = cell.formula {
            let cached = cell.value.as_deref().and_then(|v| match cell_type {
                Some("b") => Some(CellValue::Boolean(v == "1" || v.eq_ignore_ascii_case("true"))),
                Some("e") => CellError::parse(v).map(CellValue::Error),
                Some("s") => v
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| shared_strings.get(idx))
                    .map(|s| CellValue::String(s.clone())),
                None | Some("n") => v.parse::<f64>().ok().map(CellValue::Number),
                Some(_) => Some(CellValue::String(decode_excel_escapes(v))),
            });
            worksheet.set_cell_value_at(
                addr.row,
                addr.col,
                CellValue::Formula {
                    text: format!("={}", formula.trim_start_matches('=')),
                    cached_value: cached.map(Box::new),
                },
            )?;
        } else if let Some(value) = cell.value.as_deref() {
            let cell_value = match cell_type {
                Some("s") => {
                    let idx: usize = value.parse().map_err(|_| {
                        parse_error(format!("invalid shared string index: {}", value))
                    })?;
                    let s = shared_strings.get(idx).ok_or_else(|| {
                        parse_error(format!("shared string index {} out of bounds", idx))
                    })?;
                    CellValue::String(s.clone())
                }
                Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
                Some("e") => CellError::parse(value)
                    .map(CellValue::Error)
                    .unwrap_or_else(|| CellValue::String(value.to_string())),
                Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(value)),
                None | Some("n") => match value.parse::<f64>() {
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::String(value.to_string()),
                },
                // ISO 8601 date cells ("d") and anything newer stay textual
                Some(_) => CellValue::String(value.to_string()),
            };
            worksheet.set_cell_value_at(addr.row, addr.col, cell_value)?;
        }

        match cell.style {
            None | Some(0) => {}
            Some(s) => {
                let style = styles
                    .get(s as usize)
                    .ok_or_else(|| parse_error(format!("style index {} out of bounds", s)))?;
                worksheet.set_cell_style_at(addr.row, addr.col, style)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
        assert_eq!(decode_excel_escapes("col1_x0009_col2"), "col1\tcol2");
        assert_eq!(
            decode_excel_escapes("line1_x000d__x000a_line2"),
            "line1\r\nline2"
        );
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        assert_eq!(decode_excel_escapes("_x000D_"), "\r");
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("max_xyz_"), "max_xyz_");
    }

    /// Zip a minimal package around one worksheet body
    fn package(workbook_pr: &str, shared: Option<&str>, sheet_xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(format!(r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#, workbook_pr).as_bytes()).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();

            if let Some(shared) = shared {
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(shared.as_bytes()).unwrap();
            }

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();

            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_read_empty_xlsx() {
        let bytes = package(
            "",
            None,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#,
        );
        let workbook = XlsxReader::read(Cursor::new(bytes)).unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Data"]);
        assert!(workbook.worksheet(0).unwrap().is_empty());
        assert!(!workbook.settings().date_1904);
    }

    #[test]
    fn test_read_values_merges_and_date_system() {
        let shared = r#"<sst><si><t>ID</t></si><si><r><t>Ba</t></r><r><t>sic</t></r><rPh><t>x</t></rPh></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="B2" t="inlineStr"><is><t>Name</t></is></c><c r="C2" t="b"><v>1</v></c></row>
            <row r="3"><c r="A3"><v>25.5</v></c><c r="B3"><f>A3*2</f><v>51</v></c><c r="C3" t="e"><v>#N/A</v></c></row>
            </sheetData>
            <mergeCells count="3"><mergeCell ref="A1:A2"/><mergeCell ref="B1:C1"/><mergeCell ref="bogus"/></mergeCells>
            </worksheet>"#;
        let bytes = package(r#"<workbookPr date1904="1"/>"#, Some(shared), sheet);
        let workbook = XlsxReader::read(Cursor::new(bytes)).unwrap();
        let ws = workbook.worksheet_by_name("Data").unwrap();

        assert!(workbook.settings().date_1904);
        assert_eq!(ws.get_value_at(0, 0), CellValue::string("ID"));
        assert_eq!(ws.get_value_at(0, 1), CellValue::string("Basic"));
        assert_eq!(ws.get_value_at(1, 1), CellValue::string("Name"));
        assert_eq!(ws.get_value_at(1, 2), CellValue::Boolean(true));
        assert_eq!(ws.get_value_at(2, 0), CellValue::Number(25.5));
        assert_eq!(
            ws.get_value_at(2, 1),
            CellValue::Formula {
                text: "=A3*2".into(),
                cached_value: Some(Box::new(CellValue::Number(51.0))),
            }
        );
        assert_eq!(ws.get_value_at(2, 2), CellValue::Error(CellError::Na));

        let merges: Vec<String> = ws.merged_regions().iter().map(|r| r.to_string()).collect();
        assert_eq!(merges, vec!["A1:A2", "B1:C1"]);
    }

    #[test]
    fn test_missing_content_types_is_invalid() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(
            XlsxReader::read(Cursor::new(buf)),
            Err(XlsxError::InvalidFormat(_))
        ));
    }
}
