//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::hash::Hash;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetmap_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, Fill, Font,
    HorizontalAlignment, NumberFormat, Style, VerticalAlignment,
};
use sheetmap_core::Workbook;

/// First id available to custom number formats
const FIRST_CUSTOM_NUMFMT_ID: u32 = 164;

/// The two fills every stylesheet must start with
const RESERVED_FILLS: u32 = 2;

// === Writing ===

/// Workbook-wide style table.
///
/// Each worksheet owns its own [`sheetmap_core::StylePool`]. On write the
/// pools are merged into one deduplicated `cellXfs` list.
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Index corresponds to the cellXfs index (xfId).
    styles: Vec<Style>,
    /// Per worksheet: local style index -> xfId.
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

/// Id of `item` in `items`, appending it when unseen.
fn intern<T: Clone + Eq + Hash>(items: &mut Vec<T>, ids: &mut HashMap<T, u32>, item: &T) -> u32 {
    if let Some(&id) = ids.get(item) {
        return id;
    }
    let id = items.len() as u32;
    items.push(item.clone());
    ids.insert(item.clone(), id);
    id
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles = Vec::new();
        let mut style_ids = HashMap::new();
        intern(&mut styles, &mut style_ids, &Style::default());

        let sheet_maps = workbook
            .worksheets()
            .map(|sheet| {
                let mut map = HashMap::from([(0u32, 0u32)]);
                for (_row, _col, cell) in sheet.iter_cells() {
                    let local_idx = cell.style_index;
                    if map.contains_key(&local_idx) {
                        continue;
                    }
                    let style = sheet
                        .style_by_index(local_idx)
                        .cloned()
                        .unwrap_or_default();
                    map.insert(local_idx, intern(&mut styles, &mut style_ids, &style));
                }
                map
            })
            .collect();

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut fonts = Vec::new();
        let mut font_ids = HashMap::new();
        intern(&mut fonts, &mut font_ids, &Font::default());

        // custom fills only; ids are offset past the reserved pair
        let mut fills: Vec<Fill> = Vec::new();
        let mut fill_ids = HashMap::new();

        let mut borders = Vec::new();
        let mut border_ids = HashMap::new();
        intern(&mut borders, &mut border_ids, &BorderStyle::default());

        let mut numfmts: Vec<String> = Vec::new();
        let mut numfmt_ids = HashMap::new();

        let resolved: Vec<ResolvedXfIds> = self
            .styles
            .iter()
            .map(|style| ResolvedXfIds {
                font_id: intern(&mut fonts, &mut font_ids, &style.font),
                fill_id: match &style.fill {
                    Fill::None => 0,
                    fill => RESERVED_FILLS + intern(&mut fills, &mut fill_ids, fill),
                },
                border_id: intern(&mut borders, &mut border_ids, &style.border),
                num_fmt_id: match &style.number_format {
                    NumberFormat::General => 0,
                    NumberFormat::BuiltIn(id) => *id,
                    NumberFormat::Custom(code) => {
                        FIRST_CUSTOM_NUMFMT_ID + intern(&mut numfmts, &mut numfmt_ids, code)
                    }
                },
            })
            .collect();

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (i, code) in numfmts.iter().enumerate() {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    FIRST_CUSTOM_NUMFMT_ID + i as u32,
                    escape_xml_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        xml.push_str(&format!(
            "\n  <fills count=\"{}\">",
            fills.len() as u32 + RESERVED_FILLS
        ));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for fill in &fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill));
        }
        xml.push_str("\n  </fills>");

        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );
        xml
    }
}

pub(crate) fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_color(tag: &str, color: &Color) -> String {
    match color {
        Color::Auto => format!("<{tag} indexed=\"64\"/>"),
        Color::Indexed(i) => format!("<{tag} indexed=\"{i}\"/>"),
        Color::Theme(i) => format!("<{tag} theme=\"{i}\"/>"),
        rgb => format!(
            "<{tag} rgb=\"{}\"/>",
            rgb.to_argb_hex().unwrap_or_else(|| "FF000000".to_string())
        ),
    }
}

fn write_font(font: &Font) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if !font.color.is_auto() {
        s.push_str(&write_color("color", &font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/>", escape_xml_attr(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &Fill) -> String {
    match fill {
        Fill::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        Fill::Solid { color } => format!(
            "<fill><patternFill patternType=\"solid\">{}<bgColor indexed=\"64\"/></patternFill></fill>",
            write_color("fgColor", color)
        ),
    }
}

fn write_border_edge(tag: &str, edge: &Option<BorderEdge>) -> String {
    match edge {
        Some(e) if e.style != BorderLineStyle::None => format!(
            "<{tag} style=\"{}\">{}</{tag}>",
            e.style.as_str(),
            write_color("color", &e.color)
        ),
        _ => format!("<{tag}/>"),
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border>");
    for (tag, edge) in ["left", "right", "top", "bottom"].iter().zip(border.edges()) {
        s.push_str(&write_border_edge(tag, &edge));
    }
    s.push_str("<diagonal/></border>");
    s
}

fn write_alignment(al: &Alignment) -> String {
    let default = Alignment::default();
    if al.is_default() {
        return String::new();
    }

    let mut s = String::from("<alignment");
    if al.horizontal != default.horizontal {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_str()));
    }
    if al.vertical != default.vertical {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_str()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    s.push_str("/>");
    s
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if style.font != Font::default() {
        attrs.push_str(" applyFont=\"1\"");
    }
    if style.fill != Fill::None {
        attrs.push_str(" applyFill=\"1\"");
    }
    if !style.border.is_empty() {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if !style.alignment.is_default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let head = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );
    match write_alignment(&style.alignment) {
        alignment if alignment.is_empty() => format!("{head}/>"),
        alignment => format!("{head}>{alignment}</xf>"),
    }
}

// === Reading ===

/// Cell formats read from styles.xml, indexed by the `s` attribute of cells
#[derive(Debug)]
pub(crate) struct ParsedStyles {
    pub cell_styles: Vec<Style>,
}

impl Default for ParsedStyles {
    fn default() -> Self {
        Self {
            cell_styles: vec![Style::default()],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
    Diagonal,
}

impl Edge {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"left" | b"start" => Some(Edge::Left),
            b"right" | b"end" => Some(Edge::Right),
            b"top" => Some(Edge::Top),
            b"bottom" => Some(Edge::Bottom),
            b"diagonal" => Some(Edge::Diagonal),
            _ => None,
        }
    }

    fn slot(self, border: &mut BorderStyle) -> Option<&mut Option<BorderEdge>> {
        match self {
            Edge::Left => Some(&mut border.left),
            Edge::Right => Some(&mut border.right),
            Edge::Top => Some(&mut border.top),
            Edge::Bottom => Some(&mut border.bottom),
            Edge::Diagonal => None,
        }
    }
}

#[derive(Debug, Default)]
struct PendingFill {
    pattern: Option<String>,
    fg: Color,
}

#[derive(Debug)]
struct PendingXf {
    num_fmt_id: u32,
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    alignment: Alignment,
}

/// Event-driven state for one styles.xml pass.
///
/// Self-closing elements are fed through `open` then `close`, so the same
/// code handles `<xf .../>` and `<xf ...>...</xf>`.
#[derive(Debug, Default)]
struct StylesParser {
    numfmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<BorderStyle>,
    cell_xfs: Vec<Style>,

    font: Option<Font>,
    fill: Option<PendingFill>,
    border: Option<BorderStyle>,
    edge: Option<Edge>,
    xf: Option<PendingXf>,

    in_cell_xfs: bool,
    // differential formats are not cell formats; skip them entirely
    in_dxfs: bool,
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> u32 {
    attr_value(e, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

impl StylesParser {
    fn open(&mut self, e: &BytesStart<'_>) {
        let name = e.name();
        match name.as_ref() {
            b"dxfs" => self.in_dxfs = true,
            _ if self.in_dxfs => {}

            b"cellXfs" => self.in_cell_xfs = true,
            b"numFmt" => {
                if let (Some(id), Some(code)) = (
                    attr_value(e, b"numFmtId").and_then(|v| v.parse().ok()),
                    attr_value(e, b"formatCode"),
                ) {
                    self.numfmts.insert(id, code);
                }
            }

            b"font" => self.font = Some(Font::default()),
            b"b" => {
                if let Some(font) = self.font.as_mut() {
                    font.bold = attr_value(e, b"val").map_or(true, |v| v != "0");
                }
            }
            b"i" => {
                if let Some(font) = self.font.as_mut() {
                    font.italic = attr_value(e, b"val").map_or(true, |v| v != "0");
                }
            }
            b"sz" => {
                if let Some(font) = self.font.as_mut() {
                    if let Some(size) = attr_value(e, b"val").and_then(|v| v.parse().ok()) {
                        font.size = size;
                    }
                }
            }
            b"name" => {
                if let Some(font) = self.font.as_mut() {
                    if let Some(v) = attr_value(e, b"val") {
                        font.name = v;
                    }
                }
            }
            b"color" => {
                let color = parse_color_attrs(e);
                if let Some(font) = self.font.as_mut() {
                    font.color = color;
                } else if let (Some(border), Some(edge)) = (self.border.as_mut(), self.edge) {
                    if let Some(Some(existing)) = edge.slot(border) {
                        existing.color = color;
                    }
                }
            }

            b"fill" => self.fill = Some(PendingFill::default()),
            b"patternFill" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.pattern = attr_value(e, b"patternType");
                }
            }
            b"fgColor" => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.fg = parse_color_attrs(e);
                }
            }

            b"border" => self.border = Some(BorderStyle::default()),
            tag if self.border.is_some() && Edge::from_tag(tag).is_some() => {
                self.edge = Edge::from_tag(tag);
                let style = attr_value(e, b"style").map(|s| BorderLineStyle::from_name(&s));
                if let (Some(border), Some(edge), Some(style)) =
                    (self.border.as_mut(), self.edge, style)
                {
                    if style != BorderLineStyle::None {
                        if let Some(slot) = edge.slot(border) {
                            *slot = Some(BorderEdge::new(style, Color::Auto));
                        }
                    }
                }
            }

            b"xf" if self.in_cell_xfs => {
                self.xf = Some(PendingXf {
                    num_fmt_id: attr_u32(e, b"numFmtId"),
                    font_id: attr_u32(e, b"fontId"),
                    fill_id: attr_u32(e, b"fillId"),
                    border_id: attr_u32(e, b"borderId"),
                    alignment: Alignment::default(),
                });
            }
            b"alignment" => {
                if let Some(xf) = self.xf.as_mut() {
                    if let Some(h) = attr_value(e, b"horizontal") {
                        xf.alignment.horizontal = HorizontalAlignment::from_name(&h);
                    }
                    if let Some(v) = attr_value(e, b"vertical") {
                        xf.alignment.vertical = VerticalAlignment::from_name(&v);
                    }
                    if let Some(w) = attr_value(e, b"wrapText") {
                        xf.alignment.wrap_text = w == "1" || w == "true";
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"dxfs" => self.in_dxfs = false,
            _ if self.in_dxfs => {}

            b"font" => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                if let Some(fill) = self.fill.take() {
                    self.fills.push(finalize_fill(fill));
                }
            }
            b"border" => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
                self.edge = None;
            }
            tag if Edge::from_tag(tag).is_some() => self.edge = None,
            b"xf" => {
                if let Some(xf) = self.xf.take() {
                    let style = self.resolve_style(xf);
                    self.cell_xfs.push(style);
                }
            }
            b"cellXfs" => self.in_cell_xfs = false,
            _ => {}
        }
    }

    fn resolve_style(&self, xf: PendingXf) -> Style {
        Style {
            font: self
                .fonts
                .get(xf.font_id as usize)
                .cloned()
                .unwrap_or_default(),
            fill: self
                .fills
                .get(xf.fill_id as usize)
                .cloned()
                .unwrap_or_default(),
            border: self
                .borders
                .get(xf.border_id as usize)
                .cloned()
                .unwrap_or_default(),
            alignment: xf.alignment,
            number_format: match xf.num_fmt_id {
                0 => NumberFormat::General,
                id => match self.numfmts.get(&id) {
                    Some(code) => NumberFormat::Custom(code.clone()),
                    None => NumberFormat::BuiltIn(id),
                },
            },
        }
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<ParsedStyles> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut parser = StylesParser::default();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.open(&e),
            Ok(Event::Empty(e)) => {
                parser.open(&e);
                parser.close(e.name().as_ref());
            }
            Ok(Event::End(e)) => parser.close(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    if parser.cell_xfs.is_empty() {
        return Ok(ParsedStyles::default());
    }
    Ok(ParsedStyles {
        cell_styles: parser.cell_xfs,
    })
}

/// Only solid fills survive; pattern fills such as gray125 read as no fill.
fn finalize_fill(fill: PendingFill) -> Fill {
    match fill.pattern.as_deref() {
        Some("solid") => Fill::Solid { color: fill.fg },
        _ => Fill::None,
    }
}

fn parse_color_attrs(e: &BytesStart<'_>) -> Color {
    // Priority: rgb > theme > indexed > auto
    if let Some(color) = attr_value(e, b"rgb").and_then(|rgb| Color::from_hex(&rgb)) {
        return match color {
            Color::Argb { a: 255, r, g, b } => Color::Rgb { r, g, b },
            other => other,
        };
    }
    if let Some(index) = attr_value(e, b"theme").and_then(|v| v.parse().ok()) {
        return Color::Theme(index);
    }
    if let Some(index) = attr_value(e, b"indexed").and_then(|v| v.parse::<u8>().ok()) {
        // 64 is the system foreground, i.e. automatic
        return if index == 64 {
            Color::Auto
        } else {
            Color::Indexed(index)
        };
    }
    Color::Auto
}
