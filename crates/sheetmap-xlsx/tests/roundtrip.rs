//! Write-then-read tests through real files

use pretty_assertions::assert_eq;
use sheetmap_core::{
    BorderStyle, CellRange, CellValue, Color, HorizontalAlignment, Style,
    VerticalAlignment, Workbook,
};
use sheetmap_xlsx::{XlsxReader, XlsxWriter};

fn header_style() -> Style {
    Style::new()
        .bold(true)
        .font_size(12.0)
        .fill_color(Color::LIGHT_GRAY)
        .border(BorderStyle::all(
            sheetmap_core::BorderLineStyle::Thin,
            Color::BLACK,
        ))
        .horizontal_alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Center)
}

#[test]
fn test_header_block_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.xlsx");

    let mut workbook = Workbook::new();
    workbook.rename_worksheet(0, "People").unwrap();
    let ws = workbook.worksheet_mut(0).unwrap();
    for (col, label) in ["ID", "Basic", "Basic"].iter().enumerate() {
        ws.set_cell_value_at(0, col as u16, *label).unwrap();
        ws.set_cell_style_at(0, col as u16, &header_style()).unwrap();
    }
    for (col, label) in ["ID", "Name", "Age"].iter().enumerate() {
        ws.set_cell_value_at(1, col as u16, *label).unwrap();
        ws.set_cell_style_at(1, col as u16, &header_style()).unwrap();
    }
    ws.merge_cells(&CellRange::parse("A1:A2").unwrap()).unwrap();
    ws.merge_cells(&CellRange::parse("B1:C1").unwrap()).unwrap();
    ws.set_cell_value_at(2, 0, 1).unwrap();
    ws.set_cell_value_at(2, 1, "Ada").unwrap();
    ws.set_cell_value_at(2, 2, 36.5).unwrap();

    XlsxWriter::write_file(&workbook, &path).unwrap();
    let read = XlsxReader::read_file(&path).unwrap();

    assert_eq!(read.sheet_names(), vec!["People"]);
    let ws = read.worksheet(0).unwrap();
    let merges: Vec<String> = ws.merged_regions().iter().map(|r| r.to_string()).collect();
    assert_eq!(merges, vec!["A1:A2", "B1:C1"]);
    assert_eq!(ws.get_value_at(1, 2), CellValue::string("Age"));
    assert_eq!(ws.get_value_at(2, 0), CellValue::Number(1.0));
    assert_eq!(ws.get_value_at(2, 2), CellValue::Number(36.5));
    assert_eq!(ws.cell_style_at(0, 1), Some(&header_style()));
    assert_eq!(ws.cell_style_at(2, 1), None);
}

#[test]
fn test_date_format_and_1904_flag_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dates.xlsx");

    let date_style = Style::new().number_format("yyyy-mm-dd hh:mm:ss");
    let mut workbook = Workbook::new();
    workbook.settings_mut().date_1904 = true;
    let ws = workbook.worksheet_mut(0).unwrap();
    ws.set_cell_value_at(0, 0, 45000.5).unwrap();
    ws.set_cell_style_at(0, 0, &date_style).unwrap();

    XlsxWriter::write_file(&workbook, &path).unwrap();
    let read = XlsxReader::read_file(&path).unwrap();

    assert!(read.settings().date_1904);
    let ws = read.worksheet(0).unwrap();
    assert_eq!(ws.get_value_at(0, 0), CellValue::Number(45000.5));
    assert_eq!(ws.cell_style_at(0, 0), Some(&date_style));
}

#[test]
fn test_multiple_sheets_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("multi.xlsx");

    let mut workbook = Workbook::new();
    workbook.add_worksheet_with_name("Orders").unwrap();
    workbook.add_worksheet_with_name("Q&A").unwrap();
    workbook
        .worksheet_by_name_mut("Q&A")
        .unwrap()
        .set_cell_value_at(3, 4, "answer")
        .unwrap();

    XlsxWriter::write_file(&workbook, &path).unwrap();
    let read = XlsxReader::read_file(&path).unwrap();

    assert_eq!(read.sheet_names(), vec!["Sheet1", "Orders", "Q&A"]);
    assert_eq!(
        read.worksheet_by_name("Q&A").unwrap().get_value_at(3, 4),
        CellValue::string("answer")
    );
}

#[test]
fn test_not_a_zip_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"definitely not a zip archive").unwrap();

    assert!(XlsxReader::read_file(&path).is_err());
}
