//! Spreadsheet report generation.
//!
//! The sheet layout is computed as a plain list of cells first and then
//! serialized with `rust_xlsxwriter`, so the layout can be checked without
//! reading the workbook back.

use crate::models::{Metric, MetricRecord, MetricTable, MetricValue, RunId};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook};
use serde::Serialize;
use std::path::Path;

/// Name of the single worksheet.
pub const SHEET_NAME: &str = "Metrics";

/// Zero-based row of the column headers (row 3 in the sheet).
pub const HEADER_ROW: u32 = 2;

/// Width of the metric columns B through H.
pub const METRIC_COLUMN_WIDTH: f64 = 15.0;

/// Header of the run identifier column.
pub const RUN_COLUMN: &str = "run";

/// Timestamp format used for the "Completed at" line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub bordered: bool,
    pub left_aligned: bool,
    pub bold: bool,
}

/// A single cell, zero-based coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

/// Everything written to the sheet.
#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    pub cells: Vec<Cell>,
    pub column_widths: Vec<(u16, f64)>,
}

impl SheetLayout {
    fn push(&mut self, row: u32, col: u16, value: CellValue) {
        // Rows 1-2 carry the URL and timestamp; everything below is the bordered table.
        let style = CellStyle {
            bordered: row >= HEADER_ROW,
            left_aligned: col == 0,
            bold: row == HEADER_ROW,
        };
        self.cells.push(Cell {
            row,
            col,
            value,
            style,
        });
    }
}

/// Lay out the metrics sheet.
pub fn layout_sheet(table: &MetricTable, url: &str, completed_at: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();

    layout.push(0, 0, CellValue::Text(format!("URL: {}", url)));
    layout.push(1, 0, CellValue::Text(format!("Completed at: {}", completed_at)));

    layout.push(HEADER_ROW, 0, CellValue::Text(RUN_COLUMN.to_string()));
    for (i, metric) in Metric::ALL.iter().enumerate() {
        layout.push(HEADER_ROW, i as u16 + 1, CellValue::Text(metric.label().to_string()));
    }

    for (offset, record) in table.rows().enumerate() {
        let row = HEADER_ROW + 1 + offset as u32;
        layout.push(row, 0, run_cell(record.run));
        for (i, metric) in Metric::ALL.iter().enumerate() {
            layout.push(row, i as u16 + 1, metric_cell(record.get(*metric)));
        }
    }

    layout.column_widths = (1..=7).map(|col| (col, METRIC_COLUMN_WIDTH)).collect();

    layout
}

fn run_cell(run: RunId) -> CellValue {
    match run {
        RunId::Run(n) => CellValue::Number(n as f64),
        RunId::Average => CellValue::Text(run.to_string()),
    }
}

fn metric_cell(value: &MetricValue) -> CellValue {
    match value {
        MetricValue::Number(n) => CellValue::Number(*n),
        MetricValue::Error(_) | MetricValue::NotAvailable => CellValue::Text(value.to_string()),
    }
}

fn cell_format(style: CellStyle) -> Format {
    let mut format = Format::new();
    if style.bordered {
        format = format.set_border(FormatBorder::Thin);
    }
    if style.left_aligned {
        format = format.set_align(FormatAlign::Left);
    }
    if style.bold {
        format = format.set_bold();
    }
    format
}

/// Write the metrics table to an xlsx file.
pub fn write_spreadsheet(
    table: &MetricTable,
    url: &str,
    completed_at: &str,
    path: &Path,
) -> Result<()> {
    let layout = layout_sheet(table, url, completed_at);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for cell in &layout.cells {
        let format = cell_format(cell.style);
        match &cell.value {
            CellValue::Text(text) => {
                worksheet.write_string_with_format(cell.row, cell.col, text, &format)?;
            }
            CellValue::Number(n) => {
                worksheet.write_number_with_format(cell.row, cell.col, *n, &format)?;
            }
        }
    }

    for (col, width) in &layout.column_widths {
        worksheet.set_column_width(*col, *width)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write spreadsheet: {}", path.display()))?;

    Ok(())
}

#[derive(Serialize)]
struct MetricsSummary<'a> {
    url: &'a str,
    completed_at: &'a str,
    rows: Vec<&'a MetricRecord>,
}

/// Generate the JSON summary of a metrics table.
pub fn generate_json_summary(table: &MetricTable, url: &str, completed_at: &str) -> Result<String> {
    let summary = MetricsSummary {
        url,
        completed_at,
        rows: table.rows().collect(),
    };
    serde_json::to_string_pretty(&summary).map_err(Into::into)
}

/// Write the JSON summary of a metrics table.
pub fn write_json_summary(
    table: &MetricTable,
    url: &str,
    completed_at: &str,
    path: &Path,
) -> Result<()> {
    let content = generate_json_summary(table, url, completed_at)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write JSON summary: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_table;

    fn create_test_table(runs: u32) -> MetricTable {
        let records = (1..=runs)
            .map(|i| {
                let mut r = MetricRecord::empty(RunId::Run(i));
                r.performance = MetricValue::Number(80.0 + i as f64);
                r.fcp = MetricValue::Number(1500.0);
                r.tbt = MetricValue::Error("NO_LCP".to_string());
                r
            })
            .collect();
        build_table(records).unwrap()
    }

    impl SheetLayout {
        fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
            self.cells.iter().find(|c| c.row == row && c.col == col)
        }
    }

    fn text(layout: &SheetLayout, row: u32, col: u16) -> String {
        match &layout.cell(row, col).unwrap().value {
            CellValue::Text(t) => t.clone(),
            CellValue::Number(n) => n.to_string(),
        }
    }

    #[test]
    fn test_layout_rows() {
        let table = create_test_table(5);
        let layout = layout_sheet(&table, "https://example.com/", "2026-10-19 12:00:00");

        assert_eq!(text(&layout, 0, 0), "URL: https://example.com/");
        assert_eq!(text(&layout, 1, 0), "Completed at: 2026-10-19 12:00:00");
        assert_eq!(text(&layout, 2, 0), "run");
        assert_eq!(text(&layout, 2, 1), "Performance");
        assert_eq!(text(&layout, 2, 5), "Speed Index(ms)");
        assert_eq!(text(&layout, 2, 8), "CLS");

        // Runs 1-5 on sheet rows 4-8, average directly after on row 9.
        for run in 1..=5u32 {
            assert_eq!(
                layout.cell(2 + run, 0).unwrap().value,
                CellValue::Number(run as f64)
            );
        }
        assert_eq!(text(&layout, 8, 0), "average");
        assert_eq!(layout.cell(8, 1).unwrap().value, CellValue::Number(83.0));
        assert!(layout.cell(9, 0).is_none());
    }

    #[test]
    fn test_layout_sentinels_are_text() {
        let table = create_test_table(2);
        let layout = layout_sheet(&table, "https://example.com/", "now");

        assert_eq!(text(&layout, 3, 6), "NO_LCP");
        assert_eq!(text(&layout, 3, 2), "N/A");
        // TBT has no numeric values, so the average stays unavailable.
        assert_eq!(text(&layout, 5, 6), "N/A");
    }

    #[test]
    fn test_layout_styles() {
        let table = create_test_table(1);
        let layout = layout_sheet(&table, "https://example.com/", "now");

        let url_cell = layout.cell(0, 0).unwrap();
        assert!(!url_cell.style.bordered);
        assert!(url_cell.style.left_aligned);

        let header = layout.cell(2, 3).unwrap();
        assert!(header.style.bordered);
        assert!(header.style.bold);
        assert!(!header.style.left_aligned);

        let run_cell = layout.cell(3, 0).unwrap();
        assert!(run_cell.style.bordered);
        assert!(run_cell.style.left_aligned);

        assert!(layout.cells.iter().filter(|c| c.row >= 2).all(|c| c.style.bordered));
        assert!(layout.cells.iter().filter(|c| c.col == 0).all(|c| c.style.left_aligned));
    }

    #[test]
    fn test_layout_column_widths() {
        let layout = layout_sheet(&create_test_table(1), "https://example.com/", "now");
        let cols: Vec<u16> = layout.column_widths.iter().map(|(c, _)| *c).collect();
        assert_eq!(cols, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(layout.column_widths.iter().all(|(_, w)| *w == 15.0));
    }

    #[test]
    fn test_write_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("example.com_.xlsx");

        write_spreadsheet(&create_test_table(3), "https://example.com/", "now", &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // xlsx files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_generate_json_summary() {
        let json = generate_json_summary(&create_test_table(2), "https://example.com/", "now")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["url"], "https://example.com/");
        assert_eq!(value["rows"].as_array().unwrap().len(), 3);
        assert_eq!(value["rows"][2]["run"], "average");
        assert_eq!(value["rows"][0]["TBT(ms)"], "NO_LCP");
    }
}
