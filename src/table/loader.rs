use super::{CellValue, Row, Table, NAME_COLUMN};
use crate::error::TableError;
use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use std::path::Path;

/// A validated table plus the instruction that will drive the rewrite.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub instruction: String,
}

/// Read and fully validate a product table, taking the instruction from row zero.
pub fn load(path: &Path) -> Result<Table, TableError> {
    Ok(load_with_instruction(path, None)?.table)
}

/// Read and validate a product table. A non-blank `instruction_override`
/// replaces the instruction stored in row zero's name cell.
pub fn load_with_instruction(
    path: &Path,
    instruction_override: Option<&str>,
) -> Result<LoadedTable, TableError> {
    let table = read_table(path)?;
    table.validate_schema()?;

    let instruction = match instruction_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(given) => {
            if table.rows.is_empty() {
                return Err(TableError::Instruction(format!(
                    "The '{}' column has no instruction row.",
                    NAME_COLUMN
                )));
            }
            given.to_string()
        }
        None => table.instruction()?,
    };

    tracing::info!(
        path = %path.display(),
        columns = table.columns.len(),
        rows = table.rows.len(),
        "loaded table"
    );
    Ok(LoadedTable { table, instruction })
}

/// Parse a `.csv` or `.xlsx` file into a table without schema checks.
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" => read_xlsx(path),
        "" => Err(TableError::Format(
            "File has no extension; expected a .csv or .xlsx file.".to_string(),
        )),
        other => Err(TableError::Format(format!(
            "Unsupported file type '.{}'; expected a .csv or .xlsx file.",
            other
        ))),
    }
}

fn read_csv(path: &Path) -> Result<Table, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Strip BOM if present (common on Windows-created files)
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            header_name(i, h)
        })
        .collect();

    if columns.is_empty() {
        return Err(TableError::Format("The CSV file has no header row.".to_string()));
    }

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        if record.len() > columns.len() {
            return Err(TableError::Format(format!(
                "CSV row {} has {} fields but the header has {}.",
                line + 2,
                record.len(),
                columns.len()
            )));
        }
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(columns.len(), String::new());
        raw.push(cells);
    }

    let numeric: Vec<bool> = (0..columns.len())
        .map(|col| column_is_numeric(raw.iter().map(|r| r[col].as_str())))
        .collect();

    let rows = raw
        .into_iter()
        .map(|cells| {
            Row::new(
                cells
                    .into_iter()
                    .zip(&numeric)
                    .map(|(s, &is_num)| csv_cell(s, is_num))
                    .collect(),
            )
        })
        .collect();

    Ok(Table { columns, rows })
}

/// A column is numeric when it has at least one value and every non-empty
/// cell parses as a finite number.
fn column_is_numeric<'a>(cells: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = false;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        if parse_finite(cell).is_none() {
            return false;
        }
        seen = true;
    }
    seen
}

fn csv_cell(raw: String, numeric: bool) -> CellValue {
    if raw.trim().is_empty() {
        return CellValue::Blank;
    }
    if numeric {
        if let Some(n) = parse_finite(raw.trim()) {
            return CellValue::Number(n);
        }
    }
    CellValue::Text(raw)
}

/// `inf` and `NaN` parse as `f64` but are words in a product sheet.
fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn csv_error(path: &Path, err: csv::Error) -> TableError {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        TableError::io(path, err)
    } else {
        TableError::Format(format!("Could not parse CSV file: {}", err))
    }
}

fn read_xlsx(path: &Path) -> Result<Table, TableError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| xlsx_error(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TableError::Format("The workbook contains no worksheets.".to_string()))?
        .map_err(|e| xlsx_error(path, e))?;

    let mut rows_iter = range.rows();
    let header = rows_iter
        .next()
        .ok_or_else(|| TableError::Format("The first worksheet is empty.".to_string()))?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(i, &data_to_cell(cell).to_string()))
        .collect();

    let rows = rows_iter
        .map(|cells| {
            let mut row: Vec<CellValue> = cells.iter().map(data_to_cell).collect();
            row.resize(columns.len(), CellValue::Blank);
            Row::new(row)
        })
        .collect();

    Ok(Table { columns, rows })
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Blank,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn xlsx_error(path: &Path, err: XlsxError) -> TableError {
    match err {
        XlsxError::Io(e) => TableError::io(path, e),
        XlsxError::Zip(_) => TableError::Format("The file is not a valid .xlsx file.".to_string()),
        other => TableError::Format(format!("Could not read .xlsx file: {}", other)),
    }
}

fn header_name(index: usize, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_csv_infers_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "in.csv",
            b"Name,Id,Description\nMake catchy,1,\nWidget,2,42\nGadget,3,a gadget\n",
        );
        let table = read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["Name", "Id", "Description"]);
        assert_eq!(table.cell(1, "Id"), Some(&CellValue::Number(2.0)));
        // Mixed column stays text, so "42" is a string description.
        assert_eq!(table.cell(1, "Description"), Some(&CellValue::Text("42".to_string())));
        assert_eq!(table.cell(0, "Description"), Some(&CellValue::Blank));
    }

    #[test]
    fn test_csv_strips_bom_and_pads_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bom.csv", "\u{feff}Name,Id,Description\nPrompt,1\n".as_bytes());
        let table = read_table(&path).unwrap();
        assert_eq!(table.columns[0], "Name");
        assert_eq!(table.rows[0].cells.len(), 3);
        assert_eq!(table.rows[0].get(2), &CellValue::Blank);
    }

    #[test]
    fn test_csv_rejects_overlong_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "long.csv", b"Name,Id,Description\na,1,b,extra\n");
        assert!(matches!(read_table(&path), Err(TableError::Format(_))));
    }

    #[test]
    fn test_unknown_extension_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.txt", b"Name,Id,Description\n");
        match read_table(&path) {
            Err(TableError::Format(msg)) => assert!(msg.contains(".txt"), "{msg}"),
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "IN.CSV", b"Name,Id,Description\nPrompt,1,\n");
        assert!(read_table(&path).is_ok());
    }

    #[test]
    fn test_invalid_xlsx_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "fake.xlsx", b"this is not a zip archive");
        assert_eq!(
            read_table(&path),
            Err(TableError::Format("The file is not a valid .xlsx file.".to_string()))
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(read_table(&path), Err(TableError::Io { .. })));
    }

    #[test]
    fn test_load_rejects_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.csv", b"Name,Description\nPrompt,\nWidget,part\n");
        match load(&path) {
            Err(TableError::Schema { missing }) => assert_eq!(missing, vec!["Id".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_blank_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.csv", b"Name,Id,Description\n,1,\nWidget,2,part\n");
        assert!(matches!(load(&path), Err(TableError::Instruction(_))));
    }

    #[test]
    fn test_override_replaces_blank_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.csv", b"Name,Id,Description\n,1,\nWidget,2,part\n");
        let loaded = load_with_instruction(&path, Some("  Shorten it ")).unwrap();
        assert_eq!(loaded.instruction, "Shorten it");
        assert_eq!(loaded.table.rows.len(), 2);
    }

    #[test]
    fn test_blank_override_falls_back_to_file_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.csv", b"Name,Id,Description\nMake catchy,1,\n");
        let loaded = load_with_instruction(&path, Some("   ")).unwrap();
        assert_eq!(loaded.instruction, "Make catchy");
    }

    #[test]
    fn test_header_only_table_has_no_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "in.csv", b"Name,Id,Description\n");
        assert!(matches!(load(&path), Err(TableError::Instruction(_))));
        assert!(matches!(
            load_with_instruction(&path, Some("Shorten")),
            Err(TableError::Instruction(_))
        ));
    }

    #[test]
    fn test_non_finite_words_stay_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "in.csv",
            b"Name,Id,Description\nPrompt,1,inf\nNaN,2,infinity\n",
        );
        let table = read_table(&path).unwrap();
        assert_eq!(table.cell(0, "Description"), Some(&CellValue::Text("inf".to_string())));
        assert_eq!(table.cell(1, "Description"), Some(&CellValue::Text("infinity".to_string())));
        assert_eq!(table.cell(1, "Name"), Some(&CellValue::Text("NaN".to_string())));
        assert_eq!(table.cell(1, "Id"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn test_xlsx_dates_and_booleans() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typed.xlsx");
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let date = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Listed").unwrap();
        sheet.write_string(0, 1, "Active").unwrap();
        sheet.write_datetime_with_format(1, 0, &date, &date_format).unwrap();
        sheet.write_boolean(1, 1, true).unwrap();
        workbook.save(&path).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.columns, vec!["Listed", "Active"]);
        // Dates come back as their Excel serial number.
        assert_eq!(table.cell(0, "Listed"), Some(&CellValue::Number(45306.0)));
        assert_eq!(table.cell(0, "Active"), Some(&CellValue::Bool(true)));
    }

    #[test]
    fn test_error_cells_become_text() {
        use calamine::CellErrorType;

        assert_eq!(
            data_to_cell(&Data::Error(CellErrorType::Div0)),
            CellValue::Text("#DIV/0!".to_string())
        );
        assert_eq!(
            data_to_cell(&Data::DateTimeIso("2024-01-15T00:00:00".to_string())),
            CellValue::Text("2024-01-15T00:00:00".to_string())
        );
        assert_eq!(data_to_cell(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(data_to_cell(&Data::Empty), CellValue::Blank);
    }
}
