use super::{CellValue, Table};
use crate::error::TableError;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

/// Write `table` as a single-sheet `.xlsx` workbook: one header row, then
/// one row per record in table order.
pub fn write(table: &Table, path: &Path) -> Result<(), TableError> {
    let mut workbook = Workbook::new();
    fill_workbook(&mut workbook, table).map_err(|e| TableError::io(path, e))?;
    workbook.save(path).map_err(|e| TableError::io(path, e))?;

    tracing::info!(path = %path.display(), rows = table.rows.len(), "wrote table");
    Ok(())
}

fn fill_workbook(workbook: &mut Workbook, table: &Table) -> Result<(), XlsxError> {
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, cell) in row.cells.iter().enumerate().take(table.columns.len()) {
            let c = col as u16;
            match cell {
                CellValue::Text(s) => {
                    sheet.write_string(r, c, s)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number(r, c, *n)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                CellValue::Blank => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::loader::read_table;
    use crate::table::tests::{product_table, text};

    #[test]
    fn test_write_then_read_preserves_columns_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut table = product_table(&[
            ("Widget", 2.0, text("A small part")),
            ("Gadget", 3.5, CellValue::Blank),
        ]);
        table.columns.push("InStock".to_string());
        table.rows[0].cells.push(CellValue::Bool(true));
        table.rows[1].cells.push(CellValue::Bool(false));

        write(&table, &path).unwrap();
        let back = read_table(&path).unwrap();

        assert_eq!(back.columns, table.columns);
        assert_eq!(back.rows, table.rows);
    }

    #[test]
    fn test_write_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.xlsx");
        let table = product_table(&[("Widget", 2.0, text("part"))]);
        assert!(matches!(write(&table, &path), Err(TableError::Io { .. })));
    }
}
