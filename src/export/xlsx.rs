use crate::error::{PdfSheetError, Result};
use crate::export::{Table, SHEET_NAME};
use crate::record::ResultSet;
use rust_xlsxwriter::{ColNum, Format, FormatAlign, FormatBorder, RowNum, Workbook, Worksheet};
use serde_json::Value;

/// Longest text Excel accepts in a single cell.
pub const MAX_CELL_CHARS: usize = 32_767;

const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Serializes a result set to an XLSX workbook.
///
/// The single sheet has a header row holding the union of record keys and
/// one row per record. Missing keys and nulls are left empty.
pub fn export(results: &ResultSet) -> Result<Vec<u8>> {
    let table = Table::from_result_set(results);

    if table.columns.len() > MAX_COLUMNS {
        return Err(PdfSheetError::Export {
            message: format!(
                "{} columns exceed the worksheet limit of {}",
                table.columns.len(),
                MAX_COLUMNS
            ),
        });
    }
    if table.rows.len() + 1 > MAX_ROWS {
        return Err(PdfSheetError::Export {
            message: format!("{} rows exceed the worksheet limit of {}", table.rows.len(), MAX_ROWS - 1),
        });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    write_table(worksheet, &table)?;

    let bytes = workbook.save_to_buffer()?;
    log::debug!(
        "exported {} row(s) x {} column(s), {} bytes",
        table.rows.len(),
        table.columns.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    let header = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);

    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as ColNum, truncate(name, col, 0), &header)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row_num = (i + 1) as RowNum;
        for (col, cell) in row.iter().enumerate() {
            let col_num = col as ColNum;
            match cell {
                None | Some(Value::Null) => {}
                Some(Value::Bool(flag)) => {
                    worksheet.write_boolean(row_num, col_num, *flag)?;
                }
                Some(Value::Number(number)) => match number.as_f64() {
                    Some(n) => {
                        worksheet.write_number(row_num, col_num, n)?;
                    }
                    None => {
                        worksheet.write_string(row_num, col_num, number.to_string())?;
                    }
                },
                Some(Value::String(text)) => {
                    worksheet.write_string(row_num, col_num, truncate(text, col, i + 1))?;
                }
                Some(other) => {
                    let text = other.to_string();
                    worksheet.write_string(row_num, col_num, truncate(&text, col, i + 1))?;
                }
            }
        }
    }

    if !table.columns.is_empty() {
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }
    Ok(())
}

fn truncate(text: &str, col: usize, row: usize) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    log::warn!(
        "cell at row {} column {} truncated to {} characters",
        row + 1,
        col + 1,
        MAX_CELL_CHARS
    );
    text.chars().take(MAX_CELL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{flatten, FlatRecord};
    use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
    use serde_json::json;
    use std::io::Cursor;

    fn record(value: Value) -> FlatRecord {
        flatten(value.as_object().unwrap())
    }

    fn read_back(bytes: Vec<u8>) -> (Vec<String>, Range<Data>) {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let names = workbook.sheet_names();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        (names, range)
    }

    #[test]
    fn test_round_trip_has_union_header_and_empty_cells() {
        let results: ResultSet = vec![
            record(json!({"a": 1, "source_file": "x.pdf"})),
            record(json!({"b": 2, "source_file": "y.pdf"})),
        ]
        .into_iter()
        .collect();

        let (names, range) = read_back(export(&results).unwrap());
        assert_eq!(names, vec![SHEET_NAME.to_string()]);

        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            vec![
                Data::String("a".to_string()),
                Data::String("source_file".to_string()),
                Data::String("b".to_string()),
            ]
        );
        assert_eq!(
            rows[1],
            vec![Data::Float(1.0), Data::String("x.pdf".to_string()), Data::Empty]
        );
        assert_eq!(
            rows[2],
            vec![Data::Empty, Data::String("y.pdf".to_string()), Data::Float(2.0)]
        );
    }

    #[test]
    fn test_value_kinds() {
        let results: ResultSet = vec![record(json!({
            "flag": true,
            "items": [1, "two"],
            "missing": null,
            "name": "Acme",
        }))]
        .into_iter()
        .collect();

        let (_, range) = read_back(export(&results).unwrap());
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows[1][0], Data::Bool(true));
        assert_eq!(rows[1][1], Data::String(r#"[1,"two"]"#.to_string()));
        assert_eq!(rows[1][2], Data::Empty);
        assert_eq!(rows[1][3], Data::String("Acme".to_string()));
    }

    #[test]
    fn test_long_text_is_truncated() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        let results: ResultSet = vec![record(json!({ "notes": long }))].into_iter().collect();

        let (_, range) = read_back(export(&results).unwrap());
        match range.get_value((1, 0)) {
            Some(Data::String(text)) => assert_eq!(text.chars().count(), MAX_CELL_CHARS),
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_empty_result_set_exports_a_valid_workbook() {
        let (names, range) = read_back(export(&ResultSet::new()).unwrap());
        assert_eq!(names, vec![SHEET_NAME.to_string()]);
        assert_eq!(range.rows().count(), 0);
    }
}
