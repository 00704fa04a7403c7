use crate::record::ResultSet;
use serde_json::Value;

/// Row-oriented view of a result set.
///
/// `columns` is the union of all record keys in first-seen order; a cell is
/// `None` where the record has no such key.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl Table {
    pub fn from_result_set(results: &ResultSet) -> Self {
        let columns = results.columns();
        let rows = results
            .iter()
            .map(|record| columns.iter().map(|column| record.get(column).cloned()).collect())
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest display text per column, header included.
    pub fn column_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .map(|row| cell_text(row[i].as_ref()).chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Display text of a cell: strings unquoted, other values as compact JSON,
/// empty for null or missing.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::flatten;
    use serde_json::json;

    fn results() -> ResultSet {
        [json!({"a": 1, "source_file": "x.pdf"}), json!({"b": 2, "source_file": "y.pdf"})]
            .iter()
            .map(|doc| flatten(doc.as_object().unwrap()))
            .collect()
    }

    #[test]
    fn test_missing_keys_become_empty_cells() {
        let table = Table::from_result_set(&results());
        assert_eq!(table.columns, vec!["a", "source_file", "b"]);
        assert_eq!(table.rows[0], vec![Some(json!(1)), Some(json!("x.pdf")), None]);
        assert_eq!(table.rows[1], vec![None, Some(json!("y.pdf")), Some(json!(2))]);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!(null))), "");
        assert_eq!(cell_text(Some(&json!("plain"))), "plain");
        assert_eq!(cell_text(Some(&json!([1, "two"]))), r#"[1,"two"]"#);
        assert_eq!(cell_text(Some(&json!(false))), "false");
    }

    #[test]
    fn test_column_widths() {
        let table = Table::from_result_set(&results());
        assert_eq!(table.column_widths(), vec![1, 11, 1]);
    }

    #[test]
    fn test_empty_result_set() {
        let table = Table::from_result_set(&ResultSet::new());
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }
}
