use std::collections::{HashMap, HashSet};
use std::fmt;

/// Column metadata and definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataColumn {
    pub name: String,
    pub empty_count: usize,
    pub unique_values: Option<usize>,
}

impl DataColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            empty_count: 0,
            unique_values: None,
        }
    }
}

/// A row of text cells, one per column in schema order.
/// An empty string stands for an absent value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataRow {
    pub values: Vec<String>,
}

impl DataRow {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut String> {
        self.values.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for DataRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// The main DataTable structure: an ordered schema plus ordered rows.
/// Row positions are always the contiguous range `0..row_count()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    pub name: String,
    pub columns: Vec<DataColumn>,
    pub rows: Vec<DataRow>,
}

impl DataTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from header names and string rows
    pub fn from_rows<H, R>(name: &str, headers: H, rows: R) -> Result<Self, String>
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = DataRow>,
    {
        let mut table = DataTable::new(name);
        for header in headers {
            table.add_column(DataColumn::new(header));
        }
        for row in rows {
            table.add_row(row)?;
        }
        Ok(table)
    }

    /// Empty table sharing this table's schema
    pub fn with_same_schema(&self) -> Self {
        Self {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| DataColumn::new(c.name.clone()))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Append a column; existing rows get an empty cell for it
    pub fn add_column(&mut self, column: DataColumn) -> &mut Self {
        self.columns.push(column);
        for row in &mut self.rows {
            row.values.push(String::new());
        }
        self
    }

    pub fn add_row(&mut self, row: DataRow) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get_column(&self, name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names as a vector
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get_value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)
    }

    pub fn get_value_by_name(&self, row: usize, col_name: &str) -> Option<&str> {
        let col_idx = self.get_column_index(col_name)?;
        self.get_value(row, col_idx)
    }

    /// Positions of rows whose cell in `col` equals `value`, in table order
    pub fn matching_rows(&self, col: usize, value: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(col) == Some(value))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// New table with the same schema holding copies of the given rows
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut selected = self.with_same_schema();
        selected.rows = indices
            .iter()
            .filter_map(|&idx| self.rows.get(idx).cloned())
            .collect();
        selected
    }

    /// New table restricted to the given column positions, all rows in order
    pub fn project(&self, col_indices: &[usize]) -> Self {
        let mut projected = DataTable::new(self.name.clone());
        projected.columns = col_indices
            .iter()
            .filter_map(|&idx| self.columns.get(idx))
            .map(|c| DataColumn::new(c.name.clone()))
            .collect();
        projected.rows = self
            .rows
            .iter()
            .map(|row| {
                col_indices
                    .iter()
                    .map(|&idx| row.get(idx).unwrap_or_default())
                    .collect()
            })
            .collect();
        projected
    }

    /// Build a row for this schema from a name -> value mapping.
    /// Missing columns become empty, unknown keys are ignored.
    pub fn row_from_map(&self, values: &HashMap<String, String>) -> DataRow {
        self.columns
            .iter()
            .map(|c| values.get(&c.name).cloned().unwrap_or_default())
            .collect()
    }

    /// Convert to a vector of string vectors (for display/export)
    pub fn to_string_table(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| row.values.clone()).collect()
    }

    /// Recompute per-column empty and distinct counts
    pub fn compute_column_stats(&mut self) {
        for (col_idx, column) in self.columns.iter_mut().enumerate() {
            let mut empty_count = 0;
            let mut unique_values = HashSet::new();

            for row in &self.rows {
                match row.get(col_idx) {
                    Some(value) if !value.is_empty() => {
                        unique_values.insert(value);
                    }
                    _ => empty_count += 1,
                }
            }

            column.empty_count = empty_count;
            column.unique_values = Some(unique_values.len());
        }
    }

    /// Generate a debug dump string for display
    pub fn debug_dump(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("DataTable: {}\n", self.name));
        output.push_str(&format!(
            "Rows: {} | Columns: {}\n",
            self.row_count(),
            self.column_count()
        ));

        output.push_str("\nColumns:\n");
        for column in &self.columns {
            output.push_str(&format!("  {}", column.name));
            if column.empty_count > 0 {
                output.push_str(&format!(" - {} empty", column.empty_count));
            }
            if let Some(unique) = column.unique_values {
                output.push_str(&format!(", {} unique", unique));
            }
            output.push('\n');
        }

        if self.row_count() > 0 {
            let sample_size = 5.min(self.row_count());
            output.push_str(&format!("\nFirst {} rows:\n", sample_size));

            for (row_idx, row) in self.rows.iter().take(sample_size).enumerate() {
                output.push_str(&format!("  [{}]: {}\n", row_idx, row.values.join(", ")));
            }
        }

        output
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} rows x {} columns)",
            self.name,
            self.row_count(),
            self.column_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        DataTable::from_rows(
            "jobs",
            ["Company Name", "Sector", "Application Status"],
            vec![
                DataRow::from_iter(["Acme", "Tech", "Applied"]),
                DataRow::from_iter(["Globex", "Finance", "Rejected"]),
                DataRow::from_iter(["Acme", "Tech", ""]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_datatable_creation() {
        let table = sample();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get_value_by_name(1, "Sector"), Some("Finance"));
        assert_eq!(table.get_value_by_name(1, "Salary"), None);
    }

    #[test]
    fn test_add_row_rejects_wrong_width() {
        let mut table = sample();
        let err = table
            .add_row(DataRow::from_iter(["Initech", "Tech"]))
            .unwrap_err();
        assert!(err.contains("2 values"));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_add_column_pads_existing_rows() {
        let mut table = sample();
        table.add_column(DataColumn::new("Notes"));
        assert!(table.rows.iter().all(|r| r.len() == 4));
        assert_eq!(table.get_value_by_name(2, "Notes"), Some(""));
    }

    #[test]
    fn test_matching_and_select() {
        let table = sample();
        let hits = table.matching_rows(0, "Acme");
        assert_eq!(hits, vec![0, 2]);

        let selected = table.select_rows(&hits);
        assert_eq!(selected.column_names(), table.column_names());
        assert_eq!(selected.row_count(), 2);
        assert_eq!(selected.get_value(1, 2), Some(""));
    }

    #[test]
    fn test_project_keeps_row_order() {
        let table = sample();
        let projected = table.project(&[0, 2]);
        assert_eq!(
            projected.column_names(),
            vec!["Company Name".to_string(), "Application Status".to_string()]
        );
        assert_eq!(projected.row_count(), 3);
        assert_eq!(projected.get_value(1, 1), Some("Rejected"));
    }

    #[test]
    fn test_row_from_map_reindexes_against_schema() {
        let table = sample();
        let mut values = HashMap::new();
        values.insert("Sector".to_string(), "Retail".to_string());
        values.insert("Company Name".to_string(), "Initech".to_string());
        values.insert("Salary".to_string(), "100".to_string());

        let row = table.row_from_map(&values);
        assert_eq!(row.values, vec!["Initech", "Retail", ""]);
    }

    #[test]
    fn test_column_stats() {
        let mut table = sample();
        table.compute_column_stats();
        let name = table.get_column("Company Name").unwrap();
        assert_eq!(name.unique_values, Some(2));
        assert_eq!(name.empty_count, 0);
        let status = table.get_column("Application Status").unwrap();
        assert_eq!(status.empty_count, 1);
        assert!(table.debug_dump().contains("1 empty"));
    }
}
