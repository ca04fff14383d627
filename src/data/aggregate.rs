//! Read-only group counts over a table, used to drive the status and
//! sector charts. Nothing here is stored back into the dataset.

use crate::data::datatable::DataTable;
use crate::error::{StoreError, StoreResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Occurrences of one distinct value in a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

impl ValueCount {
    /// Share of `total` as a percentage
    pub fn percentage(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.count as f64 * 100.0 / total as f64
    }
}

/// Counts per distinct non-empty value of `column`, largest first.
/// Ties keep the order in which values first appear.
pub fn value_counts(table: &DataTable, column: &str) -> StoreResult<Vec<ValueCount>> {
    let col_idx = column_index(table, column)?;

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in table.rows.iter().filter_map(|row| row.get(col_idx)) {
        if value.is_empty() {
            continue;
        }
        let count = counts.entry(value).or_insert(0);
        if *count == 0 {
            order.push(value);
        }
        *count += 1;
    }

    let mut result: Vec<ValueCount> = order
        .into_iter()
        .map(|value| ValueCount {
            value: value.to_string(),
            count: counts[value],
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    result.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(result)
}

/// Two-way count table: one row per distinct `row_column` value, one
/// column per distinct `col_column` value, both sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrossTab {
    pub row_column: String,
    pub col_column: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `counts[r][c]` pairs `row_labels[r]` with `col_labels[c]`
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    pub fn get(&self, row_label: &str, col_label: &str) -> usize {
        let r = self.row_labels.iter().position(|l| l == row_label);
        let c = self.col_labels.iter().position(|l| l == col_label);
        match (r, c) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn row_total(&self, row: usize) -> usize {
        self.counts.get(row).map(|r| r.iter().sum()).unwrap_or(0)
    }

    pub fn grand_total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Count records per (`row_column`, `col_column`) pair. Records with an
/// empty cell in either column are skipped; absent pairs count as zero.
pub fn cross_tab(table: &DataTable, row_column: &str, col_column: &str) -> StoreResult<CrossTab> {
    let row_idx = column_index(table, row_column)?;
    let col_idx = column_index(table, col_column)?;

    let mut pairs: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut col_set: BTreeSet<&str> = BTreeSet::new();
    for row in &table.rows {
        let (Some(r), Some(c)) = (row.get(row_idx), row.get(col_idx)) else {
            continue;
        };
        if r.is_empty() || c.is_empty() {
            continue;
        }
        *pairs.entry((r, c)).or_insert(0) += 1;
        col_set.insert(c);
    }

    let row_labels: Vec<String> = pairs
        .keys()
        .map(|(r, _)| *r)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let col_labels: Vec<String> = col_set.into_iter().map(str::to_string).collect();

    let counts = row_labels
        .iter()
        .map(|r| {
            col_labels
                .iter()
                .map(|c| {
                    pairs
                        .get(&(r.as_str(), c.as_str()))
                        .copied()
                        .unwrap_or(0)
                })
                .collect()
        })
        .collect();

    Ok(CrossTab {
        row_column: row_column.to_string(),
        col_column: col_column.to_string(),
        row_labels,
        col_labels,
        counts,
    })
}

fn column_index(table: &DataTable, column: &str) -> StoreResult<usize> {
    table
        .get_column_index(column)
        .ok_or_else(|| StoreError::InvalidColumn(column.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datatable::DataRow;

    fn table() -> DataTable {
        DataTable::from_rows(
            "jobs",
            ["Company Name", "Sector", "Application Status"],
            vec![
                DataRow::from_iter(["Acme", "Tech", "Applied"]),
                DataRow::from_iter(["Globex", "Finance", "Rejected"]),
                DataRow::from_iter(["Acme", "Tech", "Successful"]),
                DataRow::from_iter(["Initech", "Tech", "Applied"]),
                DataRow::from_iter(["Hooli", "", "Applied"]),
                DataRow::from_iter(["Umbrella", "Health", "Not Open"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_value_counts_orders_by_count_then_first_seen() {
        let counts = value_counts(&table(), "Sector").unwrap();
        let pairs: Vec<(&str, usize)> = counts
            .iter()
            .map(|vc| (vc.value.as_str(), vc.count))
            .collect();
        assert_eq!(pairs, vec![("Tech", 3), ("Finance", 1), ("Health", 1)]);

        let total: usize = counts.iter().map(|vc| vc.count).sum();
        assert_eq!(total, 5);
        assert!((counts[0].percentage(total) - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cross_tab_fills_missing_pairs() {
        let tab = cross_tab(&table(), "Sector", "Application Status").unwrap();
        assert_eq!(tab.row_labels, vec!["Finance", "Health", "Tech"]);
        assert_eq!(
            tab.col_labels,
            vec!["Applied", "Not Open", "Rejected", "Successful"]
        );
        assert_eq!(tab.get("Tech", "Applied"), 2);
        assert_eq!(tab.get("Tech", "Rejected"), 0);
        assert_eq!(tab.get("Finance", "Rejected"), 1);
        assert_eq!(tab.row_total(2), 3);
        assert_eq!(tab.grand_total(), 5);
    }

    #[test]
    fn test_unknown_column() {
        assert!(matches!(
            value_counts(&table(), "Salary"),
            Err(StoreError::InvalidColumn(_))
        ));
        assert!(matches!(
            cross_tab(&table(), "Sector", "Salary"),
            Err(StoreError::InvalidColumn(_))
        ));
    }

    #[test]
    fn test_empty_table() {
        let empty = table().with_same_schema();
        assert!(value_counts(&empty, "Sector").unwrap().is_empty());
        let tab = cross_tab(&empty, "Sector", "Application Status").unwrap();
        assert_eq!(tab.grand_total(), 0);
        assert!(tab.row_labels.is_empty());
    }
}
