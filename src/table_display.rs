use crate::data::aggregate::{CrossTab, ValueCount};
use crate::data::datatable::DataTable;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

pub const STATUS_COLUMN: &str = "Application Status";

/// Terminal colour for a known application status
pub fn status_color(status: &str) -> Option<Color> {
    match status {
        "Applied" => Some(Color::Blue),
        "Not Open" => Some(Color::Yellow),
        "Rejected" => Some(Color::Red),
        "Successful" => Some(Color::Green),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub show_row_numbers: bool,
    pub max_rows: usize,
    pub use_colors: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_row_numbers: true,
            max_rows: 500,
            use_colors: true,
        }
    }
}

fn new_table(options: &DisplayOptions) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if !options.use_colors {
        table.force_no_tty();
    }
    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn status_cell(value: &str, options: &DisplayOptions) -> Cell {
    let cell = Cell::new(value);
    match status_color(value) {
        Some(color) if options.use_colors => cell.fg(color),
        _ => cell,
    }
}

/// Render a table with rows numbered from zero
pub fn render_datatable(data: &DataTable, options: &DisplayOptions) -> String {
    render_with_positions(data, None, options)
}

/// Render rows labelled with their dataset positions. `positions[i]` is the
/// position of `data.rows[i]`; without it rows are numbered from zero.
pub fn render_with_positions(
    data: &DataTable,
    positions: Option<&[usize]>,
    options: &DisplayOptions,
) -> String {
    if data.is_empty() {
        return "No records found.".to_string();
    }

    let mut table = new_table(options);

    let mut headers: Vec<Cell> = Vec::with_capacity(data.column_count() + 1);
    if options.show_row_numbers {
        headers.push(header_cell("#"));
    }
    headers.extend(data.columns.iter().map(|c| header_cell(&c.name)));
    table.set_header(headers);

    let status_idx = data.get_column_index(STATUS_COLUMN);
    for (idx, row) in data.rows.iter().take(options.max_rows).enumerate() {
        let mut cells: Vec<Cell> = Vec::with_capacity(row.len() + 1);
        if options.show_row_numbers {
            let position = positions
                .and_then(|p| p.get(idx).copied())
                .unwrap_or(idx);
            cells.push(Cell::new(format!("#{}", position)).set_alignment(CellAlignment::Right));
        }
        for (col_idx, value) in row.values.iter().enumerate() {
            if Some(col_idx) == status_idx {
                cells.push(status_cell(value, options));
            } else {
                cells.push(Cell::new(value));
            }
        }
        table.add_row(cells);
    }

    let mut output = table.to_string();
    if data.row_count() > options.max_rows {
        output.push_str(&format!(
            "\n... {} more rows not shown",
            data.row_count() - options.max_rows
        ));
    }
    output.push_str(&format!("\n{} record(s)", data.row_count()));
    output
}

/// One line per column with filled and distinct counts
pub fn render_column_summary(data: &DataTable, options: &DisplayOptions) -> String {
    let mut stats = data.clone();
    stats.compute_column_stats();

    let mut table = new_table(options);
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Filled"),
        header_cell("Distinct"),
    ]);
    for column in &stats.columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(stats.row_count() - column.empty_count).set_alignment(CellAlignment::Right),
            Cell::new(column.unique_values.unwrap_or(0)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

/// Counts per value with their share of the total
pub fn render_value_counts(column: &str, counts: &[ValueCount], options: &DisplayOptions) -> String {
    if counts.is_empty() {
        return format!("No values in '{}'.", column);
    }

    let total: usize = counts.iter().map(|vc| vc.count).sum();
    let mut table = new_table(options);
    table.set_header(vec![
        header_cell(column),
        header_cell("Applications"),
        header_cell("Share"),
    ]);

    for vc in counts {
        table.add_row(vec![
            Cell::new(&vc.value),
            Cell::new(vc.count).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", vc.percentage(total))).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("{}\n{} application(s) counted", table, total)
}

/// Cross tab with one row per row label and a trailing total column
pub fn render_cross_tab(tab: &CrossTab, options: &DisplayOptions) -> String {
    if tab.row_labels.is_empty() {
        return format!("No values in '{}' / '{}'.", tab.row_column, tab.col_column);
    }

    let mut table = new_table(options);
    let mut headers = vec![header_cell(&tab.row_column)];
    for label in &tab.col_labels {
        let cell = header_cell(label);
        headers.push(match status_color(label) {
            Some(color) if options.use_colors => cell.fg(color),
            _ => cell,
        });
    }
    headers.push(header_cell("Total"));
    table.set_header(headers);

    for (r, label) in tab.row_labels.iter().enumerate() {
        let mut cells = vec![Cell::new(label)];
        cells.extend(
            tab.counts[r]
                .iter()
                .map(|count| Cell::new(count).set_alignment(CellAlignment::Right)),
        );
        cells.push(
            Cell::new(tab.row_total(r))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Bold),
        );
        table.add_row(cells);
    }

    format!("{}\n{} application(s) counted", table, tab.grand_total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{cross_tab, value_counts};
    use crate::data::datatable::DataRow;

    fn plain() -> DisplayOptions {
        DisplayOptions {
            use_colors: false,
            ..DisplayOptions::default()
        }
    }

    fn table() -> DataTable {
        DataTable::from_rows(
            "jobs",
            ["Company Name", "Sector", "Application Status"],
            vec![
                DataRow::from_iter(["Acme", "Tech", "Applied"]),
                DataRow::from_iter(["Globex", "Finance", "Rejected"]),
                DataRow::from_iter(["Acme", "Tech", "Successful"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_render_empty() {
        let empty = table().with_same_schema();
        assert_eq!(render_datatable(&empty, &plain()), "No records found.");
    }

    #[test]
    fn test_render_truncates() {
        let options = DisplayOptions {
            max_rows: 2,
            ..plain()
        };
        let output = render_datatable(&table(), &options);
        assert!(output.contains("Globex"));
        assert!(!output.contains("Successful"));
        assert!(output.contains("1 more rows not shown"));
        assert!(output.ends_with("3 record(s)"));
    }

    #[test]
    fn test_render_charts() {
        let data = table();
        let counts = value_counts(&data, "Sector").unwrap();
        let output = render_value_counts("Sector", &counts, &plain());
        assert!(output.contains("66.7%"));
        assert!(output.contains("33.3%"));

        let tab = cross_tab(&data, "Sector", STATUS_COLUMN).unwrap();
        let output = render_cross_tab(&tab, &plain());
        assert!(output.contains("Total"));
        assert!(output.contains("3 application(s) counted"));
    }

    #[test]
    fn test_column_summary() {
        let output = render_column_summary(&table(), &plain());
        assert!(output.contains("Company Name"));
        assert!(output.contains("Application Status"));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color("Rejected"), Some(Color::Red));
        assert_eq!(status_color("Ghosted"), None);
    }
}
