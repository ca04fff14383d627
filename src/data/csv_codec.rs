//! Delimited-file codec: reads a header + rows file into a `DataTable`
//! and writes one back out.

use crate::data::datatable::{DataColumn, DataRow, DataTable};
use crate::error::{StoreError, StoreResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

pub struct CsvCodec {
    delimiter: u8,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvCodec {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load a delimited file into a DataTable. Every cell is kept as text.
    pub fn load<P: AsRef<Path>>(&self, path: P, table_name: &str) -> StoreResult<DataTable> {
        let path = path.as_ref();
        info!("Loading {} into DataTable '{}'", path.display(), table_name);

        let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .clone();
        if headers.is_empty() {
            return Err(StoreError::format(path, "missing header row"));
        }

        let mut table = DataTable::new(table_name);
        for header in headers.iter() {
            table.add_column(DataColumn::new(header));
        }

        for result in reader.records() {
            let record = result.map_err(|e| csv_error(path, e))?;
            table
                .add_row(record.iter().collect::<DataRow>())
                .map_err(|reason| StoreError::format(path, reason))?;
        }

        table.compute_column_stats();

        info!(
            "Load complete: {} rows, {} columns",
            table.row_count(),
            table.column_count()
        );

        Ok(table)
    }

    /// Write header + all rows to `path`, replacing whatever is there.
    ///
    /// With `atomic` set the data goes to a sibling temp file which is then
    /// renamed over the target, so a failed write leaves the old file intact.
    pub fn write<P: AsRef<Path>>(&self, table: &DataTable, path: P, atomic: bool) -> StoreResult<()> {
        let path = path.as_ref();
        debug!(
            "Writing {} rows to {} (atomic: {})",
            table.row_count(),
            path.display(),
            atomic
        );

        if atomic {
            self.write_atomic(table, path)?;
        } else {
            let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
            self.write_to(table, file, path)?;
        }

        info!("Saved {} rows to {}", table.row_count(), path.display());
        Ok(())
    }

    fn write_atomic(&self, table: &DataTable, path: &Path) -> StoreResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
        // temp files are created owner-only; the rename must not change the mode
        if let Ok(existing) = std::fs::metadata(path) {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(|e| StoreError::io(path, e))?;
        }
        self.write_to(table, temp.as_file(), path)?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(path, e))?;
        temp.persist(path)
            .map_err(|e| StoreError::io(path, e.error))?;
        Ok(())
    }

    fn write_to<W: Write>(&self, table: &DataTable, sink: W, path: &Path) -> StoreResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(sink);

        writer
            .write_record(table.columns.iter().map(|c| c.name.as_str()))
            .map_err(|e| csv_error(path, e))?;
        for row in &table.rows {
            writer
                .write_record(&row.values)
                .map_err(|e| csv_error(path, e))?;
        }

        writer.flush().map_err(|e| StoreError::io(path, e))
    }
}

/// Split csv errors into OS-level failures and content problems
fn csv_error(path: &Path, err: csv::Error) -> StoreError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => StoreError::io(path, io),
            other => StoreError::format(path, format!("{:?}", other)),
        }
    } else {
        StoreError::format(path, err.to_string())
    }
}
