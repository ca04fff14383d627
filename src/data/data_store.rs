//! The job application store: one in-memory table loaded from a delimited
//! file, queried and mutated in place, and written back on request.
//!
//! Records are addressed either by position or by their key column
//! ("Company Name" by default). Keys are not unique, so key-based
//! operations act on every matching record.

use crate::data::csv_codec::CsvCodec;
use crate::data::datatable::{DataColumn, DataTable};
use crate::error::{StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_KEY_COLUMN: &str = "Company Name";

/// How a caller addresses records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Zero-based position; negative values are representable so that
    /// out-of-range input is reported rather than wrapped
    ByIndex(i64),
    /// Key column value, may match zero, one or many records
    ByKey(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::ByIndex(i) => write!(f, "#{}", i),
            Identifier::ByKey(key) => write!(f, "'{}'", key),
        }
    }
}

/// Prefix that forces the rest of the text to be read as a key
pub const KEY_PREFIX: &str = "key:";

impl Identifier {
    /// Text that parses back to this identifier. Keys that would otherwise
    /// read as a position (or carry the key prefix) are escaped.
    pub fn to_input(&self) -> String {
        match self {
            Identifier::ByIndex(i) => format!("#{}", i),
            Identifier::ByKey(key) => match key.parse::<Identifier>() {
                Ok(Identifier::ByKey(ref parsed)) if parsed == key => key.clone(),
                _ => format!("{}{}", KEY_PREFIX, key),
            },
        }
    }
}

impl FromStr for Identifier {
    type Err = StoreError;

    /// `#N` with an integer N addresses a position, `key:NAME` is always a
    /// key, anything else (including `#` followed by non-digits) is a key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidIdentifier(
                "identifier must not be empty".to_string(),
            ));
        }

        if let Some(key) = trimmed.strip_prefix(KEY_PREFIX) {
            let key = key.trim();
            if key.is_empty() {
                return Err(StoreError::InvalidIdentifier(format!(
                    "'{}' needs a company name",
                    KEY_PREFIX
                )));
            }
            return Ok(Identifier::ByKey(key.to_string()));
        }

        match trimmed
            .strip_prefix('#')
            .and_then(|digits| digits.trim().parse::<i64>().ok())
        {
            Some(index) => Ok(Identifier::ByIndex(index)),
            None => Ok(Identifier::ByKey(trimmed.to_string())),
        }
    }
}

impl From<usize> for Identifier {
    fn from(index: usize) -> Self {
        Identifier::ByIndex(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Identifier {
    fn from(key: &str) -> Self {
        Identifier::ByKey(key.to_string())
    }
}

/// Behavior switches for a store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key_column: String,
    pub delimiter: u8,
    /// Reject updates naming a column outside the schema instead of
    /// appending that column
    pub strict_columns: bool,
    /// Persist through a temp file + rename
    pub atomic_persist: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            delimiter: b',',
            strict_columns: false,
            atomic_persist: true,
        }
    }
}

/// Exclusive owner of the dataset
#[derive(Debug, Clone)]
pub struct DataStore {
    table: DataTable,
    source: PathBuf,
    options: StoreOptions,
    dirty: bool,
}

impl DataStore {
    /// Load the backing file. Fails with `Format` when it has no header row
    /// or ragged rows, `Io` when it cannot be read at all.
    pub fn load<P: AsRef<Path>>(path: P, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "applications".to_string());

        let table = CsvCodec::new(options.delimiter).load(path, &name)?;
        info!("Opened {} from {}", table, path.display());
        trace!("{}", table.debug_dump());
        if !table.has_column(&options.key_column) {
            warn!(
                "{} has no '{}' column; key lookups will fail",
                path.display(),
                options.key_column
            );
        }

        Ok(Self {
            table,
            source: path.to_path_buf(),
            options,
            dirty: false,
        })
    }

    /// Wrap an already built table. `source` is where `save` writes.
    pub fn from_table(mut table: DataTable, source: impl Into<PathBuf>, options: StoreOptions) -> Self {
        table.compute_column_stats();
        Self {
            table,
            source: source.into(),
            options,
            dirty: false,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn key_column(&self) -> &str {
        &self.options.key_column
    }

    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// True when the dataset changed since it was loaded or last persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn columns(&self) -> Vec<String> {
        self.table.column_names()
    }

    /// The full current table, all columns, original order
    pub fn list_all(&self) -> &DataTable {
        &self.table
    }

    /// Distinct key values in first-seen order
    pub fn key_values(&self) -> Vec<String> {
        let Some(key_idx) = self.table.get_column_index(&self.options.key_column) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        self.table
            .rows
            .iter()
            .filter_map(|row| row.get(key_idx))
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect()
    }

    /// Records addressed by `id`. An index outside `[0, n)` is an error,
    /// a key without matches is an empty result.
    pub fn get(&self, id: &Identifier) -> StoreResult<DataTable> {
        let positions = self.locate(id)?;
        Ok(self.table.select_rows(&positions))
    }

    /// With a value: full rows whose `column` equals it. Without one (or
    /// with an empty one): every row projected to `[key column, column]`.
    pub fn filter(&self, column: &str, value: Option<&str>) -> StoreResult<DataTable> {
        let col_idx = self
            .table
            .get_column_index(column)
            .ok_or_else(|| StoreError::InvalidColumn(column.to_string()))?;

        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                let positions = self.table.matching_rows(col_idx, value);
                debug!("filter {} == '{}': {} rows", column, value, positions.len());
                Ok(self.table.select_rows(&positions))
            }
            None => {
                let key_idx = self.key_index()?;
                Ok(self.table.project(&[key_idx, col_idx]))
            }
        }
    }

    /// Set `column` to `new_value` on every addressed record and return how
    /// many were touched. Zero key matches is a successful no-op.
    pub fn update(&mut self, id: &Identifier, column: &str, new_value: &str) -> StoreResult<usize> {
        let positions = self.locate(id)?;
        if positions.is_empty() {
            warn!("update {}: no records match, nothing changed", id);
            return Ok(0);
        }

        let col_idx = match self.table.get_column_index(column) {
            Some(idx) => idx,
            None if self.options.strict_columns => {
                return Err(StoreError::InvalidColumn(column.to_string()));
            }
            None => {
                warn!("update {}: adding new column '{}'", id, column);
                self.table.add_column(DataColumn::new(column));
                self.table.column_count() - 1
            }
        };

        for &pos in &positions {
            if let Some(cell) = self.table.rows[pos].get_mut(col_idx) {
                *cell = new_value.to_string();
            }
        }

        self.mark_changed();
        debug!(
            "update {}: set '{}' on {} record(s)",
            id,
            column,
            positions.len()
        );
        Ok(positions.len())
    }

    /// Append a record built from `values` against the current schema.
    /// Returns its position.
    pub fn insert(&mut self, values: &HashMap<String, String>) -> usize {
        let row = self.table.row_from_map(values);
        self.table.rows.push(row);
        self.mark_changed();

        let position = self.table.row_count() - 1;
        debug!("insert: new record at #{}", position);
        position
    }

    /// Remove every addressed record; later records shift down so positions
    /// stay contiguous. Returns how many were removed.
    pub fn remove(&mut self, id: &Identifier) -> StoreResult<usize> {
        let positions = self.locate(id)?;
        if positions.is_empty() {
            warn!("remove {}: no records match, nothing changed", id);
            return Ok(0);
        }

        let doomed: HashSet<usize> = positions.iter().copied().collect();
        let mut position = 0;
        self.table.rows.retain(|_| {
            let keep = !doomed.contains(&position);
            position += 1;
            keep
        });

        self.mark_changed();
        debug!("remove {}: {} record(s) removed", id, doomed.len());
        Ok(doomed.len())
    }

    /// Overwrite `path` with the schema header and every record in order
    pub fn persist<P: AsRef<Path>>(&mut self, path: P) -> StoreResult<()> {
        let path = path.as_ref();
        CsvCodec::new(self.options.delimiter).write(&self.table, path, self.options.atomic_persist)?;
        if self.is_source(path) {
            self.dirty = false;
        }
        info!("Persisted {} records to {}", self.len(), path.display());
        Ok(())
    }

    /// Persist back to the file the store was loaded from
    pub fn save(&mut self) -> StoreResult<()> {
        let source = self.source.clone();
        self.persist(source)
    }

    /// Positions addressed by `id`, in dataset order
    pub fn locate(&self, id: &Identifier) -> StoreResult<Vec<usize>> {
        match id {
            Identifier::ByIndex(i) => {
                let n = self.table.row_count();
                match usize::try_from(*i) {
                    Ok(pos) if pos < n => Ok(vec![pos]),
                    _ => Err(StoreError::InvalidIdentifier(format!(
                        "index {} out of range 0..{}",
                        i, n
                    ))),
                }
            }
            Identifier::ByKey(key) => {
                let key_idx = self.key_index()?;
                Ok(self.table.matching_rows(key_idx, key))
            }
        }
    }

    /// Column stats stay in step with the rows after every mutation
    fn mark_changed(&mut self) {
        self.dirty = true;
        self.table.compute_column_stats();
    }

    /// Whether `path` names the same file as the source, however spelled
    fn is_source(&self, path: &Path) -> bool {
        if path == self.source.as_path() {
            return true;
        }
        match (fs::canonicalize(path), fs::canonicalize(&self.source)) {
            (Ok(target), Ok(source)) => target == source,
            _ => false,
        }
    }

    fn key_index(&self) -> StoreResult<usize> {
        self.table
            .get_column_index(&self.options.key_column)
            .ok_or_else(|| StoreError::InvalidColumn(self.options.key_column.clone()))
    }
}
