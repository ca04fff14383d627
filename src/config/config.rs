use crate::data::data_store::{StoreOptions, DEFAULT_KEY_COLUMN};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data file used when none is given on the command line
    pub default_file: PathBuf,

    /// Column used for key lookups
    pub key_column: String,

    /// Single-byte field delimiter
    pub delimiter: char,

    /// Reject updates that name a column outside the schema
    pub strict_columns: bool,

    /// Save through a temp file + rename
    pub atomic_persist: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the record position as the first column
    pub show_row_numbers: bool,

    /// Rows printed before the output is truncated
    pub max_display_rows: usize,

    /// Colour application statuses and headers
    pub use_colors: bool,

    /// Ask before removing records
    pub confirm_remove: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter used when RUST_LOG is not set
    pub level: String,

    /// Write a log file under the data directory
    pub log_to_file: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_file: PathBuf::from("data_da.csv"),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            delimiter: ',',
            strict_columns: false,
            atomic_persist: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_row_numbers: true,
            max_display_rows: 500,
            use_colors: true,
            confirm_remove: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl StoreConfig {
    pub fn to_store_options(&self) -> Result<StoreOptions> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {:?}", self.delimiter);
        }
        Ok(StoreOptions {
            key_column: self.key_column.clone(),
            delimiter: self.delimiter as u8,
            strict_columns: self.strict_columns,
            atomic_persist: self.atomic_persist,
        })
    }
}

impl Config {
    /// Load config from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("job-tracker").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Job Tracker Configuration File
# Location: ~/.config/job-tracker/config.toml (Linux)
#           ~/Library/Application Support/job-tracker/config.toml (macOS)
#           %APPDATA%\job-tracker\config.toml (Windows)

[store]
# Data file opened when no file is given on the command line
default_file = "data_da.csv"

# Column used when a record is addressed by name instead of #position
key_column = "Company Name"

# Field delimiter (single ASCII character)
delimiter = ","

# Reject `update` on a column that is not in the file header.
# When false the column is added to every record.
strict_columns = false

# Save through a temporary file that is renamed over the data file
atomic_persist = true

[display]
# Show record positions (#0, #1, ...) as the first column
show_row_numbers = true

# Maximum rows printed for one result
max_display_rows = 500

# Colour application statuses
use_colors = true

# Ask for confirmation before removing records
confirm_remove = true

[logging]
# Level used when RUST_LOG is not set: error, warn, info, debug, trace
level = "info"

# Write a log file under the data directory
log_to_file = true
"#
        .to_string()
    }
}
