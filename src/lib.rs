pub mod commands;
pub mod completer;
pub mod config;
pub mod data;
pub mod error;
pub mod repl;
pub mod table_display;
pub mod utils;

pub use data::data_store::{DataStore, Identifier, StoreOptions};
pub use error::{StoreError, StoreResult};
