//! Data layer
//!
//! The in-memory table, the delimited-file codec, the application store
//! built on them and read-only aggregations for charts.

pub mod datatable;

pub mod csv_codec;

pub mod aggregate;
pub mod data_store;
