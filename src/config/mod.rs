//! Configuration module
//!
//! Settings file handling: data file defaults, display and logging options.

pub mod config;
