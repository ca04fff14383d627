//! Utility functions and helpers
//!
//! Platform paths and logging setup.

pub mod app_paths;
pub mod logging;
