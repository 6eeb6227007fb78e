//! Report generation.

pub mod generator;

pub use generator::{write_json_summary, write_spreadsheet};
