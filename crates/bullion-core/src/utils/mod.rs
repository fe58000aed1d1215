//! Formatting helpers for tabular output.

pub mod format;

pub use format::{format_amount, format_date, truncate_string};
