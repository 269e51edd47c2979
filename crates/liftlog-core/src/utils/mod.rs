//! Utility functions for id derivation and display formatting.

pub mod format;

pub use format::{cmp_ignore_case, derive_id, format_date, format_set_line, truncate_string};
