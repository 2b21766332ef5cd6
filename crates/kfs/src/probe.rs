//! # Probe
//!
//! Runs every key and path helper on fixed inputs, one output line per call,
//! for comparing implementations by eye. Errors are reported inline as
//! `Error: <message>` so a failing helper does not hide the rest.

use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::domain::Result;
use crate::utils::{
    coerce_key, coerce_table_path, create_item_key_from_index, create_reference_id,
    create_sbucket_name_from_index, file_does_exist, hash_key, is_not_found_error, is_valid_key,
    to_human_readable_size,
};

/// A valid key: `ripemd160("A")`.
pub const PROBE_KEY: &str = "ddadef707ba62c166051b9e3cd0294c27515f2bc";

/// Printed verbatim after `hash_key("A")` as a reference for comparison.
pub const PROBE_ECHO: &str = "54e15c41a9dea039e790a69ce64ca4077a980fcc";

/// Blank lines between the empty-input and literal-input blocks.
pub const PROBE_SEPARATOR_LINES: usize = 3;

/// Output lines for the probe, in order.
///
/// `probe_path` is checked with `file_does_exist`.
pub fn probe_lines(probe_path: &Path) -> Vec<String> {
    let unrelated = io::Error::other("0");

    let mut lines = vec![
        is_valid_key("").to_string(),
        hash_key(""),
        coerce_key(""),
        show(create_item_key_from_index("", 0)),
        create_sbucket_name_from_index(0),
        show(create_reference_id(None)),
        file_does_exist(probe_path).to_string(),
        to_human_readable_size(100_000),
        coerce_table_path("").display().to_string(),
        is_not_found_error(&unrelated).to_string(),
    ];

    lines.extend(std::iter::repeat_n(String::new(), PROBE_SEPARATOR_LINES));

    lines.extend([
        is_valid_key("A").to_string(),
        coerce_key("A"),
        is_valid_key(PROBE_KEY).to_string(),
        hash_key("A"),
        PROBE_ECHO.to_string(),
        coerce_key("A"),
        show(create_item_key_from_index(PROBE_KEY, 2213)),
        create_sbucket_name_from_index(2213),
        show(create_reference_id(None)),
        file_does_exist(probe_path).to_string(),
        to_human_readable_size(100_000),
        coerce_table_path("a").display().to_string(),
        coerce_table_path("a.kfs").display().to_string(),
        is_not_found_error(&unrelated).to_string(),
    ]);

    lines
}

fn show<T: Display>(result: Result<T>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(err) => format!("Error: {}", err),
    }
}
