//! # Helpers
//!
//! Key derivation, naming and path helpers shared by the B-table and its
//! S-buckets.
//!
//! ## Key formats
//!
//! | Thing | Format | Example |
//! |-------|--------|---------|
//! | File key | 40 hex chars | `ddadef707ba62c166051b9e3cd0294c27515f2bc` |
//! | Item key | `<file key> <6-digit index>` | `ddadef…f2bc 002213` |
//! | S-bucket dir | `<3-digit index>.s` | `042.s` |
//! | Table dir | `<name>.kfs` | `store.kfs` |

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use ripemd::{Digest, Ripemd160};

use crate::constants::{
    ITEM_INDEX_WIDTH, ITEM_KEY_SEPARATOR, KEY_BYTES, MAX_ITEM_INDEX, REFERENCE_ID_FILE,
    SBUCKET_EXTENSION, SBUCKET_NAME_WIDTH, TABLE_EXTENSION,
};
use crate::domain::{KfsError, Result};

pub use crate::domain::errors::is_not_found_error;


/// Tests if the string is a valid file key: hex encoding of exactly
/// [`KEY_BYTES`] bytes.
pub fn is_valid_key(key: &str) -> bool {
    hex::decode_to_slice(key, &mut [0u8; KEY_BYTES]).is_ok()
}

/// RIPEMD-160 of the key as lowercase hex, or the key itself if it is
/// already valid.
pub fn hash_key(key: &str) -> String {
    if is_valid_key(key) {
        return key.to_string();
    }
    hex::encode(Ripemd160::digest(key.as_bytes()))
}

/// Coerces input into a valid file key.
pub fn coerce_key(key: &str) -> String {
    if !is_valid_key(key) {
        return hash_key(key);
    }
    key.to_string()
}

/// Raw bytes of the coerced key.
pub fn coerce_key_bytes(key: &str) -> [u8; KEY_BYTES] {
    let mut out = [0u8; KEY_BYTES];
    if hex::decode_to_slice(key, &mut out).is_ok() {
        return out;
    }
    out.copy_from_slice(&Ripemd160::digest(key.as_bytes()));
    out
}

/// Item key for chunk `index` of the file stored under `key`.
pub fn create_item_key_from_index(key: &str, index: u64) -> Result<String> {
    if index > MAX_ITEM_INDEX {
        return Err(KfsError::IndexOutOfBounds {
            index,
            max: MAX_ITEM_INDEX,
        });
    }
    Ok(format!(
        "{}{}{:0width$}",
        coerce_key(key),
        ITEM_KEY_SEPARATOR as char,
        index,
        width = ITEM_INDEX_WIDTH
    ))
}

/// Prefix shared by every item key of the file stored under `key`.
pub fn item_key_prefix(key: &str) -> String {
    let mut prefix = coerce_key(key);
    prefix.push(ITEM_KEY_SEPARATOR as char);
    prefix
}

/// Directory name of the S-bucket at `sbucket_index`.
pub fn create_sbucket_name_from_index(sbucket_index: usize) -> String {
    format!(
        "{:0width$}.{}",
        sbucket_index,
        SBUCKET_EXTENSION,
        width = SBUCKET_NAME_WIDTH
    )
}

/// Returns `rid` if it is a valid reference id, or a random one if `None`.
pub fn create_reference_id(rid: Option<&str>) -> Result<String> {
    match rid {
        None => {
            let mut bytes = [0u8; KEY_BYTES];
            rand::thread_rng().fill_bytes(&mut bytes);
            Ok(hex::encode(bytes))
        }
        Some(rid) if is_valid_key(rid) => Ok(rid.to_string()),
        Some(rid) => Err(KfsError::InvalidReferenceId {
            rid: rid.to_string(),
        }),
    }
}

pub fn file_does_exist(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Formats a byte count with binary units, e.g. `97.7 KiB`.
pub fn to_human_readable_size(bytes: u64) -> String {
    const THRESH: f64 = 1024.0;
    const UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / THRESH;
    let mut unit = 0;
    while value >= THRESH && unit < UNITS.len() - 1 {
        value /= THRESH;
        unit += 1;
    }
    // Rounding happens after the unit is chosen, so 1048575 is "1024.0 KiB".
    format!("{:.1} {}", value, UNITS[unit])
}

/// Ensures that the given path has a `.kfs` extension.
pub fn coerce_table_path(table_path: impl AsRef<Path>) -> PathBuf {
    let table_path = table_path.as_ref();
    if table_path.extension().is_some_and(|ext| ext == TABLE_EXTENSION) {
        return table_path.to_path_buf();
    }
    let mut coerced = OsString::from(table_path.as_os_str());
    coerced.push(".");
    coerced.push(TABLE_EXTENSION);
    PathBuf::from(coerced)
}

/// Tests if a directory name looks like `NNN.s`.
pub fn validate_sbucket_path(name: &str) -> bool {
    parse_sbucket_index_from_path(name).is_some()
}

/// Index encoded in an S-bucket directory name.
pub fn parse_sbucket_index_from_path(name: &str) -> Option<usize> {
    let stem = name
        .strip_suffix(SBUCKET_EXTENSION)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Sorted indexes of the S-bucket directories under `table_path`.
pub fn existing_sbucket_indexes(table_path: impl AsRef<Path>) -> Result<Vec<usize>> {
    let mut indexes = Vec::new();
    for entry in fs::read_dir(table_path.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(index) = entry.file_name().to_str().and_then(parse_sbucket_index_from_path) {
            indexes.push(index);
        }
    }
    indexes.sort_unstable();
    Ok(indexes)
}

/// Creates the table directory and writes its `r.id`.
pub fn init_btable_directory(table_path: impl AsRef<Path>, rid: &str) -> Result<()> {
    let table_path = table_path.as_ref();
    fs::create_dir_all(table_path)?;
    fs::write(table_path.join(REFERENCE_ID_FILE), rid)?;
    Ok(())
}

/// Checks that `table_path` is a directory holding an `r.id` file.
pub fn validate_table_path(table_path: impl AsRef<Path>) -> Result<()> {
    let table_path = table_path.as_ref();
    if !fs::metadata(table_path)?.is_dir() {
        return Err(KfsError::TablePathNotADirectory {
            path: table_path.to_path_buf(),
        });
    }
    if !table_path.join(REFERENCE_ID_FILE).is_file() {
        return Err(KfsError::TablePathInvalid {
            path: table_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Reads and validates the table's `r.id`.
pub fn read_reference_id(table_path: impl AsRef<Path>) -> Result<String> {
    let table_path = table_path.as_ref();
    let raw = fs::read_to_string(table_path.join(REFERENCE_ID_FILE)).map_err(|_| {
        KfsError::TablePathInvalid {
            path: table_path.to_path_buf(),
        }
    })?;
    create_reference_id(Some(raw.trim()))
}
