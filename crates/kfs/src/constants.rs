//! # Table Geometry
//!
//! Fixed parameters of the store layout. Chunk size and S-bucket capacity can
//! be overridden per table through [`KfsOptions`](crate::KfsOptions); the
//! values here are the defaults and the basis of the on-disk key formats.

use std::time::Duration;

/// Number of bits in a reference id / file key.
pub const R: u64 = 160;

/// Number of bytes in a file chunk.
pub const C: u64 = 131_072;

/// Number of bytes in an S-bucket.
pub const S: u64 = 32 * 1024 * 1024 * 1024;

/// Number of S-buckets (columns) in a B-table.
pub const B: usize = 256;

/// Number of bits of XOR distance used to pick an S-bucket.
pub const D: u32 = 8;

/// Key hashing algorithm.
pub const HASH: &str = "ripemd160";

/// Time an open S-bucket may sit unused before it is closed.
pub const SBUCKET_IDLE: Duration = Duration::from_millis(60_000);

/// Length of a key in bytes.
pub const KEY_BYTES: usize = (R / 8) as usize;

/// Length of a key in hex characters.
pub const KEY_HEX_LEN: usize = KEY_BYTES * 2;

/// Width of the zero-padded chunk index in an item key.
pub const ITEM_INDEX_WIDTH: usize = decimal_width(S / C);

/// Largest chunk index that fits in [`ITEM_INDEX_WIDTH`] digits.
pub const MAX_ITEM_INDEX: u64 = 10u64.pow(ITEM_INDEX_WIDTH as u32) - 1;

/// Width of the zero-padded index in an S-bucket directory name.
pub const SBUCKET_NAME_WIDTH: usize = decimal_width(B as u64);

/// Separator between the file key and the chunk index in an item key.
pub const ITEM_KEY_SEPARATOR: u8 = b' ';

/// Extension of a B-table directory.
pub const TABLE_EXTENSION: &str = "kfs";

/// Extension of an S-bucket directory.
pub const SBUCKET_EXTENSION: &str = "s";

/// File holding the table's reference id.
pub const REFERENCE_ID_FILE: &str = "r.id";

const _: () = assert!(B == 1 << D);
const _: () = assert!(D % 8 == 0 && (D / 8) as usize <= KEY_BYTES);

const fn decimal_width(mut n: u64) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}
