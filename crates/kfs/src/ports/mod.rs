//! # Ports
//!
//! - `outbound`: storage the S-buckets are written against

pub mod outbound;

pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
