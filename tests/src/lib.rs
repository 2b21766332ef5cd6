//! # KFS Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs         # Table lifecycle through the public API
//!     └── concurrency.rs   # Parallel readers and writers, idle reaper
//! tests/benches/
//! └── kfs_benchmarks.rs    # Write/read throughput per backend
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kfs-tests
//! cargo bench -p kfs-tests
//! ```

pub mod integration;
