//! # Block Streams
//!
//! Chunked file I/O on top of an S-bucket.
//!
//! - [`ReadableFileStream`]: `std::io::Read` over chunks `0, 1, 2, …`
//! - [`WritableFileStream`]: `std::io::Write` that commits one chunk per
//!   `chunk_size` bytes
//!
//! Both hold an `Arc` of their S-bucket, which keeps it from being closed by
//! the idle reaper while the stream is alive.

mod reader;
mod writer;


pub use reader::ReadableFileStream;
pub use writer::WritableFileStream;
