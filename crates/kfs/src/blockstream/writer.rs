use std::io::{self, Write};
use std::sync::Arc;

use tracing::warn;

use crate::domain::Result;
use crate::sbucket::SBucket;

/// Writes a file chunk by chunk.
///
/// Call [`finish`](Self::finish) to commit the final partial chunk. A stream
/// dropped without `finish` or [`destroy`](Self::destroy) still commits it.
/// An empty file is stored as a single empty chunk.
pub struct WritableFileStream {
    sbucket: Arc<SBucket>,
    file_key: String,
    index: u64,
    buffer: Vec<u8>,
    chunk_size: usize,
    pad_last_chunk: bool,
    closed: bool,
}

impl std::fmt::Debug for WritableFileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritableFileStream")
            .field("sbucket", &self.sbucket.index())
            .field("file_key", &self.file_key)
            .field("index", &self.index)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl WritableFileStream {
    pub(crate) fn new(
        sbucket: Arc<SBucket>,
        file_key: &str,
        chunk_size: usize,
        pad_last_chunk: bool,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            sbucket,
            file_key: file_key.to_string(),
            index: 0,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
            pad_last_chunk,
            closed: false,
        }
    }

    /// Chunks committed so far.
    pub fn chunks_written(&self) -> u64 {
        self.index
    }

    /// Buffers `data`, committing every chunk it completes.
    pub fn push(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let take = (self.chunk_size - self.buffer.len()).min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buffer.len() == self.chunk_size {
                self.commit()?;
            }
        }
        Ok(())
    }

    /// Commits the tail and returns the number of chunks in the file.
    pub fn finish(mut self) -> Result<u64> {
        self.closed = true;
        self.commit_tail()?;
        Ok(self.index)
    }

    /// Discards everything written through this stream.
    pub fn destroy(mut self) -> Result<()> {
        self.closed = true;
        self.buffer.clear();
        self.sbucket.unlink(&self.file_key)
    }

    fn commit(&mut self) -> Result<()> {
        self.sbucket
            .write_chunk(&self.file_key, self.index, &self.buffer)?;
        self.index += 1;
        self.buffer.clear();
        Ok(())
    }

    fn commit_tail(&mut self) -> Result<()> {
        if self.buffer.is_empty() && self.index > 0 {
            return Ok(());
        }
        if self.pad_last_chunk {
            self.buffer.resize(self.chunk_size, 0);
        }
        self.commit()
    }
}

impl Write for WritableFileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf)?;
        Ok(buf.len())
    }

    /// Chunks are committed as they fill; a partial chunk waits for `finish`.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for WritableFileStream {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.commit_tail() {
            warn!(
                "[kfs] Failed to commit final chunk of {}: {}",
                self.file_key, err
            );
        }
    }
}
