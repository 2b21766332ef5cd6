use std::io::{self, Read};
use std::sync::Arc;

use crate::domain::Result;
use crate::sbucket::SBucket;

/// Reads a stored file chunk by chunk.
///
/// The stream ends at the first missing chunk index.
pub struct ReadableFileStream {
    sbucket: Arc<SBucket>,
    file_key: String,
    index: u64,
    current: Vec<u8>,
    position: usize,
    done: bool,
}

impl std::fmt::Debug for ReadableFileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadableFileStream")
            .field("sbucket", &self.sbucket.index())
            .field("file_key", &self.file_key)
            .field("index", &self.index)
            .field("done", &self.done)
            .finish()
    }
}

impl ReadableFileStream {
    pub(crate) fn new(sbucket: Arc<SBucket>, file_key: &str) -> Self {
        Self {
            sbucket,
            file_key: file_key.to_string(),
            index: 0,
            current: Vec::new(),
            position: 0,
            done: false,
        }
    }

    /// Index of the next chunk to fetch.
    pub fn chunk_index(&self) -> u64 {
        self.index
    }

    /// Fetches the next whole chunk, or `None` at end of file.
    ///
    /// Bytes buffered by a previous `read` are returned first.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.position < self.current.len() {
            let rest = self.current.split_off(self.position);
            self.current.clear();
            self.position = 0;
            return Ok(Some(rest));
        }
        if self.done {
            return Ok(None);
        }
        match self.sbucket.read_chunk(&self.file_key, self.index)? {
            Some(chunk) => {
                self.index += 1;
                Ok(Some(chunk))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }
}

impl Read for ReadableFileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.position >= self.current.len() {
            match self.next_chunk()? {
                Some(chunk) => {
                    self.current = chunk;
                    self.position = 0;
                }
                None => return Ok(0),
            }
        }

        let available = &self.current[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}
