//! # Log-Structured Store
//!
//! Default on-disk backend for an S-bucket: one append-only file of
//! checksummed frames plus an in-memory ordered index of value offsets.
//!
//! ## Frame format
//!
//! ```text
//! [payload_len:u32 LE][crc32(payload):u32 LE][payload]
//! payload = op*
//! op      = [kind:u8][key_len:u32 LE][value_len:u32 LE][key][value]
//! ```
//!
//! A frame carries one whole batch, so a batch is either replayed in full or
//! not at all. Replay stops at the first short or corrupt frame and truncates
//! the file there. `compact` rewrites the live entries into a fresh log.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

const LOG_FILE: &str = "data.log";
const COMPACT_FILE: &str = "data.log.compact";

const FRAME_HEADER_LEN: usize = 8;
const OP_HEADER_LEN: usize = 9;
const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;
const EMPTY: &[u8] = &[];

/// Frames larger than this are treated as corruption on replay.
const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
struct ValuePointer {
    offset: u64,
    len: u32,
}

enum Op<'a> {
    Put(&'a [u8], &'a [u8]),
    Delete(&'a [u8]),
}

impl<'a> From<&'a BatchOperation> for Op<'a> {
    fn from(op: &'a BatchOperation) -> Self {
        match op {
            BatchOperation::Put { key, value } => Op::Put(key, value),
            BatchOperation::Delete { key } => Op::Delete(key),
        }
    }
}

/// Append-only, crash-tolerant key-value store.
pub struct LogStore {
    dir: PathBuf,
    file: Mutex<File>,
    index: BTreeMap<Vec<u8>, ValuePointer>,
    live_bytes: u64,
    log_len: u64,
    sync_writes: bool,
}

impl LogStore {
    /// Open or create the store in `dir`, replaying its log.
    pub fn open(dir: impl AsRef<Path>, sync_writes: bool) -> Result<Self, KVStoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let path = dir.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let (index, log_len) = replay(&mut file)?;
        let file_len = file.metadata()?.len();
        if file_len > log_len {
            warn!(
                "[kfs] Dropping {} bytes of torn or corrupt log tail in {}",
                file_len - log_len,
                path.display()
            );
            file.set_len(log_len)?;
        }

        let live_bytes = index
            .iter()
            .map(|(k, p)| k.len() as u64 + u64::from(p.len))
            .sum();

        debug!(
            "[kfs] Opened log store {} ({} keys, {} live bytes, {} log bytes)",
            dir.display(),
            index.len(),
            live_bytes,
            log_len
        );

        Ok(Self {
            dir,
            file: Mutex::new(file),
            index,
            live_bytes,
            log_len,
            sync_writes,
        })
    }

    /// Bytes currently in the log file, including dead entries.
    pub fn log_len(&self) -> u64 {
        self.log_len
    }

    fn read_value(&self, ptr: ValuePointer) -> Result<Vec<u8>, KVStoreError> {
        let mut buf = vec![0u8; ptr.len as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(ptr.offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, ops: &[Op<'_>]) -> Result<(), KVStoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        let (frame, value_starts) = encode_frame(ops)?;

        {
            let file = self.file.get_mut();
            let mut written = file.write_all(&frame);
            if written.is_ok() && self.sync_writes {
                written = file.sync_data();
            }
            if let Err(err) = written {
                // Keep the log replayable past this point.
                let _ = file.set_len(self.log_len);
                return Err(err.into());
            }
        }

        let frame_start = self.log_len;
        self.log_len += frame.len() as u64;

        for (op, start) in ops.iter().zip(value_starts) {
            match op {
                Op::Put(key, value) => {
                    let ptr = ValuePointer {
                        offset: frame_start + start as u64,
                        len: value.len() as u32,
                    };
                    if let Some(old) = self.index.insert(key.to_vec(), ptr) {
                        self.live_bytes -= key.len() as u64 + u64::from(old.len);
                    }
                    self.live_bytes += (key.len() + value.len()) as u64;
                }
                Op::Delete(key) => {
                    if let Some(old) = self.index.remove(*key) {
                        self.live_bytes -= key.len() as u64 + u64::from(old.len);
                    }
                }
            }
        }
        Ok(())
    }

    fn scan_range<'s>(
        &'s self,
        prefix: &'s [u8],
    ) -> impl Iterator<Item = (&'s Vec<u8>, &'s ValuePointer)> + 's {
        self.index
            .range(prefix.to_vec()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
    }
}

impl KeyValueStore for LogStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        match self.index.get(key) {
            Some(ptr) => self.read_value(*ptr).map(Some),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.append(&[Op::Put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        if !self.index.contains_key(key) {
            return Ok(());
        }
        self.append(&[Op::Delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let ops: Vec<Op<'_>> = operations.iter().map(Op::from).collect();
        self.append(&ops)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.index.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.scan_range(prefix)
            .map(|(k, ptr)| Ok((k.clone(), self.read_value(*ptr)?)))
            .collect()
    }

    fn prefix_sizes(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, u64)>, KVStoreError> {
        Ok(self
            .scan_range(prefix)
            .map(|(k, ptr)| (k.clone(), u64::from(ptr.len)))
            .collect())
    }

    fn approximate_size(&self) -> Result<u64, KVStoreError> {
        Ok(self.live_bytes)
    }

    fn compact(&mut self) -> Result<(), KVStoreError> {
        let log_path = self.dir.join(LOG_FILE);
        let tmp_path = self.dir.join(COMPACT_FILE);
        let before = self.log_len;

        let mut new_index = BTreeMap::new();
        let mut offset = 0u64;
        {
            let mut out = BufWriter::new(File::create(&tmp_path)?);
            for (key, ptr) in &self.index {
                let value = self.read_value(*ptr)?;
                let (frame, starts) = encode_frame(&[Op::Put(key, &value)])?;
                out.write_all(&frame)?;
                new_index.insert(
                    key.clone(),
                    ValuePointer {
                        offset: offset + starts[0] as u64,
                        len: ptr.len,
                    },
                );
                offset += frame.len() as u64;
            }
            let file = out.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &log_path)?;
        *self.file.get_mut() = OpenOptions::new().read(true).append(true).open(&log_path)?;
        self.index = new_index;
        self.log_len = offset;

        debug!(
            "[kfs] Compacted {}: {} -> {} log bytes",
            self.dir.display(),
            before,
            offset
        );
        Ok(())
    }
}

/// Encodes one frame; returns it with the offset of each op's value.
fn encode_frame(ops: &[Op<'_>]) -> Result<(Vec<u8>, Vec<usize>), KVStoreError> {
    let payload_len: usize = ops
        .iter()
        .map(|op| match op {
            Op::Put(k, v) => OP_HEADER_LEN + k.len() + v.len(),
            Op::Delete(k) => OP_HEADER_LEN + k.len(),
        })
        .sum();
    if payload_len > MAX_FRAME_LEN {
        return Err(KVStoreError::IOError {
            message: format!(
                "batch of {} bytes exceeds the {} byte frame limit",
                payload_len, MAX_FRAME_LEN
            ),
        });
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload_len);
    frame.extend_from_slice(&[0u8; FRAME_HEADER_LEN]);
    let mut value_starts = Vec::with_capacity(ops.len());

    for op in ops {
        let (kind, key, value): (u8, &[u8], &[u8]) = match op {
            Op::Put(k, v) => (OP_PUT, *k, *v),
            Op::Delete(k) => (OP_DELETE, *k, EMPTY),
        };
        frame.push(kind);
        frame.extend_from_slice(&(key.len() as u32).to_le_bytes());
        frame.extend_from_slice(&(value.len() as u32).to_le_bytes());
        frame.extend_from_slice(key);
        value_starts.push(frame.len());
        frame.extend_from_slice(value);
    }

    let crc = crc32fast::hash(&frame[FRAME_HEADER_LEN..]);
    frame[0..4].copy_from_slice(&(payload_len as u32).to_le_bytes());
    frame[4..8].copy_from_slice(&crc.to_le_bytes());
    Ok((frame, value_starts))
}

struct DecodedOp {
    kind: u8,
    key: Range<usize>,
    value: Range<usize>,
}

fn decode_payload(payload: &[u8]) -> Option<Vec<DecodedOp>> {
    let mut ops = Vec::new();
    let mut cursor = 0;
    while cursor < payload.len() {
        let header = payload.get(cursor..cursor + OP_HEADER_LEN)?;
        let kind = header[0];
        let key_len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let value_len = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
        if kind != OP_PUT && kind != OP_DELETE {
            return None;
        }

        let key_start = cursor + OP_HEADER_LEN;
        let value_start = key_start.checked_add(key_len)?;
        let end = value_start.checked_add(value_len)?;
        if end > payload.len() {
            return None;
        }
        ops.push(DecodedOp {
            kind,
            key: key_start..value_start,
            value: value_start..end,
        });
        cursor = end;
    }
    Some(ops)
}

/// Rebuilds the index; returns it with the length of the valid log prefix.
fn replay(file: &mut File) -> Result<(BTreeMap<Vec<u8>, ValuePointer>, u64), KVStoreError> {
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(file);
    let mut index = BTreeMap::new();
    let mut offset = 0u64;
    let mut header = [0u8; FRAME_HEADER_LEN];

    loop {
        if !read_exact_or_eof(&mut reader, &mut header)? {
            break;
        }
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_FRAME_LEN {
            break;
        }

        let mut payload = vec![0u8; len];
        if !read_exact_or_eof(&mut reader, &mut payload)? {
            break;
        }
        if crc32fast::hash(&payload) != crc {
            break;
        }
        let Some(ops) = decode_payload(&payload) else {
            break;
        };

        let payload_start = offset + FRAME_HEADER_LEN as u64;
        for op in ops {
            let key = payload[op.key].to_vec();
            if op.kind == OP_PUT {
                let ptr = ValuePointer {
                    offset: payload_start + op.value.start as u64,
                    len: op.value.len() as u32,
                };
                index.insert(key, ptr);
            } else {
                index.remove(&key);
            }
        }
        offset = payload_start + len as u64;
    }

    Ok((index, offset))
}

fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool, KVStoreError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err.into()),
    }
}
