use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::domain::StoredFile;
use crate::error::{FileAreaError, Result};
use crate::store::ChangeBatch;
use crate::util::varint::{get_uvarint, put_uvarint};

const MAGIC: &[u8; 8] = b"FALOG\0\0\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = MAGIC.len() as u64 + 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum LogRecord {
    Commit(ChangeBatch),
    /// Full state; replaces everything replayed before it.
    Snapshot(Vec<StoredFile>),
}

/// Append-only metadata log: header, then varint length + CBOR payload per record.
pub struct Journal {
    f: File,
    path: PathBuf,
}

impl Journal {
    /// Open (creating if needed) and replay. A torn record at the tail is cut off so
    /// later appends start on a clean boundary.
    pub fn open(path: &Path) -> Result<(Self, Vec<LogRecord>)> {
        let existed = path.exists();
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if !existed || f.metadata()?.len() == 0 {
            write_header(&mut f)?;
            f.sync_data()?;
            return Ok((
                Self {
                    f,
                    path: path.to_path_buf(),
                },
                Vec::new(),
            ));
        }

        let mut magic = [0u8; 8];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FileAreaError::Format(format!(
                "{} is not a file-area journal",
                path.display()
            )));
        }
        let mut ver = [0u8; 1];
        f.read_exact(&mut ver)?;
        if ver[0] != VERSION {
            return Err(FileAreaError::Format(format!(
                "unsupported journal version {}",
                ver[0]
            )));
        }

        let (records, good_end) = replay(&mut f)?;
        let len = f.metadata()?.len();
        if good_end < len {
            tracing::warn!(
                journal = %path.display(),
                dropped_bytes = len - good_end,
                "truncating torn journal tail"
            );
            f.set_len(good_end)?;
        }
        f.seek(SeekFrom::Start(good_end))?;
        Ok((
            Self {
                f,
                path: path.to_path_buf(),
            },
            records,
        ))
    }

    pub fn append(&mut self, rec: &LogRecord) -> Result<()> {
        self.append_with(rec, |f, frame| {
            f.write_all(frame)?;
            f.flush()?;
            f.sync_data()
        })
    }

    /// A failed write is cut back off the log, so the next append starts on the
    /// boundary the failed one started from.
    fn append_with(
        &mut self,
        rec: &LogRecord,
        write: impl FnOnce(&mut File, &[u8]) -> std::io::Result<()>,
    ) -> Result<()> {
        let frame = encode_record(rec)?;
        let start = self.f.stream_position()?;
        if let Err(e) = write(&mut self.f, &frame) {
            if let Err(undo) = self.f.set_len(start).and_then(|_| {
                self.f.seek(SeekFrom::Start(start))?;
                Ok(())
            }) {
                tracing::error!(
                    journal = %self.path.display(),
                    error = %undo,
                    "cannot cut back failed journal append"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Replace the log with a single snapshot record. The new log is written beside the
    /// old one and renamed over it.
    pub fn compact(&mut self, files: Vec<StoredFile>) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        write_header(tmp.as_file_mut())?;
        tmp.as_file_mut()
            .write_all(&encode_record(&LogRecord::Snapshot(files))?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        let mut f = OpenOptions::new().read(true).write(true).open(&self.path)?;
        f.seek(SeekFrom::End(0))?;
        self.f = f;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_header(f: &mut File) -> Result<()> {
    f.write_all(MAGIC)?;
    f.write_all(&[VERSION])?;
    f.flush()?;
    Ok(())
}

fn encode_record(rec: &LogRecord) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(256);
    ciborium::ser::into_writer(rec, &mut payload)
        .map_err(|e| FileAreaError::Format(format!("journal encode: {e}")))?;
    let mut frame = Vec::with_capacity(payload.len() + 10);
    put_uvarint(&mut frame, payload.len() as u64);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

// Returns the records and the offset just past the last complete one.
fn replay(f: &mut File) -> Result<(Vec<LogRecord>, u64)> {
    let file_len = f.metadata()?.len();
    let mut r = BufReader::new(f);
    let mut records = Vec::new();
    let mut good_end = HEADER_LEN;
    loop {
        let Some(len) = get_uvarint(&mut r)? else {
            break;
        };
        // A length past the end of the file is a torn or corrupt prefix.
        if len > file_len.saturating_sub(r.stream_position()?) {
            break;
        }
        let mut buf = vec![0u8; len as usize];
        match r.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let rec: LogRecord = ciborium::de::from_reader(&buf[..])
            .map_err(|e| FileAreaError::Format(format!("journal decode: {e}")))?;
        records.push(rec);
        good_end = r.stream_position()?;
    }
    Ok((records, good_end))
}
