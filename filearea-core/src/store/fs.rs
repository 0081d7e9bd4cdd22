use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::domain::{AreaKey, StoredFile};
use crate::error::{FileAreaError, Result};
use crate::hash::content::{ContentHash, HashingWriter};
use crate::hash::identity::PathHash;
use crate::store::index::AreaIndex;
use crate::store::journal::{Journal, LogRecord};
use crate::store::{ChangeBatch, ContentReader, FileStore};

const JOURNAL_FILE: &str = "files.log";
const BLOB_DIR: &str = "blobs";
const TMP_DIR: &str = "tmp";

struct State {
    journal: Journal,
    index: AreaIndex,
}

/// Directory-backed store: content blobs under `blobs/aa/bb/<hash>`, metadata in a
/// journal replayed into memory on open.
pub struct FsFileStore {
    root: PathBuf,
    state: Mutex<State>,
}

impl FsFileStore {
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(BLOB_DIR))?;
        fs::create_dir_all(root.join(TMP_DIR))?;

        let (journal, records) = Journal::open(&root.join(JOURNAL_FILE))?;
        let mut index = AreaIndex::default();
        let replayed = records.len();
        for rec in records {
            match rec {
                LogRecord::Commit(batch) => index.apply(&batch),
                LogRecord::Snapshot(files) => index = AreaIndex::from_files(files),
            }
        }
        info!(root = %root.display(), records = replayed, files = index.len(), "opened file store");
        Ok(Self {
            root: root.to_path_buf(),
            state: Mutex::new(State { journal, index }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rewrite the journal as one snapshot of the current index.
    pub fn compact(&self) -> Result<usize> {
        let mut st = self.state()?;
        let files: Vec<StoredFile> = st.index.files().cloned().collect();
        let n = files.len();
        st.journal.compact(files)?;
        info!(journal = %st.journal.path().display(), files = n, "compacted journal");
        Ok(n)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|e| {
            FileAreaError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                e.to_string(),
            ))
        })
    }

    fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root
            .join(BLOB_DIR)
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(&hex)
    }
}

impl FileStore for FsFileStore {
    fn list_area(&self, area: &AreaKey) -> Result<Vec<StoredFile>> {
        Ok(self.state()?.index.list_area(area))
    }

    fn get(&self, hash: &PathHash) -> Result<Option<StoredFile>> {
        Ok(self.state()?.index.get(hash).cloned())
    }

    fn put_content(&self, src: &mut dyn Read) -> Result<(ContentHash, u64)> {
        let tmp = tempfile::NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        let mut w = HashingWriter::new(BufWriter::new(tmp));
        std::io::copy(src, &mut w)?;
        let (buffered, hash, len) = w.finish();
        let tmp = buffered.into_inner().map_err(|e| e.into_error())?;

        let dest = self.blob_path(&hash);
        if dest.exists() {
            return Ok((hash, len));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| e.error)?;
        debug!(hash = %hash, bytes = len, "stored blob");
        Ok((hash, len))
    }

    fn open_content(&self, hash: &ContentHash) -> Result<Box<dyn ContentReader>> {
        if hash.is_directory() {
            return Err(FileAreaError::NotFound("directories carry no content".into()));
        }
        match File::open(self.blob_path(hash)) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileAreaError::NotFound(format!("content {hash}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, batch: &ChangeBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut st = self.state()?;
        st.index.check(batch)?;
        st.journal.append(&LogRecord::Commit(batch.clone()))?;
        st.index.apply(batch);
        Ok(())
    }
}
