use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{AreaKey, StoredFile};
use crate::error::{FileAreaError, Result};
use crate::hash::content::{ContentHash, HashingWriter};
use crate::hash::identity::PathHash;
use crate::store::index::AreaIndex;
use crate::store::{ChangeBatch, ContentReader, FileStore};

/// Volatile store for tests and short-lived tooling.
#[derive(Default)]
pub struct MemoryFileStore {
    index: Mutex<AreaIndex>,
    blobs: Mutex<HashMap<ContentHash, Arc<[u8]>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> Result<MutexGuard<'_, AreaIndex>> {
        self.index.lock().map_err(|e| poisoned(e.to_string()))
    }

    fn blobs(&self) -> Result<MutexGuard<'_, HashMap<ContentHash, Arc<[u8]>>>> {
        self.blobs.lock().map_err(|e| poisoned(e.to_string()))
    }
}

fn poisoned(msg: String) -> FileAreaError {
    std::io::Error::new(std::io::ErrorKind::Other, msg).into()
}

impl FileStore for MemoryFileStore {
    fn list_area(&self, area: &AreaKey) -> Result<Vec<StoredFile>> {
        Ok(self.index()?.list_area(area))
    }

    fn get(&self, hash: &PathHash) -> Result<Option<StoredFile>> {
        Ok(self.index()?.get(hash).cloned())
    }

    fn put_content(&self, src: &mut dyn Read) -> Result<(ContentHash, u64)> {
        let mut w = HashingWriter::new(Vec::new());
        std::io::copy(src, &mut w)?;
        let (bytes, hash, len) = w.finish();
        self.blobs()?.entry(hash).or_insert_with(|| bytes.into());
        Ok((hash, len))
    }

    fn open_content(&self, hash: &ContentHash) -> Result<Box<dyn ContentReader>> {
        let blob = self
            .blobs()?
            .get(hash)
            .cloned()
            .ok_or_else(|| FileAreaError::NotFound(format!("content {hash}")))?;
        Ok(Box::new(Cursor::new(blob)))
    }

    fn commit(&self, batch: &ChangeBatch) -> Result<()> {
        let mut index = self.index()?;
        index.check(batch)?;
        index.apply(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    #[test]
    fn content_is_deduplicated_and_seekable() {
        let store = MemoryFileStore::new();
        let (h1, n) = store.put_content(&mut &b"0123456789"[..]).unwrap();
        let (h2, _) = store.put_content(&mut &b"0123456789"[..]).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(n, 10);
        assert_eq!(store.blobs().unwrap().len(), 1);

        let mut r = store.open_content(&h1).unwrap();
        r.seek(SeekFrom::Start(7)).unwrap();
        let mut tail = String::new();
        r.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "789");
    }

    #[test]
    fn failed_commit_leaves_state_untouched() {
        let store = MemoryFileStore::new();
        let a = AreaKey::new(1, "files", 0);
        let root = StoredFile::directory(a.clone(), "/", 0);
        store
            .commit(&ChangeBatch {
                creates: vec![root.clone()],
                ..Default::default()
            })
            .unwrap();

        let other = StoredFile::directory(a.clone(), "/sub/", 0);
        let err = store
            .commit(&ChangeBatch {
                creates: vec![other, root],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, FileAreaError::Conflict(_)));
        assert_eq!(store.list_area(&a).unwrap().len(), 1);
    }

    #[test]
    fn missing_content_is_not_found() {
        let store = MemoryFileStore::new();
        assert!(matches!(
            store.open_content(&ContentHash::of(b"nope")),
            Err(FileAreaError::NotFound(_))
        ));
    }
}
