use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::store::FileStore;
use crate::store::fs::FsFileStore;
use crate::store::memory::MemoryFileStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Fs { root: PathBuf },
}

pub fn open_store(backend: Backend) -> Result<Arc<dyn FileStore>> {
    match backend {
        Backend::Memory => Ok(Arc::new(MemoryFileStore::new())),
        Backend::Fs { root } => Ok(Arc::new(FsFileStore::open(&root)?)),
    }
}
