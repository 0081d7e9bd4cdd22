use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::{AreaKey, StoredFile};
use crate::error::{FileAreaError, Result};
use crate::hash::identity::PathHash;
use crate::store::ChangeBatch;

/// In-memory view of every stored file, shared by the store backends.
#[derive(Clone, Debug, Default)]
pub struct AreaIndex {
    by_hash: HashMap<PathHash, StoredFile>,
    by_area: BTreeMap<AreaKey, BTreeMap<(String, String), PathHash>>,
}

impl AreaIndex {
    pub fn from_files(files: impl IntoIterator<Item = StoredFile>) -> Self {
        let mut idx = Self::default();
        for f in files {
            idx.insert(f);
        }
        idx
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn get(&self, hash: &PathHash) -> Option<&StoredFile> {
        self.by_hash.get(hash)
    }

    pub fn list_area(&self, area: &AreaKey) -> Vec<StoredFile> {
        self.by_area
            .get(area)
            .map(|slots| {
                slots
                    .values()
                    .filter_map(|h| self.by_hash.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &StoredFile> + '_ {
        self.by_area
            .values()
            .flat_map(|slots| slots.values())
            .filter_map(|h| self.by_hash.get(h))
    }

    /// Validate `batch` against the current state without touching it.
    pub fn check(&self, batch: &ChangeBatch) -> Result<()> {
        let deleted: HashSet<&PathHash> = batch.deletes.iter().collect();
        for f in &batch.updates {
            let h = f.path_hash();
            if deleted.contains(&h) || !self.by_hash.contains_key(&h) {
                return Err(FileAreaError::NotFound(format!(
                    "{}{} in {}",
                    f.path, f.filename, f.area
                )));
            }
        }
        let mut created = HashSet::new();
        for f in &batch.creates {
            let h = f.path_hash();
            let occupied = self.by_hash.contains_key(&h) && !deleted.contains(&h);
            if occupied || !created.insert(h) {
                return Err(FileAreaError::Conflict(format!(
                    "{}{} in {}",
                    f.path, f.filename, f.area
                )));
            }
        }
        Ok(())
    }

    /// Apply a batch that passed `check`.
    pub fn apply(&mut self, batch: &ChangeBatch) {
        for h in &batch.deletes {
            self.remove(h);
        }
        for f in batch.updates.iter().chain(&batch.creates) {
            self.insert(f.clone());
        }
        for area in &batch.purges {
            if let Some(slots) = self.by_area.remove(area) {
                for h in slots.values() {
                    self.by_hash.remove(h);
                }
            }
        }
    }

    fn insert(&mut self, f: StoredFile) {
        let h = f.path_hash();
        self.by_area
            .entry(f.area.clone())
            .or_default()
            .insert((f.path.clone(), f.filename.clone()), h);
        self.by_hash.insert(h, f);
    }

    fn remove(&mut self, h: &PathHash) {
        let Some(f) = self.by_hash.remove(h) else {
            return;
        };
        if let Some(slots) = self.by_area.get_mut(&f.area) {
            slots.remove(&(f.path, f.filename));
            if slots.is_empty() {
                self.by_area.remove(&f.area);
            }
        }
    }
}
