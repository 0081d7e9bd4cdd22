//! Draft-area lifecycle.
//!
//! A draft is a scratch copy of a target area at `(user_ctx, "draft", draft_id)`.
//! Users edit the draft freely; `save_draft` merges it back through the reconciler
//! and removes it in the same store commit as the target changes.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{DRAFTFILE_SCRIPT, EngineConfig};
use crate::domain::{AreaKey, DRAFT_AREA, StoredFile, now_unix};
use crate::error::{FileAreaError, Result};
use crate::mime::{MimeLookup, StaticMimeTypes};
use crate::policy::AreaOptions;
use crate::reconcile::{DroppedFile, reconcile};
use crate::store::{ChangeBatch, FileStore};
use crate::url::{self, UrlOptions};
use crate::util::sanitize::{ancestor_dirs, normalize_dir_path, validate_filename};

const MAX_DRAFT_ID: u32 = 999_999_999;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedDraft {
    pub draft_id: i64,
    /// Input text with placeholders expanded to draft URLs.
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub dropped: Vec<DroppedFile>,
    /// Input text with draft URLs folded into placeholders.
    pub text: Option<String>,
}

pub struct FileAreas {
    store: Arc<dyn FileStore>,
    config: EngineConfig,
    mime: Arc<dyn MimeLookup>,
}

impl FileAreas {
    pub fn new(store: Arc<dyn FileStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            mime: Arc::new(StaticMimeTypes),
        }
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reserve a fresh draft id by committing its root directory. A taken id shows up
    /// as `Conflict` and another id is tried.
    pub fn allocate_draft(&self, user_ctx: i64) -> Result<i64> {
        self.allocate_draft_with(user_ctx, random_draft_id)
    }

    pub(crate) fn allocate_draft_with(
        &self,
        user_ctx: i64,
        mut next_id: impl FnMut() -> Result<i64>,
    ) -> Result<i64> {
        let attempts = self.config.draft_allocation_attempts;
        for attempt in 1..=attempts {
            let id = next_id()?;
            let root = StoredFile::directory(AreaKey::draft(user_ctx, id), "/", now_unix());
            match self.store.commit(&ChangeBatch {
                creates: vec![root],
                ..Default::default()
            }) {
                Ok(()) => {
                    debug!(user_ctx, draft_id = id, attempt, "allocated draft area");
                    return Ok(id);
                }
                Err(FileAreaError::Conflict(_)) => {
                    debug!(user_ctx, draft_id = id, attempt, "draft id taken; retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(FileAreaError::AllocationExhausted(attempts))
    }

    /// New draft pre-filled with the files of `target`. Content is shared, not copied.
    pub fn prepare_draft(
        &self,
        user_ctx: i64,
        target: Option<&AreaKey>,
        text: Option<&str>,
    ) -> Result<PreparedDraft> {
        let draft_id = self.allocate_draft(user_ctx)?;
        let draft = AreaKey::draft(user_ctx, draft_id);

        if let Some(target) = target {
            let creates: Vec<StoredFile> = self
                .store
                .list_area(target)?
                .iter()
                .filter(|f| !f.is_root())
                .map(|f| f.rekeyed(&draft))
                .collect();
            let copied = creates.len();
            self.store.commit(&ChangeBatch {
                creates,
                ..Default::default()
            })?;
            debug!(from = %target, to = %draft, files = copied, "copied area into draft");
        }

        let text = text.map(|t| {
            url::from_placeholder(
                t,
                &self.config.script_url(DRAFTFILE_SCRIPT),
                user_ctx,
                DRAFT_AREA,
                Some(draft_id),
                &self.config.url_options(),
            )
        });
        Ok(PreparedDraft { draft_id, text })
    }

    /// Store `src` at `path`+`filename`, creating missing parent directories. An
    /// existing file at that slot gets its content replaced.
    pub fn add_to_draft(
        &self,
        user_ctx: i64,
        draft_id: i64,
        path: &str,
        filename: &str,
        src: &mut dyn Read,
        mime: Option<&str>,
    ) -> Result<StoredFile> {
        let draft = self.existing_draft(user_ctx, draft_id)?;
        let path = normalize_dir_path(path)?;
        if filename.is_empty() {
            return Err(FileAreaError::InvalidPath("empty filename".into()));
        }
        validate_filename(filename)?;

        let (content_hash, size) = self.store.put_content(src)?;
        let now = now_unix();
        let mut batch = ChangeBatch {
            creates: self.missing_dirs(&draft, &path, now)?,
            ..Default::default()
        };
        let file = match self.store.get(&draft.path_hash(&path, filename))? {
            Some(old) => {
                let f = StoredFile {
                    content_hash,
                    size,
                    mime_type: Some(self.mime_type(filename, mime)),
                    time_modified: now,
                    ..old
                };
                batch.updates.push(f.clone());
                f
            }
            None => {
                let f = StoredFile {
                    filename: filename.to_string(),
                    content_hash,
                    size,
                    mime_type: Some(self.mime_type(filename, mime)),
                    ..StoredFile::directory(draft.clone(), &path, now)
                };
                batch.creates.push(f.clone());
                f
            }
        };
        self.store.commit(&batch)?;
        debug!(area = %draft, file = %file.full_path(), bytes = size, "added file to draft");
        Ok(file)
    }

    /// Create `path` and its parents. Existing directories are left alone.
    pub fn create_draft_directory(&self, user_ctx: i64, draft_id: i64, path: &str) -> Result<()> {
        let draft = self.existing_draft(user_ctx, draft_id)?;
        let path = normalize_dir_path(path)?;
        let creates = self.missing_dirs(&draft, &path, now_unix())?;
        self.store.commit(&ChangeBatch {
            creates,
            ..Default::default()
        })
    }

    /// Delete one file, or with an empty `filename` a directory and everything below
    /// it. Returns the number of entries removed.
    pub fn delete_from_draft(
        &self,
        user_ctx: i64,
        draft_id: i64,
        path: &str,
        filename: &str,
    ) -> Result<usize> {
        let draft = self.existing_draft(user_ctx, draft_id)?;
        let path = normalize_dir_path(path)?;
        validate_filename(filename)?;

        let deletes = if filename.is_empty() {
            if path == "/" {
                return Err(FileAreaError::InvalidPath(
                    "the draft root cannot be deleted".into(),
                ));
            }
            self.store
                .list_area(&draft)?
                .iter()
                .filter(|f| f.path.starts_with(&path))
                .map(StoredFile::path_hash)
                .collect::<Vec<_>>()
        } else {
            vec![draft.path_hash(&path, filename)]
        };
        let Some(first) = deletes.first() else {
            return Err(FileAreaError::NotFound(format!("{path} in {draft}")));
        };
        if self.store.get(first)?.is_none() {
            return Err(FileAreaError::NotFound(format!("{path}{filename} in {draft}")));
        }

        let n = deletes.len();
        self.store.commit(&ChangeBatch {
            deletes,
            ..Default::default()
        })?;
        debug!(area = %draft, path = %path, filename, removed = n, "deleted from draft");
        Ok(n)
    }

    pub fn list_draft(&self, user_ctx: i64, draft_id: i64) -> Result<Vec<StoredFile>> {
        self.store.list_area(&AreaKey::draft(user_ctx, draft_id))
    }

    pub fn draft_url(&self, user_ctx: i64, draft_id: i64, path: &str, filename: &str) -> String {
        url::file_url(
            &self.config.script_url(DRAFTFILE_SCRIPT),
            user_ctx,
            DRAFT_AREA,
            Some(draft_id),
            path,
            filename,
            &self.config.url_options(),
        )
    }

    /// Merge the draft into `target`, then drop the draft. Target changes and the draft
    /// purge are one commit: when it fails, neither area changes and the save can be
    /// retried.
    pub fn save_draft(
        &self,
        user_ctx: i64,
        draft_id: i64,
        target: &AreaKey,
        options: &AreaOptions,
        text: Option<&str>,
    ) -> Result<SaveOutcome> {
        let draft = AreaKey::draft(user_ctx, draft_id);
        let draft_files = self.store.list_area(&draft)?;
        let target_files = self.store.list_area(target)?;

        // A draft id that was never allocated carries no file list at all.
        let submitted = (!draft_files.is_empty()).then_some(draft_files.as_slice());
        let plan = reconcile(target, submitted, &target_files, options);

        let batch = ChangeBatch {
            deletes: plan.to_delete.iter().map(StoredFile::path_hash).collect(),
            updates: plan.to_update.clone(),
            creates: plan.to_create.clone(),
            purges: if submitted.is_some() {
                vec![draft.clone()]
            } else {
                Vec::new()
            },
        };
        self.store.commit(&batch)?;

        info!(
            draft = %draft,
            target = %target,
            created = plan.to_create.len(),
            updated = plan.to_update.len(),
            deleted = plan.to_delete.len(),
            dropped = plan.dropped.len(),
            "saved draft"
        );
        Ok(SaveOutcome {
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            deleted: plan.to_delete.len(),
            dropped: plan.dropped,
            text: text.map(|t| self.fold_draft_urls(t, user_ctx, draft_id)),
        })
    }

    pub fn purge_area(&self, area: &AreaKey) -> Result<()> {
        self.store.commit(&ChangeBatch {
            purges: vec![area.clone()],
            ..Default::default()
        })?;
        info!(area = %area, "purged area");
        Ok(())
    }

    /// Copy a local directory tree into the draft below `path`. Content is hashed and
    /// stored in parallel; the entries land in one commit.
    pub fn import_dir(&self, user_ctx: i64, draft_id: i64, src: &Path, path: &str) -> Result<usize> {
        let draft = self.existing_draft(user_ctx, draft_id)?;
        let base = normalize_dir_path(path)?;

        let mut dirs = vec![base.clone()];
        let mut files = Vec::new();
        for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| FileAreaError::Io(e.into()))?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| FileAreaError::InvalidPath(e.to_string()))?;
            let rel = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                dirs.push(normalize_dir_path(&format!("{base}{rel}"))?);
            } else if entry.file_type().is_file() {
                let (dir, name) = match rel.rsplit_once('/') {
                    Some((d, n)) => (normalize_dir_path(&format!("{base}{d}"))?, n.to_string()),
                    None => (base.clone(), rel.clone()),
                };
                validate_filename(&name)?;
                files.push((dir, name, entry.into_path()));
            }
        }

        let now = now_unix();
        let store = &self.store;
        let mime = &self.mime;
        let stored: Vec<StoredFile> = files
            .par_iter()
            .map(|(dir, name, abs)| -> Result<StoredFile> {
                let mut f = std::fs::File::open(abs)?;
                let (content_hash, size) = store.put_content(&mut f)?;
                Ok(StoredFile {
                    filename: name.clone(),
                    content_hash,
                    size,
                    mime_type: Some(mime.mime_for(name).to_string()),
                    ..StoredFile::directory(draft.clone(), dir, now)
                })
            })
            .collect::<Result<_>>()?;

        let mut batch = ChangeBatch::default();
        let mut seen = std::collections::HashSet::new();
        for dir in &dirs {
            for d in ancestor_dirs(dir) {
                let h = draft.path_hash(&d, "");
                if seen.insert(h) && self.store.get(&h)?.is_none() {
                    batch.creates.push(StoredFile::directory(draft.clone(), &d, now));
                }
            }
        }
        for f in stored {
            match self.store.get(&f.path_hash())? {
                Some(old) => batch.updates.push(StoredFile {
                    time_created: old.time_created,
                    author: old.author,
                    reference: old.reference,
                    ..f
                }),
                None => batch.creates.push(f),
            }
        }
        let n = batch.updates.len() + batch.creates.len();
        self.store.commit(&batch)?;
        info!(area = %draft, src = %src.display(), entries = n, "imported directory");
        Ok(n)
    }

    fn existing_draft(&self, user_ctx: i64, draft_id: i64) -> Result<AreaKey> {
        let draft = AreaKey::draft(user_ctx, draft_id);
        if self.store.get(&draft.path_hash("/", ""))?.is_none() {
            return Err(FileAreaError::NotFound(format!("draft area {draft}")));
        }
        Ok(draft)
    }

    fn missing_dirs(&self, draft: &AreaKey, path: &str, now: i64) -> Result<Vec<StoredFile>> {
        let mut out = Vec::new();
        for dir in ancestor_dirs(path) {
            if self.store.get(&draft.path_hash(&dir, ""))?.is_none() {
                out.push(StoredFile::directory(draft.clone(), &dir, now));
            }
        }
        Ok(out)
    }

    fn mime_type(&self, filename: &str, given: Option<&str>) -> String {
        given
            .map(str::to_string)
            .unwrap_or_else(|| self.mime.mime_for(filename).to_string())
    }

    fn fold_draft_urls(&self, text: &str, user_ctx: i64, draft_id: i64) -> String {
        let script = self.config.script_url(DRAFTFILE_SCRIPT);
        let mut out = text.to_string();
        for slash_arguments in [true, false] {
            for force_https in [false, true] {
                let opts = UrlOptions {
                    slash_arguments,
                    force_download: false,
                    force_https,
                };
                let base = url::area_base_url(&script, user_ctx, DRAFT_AREA, Some(draft_id), &opts);
                out = url::to_placeholder(&out, &base);
            }
        }
        out
    }
}

fn random_draft_id() -> Result<i64> {
    let mut buf = [0u8; 4];
    getrandom::getrandom(&mut buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    Ok(i64::from(u32::from_le_bytes(buf) % MAX_DRAFT_ID) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::content::ContentHash;
    use crate::hash::identity::PathHash;
    use crate::store::ContentReader;
    use crate::store::memory::MemoryFileStore;
    use crate::url::PLACEHOLDER;

    const USER: i64 = 5;

    fn areas() -> FileAreas {
        FileAreas::new(Arc::new(MemoryFileStore::new()), EngineConfig::default())
    }

    fn names(files: &[StoredFile]) -> Vec<String> {
        files.iter().map(StoredFile::full_path).collect()
    }

    #[test]
    fn draft_round_trip_keeps_identity() {
        let fa = areas();
        let target = AreaKey::new(40, "attachment", 1);

        let first = fa.prepare_draft(USER, None, None).unwrap();
        fa.add_to_draft(USER, first.draft_id, "/", "a.txt", &mut &b"aaa"[..], None)
            .unwrap();
        fa.add_to_draft(USER, first.draft_id, "/docs/", "b.pdf", &mut &b"bbb"[..], None)
            .unwrap();
        let saved = fa
            .save_draft(USER, first.draft_id, &target, &AreaOptions::default(), None)
            .unwrap();
        assert_eq!(saved.created, 4);
        assert!(fa.list_draft(USER, first.draft_id).unwrap().is_empty());

        let before = fa.store().list_area(&target).unwrap();
        assert_eq!(names(&before), vec!["/", "/a.txt", "/docs/", "/docs/b.pdf"]);
        assert_eq!(before[3].mime_type.as_deref(), Some("application/pdf"));

        // Untouched second round: nothing changes, records are identical.
        let second = fa.prepare_draft(USER, Some(&target), None).unwrap();
        assert_ne!(second.draft_id, 0);
        let saved = fa
            .save_draft(USER, second.draft_id, &target, &AreaOptions::default(), None)
            .unwrap();
        assert_eq!((saved.created, saved.updated, saved.deleted), (0, 0, 0));
        assert_eq!(fa.store().list_area(&target).unwrap(), before);
    }

    #[test]
    fn edits_in_draft_reach_target() {
        let fa = areas();
        let target = AreaKey::new(40, "attachment", 1);
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        fa.add_to_draft(USER, d, "/", "keep.txt", &mut &b"1"[..], None).unwrap();
        fa.add_to_draft(USER, d, "/old/", "gone.txt", &mut &b"2"[..], None).unwrap();
        fa.add_to_draft(USER, d, "/", "edit.txt", &mut &b"3"[..], None).unwrap();
        fa.save_draft(USER, d, &target, &AreaOptions::default(), None).unwrap();
        let keep_before = fa
            .store()
            .get(&target.path_hash("/", "keep.txt"))
            .unwrap()
            .unwrap();

        let d = fa.prepare_draft(USER, Some(&target), None).unwrap().draft_id;
        assert_eq!(fa.delete_from_draft(USER, d, "/old/", "").unwrap(), 2);
        fa.add_to_draft(USER, d, "/", "edit.txt", &mut &b"33"[..], None).unwrap();
        fa.add_to_draft(USER, d, "/", "new.txt", &mut &b"4"[..], None).unwrap();
        let out = fa
            .save_draft(USER, d, &target, &AreaOptions::default(), None)
            .unwrap();
        assert_eq!((out.created, out.updated, out.deleted), (1, 1, 2));

        let after = fa.store().list_area(&target).unwrap();
        assert_eq!(names(&after), vec!["/", "/edit.txt", "/keep.txt", "/new.txt"]);
        assert_eq!(after[1].size, 2);
        assert_eq!(after[2], keep_before);
    }

    #[test]
    fn empty_draft_clears_target() {
        let fa = areas();
        let target = AreaKey::new(40, "attachment", 1);
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        fa.add_to_draft(USER, d, "/", "a.txt", &mut &b"a"[..], None).unwrap();
        fa.save_draft(USER, d, &target, &AreaOptions::default(), None).unwrap();

        let d = fa.prepare_draft(USER, Some(&target), None).unwrap().draft_id;
        fa.delete_from_draft(USER, d, "/", "a.txt").unwrap();
        let out = fa
            .save_draft(USER, d, &target, &AreaOptions::default(), None)
            .unwrap();
        assert_eq!(out.deleted, 2);
        assert!(fa.store().list_area(&target).unwrap().is_empty());
    }

    #[test]
    fn unknown_draft_changes_nothing() {
        let fa = areas();
        let target = AreaKey::new(40, "attachment", 1);
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        fa.add_to_draft(USER, d, "/", "a.txt", &mut &b"a"[..], None).unwrap();
        fa.save_draft(USER, d, &target, &AreaOptions::default(), None).unwrap();

        let out = fa
            .save_draft(USER, 424242, &target, &AreaOptions::default(), Some("text"))
            .unwrap();
        assert_eq!((out.created, out.updated, out.deleted), (0, 0, 0));
        assert_eq!(out.text.as_deref(), Some("text"));
        assert_eq!(fa.store().list_area(&target).unwrap().len(), 2);
    }

    #[test]
    fn policy_drops_are_reported() {
        let fa = areas();
        let target = AreaKey::new(40, "attachment", 1);
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        for name in ["1.txt", "2.txt", "3.txt"] {
            fa.add_to_draft(USER, d, "/", name, &mut name.as_bytes(), None).unwrap();
        }
        let opts = AreaOptions {
            max_files: 2,
            ..Default::default()
        };
        let out = fa.save_draft(USER, d, &target, &opts, None).unwrap();
        assert_eq!(out.dropped.len(), 1);
        assert_eq!(out.dropped[0].file.filename, "3.txt");
        assert_eq!(
            names(&fa.store().list_area(&target).unwrap()),
            vec!["/", "/1.txt", "/2.txt"]
        );
    }

    #[test]
    fn text_urls_move_between_forms() {
        let fa = areas();
        let target = AreaKey::new(40, "intro", 0);
        let stored = format!(r#"<img src="{PLACEHOLDER}pic.png">"#);

        let prepared = fa.prepare_draft(USER, Some(&target), Some(&stored)).unwrap();
        let d = prepared.draft_id;
        let editing = prepared.text.unwrap();
        assert_eq!(
            editing,
            format!(r#"<img src="http://localhost/draftfile.php/{USER}/draft/{d}/pic.png">"#)
        );

        let legacy = format!(
            "{editing} <a href=\"https://localhost/draftfile.php?file=/{USER}/draft/{d}/x.pdf\">"
        );
        let out = fa
            .save_draft(USER, d, &target, &AreaOptions::default(), Some(&legacy))
            .unwrap();
        assert_eq!(
            out.text.unwrap(),
            format!(r#"{stored} <a href="{PLACEHOLDER}x.pdf">"#)
        );
    }

    #[test]
    fn draft_url_uses_draft_script() {
        let fa = areas();
        assert_eq!(
            fa.draft_url(USER, 77, "/a b/", "c.txt"),
            "http://localhost/draftfile.php/5/draft/77/a%20b/c.txt"
        );
    }

    #[test]
    fn allocation_retries_on_collision() {
        let fa = areas();
        let taken = fa.allocate_draft_with(USER, || Ok(1)).unwrap();
        assert_eq!(taken, 1);

        let mut ids = [1, 1, 2].into_iter();
        let id = fa
            .allocate_draft_with(USER, || Ok(ids.next().unwrap()))
            .unwrap();
        assert_eq!(id, 2);

        let err = fa.allocate_draft_with(USER, || Ok(1)).unwrap_err();
        assert!(matches!(err, FileAreaError::AllocationExhausted(10)));
    }

    #[test]
    fn random_ids_are_positive() {
        for _ in 0..100 {
            let id = random_draft_id().unwrap();
            assert!((1..=i64::from(MAX_DRAFT_ID)).contains(&id));
        }
    }

    #[test]
    fn draft_edits_validate_input() {
        let fa = areas();
        assert!(matches!(
            fa.add_to_draft(USER, 9, "/", "a", &mut &b""[..], None),
            Err(FileAreaError::NotFound(_))
        ));
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        assert!(fa.add_to_draft(USER, d, "/../", "a", &mut &b""[..], None).is_err());
        assert!(fa.add_to_draft(USER, d, "/", "", &mut &b""[..], None).is_err());
        assert!(fa.delete_from_draft(USER, d, "/", "").is_err());
        assert!(matches!(
            fa.delete_from_draft(USER, d, "/", "missing.txt"),
            Err(FileAreaError::NotFound(_))
        ));

        fa.create_draft_directory(USER, d, "a/b").unwrap();
        fa.create_draft_directory(USER, d, "/a/").unwrap();
        assert_eq!(
            names(&fa.list_draft(USER, d).unwrap()),
            vec!["/", "/a/", "/a/b/"]
        );
    }

    #[test]
    fn imports_a_directory_tree() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("img/icons")).unwrap();
        std::fs::write(src.path().join("readme.txt"), b"hello").unwrap();
        std::fs::write(src.path().join("img/icons/a.png"), b"png").unwrap();

        let fa = areas();
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        assert_eq!(fa.import_dir(USER, d, src.path(), "/").unwrap(), 4);
        assert_eq!(
            names(&fa.list_draft(USER, d).unwrap()),
            vec!["/", "/img/", "/img/icons/", "/img/icons/a.png", "/readme.txt"]
        );

        std::fs::write(src.path().join("readme.txt"), b"changed").unwrap();
        fa.import_dir(USER, d, src.path(), "/").unwrap();
        let readme = fa
            .store()
            .get(&AreaKey::draft(USER, d).path_hash("/", "readme.txt"))
            .unwrap()
            .unwrap();
        assert_eq!(readme.size, 7);
    }

    /// Delegates to a memory store but refuses commits once armed.
    struct FailingStore {
        inner: MemoryFileStore,
        fail: std::sync::atomic::AtomicBool,
    }

    impl FileStore for FailingStore {
        fn list_area(&self, area: &AreaKey) -> Result<Vec<StoredFile>> {
            self.inner.list_area(area)
        }

        fn get(&self, hash: &PathHash) -> Result<Option<StoredFile>> {
            self.inner.get(hash)
        }

        fn put_content(&self, src: &mut dyn Read) -> Result<(ContentHash, u64)> {
            self.inner.put_content(src)
        }

        fn open_content(&self, hash: &ContentHash) -> Result<Box<dyn ContentReader>> {
            self.inner.open_content(hash)
        }

        fn commit(&self, batch: &ChangeBatch) -> Result<()> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.commit(batch)
        }
    }

    #[test]
    fn failed_save_keeps_both_areas() {
        let store = Arc::new(FailingStore {
            inner: MemoryFileStore::new(),
            fail: false.into(),
        });
        let fa = FileAreas::new(store.clone(), EngineConfig::default());
        let target = AreaKey::new(40, "attachment", 1);
        let d = fa.prepare_draft(USER, None, None).unwrap().draft_id;
        fa.add_to_draft(USER, d, "/", "a.txt", &mut &b"a"[..], None).unwrap();

        store.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(fa
            .save_draft(USER, d, &target, &AreaOptions::default(), None)
            .is_err());
        assert!(fa.store().list_area(&target).unwrap().is_empty());
        assert_eq!(fa.list_draft(USER, d).unwrap().len(), 2);

        store.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        let out = fa
            .save_draft(USER, d, &target, &AreaOptions::default(), None)
            .unwrap();
        assert_eq!(out.created, 2);
        assert!(fa.list_draft(USER, d).unwrap().is_empty());
    }
}
