//! Draft-to-target merge planning.
//!
//! Produces the smallest set of creates, content replacements and deletes that
//! turns a target area into the accepted contents of a draft area. Slots present on
//! both sides keep their target record, so creation time and external references
//! survive an edit.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::{AreaKey, StoredFile};
use crate::hash::identity::PathHash;
use crate::policy::AreaOptions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    Subdirectory,
    TooLarge,
    TooManyFiles,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedFile {
    pub file: StoredFile,
    pub reason: DropReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// New slots, already addressed in the target area.
    pub to_create: Vec<StoredFile>,
    /// Existing target records carrying replacement content.
    pub to_update: Vec<StoredFile>,
    pub to_delete: Vec<StoredFile>,
    /// Draft entries rejected by the area options. Never an error.
    pub dropped: Vec<DroppedFile>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

struct Admission<'a> {
    options: &'a AreaOptions,
    accepted_files: u64,
}

impl<'a> Admission<'a> {
    fn new(options: &'a AreaOptions, accepted_files: u64) -> Self {
        Self {
            options,
            accepted_files,
        }
    }

    fn rejection(&self, file: &StoredFile) -> Option<DropReason> {
        if !self.options.allow_subdirectories && file.path != "/" {
            return Some(DropReason::Subdirectory);
        }
        if file.is_directory() {
            return None;
        }
        if self.options.exceeds_size(file.size) {
            return Some(DropReason::TooLarge);
        }
        if self.options.file_limit_reached(self.accepted_files) {
            return Some(DropReason::TooManyFiles);
        }
        None
    }

    fn offer(&mut self, file: StoredFile, plan: &mut ReconcilePlan) {
        if let Some(reason) = self.rejection(&file) {
            plan.dropped.push(DroppedFile { file, reason });
            return;
        }
        if !file.is_directory() {
            self.accepted_files += 1;
        }
        plan.to_create.push(file);
    }
}

/// Plan the merge of `draft` into the area `target` currently holding `target_files`.
///
/// `draft == None` stands for a submission that carried no usable file list and
/// yields an empty plan. A draft holding only its root directory clears the target.
pub fn reconcile(
    target: &AreaKey,
    draft: Option<&[StoredFile]>,
    target_files: &[StoredFile],
    options: &AreaOptions,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    let Some(draft) = draft else {
        warn!(area = %target, "no draft file list supplied; leaving area untouched");
        return plan;
    };

    if draft.len() < 2 {
        plan.to_delete = target_files.to_vec();
        debug!(area = %target, deleted = plan.to_delete.len(), "draft emptied; clearing area");
        return plan;
    }

    if target_files.len() < 2 {
        populate(target, draft, target_files, options, &mut plan);
    } else {
        merge(target, draft, target_files, options, &mut plan);
    }

    debug!(
        area = %target,
        create = plan.to_create.len(),
        update = plan.to_update.len(),
        delete = plan.to_delete.len(),
        dropped = plan.dropped.len(),
        "reconciled draft"
    );
    plan
}

// First population. The target holds at most its root directory.
fn populate(
    target: &AreaKey,
    draft: &[StoredFile],
    target_files: &[StoredFile],
    options: &AreaOptions,
    plan: &mut ReconcilePlan,
) {
    let mut existing: Vec<PathHash> = target_files.iter().map(|f| f.path_hash()).collect();
    let mut admission = Admission::new(options, 0);
    for file in draft {
        let slot = target.path_hash(&file.path, &file.filename);
        if let Some(pos) = existing.iter().position(|h| *h == slot) {
            existing.remove(pos);
            continue;
        }
        admission.offer(file.rekeyed(target), plan);
    }
    plan.to_delete.extend(
        target_files
            .iter()
            .filter(|f| existing.contains(&f.path_hash()))
            .cloned(),
    );
}

fn merge(
    target: &AreaKey,
    draft: &[StoredFile],
    target_files: &[StoredFile],
    options: &AreaOptions,
    plan: &mut ReconcilePlan,
) {
    let mut pending: HashMap<PathHash, (usize, &StoredFile)> = draft
        .iter()
        .enumerate()
        .map(|(i, f)| (target.path_hash(&f.path, &f.filename), (i, f)))
        .collect();

    let mut retained = 0u64;
    for old in target_files {
        let Some((_, new)) = pending.remove(&old.path_hash()) else {
            plan.to_delete.push(old.clone());
            continue;
        };
        if old.is_directory() {
            continue;
        }
        retained += 1;
        if new.content_hash == old.content_hash {
            continue;
        }
        if options.exceeds_size(new.size) {
            plan.dropped.push(DroppedFile {
                file: new.rekeyed(target),
                reason: DropReason::TooLarge,
            });
            continue;
        }
        plan.to_update.push(StoredFile {
            content_hash: new.content_hash,
            size: new.size,
            mime_type: new.mime_type.clone(),
            time_modified: new.time_modified,
            ..old.clone()
        });
    }

    // Keep submission order for the slots that are new to the target.
    let mut added: Vec<(usize, &StoredFile)> = pending.into_values().collect();
    added.sort_by_key(|(i, _)| *i);

    let mut admission = Admission::new(options, retained);
    for (_, file) in added {
        admission.offer(file.rekeyed(target), plan);
    }
}
