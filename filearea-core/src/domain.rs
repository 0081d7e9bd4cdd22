// filearea_core/src/domain.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::FileAreaError;
use crate::hash::content::ContentHash;
use crate::hash::identity::{PathHash, identity_hash};

pub const DRAFT_AREA: &str = "draft";

/// Addresses one file collection: the owning context, the area name and the item within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaKey {
    pub context_id: i64,
    pub area: String,
    pub item_id: i64,
}

impl AreaKey {
    pub fn new(context_id: i64, area: impl Into<String>, item_id: i64) -> Self {
        Self {
            context_id,
            area: area.into(),
            item_id,
        }
    }

    pub fn draft(user_context_id: i64, draft_item_id: i64) -> Self {
        Self::new(user_context_id, DRAFT_AREA, draft_item_id)
    }

    pub fn is_draft(&self) -> bool {
        self.area == DRAFT_AREA
    }

    pub fn path_hash(&self, path: &str, filename: &str) -> PathHash {
        identity_hash(self.context_id, &self.area, self.item_id, path, filename)
    }
}

impl fmt::Display for AreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.context_id, self.area, self.item_id)
    }
}

/// Parses the `ctx/area/item` form printed by `Display`.
impl FromStr for AreaKey {
    type Err = FileAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || FileAreaError::InvalidPath(format!("expected ctx/area/item, got {s:?}"));
        let mut parts = s.split('/');
        let (Some(ctx), Some(area), Some(item), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };
        if area.is_empty() {
            return Err(bad());
        }
        Ok(Self::new(
            ctx.parse().map_err(|_| bad())?,
            area,
            item.parse().map_err(|_| bad())?,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub area: AreaKey,
    pub path: String,
    /// Empty for directory entries.
    pub filename: String,
    pub content_hash: ContentHash,
    pub size: u64,
    pub mime_type: Option<String>,
    pub time_created: i64,
    pub time_modified: i64,
    #[serde(default)]
    pub author: Option<String>,
    /// Externally held reference (permalink, alias target). Survives reconciliation untouched.
    #[serde(default)]
    pub reference: Option<String>,
}

impl StoredFile {
    pub fn directory(area: AreaKey, path: &str, now: i64) -> Self {
        Self {
            area,
            path: path.to_string(),
            filename: String::new(),
            content_hash: ContentHash::DIRECTORY,
            size: 0,
            mime_type: None,
            time_created: now,
            time_modified: now,
            author: None,
            reference: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.filename.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.is_directory() && self.path == "/"
    }

    pub fn path_hash(&self) -> PathHash {
        self.area.path_hash(&self.path, &self.filename)
    }

    pub fn full_path(&self) -> String {
        format!("{}{}", self.path, self.filename)
    }

    /// Same file, addressed in another area.
    pub fn rekeyed(&self, area: &AreaKey) -> StoredFile {
        StoredFile {
            area: area.clone(),
            ..self.clone()
        }
    }
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rekeyed_changes_only_identity() {
        let draft = AreaKey::draft(7, 1234);
        let target = AreaKey::new(40, "attachment", 3);
        let mut f = StoredFile::directory(draft.clone(), "/", 100);
        f.filename = "a.txt".into();
        f.content_hash = ContentHash::of(b"a");
        f.size = 1;

        let moved = f.rekeyed(&target);
        assert_eq!(moved.area, target);
        assert_eq!(moved.content_hash, f.content_hash);
        assert_eq!(moved.time_created, 100);
        assert_ne!(moved.path_hash(), f.path_hash());
        assert_eq!(moved.path_hash(), target.path_hash("/", "a.txt"));
    }

    #[test]
    fn area_key_parses_its_display_form() {
        let k = AreaKey::new(12, "attachment", 3);
        assert_eq!(k.to_string().parse::<AreaKey>().unwrap(), k);
        assert!("12/attachment".parse::<AreaKey>().is_err());
        assert!("12//3".parse::<AreaKey>().is_err());
        assert!("x/a/3".parse::<AreaKey>().is_err());
        assert!("1/a/2/3".parse::<AreaKey>().is_err());
    }

    #[test]
    fn root_detection() {
        let a = AreaKey::draft(1, 1);
        assert!(StoredFile::directory(a.clone(), "/", 0).is_root());
        assert!(!StoredFile::directory(a, "/sub/", 0).is_root());
    }
}
