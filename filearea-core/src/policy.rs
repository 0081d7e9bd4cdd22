use serde::{Deserialize, Serialize};

/// Per-area limits applied when a draft is merged into its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaOptions {
    pub allow_subdirectories: bool,
    /// -1 means unlimited. Directories never count.
    pub max_files: i64,
    /// 0 means unlimited.
    pub max_bytes_per_file: u64,
}

impl Default for AreaOptions {
    fn default() -> Self {
        Self {
            allow_subdirectories: true,
            max_files: -1,
            max_bytes_per_file: 0,
        }
    }
}

impl AreaOptions {
    pub fn exceeds_size(&self, size: u64) -> bool {
        self.max_bytes_per_file > 0 && size > self.max_bytes_per_file
    }

    pub fn file_limit_reached(&self, accepted: u64) -> bool {
        self.max_files >= 0 && accepted >= self.max_files as u64
    }
}
