use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FileAreaError, Result};
use crate::serve::headers::DownloadOptions;
use crate::serve::stream::{DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_TIME_LIMIT_SECS, TransferLimits};
use crate::store_factory::Backend;
use crate::url::UrlOptions;

pub const PLUGINFILE_SCRIPT: &str = "pluginfile.php";
pub const DRAFTFILE_SCRIPT: &str = "draftfile.php";

/// Site-wide engine settings. Every field has a default, so a config file only
/// names what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Public root URL, without a trailing slash.
    pub wwwroot: String,
    pub slash_arguments: bool,
    pub force_https: bool,
    /// Store directory; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub chunk_size: usize,
    /// Per-chunk budget. Together with `chunk_size` it sets the slowest client served.
    pub chunk_time_limit_secs: u64,
    pub max_transfer_secs: u64,
    /// Cache lifetime for downloads, in seconds.
    pub default_lifetime: u64,
    pub draft_allocation_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wwwroot: "http://localhost".into(),
            slash_arguments: true,
            force_https: false,
            data_dir: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_time_limit_secs: DEFAULT_CHUNK_TIME_LIMIT_SECS,
            max_transfer_secs: 3600,
            default_lifetime: 86_400,
            draft_allocation_attempts: 10,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| FileAreaError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FileAreaError::Config("chunk_size must be positive".into()));
        }
        if self.draft_allocation_attempts == 0 {
            return Err(FileAreaError::Config(
                "draft_allocation_attempts must be positive".into(),
            ));
        }
        if self.wwwroot.ends_with('/') {
            return Err(FileAreaError::Config(format!(
                "wwwroot must not end with '/': {}",
                self.wwwroot
            )));
        }
        Ok(())
    }

    pub fn backend(&self) -> Backend {
        match &self.data_dir {
            Some(root) => Backend::Fs { root: root.clone() },
            None => Backend::Memory,
        }
    }

    pub fn script_url(&self, script: &str) -> String {
        format!("{}/{script}", self.wwwroot)
    }

    pub fn url_options(&self) -> UrlOptions {
        UrlOptions {
            slash_arguments: self.slash_arguments,
            force_download: false,
            force_https: self.force_https,
        }
    }

    pub fn transfer_limits(&self) -> TransferLimits {
        TransferLimits {
            chunk_size: self.chunk_size,
            chunk_time_limit: Duration::from_secs(self.chunk_time_limit_secs),
            max_transfer_time: Duration::from_secs(self.max_transfer_secs),
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            lifetime: self.default_lifetime,
            https: self.wwwroot.starts_with("https://") || self.force_https,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{"wwwroot": "https://lms.example.org", "max_transfer_secs": 120}"#,
        )
        .unwrap();

        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.wwwroot, "https://lms.example.org");
        assert_eq!(cfg.transfer_limits().max_transfer_time, Duration::from_secs(120));
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(cfg.download_options().https);
        assert_eq!(
            cfg.script_url(PLUGINFILE_SCRIPT),
            "https://lms.example.org/pluginfile.php"
        );
        assert_eq!(cfg.backend(), Backend::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"chunk_size": 0}"#).unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(FileAreaError::Config(_))));

        std::fs::write(&path, r#"{"wwwroot": 5}"#).unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(FileAreaError::Config(_))));

        std::fs::write(&path, r#"{"wwwroot": "http://x/"}"#).unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
