#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod draft;
pub mod error;
pub mod mime;
pub mod policy;
pub mod reconcile;
pub mod serve;
pub mod store;
pub mod store_factory;
pub mod url;

pub mod util {
    pub mod hex;
    pub mod sanitize;
    pub mod varint;
}

pub mod hash {
    pub mod content;
    pub mod identity;
}

// Re-exports: stable API surface
pub use config::EngineConfig;
pub use domain::{AreaKey, StoredFile};
pub use draft::{FileAreas, PreparedDraft, SaveOutcome};
pub use error::{FileAreaError, Result};
pub use policy::AreaOptions;
pub use reconcile::{DropReason, DroppedFile, ReconcilePlan, reconcile};
pub use serve::headers::DownloadOptions;
pub use serve::range::{ByteRange, parse_range_header};
pub use serve::stream::{ByteStreamer, ResponseHead, StreamOutcome, TransferLimits};
pub use serve::{Download, prepare_download};
pub use store::{ChangeBatch, FileStore};
pub use store_factory::{Backend, open_store};
