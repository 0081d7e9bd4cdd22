//! Download path: header policy, Range parsing and the body streamer.

use tracing::debug;

use crate::domain::StoredFile;
use crate::error::{FileAreaError, Result};
use crate::mime::FALLBACK_MIME;
use crate::store::FileStore;

pub mod headers;
pub mod range;
pub mod stream;

use headers::{DownloadOptions, download_headers};
use range::parse_range_header;
use stream::{ByteStreamer, ResponseHead, TransferLimits};

/// A ready response: complete head plus the streamer that produces the body.
pub struct Download {
    pub head: ResponseHead,
    pub body: ByteStreamer,
}

pub fn prepare_download(
    store: &dyn FileStore,
    file: &StoredFile,
    range_header: Option<&str>,
    opts: &DownloadOptions,
    limits: &TransferLimits,
) -> Result<Download> {
    if file.is_directory() {
        return Err(FileAreaError::NotFound(format!(
            "{} in {} is a directory",
            file.full_path(),
            file.area
        )));
    }
    let reader = store.open_content(&file.content_hash)?;
    let ranges = if opts.byteserving() {
        range_header.and_then(|h| parse_range_header(h, file.size))
    } else {
        None
    };
    debug!(
        file = %file.full_path(),
        area = %file.area,
        ranges = ranges.as_ref().map_or(0, Vec::len),
        "preparing download"
    );

    let mime = file.mime_type.as_deref().unwrap_or(FALLBACK_MIME);
    let body = ByteStreamer::new(reader, mime, file.size, ranges, limits.clone());
    let mut head = body.head();
    head.extend(download_headers(opts, &file.filename, file.time_modified)?);
    Ok(Download { head, body })
}
