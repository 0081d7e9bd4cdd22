use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::domain::now_unix;
use crate::error::{FileAreaError, Result};
use crate::serve::stream::ResponseHead;

const IMF_FIXDATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Per-download caching and disposition choices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Seconds a client may cache the response; 0 disables caching and byte serving.
    pub lifetime: u64,
    /// `public` rather than `private` caching when `lifetime > 0`.
    pub public: bool,
    pub force_download: bool,
    /// Request arrived over https.
    pub https: bool,
    /// Client needs the percent-encoded filename form.
    pub legacy_user_agent: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            lifetime: 86_400,
            public: false,
            force_download: false,
            https: false,
            legacy_user_agent: false,
        }
    }
}

impl DownloadOptions {
    pub fn byteserving(&self) -> bool {
        self.lifetime > 0
    }
}

pub fn http_date(unix: i64) -> Result<String> {
    let t = OffsetDateTime::from_unix_timestamp(unix)
        .map_err(|e| FileAreaError::Format(format!("timestamp {unix}: {e}")))?;
    t.format(IMF_FIXDATE)
        .map_err(|e| FileAreaError::Format(format!("timestamp {unix}: {e}")))
}

fn disposition(opts: &DownloadOptions, filename: &str) -> String {
    let kind = if opts.force_download {
        "attachment"
    } else {
        "inline"
    };
    let name = if opts.legacy_user_agent {
        urlencoding::encode(filename).into_owned()
    } else {
        filename.replace('\\', "\\\\").replace('"', "\\\"")
    };
    format!("{kind}; filename=\"{name}\"")
}

/// Disposition, validator and cache headers for a download. Content headers come
/// from the streamer.
pub fn download_headers(
    opts: &DownloadOptions,
    filename: &str,
    last_modified: i64,
) -> Result<ResponseHead> {
    download_headers_at(opts, filename, last_modified, now_unix())
}

pub(crate) fn download_headers_at(
    opts: &DownloadOptions,
    filename: &str,
    last_modified: i64,
    now: i64,
) -> Result<ResponseHead> {
    let mut head = ResponseHead::default();
    head.push("Content-Disposition", disposition(opts, filename));
    head.push("Last-Modified", http_date(last_modified)?);

    if opts.lifetime > 0 {
        let scope = if opts.public { "public" } else { "private" };
        head.push(
            "Cache-Control",
            format!("{scope}, max-age={}, no-transform", opts.lifetime),
        );
        let expires = now.saturating_add(i64::try_from(opts.lifetime).unwrap_or(i64::MAX));
        head.push("Expires", http_date(expires)?);
        head.push("Pragma", "");
    } else if opts.https {
        head.push("Cache-Control", "private, max-age=10, no-transform");
        head.push("Expires", http_date(0)?);
        head.push("Pragma", "");
    } else {
        head.push(
            "Cache-Control",
            "private, must-revalidate, pre-check=0, post-check=0, max-age=0, no-transform",
        );
        head.push("Expires", http_date(0)?);
        head.push("Pragma", "no-cache");
    }

    head.push(
        "Accept-Ranges",
        if opts.byteserving() { "bytes" } else { "none" },
    );
    Ok(head)
}
