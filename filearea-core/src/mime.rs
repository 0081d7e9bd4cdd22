pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Filename to mime type. Directories never reach a lookup.
pub trait MimeLookup: Send + Sync {
    fn mime_for(&self, filename: &str) -> &str;
}

/// Small built-in extension table.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticMimeTypes;

const TABLE: &[(&str, &str)] = &[
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ogg", "audio/ogg"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    ("rtf", "text/rtf"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
];

impl MimeLookup for StaticMimeTypes {
    fn mime_for(&self, filename: &str) -> &str {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return FALLBACK_MIME;
        };
        let ext = ext.to_ascii_lowercase();
        TABLE
            .binary_search_by(|(e, _)| (*e).cmp(ext.as_str()))
            .map(|i| TABLE[i].1)
            .unwrap_or(FALLBACK_MIME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        assert!(TABLE.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn looks_up_by_extension() {
        let m = StaticMimeTypes;
        assert_eq!(m.mime_for("Report.PDF"), "application/pdf");
        assert_eq!(m.mime_for("archive.tar.gz"), "application/gzip");
        assert_eq!(m.mime_for("README"), FALLBACK_MIME);
        assert_eq!(m.mime_for("weird.xyz"), FALLBACK_MIME);
    }
}
