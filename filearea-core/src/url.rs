//! Serving-endpoint URLs and the placeholder token stored in rich text.
//!
//! Text saved alongside a file area refers to its files through
//! [`PLACEHOLDER`] instead of an absolute URL, so the text survives host, scheme
//! and draft-to-permanent moves. `to_placeholder` folds a concrete base URL into
//! the token, `from_placeholder` expands it again for rendering.

use crate::error::{FileAreaError, Result};
use crate::util::sanitize::{normalize_dir_path, validate_filename};

pub const PLACEHOLDER: &str = "@@PLUGINFILE@@/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlOptions {
    /// `script/ctx/area/...` when true, `script?file=/ctx/area/...` otherwise.
    pub slash_arguments: bool,
    pub force_download: bool,
    pub force_https: bool,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            slash_arguments: true,
            force_download: false,
            force_https: false,
        }
    }
}

/// Components of a serving URL's file argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileArgument {
    pub context_id: i64,
    pub area: String,
    pub item_id: Option<i64>,
    pub path: String,
    /// Empty when the argument names a directory.
    pub filename: String,
}

fn encode_segments(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn force_https(url: String, opts: &UrlOptions) -> String {
    if opts.force_https {
        if let Some(rest) = url.strip_prefix("http://") {
            return format!("https://{rest}");
        }
    }
    url
}

fn file_argument(context_id: i64, area: &str, item_id: Option<i64>, tail: &str) -> String {
    let mut arg = format!("/{context_id}/{}", urlencoding::encode(area));
    if let Some(item) = item_id {
        arg.push_str(&format!("/{item}"));
    }
    arg.push_str(&encode_segments(tail));
    arg
}

/// Canonical URL serving one file (or directory, with an empty `filename`).
pub fn file_url(
    script_url: &str,
    context_id: i64,
    area: &str,
    item_id: Option<i64>,
    path: &str,
    filename: &str,
    opts: &UrlOptions,
) -> String {
    let arg = file_argument(context_id, area, item_id, &format!("{path}{filename}"));
    let mut url = if opts.slash_arguments {
        format!("{script_url}{arg}")
    } else {
        format!("{script_url}?file={arg}")
    };
    if opts.force_download {
        url.push(if opts.slash_arguments { '?' } else { '&' });
        url.push_str("forcedownload=1");
    }
    force_https(url, opts)
}

/// Prefix shared by every file URL of one area; ends where the file path begins.
pub fn area_base_url(
    script_url: &str,
    context_id: i64,
    area: &str,
    item_id: Option<i64>,
    opts: &UrlOptions,
) -> String {
    let plain = UrlOptions {
        force_download: false,
        ..opts.clone()
    };
    file_url(script_url, context_id, area, item_id, "/", "", &plain)
}

/// Replace every literal occurrence of `base_url` with the placeholder token.
pub fn to_placeholder(text: &str, base_url: &str) -> String {
    if base_url.is_empty() {
        return text.to_string();
    }
    text.replace(base_url, PLACEHOLDER)
}

/// Expand the placeholder token into the base URL of the given area.
pub fn from_placeholder(
    text: &str,
    script_url: &str,
    context_id: i64,
    area: &str,
    item_id: Option<i64>,
    opts: &UrlOptions,
) -> String {
    if !text.contains(PLACEHOLDER) {
        return text.to_string();
    }
    let base = area_base_url(script_url, context_id, area, item_id, opts);
    text.replace(PLACEHOLDER, &base)
}

/// Parse `ctx/area[/item]/dir/.../filename` as produced by [`file_url`].
/// Segments are percent-decoded individually; a trailing `/` names a directory.
pub fn parse_file_argument(arg: &str, has_item: bool) -> Result<FileArgument> {
    let arg = arg.strip_prefix('/').unwrap_or(arg);
    let mut segs = arg.split('/');
    let bad = || FileAreaError::InvalidPath(format!("malformed file argument: {arg}"));

    let context_id: i64 = segs.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
    let area = segs
        .next()
        .filter(|s| !s.is_empty())
        .map(decode)
        .transpose()?
        .ok_or_else(bad)?;
    let item_id = if has_item {
        Some(segs.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?)
    } else {
        None
    };

    let rest: Vec<String> = segs.map(decode).collect::<Result<_>>()?;
    let (filename, dirs) = match rest.split_last() {
        Some((last, dirs)) => (last.clone(), dirs.join("/")),
        None => (String::new(), String::new()),
    };
    validate_filename(&filename)?;
    Ok(FileArgument {
        context_id,
        area,
        item_id,
        path: normalize_dir_path(&dirs)?,
        filename,
    })
}

fn decode(seg: &str) -> Result<String> {
    urlencoding::decode(seg)
        .map(|s| s.into_owned())
        .map_err(|e| FileAreaError::InvalidPath(format!("bad percent-encoding in {seg:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "http://example.org/pluginfile.php";

    #[test]
    fn builds_path_embedded_urls() {
        let url = file_url(
            SCRIPT,
            12,
            "attachment",
            Some(3),
            "/my docs/",
            "a&b #1.txt",
            &UrlOptions::default(),
        );
        assert_eq!(
            url,
            "http://example.org/pluginfile.php/12/attachment/3/my%20docs/a%26b%20%231.txt"
        );
    }

    #[test]
    fn builds_query_urls_with_flags() {
        let opts = UrlOptions {
            slash_arguments: false,
            force_download: true,
            force_https: true,
        };
        let url = file_url(SCRIPT, 12, "intro", None, "/", "x.pdf", &opts);
        assert_eq!(
            url,
            "https://example.org/pluginfile.php?file=/12/intro/x.pdf&forcedownload=1"
        );

        let opts = UrlOptions {
            force_download: true,
            ..Default::default()
        };
        let url = file_url(SCRIPT, 12, "intro", Some(0), "/", "x.pdf", &opts);
        assert_eq!(url, "http://example.org/pluginfile.php/12/intro/0/x.pdf?forcedownload=1");
    }

    #[test]
    fn placeholder_round_trip() {
        let base = area_base_url(SCRIPT, 5, "content", Some(9), &UrlOptions::default());
        assert_eq!(base, "http://example.org/pluginfile.php/5/content/9/");
        let text = format!(
            r#"<img src="{base}a.png"> and <a href="{base}docs/b.pdf">b</a> {base}"#
        );

        let stored = to_placeholder(&text, &base);
        assert!(!stored.contains(SCRIPT));
        assert_eq!(stored.matches(PLACEHOLDER).count(), 3);

        let back = from_placeholder(&stored, SCRIPT, 5, "content", Some(9), &UrlOptions::default());
        assert_eq!(back, text);
    }

    #[test]
    fn placeholder_replacement_is_literal() {
        let base = "http://h/p.php?file=/1/a/2/";
        let text = "x http://h/pXphp?file=/1/a/2/y http://h/p.php?file=/1/a/2/z";
        assert_eq!(
            to_placeholder(text, base),
            "x http://h/pXphp?file=/1/a/2/y @@PLUGINFILE@@/z"
        );
    }

    #[test]
    fn expands_to_https_when_forced() {
        let opts = UrlOptions {
            force_https: true,
            ..Default::default()
        };
        let out = from_placeholder("@@PLUGINFILE@@/a.png", SCRIPT, 1, "area", None, &opts);
        assert_eq!(out, "https://example.org/pluginfile.php/1/area/a.png");
    }

    #[test]
    fn parses_what_it_builds() {
        let url = file_url(
            "",
            12,
            "attachment",
            Some(3),
            "/my docs/",
            "a&b #1.txt",
            &UrlOptions::default(),
        );
        let arg = parse_file_argument(&url, true).unwrap();
        assert_eq!(
            arg,
            FileArgument {
                context_id: 12,
                area: "attachment".into(),
                item_id: Some(3),
                path: "/my docs/".into(),
                filename: "a&b #1.txt".into(),
            }
        );

        let dir = parse_file_argument("/12/attachment/3/sub/", true).unwrap();
        assert_eq!(dir.path, "/sub/");
        assert_eq!(dir.filename, "");

        let no_item = parse_file_argument("12/intro/x.pdf", false).unwrap();
        assert_eq!(no_item.item_id, None);
        assert_eq!(no_item.filename, "x.pdf");
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse_file_argument("abc/area/1/x", true).is_err());
        assert!(parse_file_argument("12//1/x", true).is_err());
        assert!(parse_file_argument("12/area/x/y", true).is_err());
        assert!(parse_file_argument("12/area/1/../secret", true).is_err());
        assert!(parse_file_argument("12/area/1/a%2Fb", true).is_err());
    }
}
