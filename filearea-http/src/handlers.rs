use axum::extract::State;
use axum::http::header::RANGE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use filearea_core::config::{DRAFTFILE_SCRIPT, PLUGINFILE_SCRIPT};
use filearea_core::domain::DRAFT_AREA;
use filearea_core::url::{FileArgument, parse_file_argument};
use filearea_core::{
    AreaKey, FileAreaError, FileStore, ResponseHead, StoredFile, StreamOutcome, prepare_download,
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::body::channel_body;
use crate::error::HttpError;
use crate::server::AppState;

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn pluginfile(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let args = file_arguments(&uri, PLUGINFILE_SCRIPT)?;
    serve(state, args, &uri, &headers).await
}

pub async fn draftfile(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let args = file_arguments(&uri, DRAFTFILE_SCRIPT)?;
    if let Some(arg) = args.iter().find(|a| a.area != DRAFT_AREA) {
        return Err(FileAreaError::NotFound(format!("{} is not a draft area", arg.area)).into());
    }
    serve(state, args, &uri, &headers).await
}

/// The file argument comes either after the script name in the path or in the
/// `file` query parameter. Both are taken raw so that segments are decoded once.
///
/// Areas may be addressed with or without an item segment, so an argument can
/// have two readings; the one with an item comes first.
fn file_arguments(uri: &Uri, script: &str) -> Result<Vec<FileArgument>, HttpError> {
    let prefix = format!("/{script}/");
    let raw = match uri.path().strip_prefix(prefix.as_str()) {
        Some(rest) => rest,
        None => query_param(uri.query(), "file").ok_or_else(|| {
            FileAreaError::InvalidPath(format!("{script} needs a file argument"))
        })?,
    };
    let with_item = parse_file_argument(raw, true);
    let without_item = parse_file_argument(raw, false);
    match (with_item, without_item) {
        (Ok(a), Ok(b)) => Ok(vec![a, b]),
        (Ok(a), Err(_)) | (Err(_), Ok(a)) => Ok(vec![a]),
        (Err(e), Err(_)) => Err(e.into()),
    }
}

fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

async fn serve(
    state: AppState,
    args: Vec<FileArgument>,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Response, HttpError> {
    let range = headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let force_download = query_param(uri.query(), "forcedownload") == Some("1");

    let (head_tx, head_rx) = oneshot::channel();
    let (mut writer, body) = channel_body();
    let areas = state.areas.clone();

    // Store reads and the copy loop are blocking; the body is fed through a channel.
    tokio::task::spawn_blocking(move || {
        let prepared = find_file(areas.store().as_ref(), &args).and_then(|(key, file)| {
            let mut opts = areas.config().download_options();
            opts.force_download = force_download;
            let download = prepare_download(
                areas.store().as_ref(),
                &file,
                range.as_deref(),
                &opts,
                &areas.config().transfer_limits(),
            )?;
            Ok((key, download))
        });
        let (key, download) = match prepared {
            Ok(found) => found,
            Err(e) => {
                let _ = head_tx.send(Err(e));
                return;
            }
        };
        if head_tx.send(Ok(download.head.clone())).is_err() {
            return;
        }
        match download.body.stream_to(&mut writer) {
            Ok(StreamOutcome::Complete { bytes_sent }) => {
                debug!(area = %key, bytes_sent, "served file");
            }
            Ok(StreamOutcome::ClientAborted { bytes_sent }) => {
                info!(area = %key, bytes_sent, "client aborted download");
            }
            Err(e) => {
                warn!(area = %key, error = %e, "download failed mid-stream");
                writer.abort(e.to_string());
            }
        }
    });

    let head = head_rx
        .await
        .map_err(|_| FileAreaError::Io(std::io::Error::other("streaming task ended early")))??;
    Ok(into_response(head, body))
}

/// First reading of the argument that names a stored file. Item-less areas are
/// stored under item 0.
fn find_file(
    store: &dyn FileStore,
    args: &[FileArgument],
) -> filearea_core::Result<(AreaKey, StoredFile)> {
    for arg in args {
        let key = AreaKey::new(arg.context_id, arg.area.clone(), arg.item_id.unwrap_or(0));
        if let Some(file) = store.get(&key.path_hash(&arg.path, &arg.filename))? {
            return Ok((key, file));
        }
    }
    let missing = args
        .first()
        .map(|a| format!("{}{} in {}/{}", a.path, a.filename, a.context_id, a.area))
        .unwrap_or_default();
    Err(FileAreaError::NotFound(missing))
}

fn into_response(head: ResponseHead, body: axum::body::Body) -> Response {
    let mut resp = Response::new(body);
    *resp.status_mut() = StatusCode::from_u16(head.status).unwrap_or(StatusCode::OK);
    let out = resp.headers_mut();
    for (name, value) in &head.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(n), Ok(v)) => {
                out.append(n, v);
            }
            _ => warn!(header = %name, "dropping unrepresentable header"),
        }
    }
    resp
}
