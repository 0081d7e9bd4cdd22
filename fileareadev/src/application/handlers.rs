use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filearea_core::config::{DRAFTFILE_SCRIPT, PLUGINFILE_SCRIPT};
use filearea_core::error::{FileAreaError, Result};
use filearea_core::store::fs::FsFileStore;
use filearea_core::util::sanitize::split_file_path;
use filearea_core::{
    AreaKey, AreaOptions, EngineConfig, FileAreas, FileStore, StoredFile, prepare_download, url,
};
use tracing::debug;

use crate::presentation::cli::EngineArgs;

/// Store plus draft service, opened once per invocation.
pub struct Engine {
    areas: FileAreas,
    store: Arc<FsFileStore>,
}

impl Engine {
    pub fn open(args: &EngineArgs) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(root) = &args.wwwroot {
            cfg.wwwroot = root.trim_end_matches('/').to_string();
        }
        if args.query_arguments {
            cfg.slash_arguments = false;
        }
        cfg.force_https |= args.force_https;
        cfg.data_dir = Some(args.data_dir.clone());
        cfg.validate()?;

        let store = Arc::new(FsFileStore::open(&args.data_dir)?);
        let areas = FileAreas::new(store.clone(), cfg);
        Ok(Self { areas, store })
    }

    fn config(&self) -> &EngineConfig {
        self.areas.config()
    }
}

fn source_name(src: &Path, name: Option<String>) -> Result<String> {
    match name {
        Some(n) => Ok(n),
        None => src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileAreaError::InvalidPath(format!("no file name in {}", src.display()))),
    }
}

fn add_source(
    areas: &FileAreas,
    user: i64,
    draft: i64,
    src: &Path,
    path: &str,
    name: Option<String>,
    mime: Option<&str>,
) -> Result<usize> {
    if src.is_dir() {
        return areas.import_dir(user, draft, src, path);
    }
    let filename = source_name(src, name)?;
    let mut f = File::open(src)?;
    areas.add_to_draft(user, draft, path, &filename, &mut f, mime)?;
    Ok(1)
}

fn print_file(f: &StoredFile, long: bool) {
    if long {
        let kind = if f.is_directory() { 'd' } else { '-' };
        println!(
            "{kind} {:>10} {} {:>12} {}",
            f.size,
            &f.content_hash.to_hex()[..12],
            f.time_modified,
            f.full_path()
        );
    } else {
        println!("{}", f.full_path());
    }
}

pub fn handle_area_ls(engine: &Engine, area: &AreaKey, long: bool) -> Result<()> {
    for f in engine.areas.store().list_area(area)? {
        print_file(&f, long);
    }
    Ok(())
}

pub fn handle_area_put(
    engine: &Engine,
    area: &AreaKey,
    src: &Path,
    path: &str,
    name: Option<String>,
    user: i64,
) -> Result<()> {
    let areas = &engine.areas;
    let draft = areas.prepare_draft(user, Some(area), None)?.draft_id;
    let staged = add_source(areas, user, draft, src, path, name, None);
    if let Err(e) = staged {
        areas.purge_area(&AreaKey::draft(user, draft))?;
        return Err(e);
    }
    let out = areas.save_draft(user, draft, area, &AreaOptions::default(), None)?;
    eprintln!(
        "put: {} created, {} updated in {area}",
        out.created, out.updated
    );
    Ok(())
}

pub fn handle_area_rm(engine: &Engine, area: &AreaKey, path: &str, user: i64) -> Result<()> {
    let areas = &engine.areas;
    let (dir, name) = split_file_path(path)?;
    let draft = areas.prepare_draft(user, Some(area), None)?.draft_id;
    if let Err(e) = areas.delete_from_draft(user, draft, &dir, &name) {
        areas.purge_area(&AreaKey::draft(user, draft))?;
        return Err(e);
    }
    let out = areas.save_draft(user, draft, area, &AreaOptions::default(), None)?;
    eprintln!("rm: {} deleted from {area}", out.deleted);
    Ok(())
}

pub fn handle_area_purge(engine: &Engine, area: &AreaKey) -> Result<()> {
    engine.areas.purge_area(area)?;
    eprintln!("purge: {area} emptied");
    Ok(())
}

pub fn handle_draft_new(
    engine: &Engine,
    user: i64,
    from: Option<AreaKey>,
    text: Option<String>,
) -> Result<()> {
    let prepared = engine
        .areas
        .prepare_draft(user, from.as_ref(), text.as_deref())?;
    println!("{}", prepared.draft_id);
    if let Some(text) = prepared.text {
        println!("{text}");
    }
    Ok(())
}

pub fn handle_draft_add(
    engine: &Engine,
    user: i64,
    draft: i64,
    src: &Path,
    path: &str,
    name: Option<String>,
    mime: Option<String>,
) -> Result<()> {
    let n = add_source(&engine.areas, user, draft, src, path, name, mime.as_deref())?;
    eprintln!("add: {n} entries staged in draft {draft}");
    Ok(())
}

pub fn handle_draft_mkdir(engine: &Engine, user: i64, draft: i64, path: &str) -> Result<()> {
    engine.areas.create_draft_directory(user, draft, path)
}

pub fn handle_draft_rm(engine: &Engine, user: i64, draft: i64, path: &str) -> Result<()> {
    let (dir, name) = split_file_path(path)?;
    let n = engine.areas.delete_from_draft(user, draft, &dir, &name)?;
    eprintln!("rm: {n} entries removed from draft {draft}");
    Ok(())
}

pub fn handle_draft_ls(engine: &Engine, user: i64, draft: i64) -> Result<()> {
    for f in engine.areas.list_draft(user, draft)? {
        println!(
            "{}\t{}",
            f.full_path(),
            engine.areas.draft_url(user, draft, &f.path, &f.filename)
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_draft_save(
    engine: &Engine,
    user: i64,
    draft: i64,
    target: &AreaKey,
    options: Option<PathBuf>,
    no_subdirectories: bool,
    max_files: Option<i64>,
    max_bytes: Option<u64>,
    text: Option<String>,
) -> Result<()> {
    let mut opts = match options {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<AreaOptions>(&raw)
                .map_err(|e| FileAreaError::Config(format!("{}: {e}", path.display())))?
        }
        None => AreaOptions::default(),
    };
    if no_subdirectories {
        opts.allow_subdirectories = false;
    }
    if let Some(n) = max_files {
        opts.max_files = n;
    }
    if let Some(n) = max_bytes {
        opts.max_bytes_per_file = n;
    }

    let out = engine
        .areas
        .save_draft(user, draft, target, &opts, text.as_deref())?;
    eprintln!(
        "save: {} created, {} updated, {} deleted in {target}",
        out.created, out.updated, out.deleted
    );
    for d in &out.dropped {
        eprintln!("  dropped {} ({:?})", d.file.full_path(), d.reason);
    }
    if let Some(text) = out.text {
        println!("{text}");
    }
    Ok(())
}

pub fn handle_cat(
    engine: &Engine,
    area: &AreaKey,
    path: &str,
    range: Option<String>,
    out: Option<PathBuf>,
    force_download: bool,
    lifetime: Option<u64>,
) -> Result<()> {
    let (dir, name) = split_file_path(path)?;
    let file = engine
        .areas
        .store()
        .get(&area.path_hash(&dir, &name))?
        .ok_or_else(|| FileAreaError::NotFound(format!("{path} in {area}")))?;

    let mut opts = engine.config().download_options();
    opts.force_download = force_download;
    if let Some(secs) = lifetime {
        opts.lifetime = secs;
    }
    let download = prepare_download(
        engine.areas.store().as_ref(),
        &file,
        range.as_deref(),
        &opts,
        &engine.config().transfer_limits(),
    )?;

    let mut w: Box<dyn Write> = match &out {
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    download.head.write_to(&mut w)?;
    let outcome = download.body.stream_to(&mut w)?;
    w.flush()?;
    debug!(?outcome, status = download.head.status, "cat finished");
    Ok(())
}

pub fn handle_url_build(
    engine: &Engine,
    context: i64,
    area: &str,
    path: &str,
    item: Option<i64>,
    force_download: bool,
    draft: bool,
) -> Result<()> {
    let (dir, name) = split_file_path(path)?;
    let script = if draft {
        DRAFTFILE_SCRIPT
    } else {
        PLUGINFILE_SCRIPT
    };
    let mut opts = engine.config().url_options();
    opts.force_download = force_download;
    println!(
        "{}",
        url::file_url(
            &engine.config().script_url(script),
            context,
            area,
            item,
            &dir,
            &name,
            &opts
        )
    );
    Ok(())
}

pub fn handle_url_to_placeholder(
    engine: &Engine,
    text: &str,
    context: i64,
    area: &str,
    item: Option<i64>,
) -> Result<()> {
    let base = url::area_base_url(
        &engine.config().script_url(PLUGINFILE_SCRIPT),
        context,
        area,
        item,
        &engine.config().url_options(),
    );
    println!("{}", url::to_placeholder(text, &base));
    Ok(())
}

pub fn handle_url_from_placeholder(
    engine: &Engine,
    text: &str,
    context: i64,
    area: &str,
    item: Option<i64>,
) -> Result<()> {
    println!(
        "{}",
        url::from_placeholder(
            text,
            &engine.config().script_url(PLUGINFILE_SCRIPT),
            context,
            area,
            item,
            &engine.config().url_options(),
        )
    );
    Ok(())
}

pub fn handle_compact(engine: &Engine) -> Result<()> {
    let n = engine.store.compact()?;
    eprintln!(
        "compact: {} now holds {n} entries",
        engine.store.root().display()
    );
    Ok(())
}
