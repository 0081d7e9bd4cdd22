use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use filearea_core::{EngineConfig, FileAreas, Result, open_store};
use filearea_http::{AppState, run};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Serve file areas over HTTP", long_about = None)]
struct Args {
    /// JSON engine config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store directory; without one (here or in the config) an empty in-memory store is served
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Public root URL used when building links
    #[arg(long)]
    wwwroot: Option<String>,

    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Build `script?file=/...` links instead of path-embedded ones
    #[arg(long)]
    query_arguments: bool,

    #[arg(long)]
    force_https: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(root) = args.wwwroot {
        cfg.wwwroot = root.trim_end_matches('/').to_string();
    }
    if args.data_dir.is_some() {
        cfg.data_dir = args.data_dir;
    }
    if args.query_arguments {
        cfg.slash_arguments = false;
    }
    cfg.force_https |= args.force_https;
    cfg.validate()?;

    let store = open_store(cfg.backend())?;
    let areas = FileAreas::new(store, cfg);
    run(args.bind, AppState::new(areas)).await
}
