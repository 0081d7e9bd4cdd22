use clap::{Args, Parser, Subcommand};
use filearea_core::AreaKey;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "fileareadev CLI", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command. Flags override the config file.
#[derive(Args, Clone, Debug)]
pub struct EngineArgs {
    /// Store directory (blobs + metadata journal)
    #[arg(long, global = true, default_value = "filearea-data")]
    pub data_dir: PathBuf,

    /// JSON engine config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Public root URL used when building links
    #[arg(long, global = true)]
    pub wwwroot: Option<String>,

    /// Build `script?file=/...` links instead of path-embedded ones
    #[arg(long, global = true)]
    pub query_arguments: bool,

    #[arg(long, global = true)]
    pub force_https: bool,
}

#[derive(Subcommand)]
pub enum AreaCommands {
    /// List the files of an area
    Ls {
        /// ctx/area/item
        area: AreaKey,
        /// show size, content hash and mtime
        #[arg(long)]
        long: bool,
    },

    /// Put a local file or directory into an area (through a draft)
    Put {
        area: AreaKey,
        src: PathBuf,
        /// destination directory inside the area
        #[arg(long, default_value = "/")]
        path: String,
        /// stored filename; defaults to the source file name
        #[arg(long)]
        name: Option<String>,
        /// user context owning the intermediate draft
        #[arg(long, default_value_t = 1)]
        user: i64,
    },

    /// Remove a file, or a directory when the path ends with '/'
    Rm {
        area: AreaKey,
        path: String,
        #[arg(long, default_value_t = 1)]
        user: i64,
    },

    /// Delete every entry of an area
    Purge { area: AreaKey },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// Allocate a draft, optionally pre-filled from an area; prints the draft id
    New {
        user: i64,
        /// ctx/area/item to copy from
        #[arg(long)]
        from: Option<AreaKey>,
        /// text whose placeholders are expanded to draft URLs
        #[arg(long)]
        text: Option<String>,
    },

    /// Add a local file (or directory tree) to a draft
    Add {
        user: i64,
        draft: i64,
        src: PathBuf,
        #[arg(long, default_value = "/")]
        path: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mime: Option<String>,
    },

    /// Create a directory (and its parents) in a draft
    Mkdir { user: i64, draft: i64, path: String },

    /// Remove a file, or a directory when the path ends with '/'
    Rm { user: i64, draft: i64, path: String },

    /// List a draft with its serving URLs
    Ls { user: i64, draft: i64 },

    /// Merge a draft into an area and discard the draft
    Save {
        user: i64,
        draft: i64,
        target: AreaKey,
        /// JSON file with area options (allow_subdirectories, max_files, max_bytes_per_file)
        #[arg(long)]
        options: Option<PathBuf>,
        #[arg(long)]
        no_subdirectories: bool,
        #[arg(long)]
        max_files: Option<i64>,
        #[arg(long)]
        max_bytes: Option<u64>,
        /// text whose draft URLs are folded into placeholders
        #[arg(long)]
        text: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UrlCommands {
    /// Serving URL for one file
    Build {
        context: i64,
        area: String,
        /// full path inside the area, e.g. /docs/a.pdf
        path: String,
        #[arg(long)]
        item: Option<i64>,
        #[arg(long)]
        force_download: bool,
        /// serve through the draft script
        #[arg(long)]
        draft: bool,
    },

    /// Fold an area's base URL into the placeholder token
    ToPlaceholder {
        text: String,
        context: i64,
        area: String,
        #[arg(long)]
        item: Option<i64>,
    },

    /// Expand the placeholder token into an area's base URL
    FromPlaceholder {
        text: String,
        context: i64,
        area: String,
        #[arg(long)]
        item: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(subcommand)]
    /// Permanent file areas
    Area(AreaCommands),

    #[command(subcommand)]
    /// Draft areas
    Draft(DraftCommands),

    /// Serve a file as an HTTP response (head + body)
    Cat {
        area: AreaKey,
        path: String,
        /// Range header value, e.g. "bytes=0-99,200-"
        #[arg(long)]
        range: Option<String>,
        /// write the response here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        force_download: bool,
        /// cache lifetime in seconds; 0 disables byte serving
        #[arg(long)]
        lifetime: Option<u64>,
    },

    #[command(subcommand)]
    /// Serving URLs and placeholder rewriting
    Url(UrlCommands),

    /// Rewrite the metadata journal as a single snapshot
    Compact,
}
