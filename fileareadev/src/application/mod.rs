pub mod handlers;

use crate::presentation::cli::{AreaCommands, Cli, Commands, DraftCommands, UrlCommands};
use clap::Parser;
use filearea_core::error::Result;
use handlers::Engine;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let engine = Engine::open(&cli.engine)?;
    match cli.command {
        Commands::Area(cmd) => match cmd {
            AreaCommands::Ls { area, long } => handlers::handle_area_ls(&engine, &area, long),
            AreaCommands::Put {
                area,
                src,
                path,
                name,
                user,
            } => handlers::handle_area_put(&engine, &area, &src, &path, name, user),
            AreaCommands::Rm { area, path, user } => {
                handlers::handle_area_rm(&engine, &area, &path, user)
            }
            AreaCommands::Purge { area } => handlers::handle_area_purge(&engine, &area),
        },
        Commands::Draft(cmd) => match cmd {
            DraftCommands::New { user, from, text } => {
                handlers::handle_draft_new(&engine, user, from, text)
            }
            DraftCommands::Add {
                user,
                draft,
                src,
                path,
                name,
                mime,
            } => handlers::handle_draft_add(&engine, user, draft, &src, &path, name, mime),
            DraftCommands::Mkdir { user, draft, path } => {
                handlers::handle_draft_mkdir(&engine, user, draft, &path)
            }
            DraftCommands::Rm { user, draft, path } => {
                handlers::handle_draft_rm(&engine, user, draft, &path)
            }
            DraftCommands::Ls { user, draft } => handlers::handle_draft_ls(&engine, user, draft),
            DraftCommands::Save {
                user,
                draft,
                target,
                options,
                no_subdirectories,
                max_files,
                max_bytes,
                text,
            } => handlers::handle_draft_save(
                &engine,
                user,
                draft,
                &target,
                options,
                no_subdirectories,
                max_files,
                max_bytes,
                text,
            ),
        },
        Commands::Cat {
            area,
            path,
            range,
            out,
            force_download,
            lifetime,
        } => handlers::handle_cat(&engine, &area, &path, range, out, force_download, lifetime),
        Commands::Url(cmd) => match cmd {
            UrlCommands::Build {
                context,
                area,
                path,
                item,
                force_download,
                draft,
            } => handlers::handle_url_build(&engine, context, &area, &path, item, force_download, draft),
            UrlCommands::ToPlaceholder {
                text,
                context,
                area,
                item,
            } => handlers::handle_url_to_placeholder(&engine, &text, context, &area, item),
            UrlCommands::FromPlaceholder {
                text,
                context,
                area,
                item,
            } => handlers::handle_url_from_placeholder(&engine, &text, context, &area, item),
        },
        Commands::Compact => handlers::handle_compact(&engine),
    }
}
