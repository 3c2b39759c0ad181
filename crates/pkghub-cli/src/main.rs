use clap::Parser;
use cli::{Args, Commands};
use list::{list_featured, list_packages, list_tags, search_packages};
use logging::setup_logging;
use pkghub_config::config::{config_path, Config};
use pkghub_operations::{HubContext, Result};
use show::show_package;
use tracing::{debug, info};

mod cli;
mod list;
mod logging;
mod show;
mod utils;

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };
    debug!(index_url = config.get_index_url(), "configuration loaded");
    Ok(config)
}

async fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);
    if args.no_color {
        utils::set_color(false);
    }

    let ctx = HubContext::new(load_config(&args)?);

    match args.command {
        Commands::List { all_versions } => list_packages(&ctx, all_versions).await?,
        Commands::Search { query, tags, limit } => {
            search_packages(&ctx, query.as_deref(), &tags, limit).await?
        }
        Commands::Tags => list_tags(&ctx).await?,
        Commands::Show {
            name,
            version,
            files,
            readme,
        } => show_package(&ctx, &name, version.as_deref(), files, readme).await?,
        Commands::Featured => list_featured(&ctx).await?,
        Commands::Config => {
            let path = args
                .config
                .unwrap_or_else(|| config_path().display().to_string());
            info!("# {path}");
            info!("{}", ctx.config().to_toml()?.trim_end());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
