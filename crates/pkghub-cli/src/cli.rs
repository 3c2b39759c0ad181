use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pkghub",
    about = "Browse the espanso package hub",
    version,
    arg_required_else_help = true
)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit log events as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use this configuration file instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available packages
    #[clap(name = "list", visible_alias = "ls")]
    List {
        /// Show every version instead of only the latest
        #[arg(short, long)]
        all_versions: bool,
    },

    /// Search packages by text and tags
    #[clap(name = "search", visible_alias = "s")]
    Search {
        /// Fuzzy text query over name, author, description and title
        query: Option<String>,

        /// Only show packages with this tag (repeatable, any may match)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show how many packages use each tag
    #[clap(name = "tags")]
    Tags,

    /// Show a package's details and archive contents
    #[clap(name = "show", visible_alias = "info")]
    Show {
        name: String,

        /// Version to show, defaults to the latest
        #[arg(long)]
        version: Option<String>,

        /// Print the contents of every package file
        #[arg(short, long)]
        files: bool,

        /// Print the README
        #[arg(short, long)]
        readme: bool,
    },

    /// List featured packages
    #[clap(name = "featured")]
    Featured,

    /// Print the resolved configuration
    #[clap(name = "config")]
    Config,
}
