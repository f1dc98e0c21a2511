use clap::{ArgAction, Parser, Subcommand};
use npmpeek_config::server::Transport;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log as json lines
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server
    Serve {
        /// Transport to serve on (stdio or http)
        #[arg(required = false, short, long)]
        transport: Option<Transport>,

        /// Address for the http transport
        #[arg(required = false, short, long)]
        bind: Option<String>,

        /// Require this bearer token on every http request
        #[arg(required = false, long)]
        auth_token: Option<String>,
    },

    /// Print source files of a package
    #[command(arg_required_else_help = true)]
    #[clap(name = "fetch", visible_alias = "cat")]
    Fetch {
        /// Package to fetch, optionally with a version (`react@18`)
        #[arg(required = true)]
        package: String,

        /// File to print, relative to the package root
        #[arg(required = false)]
        file_path: Option<String>,
    },

    /// List the files of a package
    #[command(arg_required_else_help = true)]
    #[clap(name = "files", visible_alias = "ls")]
    Files {
        /// Package to list, optionally with a version
        #[arg(required = true)]
        package: String,
    },

    /// Show package metadata
    #[command(arg_required_else_help = true)]
    #[clap(name = "info", visible_alias = "query")]
    Info {
        /// Package to describe, optionally with a version
        #[arg(required = true)]
        package: String,
    },

    /// Search the registry
    #[command(arg_required_else_help = true)]
    #[clap(name = "search", visible_alias = "s", visible_alias = "find")]
    Search {
        /// Query to search
        #[arg(required = true)]
        query: String,

        /// Limit number of result
        #[arg(required = false, long)]
        limit: Option<usize>,

        /// Skip this many results
        #[arg(required = false, long)]
        from: Option<usize>,
    },

    /// Show the popular packages digest
    Popular,

    /// Print the configuration file to stdout
    Config {
        /// Open the configuration file in editor
        /// Optional value can be passed to set as editor (default is $EDITOR)
        #[arg(required = false, short, long)]
        edit: Option<Option<String>>,
    },

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,
}

/// Splits `name@version` into its parts. A leading `@` belongs to the scope.
pub fn split_package_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.rfind('@') {
        Some(idx) if idx > 0 => {
            let (name, version) = spec.split_at(idx);
            let version = &version[1..];
            (name, (!version.is_empty()).then_some(version))
        }
        _ => (spec, None),
    }
}
