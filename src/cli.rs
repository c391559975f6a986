//! CLI argument parsing for the report viewer.
use crate::config::ConfigOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default listen address for `serve`.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Root CLI entrypoint.
///
/// Data-location flags are global so every subcommand sees the same tree.
#[derive(Parser, Debug)]
#[command(
    name = "verif-viewer",
    version,
    about = "Browse pre-generated verification plots and scorecards",
    after_help = "Commands:\n  serve [--addr <host:port>]              Serve /api and /image over HTTP\n  projects                                Print the taxonomy of every project\n  scorecard --project <name>              Print scorecard rows from metrics.sqlite\n  navigate --project <name> [--category]  Print categories and ordered variables\n  fetch --path <rel> [--out <file>]       Read one file from under the data root\n\nExamples:\n  verif-viewer --data-root out/unified_verification projects\n  verif-viewer navigate --project monitor --category surface_lead_time\n  verif-viewer serve --addr 0.0.0.0:8080",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Data root holding one directory per project (env: VERIF_DATA_PATH)
    #[arg(long, value_name = "DIR", global = true)]
    pub data_root: Option<PathBuf>,

    /// Base directory for relative paths (defaults to the working directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub base_dir: Option<PathBuf>,

    /// Label catalog JSON (env: VERIF_VAR_NAMES)
    #[arg(long, value_name = "PATH", global = true)]
    pub labels: Option<PathBuf>,

    /// Project profiles JSON replacing the built-in profiles (env: VERIF_PROFILES)
    #[arg(long, value_name = "PATH", global = true)]
    pub profiles: Option<PathBuf>,

    /// Also parse plots stored directly under plots/ (env: VERIF_LEGACY_TOP_LEVEL)
    #[arg(long, global = true)]
    pub legacy_top_level: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_root: self.data_root.clone(),
            base_dir: self.base_dir.clone(),
            labels: self.labels.clone(),
            profiles: self.profiles.clone(),
            legacy_top_level: self.legacy_top_level,
        }
    }
}

/// Viewer commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Serve(ServeArgs),
    Projects,
    Scorecard(ScorecardArgs),
    Navigate(NavigateArgs),
    Fetch(FetchArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Serve the JSON API and plot files over HTTP")]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "HOST:PORT", default_value = DEFAULT_ADDR)]
    pub addr: String,
}

#[derive(Parser, Debug)]
#[command(about = "Print scorecard rows for a project")]
pub struct ScorecardArgs {
    /// Project directory name under the data root
    #[arg(long)]
    pub project: String,
}

#[derive(Parser, Debug)]
#[command(about = "Print navigation categories and ordered variables")]
pub struct NavigateArgs {
    /// Project directory name under the data root
    #[arg(long)]
    pub project: String,

    /// Only list the variables of this category
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Read a file from under the data root")]
pub struct FetchArgs {
    /// Path relative to the data root, as returned by `projects`
    #[arg(long, value_name = "REL")]
    pub path: String,

    /// Write the file here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}
