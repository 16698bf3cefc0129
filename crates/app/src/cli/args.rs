pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shelf", version)]
#[command(about = "Files and directories on a flat object store")]
pub struct Args {
    /// Path to the config file (defaults to ./shelf.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Scope all paths under this prefix, overriding the config's base_path
    #[arg(long, global = true)]
    pub base_path: Option<String>,

    /// Print nodes as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
