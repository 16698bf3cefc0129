// CLI modules
mod cli;
mod config;
mod logging;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op};
use cli::{Access, Ls, Mkdir, Mv, Reconcile, Rename, Rm, Share, Tree, UploadUrl};
use config::AppConfig;

command_enum! {
    (Ls, Ls),
    (Tree, Tree),
    (Mkdir, Mkdir),
    (Mv, Mv),
    (Rename, Rename),
    (Rm, Rm),
    (Share, Share),
    (Access, Access),
    (UploadUrl, UploadUrl),
    (Reconcile, Reconcile),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    // validated on load
    let level = config.level().unwrap_or(tracing::Level::INFO);
    let guards = logging::init_logging(level, config.log_dir.as_deref());

    let ctx = match cli::op::OpContext::connect(&config, args.base_path.as_deref(), args.json).await
    {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            drop(guards);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            drop(guards);
            std::process::exit(cli::op::exit_code(&e));
        }
    }
}
