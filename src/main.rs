mod app;
mod background;
mod cache;
mod commands;
mod config;
mod logging;
mod net;
mod quotes;
mod records;
mod share;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "whispers")]
#[command(about = "Inspirational quotes that keep working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/whispers/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Logs go to a file so they never interleave with command output
  let _log_guard = logging::init(&config::Config::data_dir()?)?;

  let mut app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
