use anyhow::bail;
use clap::Parser;
use streakline::cli::Cli;
use streakline::config::AppConfig;

mod main_dispatch;
mod main_runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }

    main_dispatch::run(&cli, config).await
}
