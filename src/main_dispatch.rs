use streakline::cli::{run_command, Cli, CommandContext, Commands};
use streakline::config::AppConfig;

pub(crate) async fn run(cli: &Cli, config: AppConfig) -> anyhow::Result<()> {
    // Slate and backtest runs keep full logging; report commands stay quiet.
    let _guard = match &cli.command {
        Commands::Slate { .. } | Commands::Backtest { .. } => {
            crate::main_runtime::init_logging(&config.logging)
        }
        Commands::Streaks { .. } | Commands::Player { .. } | Commands::Team { .. } => {
            crate::main_runtime::init_logging_simple();
            None
        }
    };

    let ctx = CommandContext::load(cli, config).await?;
    run_command(&cli.command, &ctx).await
}
