use clap::Parser;
use poly_alert::cli::{Cli, Commands};
use poly_alert::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_env(&cli.config)?;

    if let Commands::Config = cli.command {
        println!("{}", config.to_display_toml()?);
        return Ok(());
    }

    poly_alert::telemetry::init_logging(&config.telemetry.log_level, config.telemetry.log_format)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting alert pipeline");
            args.execute(config).await?;
        }
        Commands::Parse(args) => args.execute().await?,
        Commands::TestAlert(args) => args.execute(&config).await?,
        Commands::Config => {}
    }

    Ok(())
}
