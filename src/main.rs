use clap::Parser;
use log::{error, info};

use sentibench::conf::Config;
use sentibench::core::{CliArgs, Command, setup_logging};
use sentibench::service::{run_bench, run_load};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = Config::load(args.config.as_deref())?;
    setup_logging(config.logging.file.as_deref())?;
    info!(args = args; "Sentibench started.");

    let result = match args.command {
        Command::Load { backend } => run_load(&config, backend).await,
        Command::Bench => run_bench(&config).await.map(|_| ()),
    };
    if let Err(e) = &result {
        error!("Run failed: {}", e);
    }
    Ok(result?)
}
