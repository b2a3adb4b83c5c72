use clap::Parser;
use eyre::WrapErr;
use tokenlease::commands::Commands;
use tokenlease::output::render;
use tokenlease::{BrokerSettings, Host};

#[derive(Parser)]
#[command(name = "tokenlease")]
#[command(about = "Issue lease-bound, short-lived API tokens", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: BrokerSettings,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let directive = if cli.verbose { "debug" } else { "info" };
    tokenlease_utils::tracing::init(directive).map_err(|e| eyre::eyre!(e))?;

    let host = Host::open(&cli.settings).wrap_err("failed to open tokenlease data directory")?;
    let response = cli.command.execute(&host).await?;
    if let Some(output) = render(&response)? {
        println!("{output}");
    }
    Ok(())
}
