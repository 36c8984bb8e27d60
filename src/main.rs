use anyhow::Result;
use gitpulse::cli::Cli;
use gitpulse::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.common.verbose);
    cli.execute().await
}
