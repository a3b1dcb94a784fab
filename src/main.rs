use clap::Parser;
use credential_service::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Migrate => cli::migrate::run().await,
        Command::User(command) => cli::users::run(command).await,
    }
}
