use clap::Parser;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up LM_STUDIO_* and friends from a local .env, if any
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lia_proxy=info".parse()?)
                .add_directive("lia_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?)
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port } => {
            cli::commands::start::run(cli.config, port).await?;
        }
        Commands::Status => {
            cli::commands::status::run(cli.config).await?;
        }
        Commands::Ask { message, history } => {
            cli::commands::ask::run(cli.config, message, history).await?;
        }
    }

    Ok(())
}
