use anyhow::Result;
use clap::Parser;

use polyrun::cli::{Cli, Commands};
use polyrun::commands::{logs, run, status, stop};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(
            "polyrun=info".parse().expect("static directive always parses"),
        ))
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    let code = match cli.command {
        Commands::Run {
            services,
            write_ports,
            mirror_logs,
        } => {
            run::run(
                &cwd,
                cli.manifest.as_deref(),
                &services,
                write_ports,
                mirror_logs,
            )
            .await?
        }
        Commands::Status => status::status(&cwd, cli.manifest.as_deref()).await?,
        Commands::Stop => stop::stop(&cwd, cli.manifest.as_deref()).await?,
        Commands::Logs { service, follow, lines } => {
            logs::logs(&cwd, cli.manifest.as_deref(), &service, follow, lines).await?
        }
    };

    std::process::exit(code);
}
