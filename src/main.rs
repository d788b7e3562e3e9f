use clap::Parser;
use tracing::debug;

use credforge::cli::{run_check, run_providers, run_setup, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(cli.verbose >= 2)
        .init();

    debug!("credforge started with verbosity level: {}", cli.verbose);

    let verbose = cli.verbose > 0;
    let result = match cli.command {
        Commands::Setup(args) => run_setup(args, verbose).await,
        Commands::Check(args) => run_check(args).await,
        Commands::Providers => Ok(run_providers()),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("❌ {e:#}");
            std::process::exit(2);
        }
    }
}
