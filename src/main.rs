use clap::Parser;
use tracing_subscriber::EnvFilter;

use suitectl::cli::{self, Cli};

/// 로그는 stderr로. `RUST_LOG`가 있으면 그것을 우선 사용.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("suitectl={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli::run(cli).await {
        eprintln!("✗ Error: {:#}", e);
        std::process::exit(1);
    }
}
