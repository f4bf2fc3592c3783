use clap::Parser;

use tax_autonomy::api::{Cli, run_cli};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
