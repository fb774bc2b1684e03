use clap::Parser;
use std::process;
use ykubeedit::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> ykubeedit::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    let json = cli.json;
    let report = ykubeedit::run_command(cli).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}
