#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use anyhow::bail;
use clap::Parser;
use subcanon::cli::Args;
use subcanon::generator::Generator;
use tracing::Level;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!("Loading generator config from: {}", args.config);

    let mut generator = Generator::load(&args.config).await?;
    if let Some(output_dir) = args.output_dir {
        generator = generator.with_output_dir(output_dir);
    }

    let report = generator.run().await?;
    if !report.is_success() {
        bail!(
            "No profile produced a payload ({} rejected, {} failed)",
            report.rejected.len(),
            report.failed.len()
        );
    }

    tracing::info!("Payload generation complete!");
    Ok(())
}
