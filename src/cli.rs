use clap::Parser;

#[derive(Parser)]
#[command(
    version,
    about = "Convert Clash subscriptions into latency engine payloads",
    long_about = None
)]
pub struct Args {
    #[arg(short, long, help = "Generator config, accept file path or URL")]
    pub config: String,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,

    #[arg(short, long, help = "Payload output directory, overrides the config")]
    pub output_dir: Option<String>,
}
