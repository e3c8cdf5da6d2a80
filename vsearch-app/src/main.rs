mod app;
mod input;

use app::App;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "vsearch")]
#[command(about = "Visual search reaction-time experiment")]
pub struct Args {
    /// Participant identifier; typed on the setup screen when omitted
    #[arg(short, long, env = "VSEARCH_PARTICIPANT")]
    participant: Option<String>,

    /// Directory the CSV and JSON exports are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Run in a window instead of borderless fullscreen
    #[arg(long)]
    windowed: bool,

    /// Seed for trial order and layouts
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let app = App::new(args)?;
    app.run()?;

    Ok(())
}
