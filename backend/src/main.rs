use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use qrgen::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Overrides PORT
    #[arg(long)]
    port: Option<u16>,

    /// Overrides STATIC_DIR
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    qrgen::init_logging();

    let mut config = Config::load()?;
    if let Some(port) = args.port {
        info!("Port overridden from command line: {port}");
        config.port = port;
    }
    if let Some(static_dir) = args.static_dir {
        config.static_dir = static_dir;
    }

    qrgen::start_server(config).await
}
