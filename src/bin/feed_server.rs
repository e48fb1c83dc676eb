use anyhow::Context;
use clap::Parser;
use maze_chase_core::config::FeedServerConfig;
use maze_chase_core::feed::{self, FeedMode};
use maze_chase_core::logging::init_logging;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "WebSocket control feed for remote actors")]
struct Cli {
    /// Overrides `PORT`
    #[arg(long)]
    port: Option<u16>,
    /// relay or roster; overrides `FEED_MODE`
    #[arg(long, value_parser = parse_mode)]
    mode: Option<FeedMode>,
    #[arg(short, long)]
    verbose: bool,
}

fn parse_mode(raw: &str) -> Result<FeedMode, String> {
    FeedMode::parse(raw).ok_or_else(|| format!("unknown feed mode `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = FeedServerConfig::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(port = config.port, mode = ?config.mode, "feed server listening");
    feed::serve(listener, feed::shared_state(config.mode))
        .await
        .context("feed server runtime failed")
}
