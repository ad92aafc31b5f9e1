use anyhow::Context;
use clap::Parser;
use ptptun::{
    config::{Args, TunnelConfig},
    daemon::run_daemon,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    let config = TunnelConfig::from(args);
    run_daemon(config).await.context("ptptun stopped")
}
