//! Fixture todo service binary

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use flowcheck_fixture::{serve, shared, TodoStore, DEFAULT_ADDR};

#[derive(Parser)]
#[command(name = "flowcheck-fixture")]
#[command(about = "Minimal todo service used as a flow evaluation target")]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(long, env = "FLOWCHECK_FIXTURE_ADDR", default_value = DEFAULT_ADDR)]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let listener = TcpListener::bind(cli.addr).await?;

    tokio::select! {
        result = serve(listener, shared(TodoStore::new())) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }
    Ok(())
}
