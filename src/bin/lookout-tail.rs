//! Print every frame received on the given channels as JSON lines

use clap::Parser;
use lookout::{LookoutConfig, LookoutError};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "lookout-tail")]
#[command(about = "Stream dashboard channel events to stdout")]
struct Cli {
    /// URL the dashboard is served from
    #[arg(long, env = "LOOKOUT_APP_URL")]
    app_url: String,

    /// Socket path on the application host
    #[arg(long, env = "LOOKOUT_WS_PATH")]
    path: Option<String>,

    /// Channel to follow (repeatable)
    #[arg(long = "channel", required = true)]
    channels: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lookout=info".parse()?)
                .add_directive("lookout_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = LookoutConfig::new(cli.app_url);
    if let Some(path) = cli.path {
        config.ws_path = path;
    }

    let client = lookout::websocket_client(&config)?;

    let handles: Vec<_> = cli
        .channels
        .iter()
        .map(|channel| {
            client.subscribe(channel.as_str(), |frame| {
                let line = serde_json::to_string(frame)?;
                println!("{}", line);
                Ok::<(), LookoutError>(())
            })
        })
        .collect();

    if let Err(e) = client.connect().await {
        error!(error = %e, "Initial connection failed, retrying in the background");
    }

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, closing connection");

    for handle in handles {
        handle.unsubscribe();
    }
    client.disconnect();

    Ok(())
}
