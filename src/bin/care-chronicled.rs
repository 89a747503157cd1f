use care_chronicle::config::Config;
use care_chronicle::daemon;
use care_chronicle::error::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "care-chronicled")]
#[command(about = "Care Chronicle API server")]
struct Cli {
    /// JSON config file; flags below override its values.
    #[arg(long, env = "CARE_CHRONICLE_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "CARE_CHRONICLE_HOST")]
    host: Option<String>,

    #[arg(long, env = "CARE_CHRONICLE_PORT")]
    port: Option<u16>,

    #[arg(long, env = "CARE_CHRONICLE_DB")]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(db) = cli.db {
        config.database.sqlite_path = db;
    }

    let fallback = config.logging.filter.clone();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    daemon::run_with_shutdown(config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    })
    .await
}
