use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use care_chronicle::client::ChronicleClient;
use care_chronicle::config::Config;
use care_chronicle::error::{ChronicleError, Result};

#[derive(Parser, Debug)]
#[command(name = "care-chronicle")]
#[command(about = "Query a running Care Chronicle server")]
struct Cli {
    /// Optional JSON config file; its `client` section supplies defaults.
    #[arg(long, env = "CARE_CHRONICLE_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "CARE_CHRONICLE_URL")]
    url: Option<String>,

    #[arg(long, env = "CARE_CHRONICLE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Server liveness and store connectivity.
    Status,
    Members {
        /// Include related rows, insights and the cohort summary.
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    Member {
        #[arg(long)]
        id: String,
    },
    Dashboard {
        #[arg(long)]
        id: String,
    },
    Metrics {
        #[arg(long)]
        id: String,

        #[arg(long = "type")]
        metric_type: Option<String>,

        #[arg(long)]
        limit: Option<i64>,
    },
    Episodes {
        #[arg(long)]
        id: String,
    },
    Conversation {
        #[arg(long)]
        id: String,
    },
    Overview,
    Team,
}

#[derive(Serialize)]
struct StatusReport {
    url: String,
    health: care_chronicle::routes::service::HealthResponse,
    store: care_chronicle::store::StoreStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.client.base_url = url;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.client.timeout_secs = timeout_secs;
    }
    let client = ChronicleClient::new(&config.client)?;

    match cli.command {
        Commands::Status => {
            let health = client.health().await?;
            let store = client.store_status().await?;
            print_json(&StatusReport {
                url: client.base_url().to_string(),
                health,
                store,
            })
        }
        Commands::Members { full: false } => print_json(&client.members().await?),
        Commands::Members { full: true } => print_json(&client.members_full().await?),
        Commands::Member { id } => print_json(&client.member(&id).await?),
        Commands::Dashboard { id } => print_json(&client.dashboard(&id).await?),
        Commands::Metrics {
            id,
            metric_type,
            limit,
        } => print_json(
            &client
                .member_health_metrics(&id, metric_type.as_deref(), limit)
                .await?,
        ),
        Commands::Episodes { id } => print_json(&client.member_episodes(&id).await?),
        Commands::Conversation { id } => print_json(&client.conversation(&id).await?),
        Commands::Overview => print_json(&client.overview().await?),
        Commands::Team => print_json(&client.team_members().await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ChronicleError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}
