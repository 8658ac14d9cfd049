mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "trendscope-cli")]
#[command(about = "Trendscope command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List tracked trends, highest score first.
    Trends {
        #[arg(long)]
        segment: Option<String>,
        #[arg(long)]
        zone: Option<String>,
        #[arg(long)]
        phase: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Print the market window for one (segment, zone) pair.
    Market {
        #[arg(long)]
        segment: String,
        #[arg(long)]
        zone: String,
        /// Any date inside the wanted ISO week; defaults to today.
        #[arg(long)]
        week_of: Option<NaiveDate>,
    },
    /// Inspect or append to the usage ledger.
    Usage {
        #[command(subcommand)]
        command: UsageCommands,
    },
    /// Trigger a brain cycle on a running server.
    Cycle {
        /// Server base URL, e.g. http://localhost:3000
        #[arg(long, env = "TRENDSCOPE_SERVER_URL")]
        server_url: String,
        /// Shared cycle secret, sent as x-cycle-secret.
        #[arg(long, env = "TRENDSCOPE_CYCLE_SECRET", hide_env_values = true)]
        secret: String,
        /// Run a reduced-scope turbo cycle.
        #[arg(long)]
        turbo: bool,
    },
}

#[derive(Debug, Subcommand)]
enum UsageCommands {
    /// Show this month's consumption for a user and feature.
    Get { user_id: Uuid, feature_key: String },
    /// Append one usage event.
    Record { user_id: Uuid, feature_key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Trends {
            segment,
            zone,
            phase,
            limit,
        } => {
            let pool = connect().await?;
            commands::list_trends(
                &pool,
                segment.as_deref(),
                zone.as_deref(),
                phase.as_deref(),
                limit,
            )
            .await
        }
        Commands::Market {
            segment,
            zone,
            week_of,
        } => {
            let pool = connect().await?;
            commands::print_market_window(&pool, &segment, &zone, week_of).await
        }
        Commands::Usage { command } => {
            let pool = connect().await?;
            match command {
                UsageCommands::Get {
                    user_id,
                    feature_key,
                } => commands::show_usage(&pool, user_id, &feature_key).await,
                UsageCommands::Record {
                    user_id,
                    feature_key,
                } => commands::record_usage(&pool, user_id, &feature_key).await,
            }
        }
        Commands::Cycle {
            server_url,
            secret,
            turbo,
        } => commands::trigger_cycle(&server_url, &secret, turbo).await,
    }
}

async fn connect() -> anyhow::Result<sqlx::PgPool> {
    let config = trendscope_core::load_app_config()?;
    let pool = trendscope_db::connect_pool(
        &config.database_url,
        trendscope_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    Ok(pool)
}
