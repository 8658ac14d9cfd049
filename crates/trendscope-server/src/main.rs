mod api;
mod cycle;
mod middleware;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::{AuthState, CycleGate},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(trendscope_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let markets = Arc::new(trendscope_core::load_markets(&config.markets_path)?);
    tracing::info!(
        zones = markets.zones.len(),
        segments = markets.segments.len(),
        "loaded market topology"
    );

    let pool_config = trendscope_db::PoolConfig::from_app_config(&config);
    let pool = trendscope_db::connect_pool(&config.database_url, pool_config).await?;
    trendscope_db::run_migrations(&pool).await?;

    // One lock per process: the scheduler and the HTTP trigger share it so
    // two cycles can never run at once.
    let cycle_lock = Arc::new(tokio::sync::Mutex::new(()));
    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&config),
        Arc::clone(&markets),
        Arc::clone(&cycle_lock),
    )
    .await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        trendscope_core::Environment::Development
    ))?;
    let cycle_gate = CycleGate::new(config.cycle_secret.as_deref());
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        markets,
        cycle_gate,
        cycle_lock,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
