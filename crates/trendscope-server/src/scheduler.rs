//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring brain cycle job.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use trendscope_engine::{CycleMode, CycleReport};

/// Builds and starts the background job scheduler.
///
/// `cycle_lock` is the same mutex the HTTP trigger holds while a cycle runs;
/// sharing it keeps scheduled ticks and manual triggers from overlapping.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cycle job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<trendscope_core::AppConfig>,
    markets: Arc<trendscope_core::MarketsFile>,
    cycle_lock: Arc<tokio::sync::Mutex<()>>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_cycle_job(&scheduler, pool, config, markets, cycle_lock).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring full-cycle job.
///
/// Runs at 05:00 UTC by default (`0 0 5 * * *`) and can be overridden with
/// `TRENDSCOPE_CYCLE_CRON`. Scheduled runs always use normal mode; turbo is
/// reserved for the manual trigger.
async fn register_cycle_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<trendscope_core::AppConfig>,
    markets: Arc<trendscope_core::MarketsFile>,
    cycle_lock: Arc<tokio::sync::Mutex<()>>,
) -> Result<(), JobSchedulerError> {
    let cron = std::env::var("TRENDSCOPE_CYCLE_CRON").unwrap_or_else(|_| "0 0 5 * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let markets = Arc::clone(&markets);
        let cycle_lock = Arc::clone(&cycle_lock);

        Box::pin(async move {
            run_scheduled_cycle(&pool, &config, &markets, &cycle_lock).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered cycle job");
    Ok(())
}

/// Run one scheduled tick, or skip it when a cycle already holds the lock.
///
/// A tick that fires while a manual trigger (or an overlong previous tick)
/// is still running must not start a second cycle; the two would race on
/// scoring writes and double-spend the generation services.
async fn run_scheduled_cycle(
    pool: &PgPool,
    config: &trendscope_core::AppConfig,
    markets: &trendscope_core::MarketsFile,
    cycle_lock: &tokio::sync::Mutex<()>,
) -> Option<CycleReport> {
    let Ok(_guard) = cycle_lock.try_lock() else {
        tracing::warn!("scheduler: a cycle is already running, skipping this tick");
        return None;
    };

    tracing::info!("scheduler: starting scheduled cycle run");
    let report = crate::cycle::run_cycle(pool, config, markets, CycleMode::Normal).await;
    tracing::info!(
        stages = report.stages_completed.len(),
        errors = report.errors.len(),
        elapsed_ms = report.elapsed_ms,
        "scheduler: scheduled cycle run complete"
    );
    Some(report)
}
