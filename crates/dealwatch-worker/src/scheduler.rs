//! Recurring crawl scheduling.
//!
//! Registers the crawl-and-notify job on a [`JobScheduler`] started at
//! process startup. If a cycle is still running when the next tick fires,
//! the tick is skipped rather than stacked.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use dealwatch_core::Environment;

use crate::worker::Worker;

/// Every 30 minutes on the hour and half-hour.
const PRODUCTION_SCHEDULE: &str = "0 0,30 * * * *";
/// Every minute, for watching the loop locally.
const DEVELOPMENT_SCHEDULE: &str = "0 * * * * *";

/// The cron expression used for the given environment.
#[must_use]
pub fn schedule_for(env: Environment) -> &'static str {
    match env {
        Environment::Production => PRODUCTION_SCHEDULE,
        Environment::Development | Environment::Test => DEVELOPMENT_SCHEDULE,
    }
}

/// Builds and starts the scheduler with the recurring crawl job registered.
///
/// The returned handle must be kept alive for the lifetime of the process;
/// dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    worker: Arc<Worker>,
    env: Environment,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_crawl_job(&scheduler, worker, schedule_for(env)).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_crawl_job(
    scheduler: &JobScheduler,
    worker: Arc<Worker>,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    // Held across the whole run; a tick that cannot take it is skipped.
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let worker = Arc::clone(&worker);
        let running = Arc::clone(&running);

        Box::pin(async move {
            run_exclusive(&running, || async {
                tracing::info!("scheduler: starting crawl cycle");
                match worker.run_once().await {
                    Ok(summary) => {
                        tracing::info!(?summary, "scheduler: crawl cycle finished");
                    }
                    Err(error) => {
                        tracing::error!(%error, "scheduler: crawl cycle failed");
                    }
                }
            })
            .await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Runs `run` only if no other holder of `running` is mid-run; returns
/// whether it ran. Ticks never queue behind a slow cycle — a cycle that
/// outlives its interval means the system is over capacity, and stacking
/// cycles would also break the one-in-flight-crawl-per-pair guarantee.
async fn run_exclusive<F, Fut>(running: &Mutex<()>, run: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("previous crawl cycle still running; skipping this tick");
        return false;
    };
    run().await;
    true
}
