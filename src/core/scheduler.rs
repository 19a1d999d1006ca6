use tokio_cron_scheduler::{Job, JobScheduler};
use crate::core::orchestrator::{Pipeline, RunReport};
use crate::indicators::IndicatorSpec;
use tracing::{error, info};

/// Registers a cron job that scrapes `specs` on every tick and starts the scheduler.
///
/// The expression uses the six-field form with seconds, e.g. `0 0 6 * * *`.
pub async fn start(
    pipeline: Pipeline,
    specs: Vec<&'static IndicatorSpec>,
    cron: &str,
) -> Result<JobScheduler, anyhow::Error> {
    let sched = JobScheduler::new().await?;

    sched.add(
        Job::new_async(cron, move |_uuid, _l| {
            let pipeline = pipeline.clone();
            let specs = specs.clone();
            Box::pin(async move {
                info!("Running scheduled scrape...");
                let reports = pipeline.run_all(&specs).await;
                log_summary(&reports);
            })
        })?
    ).await?;

    sched.start().await?;
    info!(cron, "scheduler started");
    Ok(sched)
}

fn log_summary(reports: &[RunReport]) {
    for report in reports {
        match &report.error {
            None => info!(indicator = %report.indicator_id, key = %report.destination_key, records = report.records, "ok"),
            Some(e) => error!(indicator = %report.indicator_id, "{}", e),
        }
    }
}
