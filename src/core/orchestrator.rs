use crate::error::ScrapeError;
use crate::fetcher::{PageRenderer, WaitCondition};
use crate::indicators::IndicatorSpec;
use crate::models::{FieldKind, FieldValue};
use crate::scrape::{self, RowOutcome};
use crate::storage::{StorageSink, CSV_CONTENT_TYPE};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Where an indicator run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Rendering,
    Extracting,
    Normalizing,
    Assembling,
    Persisted,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Pending => "pending",
            RunState::Rendering => "rendering",
            RunState::Extracting => "extracting",
            RunState::Normalizing => "normalizing",
            RunState::Assembling => "assembling",
            RunState::Persisted => "persisted",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A run-level failure, tagged with the indicator and the stage it hit.
#[derive(Error, Debug)]
#[error("{indicator_id} failed while {stage}: {source}")]
pub struct PipelineError {
    pub indicator_id: String,
    pub stage: RunState,
    #[source]
    pub source: ScrapeError,
}

#[derive(Debug)]
pub struct RunReport {
    pub indicator_id: String,
    pub state: RunState,
    pub destination_key: String,
    pub rows_seen: usize,
    pub rows_rejected: usize,
    pub records: usize,
    pub null_dates: usize,
    pub error: Option<PipelineError>,
}

impl RunReport {
    fn new(spec: &IndicatorSpec) -> Self {
        Self {
            indicator_id: spec.id.clone(),
            state: RunState::Pending,
            destination_key: spec.destination_key(),
            rows_seen: 0,
            rows_rejected: 0,
            records: 0,
            null_dates: 0,
            error: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.state == RunState::Persisted
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub render_timeout: Duration,
    pub poll_interval: Duration,
    /// Upper bound on indicators being rendered at the same time
    pub max_concurrent: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            render_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            max_concurrent: 1,
        }
    }
}

/// Render -> locate -> parse -> normalize -> assemble -> persist, per indicator.
#[derive(Clone)]
pub struct Pipeline {
    renderer: Arc<dyn PageRenderer>,
    sink: Arc<dyn StorageSink>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(renderer: Arc<dyn PageRenderer>, sink: Arc<dyn StorageSink>, options: PipelineOptions) -> Self {
        Self { renderer, sink, options }
    }

    /// Runs every indicator independently; a failure in one never stops the others.
    /// Reports come back in the order of `specs`, one per distinct indicator id.
    pub async fn run_all(&self, specs: &[&IndicatorSpec]) -> Vec<RunReport> {
        // Two runs of one indicator would race on the same destination key.
        let unique: Vec<&IndicatorSpec> = {
            let mut seen = HashSet::new();
            specs
                .iter()
                .copied()
                .filter(|spec| seen.insert(spec.id.as_str()))
                .collect()
        };
        if unique.len() < specs.len() {
            warn!(skipped = specs.len() - unique.len(), "duplicate indicators ignored");
        }

        info!(
            indicators = unique.len(),
            renderer = self.renderer.name(),
            sink = self.sink.name(),
            "starting scrape"
        );

        let runs: Vec<_> = unique.into_iter().map(|spec| self.run_indicator(spec)).collect();
        let reports: Vec<RunReport> = stream::iter(runs)
            .buffered(self.options.max_concurrent.max(1))
            .collect()
            .await;

        let persisted = reports.iter().filter(|r| r.is_persisted()).count();
        info!(persisted, failed = reports.len() - persisted, "scrape finished");
        reports
    }

    pub async fn run_indicator(&self, spec: &IndicatorSpec) -> RunReport {
        let mut report = RunReport::new(spec);

        if let Err(source) = self.execute(spec, &mut report).await {
            let err = PipelineError {
                indicator_id: spec.id.clone(),
                stage: report.state,
                source,
            };
            error!(indicator = %spec.id, stage = %report.state, "{}", err);
            report.state = RunState::Failed;
            report.error = Some(err);
        }

        report
    }

    async fn execute(&self, spec: &IndicatorSpec, report: &mut RunReport) -> Result<(), ScrapeError> {
        report.state = RunState::Rendering;
        let wait = WaitCondition {
            ready_selector: spec.table.target.ready_selector(),
            min_matches: spec.table.target.ready_matches(),
            timeout: self.options.render_timeout,
            poll_interval: self.options.poll_interval,
        };
        let markup = self.renderer.render(&spec.source_url, &wait).await?;

        report.state = RunState::Extracting;
        let raw_rows = scrape::locate(&markup, &spec.table)?;
        report.rows_seen = raw_rows.len();
        debug!(indicator = %spec.id, rows = raw_rows.len(), order = ?spec.row_order, "table located");

        report.state = RunState::Normalizing;
        let mut records = Vec::with_capacity(raw_rows.len());
        for (index, raw) in raw_rows.iter().enumerate() {
            match scrape::parse_row(raw, &spec.layout) {
                RowOutcome::Parsed(row) => records.push(scrape::normalize_row(row)),
                RowOutcome::Rejected(reason) => {
                    debug!(indicator = %spec.id, row = index, ?reason, "row rejected");
                    report.rows_rejected += 1;
                }
            }
        }

        report.null_dates = records
            .iter()
            .filter(|r| {
                spec.layout
                    .fields
                    .iter()
                    .filter(|f| f.kind == FieldKind::Date)
                    .any(|f| r.get(f.name).is_some_and(FieldValue::is_null))
            })
            .count();
        if report.null_dates > 0 {
            warn!(indicator = %spec.id, count = report.null_dates, "records with unparseable dates kept");
        }

        report.state = RunState::Assembling;
        let dataset = scrape::assemble(records, spec.schema())?;
        report.records = dataset.len();
        let body = dataset.to_csv()?;

        self.sink
            .put(&report.destination_key, body, CSV_CONTENT_TYPE)
            .await?;

        report.state = RunState::Persisted;
        info!(
            indicator = %spec.id,
            key = %report.destination_key,
            records = report.records,
            rejected = report.rows_rejected,
            "dataset persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RenderError, StorageError};
    use crate::fetcher::StaticRenderer;
    use crate::indicators::Registry;
    use crate::storage::MemorySink;
    use async_trait::async_trait;

    /// Never sees its ready selector appear.
    struct StalledRenderer;

    #[async_trait]
    impl PageRenderer for StalledRenderer {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn render(&self, url: &str, wait: &WaitCondition) -> Result<String, RenderError> {
            Err(RenderError::Timeout {
                url: url.to_string(),
                selector: wait.ready_selector.clone(),
                timeout: wait.timeout,
            })
        }
    }

    const CALENDAR_PAGE: &str = r#"
        <table id="economicCalendarData">
          <tr><td>Lançamento</td><td>Atual</td><td>Projeção</td><td>Anterior</td><td></td></tr>
          <tr><td>05.03.2024 (Fev)</td><td>52,5</td><td>52,9</td><td>52,7</td><td></td></tr>
          <tr><td>Data pendente</td><td></td><td>52,0</td><td>52,5</td><td></td></tr>
          <tr><td colspan="5">separador</td></tr>
        </table>
    "#;

    fn pipeline(renderer: StaticRenderer, sink: Arc<MemorySink>) -> Pipeline {
        Pipeline::new(Arc::new(renderer), sink, PipelineOptions::default())
    }

    #[tokio::test]
    async fn test_calendar_run_tolerates_bad_rows_and_dates() {
        let spec = Registry::get("caixin_services_index").unwrap();
        let sink = Arc::new(MemorySink::new());
        let renderer = StaticRenderer::new().with_page(&spec.source_url, CALENDAR_PAGE);

        let report = pipeline(renderer, sink.clone()).run_indicator(spec).await;

        assert_eq!(report.state, RunState::Persisted);
        assert_eq!(report.rows_seen, 4);
        assert_eq!(report.rows_rejected, 1);
        assert_eq!(report.records, 3);
        // Header row and the pending row both carry unparseable dates
        assert_eq!(report.null_dates, 2);

        let csv = String::from_utf8(sink.get("raw/caixin_index.csv").unwrap()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "date,actual_state,close,forecast");
        assert_eq!(lines[2], "2024-03-05,\"52,5\",\"52,7\",\"52,9\"");
        assert_eq!(lines[3], ",,\"52,5\",\"52,0\"");
    }

    #[tokio::test]
    async fn test_render_failure_is_reported_with_stage() {
        let spec = Registry::get("usd_cny").unwrap();
        let sink = Arc::new(MemorySink::new());

        let report = pipeline(StaticRenderer::new(), sink.clone()).run_indicator(spec).await;

        assert_eq!(report.state, RunState::Failed);
        let err = report.error.unwrap();
        assert_eq!(err.indicator_id, "usd_cny");
        assert_eq!(err.stage, RunState::Rendering);
        assert!(matches!(err.source, ScrapeError::Render(RenderError::Status { status: 404, .. })));
        assert!(sink.put_calls().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_fails_run() {
        let spec = Registry::get("caixin_services_index").unwrap();
        let sink = Arc::new(MemorySink::new().failing_on("raw/caixin_index.csv"));
        let renderer = StaticRenderer::new().with_page(&spec.source_url, CALENDAR_PAGE);

        let report = pipeline(renderer, sink.clone()).run_indicator(spec).await;

        assert_eq!(report.state, RunState::Failed);
        let err = report.error.unwrap();
        assert_eq!(err.stage, RunState::Assembling);
        assert!(matches!(err.source, ScrapeError::Storage(StorageError::Status { status: 403, .. })));
        assert!(sink.keys().is_empty());
    }

    #[tokio::test]
    async fn test_render_timeout_is_fatal_for_the_run() {
        let spec = Registry::get("usd_cny").unwrap();
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(Arc::new(StalledRenderer), sink.clone(), PipelineOptions::default());

        let report = pipeline.run_indicator(spec).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.records, 0);
        let err = report.error.unwrap();
        assert_eq!(err.indicator_id, "usd_cny");
        assert_eq!(err.stage, RunState::Rendering);
        match err.source {
            ScrapeError::Render(RenderError::Timeout { selector, timeout, .. }) => {
                assert_eq!(selector, "table#curr_table");
                assert_eq!(timeout, Duration::from_secs(30));
            }
            other => panic!("expected a render timeout, got {:?}", other),
        }
        assert!(sink.put_calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_indicators_run_once() {
        let spec = Registry::get("caixin_services_index").unwrap();
        let sink = Arc::new(MemorySink::new());
        let renderer = StaticRenderer::new().with_page(&spec.source_url, CALENDAR_PAGE);
        let options = PipelineOptions { max_concurrent: 4, ..PipelineOptions::default() };
        let pipeline = Pipeline::new(Arc::new(renderer), sink.clone(), options);

        let reports = pipeline.run_all(&[spec, spec, spec, spec]).await;

        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_persisted());
        assert_eq!(sink.put_calls(), vec!["raw/caixin_index.csv"]);
    }
}
