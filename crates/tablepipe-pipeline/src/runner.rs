//! Sequential workflow runner.
//!
//! Stages run strictly in order; the first error moves the run to Failed
//! and the remaining stages are skipped. Every state change is written to
//! the run history table.

use crate::error::{PipelineError, PipelineResult};
use crate::schedule::RetryPolicy;
use crate::stages::clean::{self, CleanReport, CleanRules};
use crate::stages::publish::{self, PublishReport, PublishSettings};
use crate::stages::{extract, ingest};
use std::sync::Arc;
use std::time::Duration;
use tablepipe_config::{ArtifactPaths, Config};
use tablepipe_core::{PipelineRun, RunState, Stage};
use tablepipe_db::Database;
use tablepipe_search::DocumentIndex;
use tracing::{error, info, warn};

/// Everything the stages need besides their inputs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub workflow: String,
    pub table: String,
    pub clean: CleanRules,
    pub publish: PublishSettings,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workflow: config.schedule.name.clone(),
            table: config.database.table.clone(),
            clean: CleanRules::from_config(&config.clean),
            publish: PublishSettings::from_config(config),
        }
    }
}

/// Result of one stage.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Ingested(usize),
    Extracted(usize),
    Cleaned(CleanReport),
    Published(PublishReport),
}

impl StageOutcome {
    /// Rows the stage produced.
    pub fn rows(&self) -> usize {
        match self {
            StageOutcome::Ingested(rows) | StageOutcome::Extracted(rows) => *rows,
            StageOutcome::Cleaned(report) => report.output_rows,
            StageOutcome::Published(report) => report.indexed,
        }
    }
}

/// Callbacks for progress display. Every method defaults to doing nothing.
pub trait RunObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage, _outcome: &StageOutcome) {}
    fn stage_failed(&self, _stage: Stage, _error: &PipelineError) {}
    fn retry_scheduled(&self, _attempt: i32, _from: Stage, _delay: Duration) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// The four-stage workflow over one database, data directory and index.
pub struct Pipeline {
    db: Database,
    paths: ArtifactPaths,
    settings: PipelineSettings,
    index: Arc<dyn DocumentIndex>,
}

impl Pipeline {
    pub fn new(
        db: Database,
        paths: ArtifactPaths,
        settings: PipelineSettings,
        index: Arc<dyn DocumentIndex>,
    ) -> Self {
        Self {
            db,
            paths,
            settings,
            index,
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run a single stage against the configured artifacts.
    pub async fn run_stage(&self, stage: Stage) -> PipelineResult<StageOutcome> {
        let paths = &self.paths;
        let outcome = match stage {
            Stage::Ingest => StageOutcome::Ingested(ingest::ingest(
                &paths.raw_file,
                &self.db,
                &self.settings.table,
            )?),
            Stage::Extract => StageOutcome::Extracted(extract::extract(
                &self.db,
                &self.settings.table,
                &paths.extracted_file,
            )?),
            Stage::Clean => StageOutcome::Cleaned(clean::clean(
                &paths.extracted_file,
                &paths.clean_file,
                &self.settings.clean,
            )?),
            Stage::Publish => StageOutcome::Published(
                publish::publish(&paths.clean_file, self.index.as_ref(), &self.settings.publish)
                    .await?,
            ),
        };
        Ok(outcome)
    }

    /// One attempt of the workflow, starting at `from`.
    pub async fn run_attempt(
        &self,
        attempt: i32,
        from: Stage,
        observer: &dyn RunObserver,
    ) -> PipelineRun {
        let mut run = PipelineRun::new(&self.settings.workflow, attempt);
        info!(
            "Starting run {} of {} (attempt {}, from {})",
            run.id, run.workflow, attempt, from
        );
        if let Err(e) = self.db.insert_run(&run) {
            warn!("Could not record run {}: {}", run.id, e);
        }

        match from {
            Stage::Ingest => run.advance(),
            other => run.resume_at(other),
        };
        self.record(&run);

        for stage in Stage::ALL.into_iter().skip_while(|s| *s != from) {
            observer.stage_started(stage);
            match self.run_stage(stage).await {
                Ok(outcome) => {
                    run.counts.record(stage, outcome.rows() as i64);
                    observer.stage_finished(stage, &outcome);
                    run.advance();
                    self.record(&run);
                }
                Err(e) => {
                    error!("Stage {} failed: {}", stage, e);
                    observer.stage_failed(stage, &e);
                    run.fail(stage, e.kind(), e.to_string());
                    self.record(&run);
                    return run;
                }
            }
        }

        info!("Run {} succeeded", run.id);
        run
    }

    /// One attempt from the first stage.
    pub async fn run(&self, observer: &dyn RunObserver) -> PipelineRun {
        self.run_attempt(1, Stage::Ingest, observer).await
    }

    /// Run from `start`, retrying a failed attempt per `policy`.
    ///
    /// Returns every attempt made, the last one deciding the outcome.
    pub async fn run_with_retry(
        &self,
        start: Stage,
        policy: &RetryPolicy,
        observer: &dyn RunObserver,
    ) -> Vec<PipelineRun> {
        let mut runs: Vec<PipelineRun> = Vec::new();
        let mut from = start;

        for attempt in 1..=(policy.retries as i32 + 1) {
            let run = self.run_attempt(attempt, from, observer).await;
            let failed_stage = run.failed_stage;
            let succeeded = run.state == RunState::Succeeded;
            runs.push(run);

            if succeeded || attempt > policy.retries as i32 {
                break;
            }

            from = if policy.from_start {
                Stage::Ingest
            } else {
                failed_stage.unwrap_or(Stage::Ingest)
            };
            info!(
                "Retrying from {} in {} seconds",
                from,
                policy.delay.as_secs()
            );
            observer.retry_scheduled(attempt + 1, from, policy.delay);
            tokio::time::sleep(policy.delay).await;
        }

        runs
    }

    fn record(&self, run: &PipelineRun) {
        if let Err(e) = self.db.update_run(run) {
            warn!("Could not update run {}: {}", run.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tablepipe_core::{ErrorKind, Table, Value};
    use tablepipe_search::MemoryIndex;
    use tempfile::TempDir;

    /// Ten rows: row 4 repeats row 2, row 7 has no price. The column under
    /// the blank last header is the junk column.
    const RAW: &str = "\
Name,Price,In Stock,Category,Rating,Weight (kg),Color,Size,Brand,Origin,SKU,Added,\n\
pen,1.5,yes,office,4,0.01,blue,s,acme,de,p1,2024-01-01,0\n\
mug,7.0,yes,kitchen,5,0.3,white,m,acme,cn,m1,2024-01-02,0\n\
lamp,20.0,no,home,3,1.2,black,l,lux,us,l1,2024-01-03,0\n\
mug,7.0,yes,kitchen,5,0.3,white,m,acme,cn,m1,2024-01-02,0\n\
desk,150.0,yes,office,4,30.0,oak,xl,wood,se,d1,2024-01-04,0\n\
cup,3.0,yes,kitchen,4,0.2,red,s,acme,cn,c1,2024-01-05,0\n\
rug,,no,home,2,4.0,grey,l,lux,in,r1,2024-01-06,0\n\
fan,25.0,yes,home,4,2.5,white,m,cool,cn,f1,2024-01-07,0\n\
book,12.0,yes,office,5,0.5,green,m,read,uk,b1,2024-01-08,0\n\
sofa,400.0,no,home,3,60.0,blue,xl,lux,it,s1,2024-01-09,0\n";

    struct Fixture {
        _dir: TempDir,
        pipeline: Pipeline,
        index: Arc<MemoryIndex>,
        db: Database,
    }

    fn fixture_with(index: MemoryIndex) -> Fixture {
        let dir = TempDir::new().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        std::fs::write(&paths.raw_file, RAW).unwrap();

        let db = Database::open_in_memory().unwrap();
        let index = Arc::new(index);
        let settings = PipelineSettings::from_config(&Config::default());
        let pipeline = Pipeline::new(db.clone(), paths, settings, index.clone());

        Fixture {
            _dir: dir,
            pipeline,
            index,
            db,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MemoryIndex::new())
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl RunObserver for Recorder {
        fn stage_started(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {}", stage));
        }

        fn stage_failed(&self, stage: Stage, _error: &PipelineError) {
            self.events.lock().unwrap().push(format!("fail {}", stage));
        }

        fn retry_scheduled(&self, attempt: i32, from: Stage, _delay: Duration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("retry {} from {}", attempt, from));
        }
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let f = fixture();

        let run = f.pipeline.run(&NoopObserver).await;

        assert_eq!(run.state, RunState::Succeeded);
        assert_eq!(run.counts.ingested, Some(10));
        assert_eq!(run.counts.extracted, Some(10));
        assert_eq!(run.counts.cleaned, Some(8));
        assert_eq!(run.counts.published, Some(8));

        let clean = Table::read_csv(&f.pipeline.paths().clean_file).unwrap();
        assert_eq!(clean.headers()[0], "id");
        assert!(clean.column_index("unnamed_12").is_none());
        assert!(clean.column_index("weight_kg").is_some());
        assert!(clean.column_index("in_stock").is_some());
        let ids: Vec<i64> = clean.column(0).filter_map(Value::as_i64).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());

        let docs = f.index.documents("table_milestone");
        let doc_ids: Vec<u64> = docs.iter().map(|(id, _)| *id).collect();
        assert_eq!(doc_ids, (1..=8).collect::<Vec<_>>());
        assert_eq!(docs[7].1["name"], serde_json::json!("sofa"));

        let stored = f.db.get_run(&run.id).unwrap();
        assert_eq!(stored.state, RunState::Succeeded);
        assert_eq!(stored.counts.published, Some(8));
    }

    #[tokio::test]
    async fn test_stage_failure_skips_the_rest() {
        let f = fixture_with(MemoryIndex::offline());
        let recorder = Recorder::default();

        let run = f.pipeline.run(&recorder).await;

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.failed_stage, Some(Stage::Publish));
        assert_eq!(run.error_kind, Some(ErrorKind::Connection));
        assert_eq!(run.counts.cleaned, Some(8));
        assert_eq!(run.counts.published, None);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.last().map(String::as_str), Some("fail publish"));

        let stored = f.db.get_run(&run.id).unwrap();
        assert_eq!(stored.state, RunState::Failed);
        assert_eq!(stored.failed_stage, Some(Stage::Publish));
    }

    #[tokio::test]
    async fn test_missing_raw_file_fails_ingest() {
        let f = fixture();
        std::fs::remove_file(&f.pipeline.paths().raw_file).unwrap();

        let run = f.pipeline.run(&NoopObserver).await;

        assert_eq!(run.failed_stage, Some(Stage::Ingest));
        assert_eq!(run.error_kind, Some(ErrorKind::Io));
        assert!(!f.pipeline.paths().extracted_file.exists());
    }

    #[tokio::test]
    async fn test_retry_resumes_at_failed_stage() {
        let f = fixture_with(MemoryIndex::offline());
        let recorder = Recorder::default();
        let policy = RetryPolicy {
            retries: 1,
            delay: Duration::ZERO,
            from_start: false,
        };

        let runs = f
            .pipeline
            .run_with_retry(Stage::Ingest, &policy, &recorder)
            .await;

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].attempt, 2);
        assert_eq!(runs[1].counts.ingested, None);
        assert_eq!(runs[1].failed_stage, Some(Stage::Publish));

        let events = recorder.events.lock().unwrap().clone();
        assert!(events.contains(&"retry 2 from publish".to_string()));
        assert_eq!(f.db.list_runs(10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_from_start() {
        let f = fixture_with(MemoryIndex::offline());
        let policy = RetryPolicy {
            retries: 1,
            delay: Duration::ZERO,
            from_start: true,
        };

        let runs = f
            .pipeline
            .run_with_retry(Stage::Ingest, &policy, &NoopObserver)
            .await;

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].counts.ingested, Some(10));
    }

    #[tokio::test]
    async fn test_no_retry_after_success() {
        let f = fixture();

        let runs = f
            .pipeline
            .run_with_retry(Stage::Ingest, &RetryPolicy::none(), &NoopObserver)
            .await;

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].state, RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_run_is_repeatable() {
        let f = fixture();

        f.pipeline.run(&NoopObserver).await;
        let second = f.pipeline.run(&NoopObserver).await;

        assert_eq!(second.state, RunState::Succeeded);
        assert_eq!(f.db.table_row_count("table_m3").unwrap(), 10);
        assert_eq!(f.index.documents("table_milestone").len(), 8);
    }
}
