//! Spinner per stage while a run is in progress.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use tablepipe_core::Stage;
use tablepipe_pipeline::{PipelineError, RunObserver, StageOutcome};

#[derive(Default)]
pub struct SpinnerObserver {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn take(&self) -> Option<ProgressBar> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

fn describe(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Ingested(rows) => format!("{} rows loaded into the table", rows),
        StageOutcome::Extracted(rows) => format!("{} rows extracted", rows),
        StageOutcome::Cleaned(report) => format!(
            "{} of {} rows kept ({} missing, {} duplicates dropped)",
            report.output_rows,
            report.input_rows,
            report.missing_dropped,
            report.duplicates_dropped
        ),
        StageOutcome::Published(report) if report.is_complete() => {
            format!("{} documents indexed", report.indexed)
        }
        StageOutcome::Published(report) => format!(
            "{} documents indexed, {} failed",
            report.indexed,
            report.failed.len()
        ),
    }
}

impl RunObserver for SpinnerObserver {
    fn stage_started(&self, stage: Stage) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{} ({})", stage, stage.task_id()));
        pb.enable_steady_tick(Duration::from_millis(100));

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn stage_finished(&self, stage: Stage, outcome: &StageOutcome) {
        if let Some(pb) = self.take() {
            pb.finish_with_message(format!(
                "{} {:<8} {}",
                "✓".green(),
                stage.to_string(),
                describe(outcome)
            ));
        }
    }

    fn stage_failed(&self, stage: Stage, error: &PipelineError) {
        if let Some(pb) = self.take() {
            pb.finish_with_message(format!(
                "{} {:<8} {}",
                "✗".red(),
                stage.to_string(),
                error.to_string().red()
            ));
        }
    }

    fn retry_scheduled(&self, attempt: i32, from: Stage, delay: Duration) {
        println!(
            "{} attempt {} from {} in {}s",
            "Retrying:".yellow().bold(),
            attempt,
            from,
            delay.as_secs()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablepipe_pipeline::CleanReport;

    #[test]
    fn test_describe_clean() {
        let outcome = StageOutcome::Cleaned(CleanReport {
            input_rows: 10,
            missing_dropped: 1,
            duplicates_dropped: 1,
            output_rows: 8,
            columns: vec!["id".into()],
        });
        assert_eq!(
            describe(&outcome),
            "8 of 10 rows kept (1 missing, 1 duplicates dropped)"
        );
    }
}
