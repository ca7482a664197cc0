//! Workflow descriptor for an external scheduler.
//!
//! Nothing here triggers runs. The descriptor states when the workflow is due,
//! its task chain, and how a failed run is retried.

use crate::error::PipelineResult;
use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime, Timelike};
use std::time::Duration;
use tablepipe_config::ScheduleConfig;
use tablepipe_core::Stage;

/// How a failed run is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Further attempts after the first one.
    pub retries: u32,
    pub delay: Duration,
    /// Restart from Ingest instead of the stage that failed.
    pub from_start: bool,
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
            from_start: false,
        }
    }
}

/// The daily workflow as registered with a scheduler.
#[derive(Debug, Clone)]
pub struct WorkflowSchedule {
    pub name: String,
    pub owner: String,
    pub start: NaiveDateTime,
    pub run_at: NaiveTime,
    pub retries: u32,
    pub retry_delay: Duration,
    pub retry_from_start: bool,
    /// Tasks in dependency order.
    pub tasks: Vec<Stage>,
}

impl WorkflowSchedule {
    pub fn from_config(config: &ScheduleConfig) -> PipelineResult<Self> {
        Ok(Self {
            name: config.name.clone(),
            owner: config.owner.clone(),
            start: config.start_date_time()?,
            run_at: config.run_at_time()?,
            retries: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay_minutes * 60),
            retry_from_start: config.retry_from_start,
            tasks: Stage::ALL.to_vec(),
        })
    }

    /// First trigger strictly after `now`, never before the start date.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let from = now.max(self.start - ChronoDuration::seconds(1));
        let today = from.date().and_time(self.run_at);
        if today > from {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    /// The run time as a five-field cron expression.
    pub fn cron_expression(&self) -> String {
        format!("{} {} * * *", self.run_at.minute(), self.run_at.hour())
    }

    /// Upstream to downstream task pairs.
    pub fn dependencies(&self) -> Vec<(Stage, Stage)> {
        self.tasks.windows(2).map(|w| (w[0], w[1])).collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: self.retry_delay,
            from_start: self.retry_from_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn schedule() -> WorkflowSchedule {
        WorkflowSchedule::from_config(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let schedule = schedule();
        assert_eq!(schedule.cron_expression(), "30 6 * * *");
        assert_eq!(schedule.retry_delay, Duration::from_secs(600));
        assert_eq!(schedule.retry_policy().retries, 1);
        assert_eq!(schedule.tasks.first(), Some(&Stage::Ingest));
    }

    #[test]
    fn test_next_run_after() {
        let schedule = schedule();

        assert_eq!(schedule.next_run_after(at(2024, 5, 1, 5, 0)), at(2024, 5, 1, 6, 30));
        assert_eq!(schedule.next_run_after(at(2024, 5, 1, 6, 30)), at(2024, 5, 2, 6, 30));
        assert_eq!(schedule.next_run_after(at(2024, 5, 1, 23, 0)), at(2024, 5, 2, 6, 30));
    }

    #[test]
    fn test_next_run_never_before_start() {
        let schedule = schedule();

        assert_eq!(schedule.next_run_after(at(2023, 1, 1, 0, 0)), at(2024, 3, 20, 6, 30));
    }

    #[test]
    fn test_dependency_chain() {
        let deps: Vec<(&str, &str)> = schedule()
            .dependencies()
            .into_iter()
            .map(|(a, b)| (a.task_id(), b.task_id()))
            .collect();

        assert_eq!(
            deps,
            vec![
                ("load_csv_to_database", "fetch_data_from_database"),
                ("fetch_data_from_database", "clean_data"),
                ("clean_data", "upload_to_elasticsearch"),
            ]
        );
    }
}
