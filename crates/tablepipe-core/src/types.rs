//! Core domain types for tablepipe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for pipeline runs.
pub type RunId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Kind of a table column, used for SQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// One of the four units of work, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Extract,
    Clean,
    Publish,
}

impl Stage {
    /// All stages in the order they run.
    pub const ALL: [Stage; 4] = [Stage::Ingest, Stage::Extract, Stage::Clean, Stage::Publish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Extract => "extract",
            Stage::Clean => "clean",
            Stage::Publish => "publish",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ingest" => Some(Stage::Ingest),
            "extract" => Some(Stage::Extract),
            "clean" => Some(Stage::Clean),
            "publish" => Some(Stage::Publish),
            _ => None,
        }
    }

    /// Task name the stage is registered under in the workflow definition.
    pub fn task_id(&self) -> &'static str {
        match self {
            Stage::Ingest => "load_csv_to_database",
            Stage::Extract => "fetch_data_from_database",
            Stage::Clean => "clean_data",
            Stage::Publish => "upload_to_elasticsearch",
        }
    }

    /// The state a run is in while this stage executes.
    pub fn running_state(&self) -> RunState {
        match self {
            Stage::Ingest => RunState::Ingesting,
            Stage::Extract => RunState::Extracting,
            Stage::Clean => RunState::Cleaning,
            Stage::Publish => RunState::Publishing,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Pending,
    Ingesting,
    Extracting,
    Cleaning,
    Publishing,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Ingesting => "ingesting",
            RunState::Extracting => "extracting",
            RunState::Cleaning => "cleaning",
            RunState::Publishing => "publishing",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RunState::Pending),
            "ingesting" => Some(RunState::Ingesting),
            "extracting" => Some(RunState::Extracting),
            "cleaning" => Some(RunState::Cleaning),
            "publishing" => Some(RunState::Publishing),
            "succeeded" => Some(RunState::Succeeded),
            "failed" => Some(RunState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }

    /// The state that follows this one when the current stage succeeds.
    pub fn next(&self) -> Option<Self> {
        match self {
            RunState::Pending => Some(RunState::Ingesting),
            RunState::Ingesting => Some(RunState::Extracting),
            RunState::Extracting => Some(RunState::Cleaning),
            RunState::Cleaning => Some(RunState::Publishing),
            RunState::Publishing => Some(RunState::Succeeded),
            RunState::Succeeded | RunState::Failed => None,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure classes a run can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Database or search endpoint unreachable.
    Connection,
    /// Malformed CSV, missing column or table.
    DataFormat,
    /// File missing or unwritable.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::DataFormat => "data_format",
            ErrorKind::Io => "io",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "connection" => Some(ErrorKind::Connection),
            "data_format" => Some(ErrorKind::DataFormat),
            "io" => Some(ErrorKind::Io),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row counts observed at each stage of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub ingested: Option<i64>,
    pub extracted: Option<i64>,
    pub cleaned: Option<i64>,
    pub published: Option<i64>,
}

impl StageCounts {
    pub fn record(&mut self, stage: Stage, rows: i64) {
        match stage {
            Stage::Ingest => self.ingested = Some(rows),
            Stage::Extract => self.extracted = Some(rows),
            Stage::Clean => self.cleaned = Some(rows),
            Stage::Publish => self.published = Some(rows),
        }
    }

    pub fn get(&self, stage: Stage) -> Option<i64> {
        match stage {
            Stage::Ingest => self.ingested,
            Stage::Extract => self.extracted,
            Stage::Clean => self.cleaned,
            Stage::Publish => self.published,
        }
    }
}

/// One execution attempt of the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub workflow: String,
    pub attempt: i32,
    pub state: RunState,
    pub failed_stage: Option<Stage>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub counts: StageCounts,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(workflow: impl Into<String>, attempt: i32) -> Self {
        Self {
            id: new_id(),
            workflow: workflow.into(),
            attempt,
            state: RunState::Pending,
            failed_stage: None,
            error: None,
            error_kind: None,
            counts: StageCounts::default(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Advance to the next state after the current one succeeded.
    pub fn advance(&mut self) -> Option<RunState> {
        let next = self.state.next()?;
        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Some(next)
    }

    /// Start a pending run at `stage`, skipping the stages before it.
    pub fn resume_at(&mut self, stage: Stage) -> Option<RunState> {
        if self.state != RunState::Pending {
            return None;
        }
        self.state = stage.running_state();
        Some(self.state)
    }

    /// Move straight to Failed, recording which stage broke and why.
    pub fn fail(&mut self, stage: Stage, kind: ErrorKind, error: impl Into<String>) {
        self.state = RunState::Failed;
        self.failed_stage = Some(stage);
        self.error_kind = Some(kind);
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_states() {
        let mut run = PipelineRun::new("daily", 1);
        for stage in Stage::ALL {
            assert_eq!(run.advance(), Some(stage.running_state()));
        }
        assert_eq!(run.advance(), Some(RunState::Succeeded));
        assert!(run.finished_at.is_some());
        assert_eq!(run.advance(), None);
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut run = PipelineRun::new("daily", 1);
        run.advance();
        run.fail(Stage::Ingest, ErrorKind::Io, "missing file");

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.failed_stage, Some(Stage::Ingest));
        assert!(run.state.is_terminal());
        assert_eq!(run.advance(), None);
    }

    #[test]
    fn test_resume_at_only_from_pending() {
        let mut run = PipelineRun::new("daily", 2);
        assert_eq!(run.resume_at(Stage::Clean), Some(RunState::Cleaning));
        assert_eq!(run.resume_at(Stage::Ingest), None);
        assert_eq!(run.advance(), Some(RunState::Publishing));
    }

    #[test]
    fn test_stage_from_str() {
        assert_eq!(Stage::from_str("Publish"), Some(Stage::Publish));
        assert_eq!(Stage::from_str("load"), None);
        assert_eq!(RunState::from_str("cleaning"), Some(RunState::Cleaning));
        assert_eq!(ErrorKind::from_str("data_format"), Some(ErrorKind::DataFormat));
    }

    #[test]
    fn test_stage_counts() {
        let mut counts = StageCounts::default();
        counts.record(Stage::Clean, 8);
        assert_eq!(counts.get(Stage::Clean), Some(8));
        assert_eq!(counts.get(Stage::Publish), None);
    }
}
