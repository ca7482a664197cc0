//! Normalization of the extracted table.
//!
//! Rules run in a fixed order over the whole table: assign ids, drop rows
//! with missing values, drop duplicates, normalize column names, drop the
//! junk column, and renumber ids over the surviving rows.

use super::read_artifact;
use crate::error::{PipelineError, PipelineResult};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tablepipe_config::CleanConfig;
use tablepipe_core::{Table, Value};
use tracing::{debug, info};

/// Rules for the clean stage.
#[derive(Debug, Clone)]
pub struct CleanRules {
    /// Name of the sequential identifier column placed first.
    pub id_column: String,
    /// Column removed after renaming. `None` skips the step.
    pub junk_column: Option<String>,
    /// Remove characters other than word characters and whitespace from names.
    pub strip_non_word: bool,
    /// Renumber ids 1..M after rows are dropped.
    pub renumber_ids: bool,
}

impl Default for CleanRules {
    fn default() -> Self {
        Self::from_config(&CleanConfig::default())
    }
}

impl CleanRules {
    /// Create rules from clean settings. An empty junk column disables the drop.
    pub fn from_config(config: &CleanConfig) -> Self {
        let junk = config.junk_column.trim();
        Self {
            id_column: config.id_column.clone(),
            junk_column: (!junk.is_empty()).then(|| junk.to_string()),
            strip_non_word: config.strip_non_word,
            renumber_ids: config.renumber_ids,
        }
    }
}

/// What the clean stage did to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub missing_dropped: usize,
    pub duplicates_dropped: usize,
    pub output_rows: usize,
    pub columns: Vec<String>,
}

/// Normalize a column name: lowercase, spaces to underscores, optionally
/// strip non-word characters, then trim.
pub fn normalize_column_name(name: &str, strip_non_word: bool) -> String {
    static NON_WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

    let name = name.to_lowercase().replace(' ', "_");
    if strip_non_word {
        NON_WORD.replace_all(&name, "").trim().to_string()
    } else {
        name.trim().to_string()
    }
}

fn sequence(len: usize) -> Vec<Value> {
    (1..=len as i64).map(Value::Integer).collect()
}

/// Apply every rule to `table`.
pub fn clean_table(mut table: Table, rules: &CleanRules) -> PipelineResult<(Table, CleanReport)> {
    let input_rows = table.len();

    let ids = sequence(table.len());
    match table.column_index(&rules.id_column) {
        Some(index) => table.set_column(index, ids)?,
        None => table.insert_column(0, rules.id_column.clone(), ids)?,
    }
    table.move_column_to_front(&rules.id_column)?;

    let missing_dropped = table.drop_missing();
    debug!("Dropped {} rows with missing values", missing_dropped);

    // Ids are unique per row, so they never take part in the comparison
    let duplicates_dropped = table.drop_duplicates(Some(0));
    debug!("Dropped {} duplicate rows", duplicates_dropped);

    table.rename_columns(|name| normalize_column_name(name, rules.strip_non_word));

    if let Some(junk) = &rules.junk_column {
        table.remove_column(junk).map_err(|e| match e {
            tablepipe_core::Error::MissingColumn(column) => PipelineError::MissingColumn { column },
            other => other.into(),
        })?;
    }

    if rules.renumber_ids {
        table.set_column(0, sequence(table.len()))?;
    }

    let report = CleanReport {
        input_rows,
        missing_dropped,
        duplicates_dropped,
        output_rows: table.len(),
        columns: table.headers().to_vec(),
    };
    Ok((table, report))
}

/// Clean the CSV at `input` and write the result to `output`.
pub fn clean(input: &Path, output: &Path, rules: &CleanRules) -> PipelineResult<CleanReport> {
    info!("Cleaning {} into {}", input.display(), output.display());

    let table = read_artifact(input)?;
    let (table, report) = clean_table(table, rules)?;
    table.write_csv(output)?;

    info!(
        "Clean complete: {} -> {} rows ({} missing, {} duplicates)",
        report.input_rows, report.output_rows, report.missing_dropped, report.duplicates_dropped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablepipe_core::ErrorKind;
    use tempfile::TempDir;

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn dropping(junk: &str) -> CleanRules {
        CleanRules {
            junk_column: Some(junk.to_string()),
            ..CleanRules::default()
        }
    }

    fn ids(table: &Table) -> Vec<i64> {
        table.column(0).filter_map(Value::as_i64).collect()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Unnamed: 12", true), "unnamed_12");
        assert_eq!(normalize_column_name("First Name", true), "first_name");
        assert_eq!(normalize_column_name(" Price ($) ", true), "_price__");
        assert_eq!(normalize_column_name("\tRate %\t", true), "rate_");
        assert_eq!(normalize_column_name("Rate %", false), "rate_%");
        assert_eq!(normalize_column_name("Straße", true), "straße");
        assert_eq!(
            normalize_column_name("Cafe\u{301} Name", true),
            "cafe\u{301}_name"
        );
        assert_eq!(normalize_column_name("a\u{203F}b", true), "a\u{203F}b");
    }

    #[test]
    fn test_clean_rules_in_order() {
        let input = table(
            "Name,Score,\n\
             ann,1,x\n\
             bob,,x\n\
             ann,1,x\n\
             cy,3,x\n",
        );

        let (out, report) = clean_table(input, &dropping("unnamed_2")).unwrap();

        assert_eq!(out.headers(), ["id", "name", "score"]);
        assert_eq!(ids(&out), vec![1, 2]);
        assert_eq!(report.missing_dropped, 1);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.output_rows, 2);
    }

    #[test]
    fn test_existing_id_column_is_replaced_and_moved_first() {
        let input = table("name,id,\nann,70,x\nbob,12,x\n");

        let (out, _) = clean_table(input, &dropping("unnamed_2")).unwrap();

        assert_eq!(out.headers()[0], "id");
        assert_eq!(out.width(), 2);
        assert_eq!(ids(&out), vec![1, 2]);
    }

    #[test]
    fn test_without_renumbering_ids_keep_gaps() {
        let input = table("name,\nann,x\n,x\ncy,x\n");
        let rules = CleanRules {
            renumber_ids: false,
            ..dropping("unnamed_1")
        };

        let (out, _) = clean_table(input, &rules).unwrap();
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn test_missing_junk_column_fails() {
        let input = table("name,score\nann,1\n");

        let err = clean_table(input, &CleanRules::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column } if column == "unnamed_12"));
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn test_output_column_names_are_normalized() {
        let input = table("First Name,Total (USD),  Notes!  ,\nann,1,a,x\n");
        let (out, _) = clean_table(input, &dropping("unnamed_3")).unwrap();
        for name in out.headers() {
            assert_eq!(name, &name.to_lowercase());
            assert!(!name.contains(' '));
            assert!(name.chars().all(|c| c.is_alphanumeric() || c == '_'));
            assert_eq!(name, name.trim());
        }
    }

    #[test]
    fn test_clean_is_stable_on_clean_data() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("data_clean.csv");
        let second = dir.path().join("data_clean_again.csv");
        std::fs::write(&first, "id,name,score\n1,ann,1\n2,bob,2\n3,cy,3\n").unwrap();

        let rules = CleanRules {
            junk_column: None,
            ..CleanRules::default()
        };
        let report = clean(&first, &second, &rules).unwrap();

        assert_eq!(report.input_rows, report.output_rows);
        assert_eq!(
            Table::read_csv(&first).unwrap(),
            Table::read_csv(&second).unwrap()
        );
    }

    #[test]
    fn test_from_config_empty_junk_disables_drop() {
        let config = CleanConfig {
            junk_column: " ".into(),
            ..CleanConfig::default()
        };
        assert_eq!(CleanRules::from_config(&config).junk_column, None);
    }
}
