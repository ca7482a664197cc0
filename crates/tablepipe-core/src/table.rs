//! In-memory table model and its CSV codec.
//!
//! A [`Table`] is the whole dataset a stage works on: an ordered header plus
//! rows of [`Value`] cells. Reading a CSV infers one kind per column, the same
//! way the values later become SQL column types.

use crate::error::{Error, Result};
use crate::types::ColumnKind;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Field contents that are read as a missing value.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// CSV field representation. Missing values become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            // Debug keeps the trailing ".0" on whole floats
            Value::Real(f) => format!("{:?}", f),
            Value::Text(s) => s.clone(),
        }
    }

    /// JSON representation used for search documents.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn is_missing_token(field: &str) -> bool {
        MISSING_TOKENS.contains(&field)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(i) => i.hash(state),
            Value::Real(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_field())
    }
}

/// A whole dataset held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Create a table from a header and rows, checking every row's width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::RaggedRow {
                row: self.rows.len() + 1,
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate over the values of one column.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Kind of a column, derived from the values it holds.
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        let mut kind: Option<ColumnKind> = None;
        for value in self.column(index) {
            let cell = match value {
                Value::Null => continue,
                Value::Integer(_) => ColumnKind::Integer,
                Value::Real(_) => ColumnKind::Real,
                Value::Text(_) => return ColumnKind::Text,
            };
            kind = Some(match (kind, cell) {
                (Some(ColumnKind::Real), _) | (_, ColumnKind::Real) => ColumnKind::Real,
                _ => cell,
            });
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.width()).map(|i| self.column_kind(i)).collect()
    }

    /// Insert a column at `position`. `values` must have one entry per row.
    pub fn insert_column(
        &mut self,
        position: usize,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::InvalidInput(format!(
                "column has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        let position = position.min(self.headers.len());
        self.headers.insert(position, name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(position, value);
        }
        Ok(())
    }

    /// Replace every value of an existing column.
    pub fn set_column(&mut self, index: usize, values: Vec<Value>) -> Result<()> {
        if index >= self.headers.len() || values.len() != self.rows.len() {
            return Err(Error::InvalidInput(format!(
                "cannot set column {} with {} values",
                index,
                values.len()
            )));
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        Ok(())
    }

    /// Move a named column to the first position.
    pub fn move_column_to_front(&mut self, name: &str) -> Result<()> {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        let header = self.headers.remove(index);
        self.headers.insert(0, header);
        for row in &mut self.rows {
            let value = row.remove(index);
            row.insert(0, value);
        }
        Ok(())
    }

    /// Remove a named column. Fails if the column is absent.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        let index = self
            .column_index(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        self.headers.remove(index);
        for row in &mut self.rows {
            row.remove(index);
        }
        Ok(())
    }

    /// Rewrite every column name.
    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> String,
    {
        for header in &mut self.headers {
            *header = rename(header);
        }
    }

    /// Keep only the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Drop every row that holds at least one missing value.
    pub fn drop_missing(&mut self) -> usize {
        let before = self.rows.len();
        self.retain_rows(|row| !row.iter().any(Value::is_null));
        before - self.rows.len()
    }

    /// Drop rows equal to an earlier row, comparing every column except `ignore`.
    pub fn drop_duplicates(&mut self, ignore: Option<usize>) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<Value>> = HashSet::new();
        self.retain_rows(|row| {
            let key: Vec<Value> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != ignore)
                .map(|(_, v)| v.clone())
                .collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }

    /// Read a CSV file with a header row.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading CSV: {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse CSV data with a header row, inferring a kind per column.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let raw_headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if raw_headers.is_empty() {
            return Err(Error::InvalidInput("CSV has no header row".to_string()));
        }
        let headers = dedupe_headers(&raw_headers);

        let mut fields: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            fields.push(record.iter().map(String::from).collect());
        }

        let kinds: Vec<ColumnKind> = (0..headers.len())
            .map(|i| infer_kind(fields.iter().map(|row| row[i].as_str())))
            .collect();

        let rows = fields
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&kinds)
                    .map(|(field, kind)| parse_field(field, *kind))
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// Write the table as CSV with a header row and no index column.
    ///
    /// The file is written next to its destination and renamed into place,
    /// so a failed write never leaves a partial file at `path`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", path.display())))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        let file = std::fs::File::create(&tmp)?;
        if let Err(e) = self.to_writer(file) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, path)?;

        debug!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().delimiter(b',').from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Value::to_field))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Convert one row into a flat JSON object keyed by column name.
    pub fn row_to_document(&self, index: usize) -> Option<serde_json::Map<String, serde_json::Value>> {
        let row = self.rows.get(index)?;
        Some(
            self.headers
                .iter()
                .zip(row)
                .map(|(h, v)| (h.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Name blank headers `Unnamed: <index>` and suffix repeats with `.1`, `.2`, ...
fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let named: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if h.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.clone()
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(named.len());

    for name in named {
        let mut candidate = name.clone();
        while taken.contains(&candidate) {
            let n = counts.entry(name.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", name, n);
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn infer_kind<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for field in fields {
        if Value::is_missing_token(field) {
            continue;
        }
        if field.parse::<i64>().is_ok() {
            kind.get_or_insert(ColumnKind::Integer);
        } else if field.parse::<f64>().is_ok() {
            kind = Some(ColumnKind::Real);
        } else {
            return ColumnKind::Text;
        }
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn parse_field(field: String, kind: ColumnKind) -> Value {
    if Value::is_missing_token(&field) {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => field
            .parse()
            .map(Value::Integer)
            .unwrap_or(Value::Text(field)),
        ColumnKind::Real => field
            .parse()
            .map(Value::Real)
            .unwrap_or(Value::Text(field)),
        ColumnKind::Text => Value::Text(field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(data: &str) -> Table {
        Table::from_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn test_infers_column_kinds() {
        let table = parse("a,b,c\n1,2.5,x\n2,3,y\n");
        assert_eq!(
            table.column_kinds(),
            vec![ColumnKind::Integer, ColumnKind::Real, ColumnKind::Text]
        );
        assert_eq!(table.rows()[1][1], Value::Real(3.0));
        assert_eq!(table.rows()[0][2], Value::Text("x".to_string()));
    }

    #[test]
    fn test_missing_tokens_become_null() {
        let table = parse("a,b\n1,\nNA,foo\n");
        assert!(table.rows()[0][1].is_null());
        assert!(table.rows()[1][0].is_null());
        assert_eq!(table.column_kind(0), ColumnKind::Integer);
    }

    #[test]
    fn test_blank_and_repeated_headers() {
        let table = parse("Name,,Name,Name\n1,2,3,4\n");
        assert_eq!(table.headers(), &["Name", "Unnamed: 1", "Name.1", "Name.2"]);
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let err = Table::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::RaggedRow { .. }));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(Table::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_read_keeps_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        let table = parse("id,score,name\n1,1.0,\"a, b\"\n2,,c\n");
        table.write_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("id,score,name\n1,1.0,\"a, b\"\n2,,c"));

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back, table);
        assert!(!dir.path().join(".out.csv.tmp").exists());
    }

    #[test]
    fn test_drop_missing_and_duplicates() {
        let mut table = parse("id,a,b\n1,x,1\n2,x,1\n3,,2\n4,y,2\n");
        assert_eq!(table.drop_missing(), 1);
        assert_eq!(table.drop_duplicates(Some(0)), 1);
        let ids: Vec<_> = table.column(0).filter_map(Value::as_i64).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_duplicates_consider_every_column_without_ignore() {
        let mut table = parse("id,a\n1,x\n2,x\n");
        assert_eq!(table.drop_duplicates(None), 0);
    }

    #[test]
    fn test_column_moves() {
        let mut table = parse("a,b\n1,2\n");
        table
            .insert_column(2, "id", vec![Value::Integer(7)])
            .unwrap();
        table.move_column_to_front("id").unwrap();
        assert_eq!(table.headers(), &["id", "a", "b"]);
        assert_eq!(table.rows()[0][0], Value::Integer(7));

        table.remove_column("a").unwrap();
        assert_eq!(table.headers(), &["id", "b"]);
        assert!(matches!(
            table.remove_column("missing"),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn test_row_to_document() {
        let table = parse("id,name,score\n1,ann,2.5\n");
        let doc = table.row_to_document(0).unwrap();
        assert_eq!(doc["id"], serde_json::json!(1));
        assert_eq!(doc["name"], serde_json::json!("ann"));
        assert_eq!(doc["score"], serde_json::json!(2.5));
        assert!(table.row_to_document(1).is_none());
    }
}
