//! Persists collected records as semicolon-delimited tables plus one JSON
//! blob of run-level metadata. Purely mechanical: rows in, files out, with
//! the caller-supplied run tag appended to every row.

use crate::artifacts::records::{RecordKind, TableRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DELIMITER: char = ';';

/// Run-level timing marks, epoch seconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StepTimes {
    pub run_start: f64,
    pub execution_end: f64,
    pub postprocessing_end: f64,
}

/// Run-level metadata persisted alongside the tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub tag: String,
    pub nodes: usize,
    pub plan_commands: usize,
    pub commands_failed: usize,
    pub nodes_failed: usize,
    pub step_times: StepTimes,
}

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    out_dir: PathBuf,
    tag: String,
}

impl ArtifactWriter {
    /// `tag` is threaded in by the caller and appended as the last column of
    /// every row, so tables from different runs can be concatenated.
    pub fn new(out_dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            tag: tag.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Writes one table for `kind`, header first, tag column last.
    pub fn write<R: TableRecord>(&self, kind: RecordKind, records: &[R]) -> Result<PathBuf> {
        let path = self.out_dir.join(format!("{}.csv", kind.file_stem()));
        let mut contents = String::new();

        let mut header: Vec<&str> = R::header().to_vec();
        header.push("tag");
        push_row(&mut contents, header.iter().map(|s| s.to_string()));

        for record in records {
            let mut fields = record.fields();
            fields.push(self.tag.clone());
            push_row(&mut contents, fields.into_iter());
        }

        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Writes the run-info JSON blob.
    pub fn write_run_info(&self, info: &RunInfo) -> Result<PathBuf> {
        let path = self.out_dir.join("general_infos.json");
        let mut contents =
            serde_json::to_string(info).context("failed to serialize run info")?;
        contents.push('\n');
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

fn push_row(contents: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            contents.push(DELIMITER);
        }
        first = false;
        contents.push_str(&escape(&field));
    }
    contents.push('\n');
}

/// Minimal CSV quoting: fields containing the delimiter, quotes, or
/// newlines are wrapped in double quotes with inner quotes doubled.
fn escape(field: &str) -> String {
    if field.contains(DELIMITER) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
