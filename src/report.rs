// ABOUTME: Per-run export accounting: counts plus recorded degradations
// ABOUTME: Emission is sorted by identity so aggregation order never shows

use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Notebook,
    Section,
    Page,
    Image,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Failure {
    pub scope: Scope,
    pub identity: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub notebooks: u64,
    pub sections: u64,
    pub pages: u64,
    pub images: u64,
    failures: Vec<Failure>,
}

impl ExportReport {
    pub fn new() -> Self {
        ExportReport::default()
    }

    pub fn record(&mut self, scope: Scope, identity: impl Into<String>, reason: impl ToString) {
        self.failures.push(Failure {
            scope,
            identity: identity.into(),
            reason: reason.to_string(),
        });
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failures sorted by identity then scope, independent of the order
    /// they were recorded in.
    pub fn failures(&self) -> Vec<Failure> {
        let mut sorted = self.failures.clone();
        sorted.sort_by(|a, b| a.identity.cmp(&b.identity).then(a.scope.cmp(&b.scope)));
        sorted
    }

    /// Write `export-report.json` under the output root.
    pub fn write_json(&self, output_root: &Path) -> Result<PathBuf> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            generated_at: DateTime<Utc>,
            notebooks: u64,
            sections: u64,
            pages: u64,
            images: u64,
            failures: &'a [Failure],
        }

        let failures = self.failures();
        let report = JsonReport {
            generated_at: Utc::now(),
            notebooks: self.notebooks,
            sections: self.sections,
            pages: self.pages,
            images: self.images,
            failures: &failures,
        };

        let path = output_root.join("export-report.json");
        fs::create_dir_all(output_root)?;
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        Ok(path)
    }
}
