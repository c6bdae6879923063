//! Conversion engine.
//!
//! Sequences clean → validate → generate for a record set against one
//! schema, for every requested dialect. Rows may be cleaned and validated on
//! the blocking thread pool; results are always reassembled in input order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cleaner::clean;
use crate::error::{ConvertError, ConvertResult, GenerationError, ValidationError};
use crate::parser;
use crate::schema::{default_schema, Schema};
use crate::transpiler::{self, Dialect, GenerateOptions, GeneratedSql, DEFAULT_BATCH_SIZE};
use crate::validator::{apply_defaults, ValidationReport, Validator};
use crate::value::{CleanedRecord, Record};

/// What to do with a Null in a column that has a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Report it as `NullNotAllowed` when the column is NOT NULL.
    #[default]
    Strict,
    /// Substitute the column default before validation.
    ApplyDefaults,
}

/// Options for a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub dialects: Vec<Dialect>,
    pub batch_size: usize,
    pub null_policy: NullPolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            dialects: Dialect::ALL.to_vec(),
            batch_size: DEFAULT_BATCH_SIZE,
            null_policy: NullPolicy::default(),
        }
    }
}

/// Result of a run: cleaned rows, the report, and SQL per dialect.
///
/// A dialect whose generation failed keeps its error; the others are unaffected.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub records: Vec<CleanedRecord>,
    pub report: ValidationReport,
    pub outputs: BTreeMap<Dialect, Result<GeneratedSql, GenerationError>>,
}

impl Conversion {
    /// Successfully generated dialects.
    pub fn generated(&self) -> impl Iterator<Item = &GeneratedSql> {
        self.outputs.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn output(&self, dialect: Dialect) -> Option<&GeneratedSql> {
        self.outputs.get(&dialect).and_then(|r| r.as_ref().ok())
    }

    /// Dialects whose generation failed.
    pub fn failures(&self) -> impl Iterator<Item = (Dialect, &GenerationError)> {
        self.outputs
            .iter()
            .filter_map(|(d, r)| r.as_ref().err().map(|e| (*d, e)))
    }
}

/// Runs conversions against one schema.
#[derive(Debug, Clone)]
pub struct Converter {
    schema: Arc<Schema>,
    options: ConvertOptions,
}

impl Converter {
    pub fn new(schema: Schema, options: ConvertOptions) -> Self {
        Self {
            schema: Arc::new(schema),
            options,
        }
    }

    /// Use the built-in `cadastro` table.
    pub fn with_default_schema(options: ConvertOptions) -> Self {
        Self::new(default_schema().clone(), options)
    }

    /// Parse `ddl` if given, otherwise use the built-in table.
    pub fn from_ddl(ddl: Option<&str>, options: ConvertOptions) -> ConvertResult<Self> {
        match ddl {
            Some(text) => Ok(Self::new(parser::parse(text)?, options)),
            None => Ok(Self::with_default_schema(options)),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Clean one record, then fill defaults if the policy asks for it.
    pub fn prepare(&self, record: &Record) -> CleanedRecord {
        prepare_record(record, &self.schema, self.options.null_policy)
    }

    /// Run the whole pipeline on the current thread.
    pub fn run(&self, records: &[Record]) -> ConvertResult<Conversion> {
        if records.is_empty() {
            return Err(ValidationError::NoRecords.into());
        }
        debug!(rows = records.len(), table = self.schema.table_name(), "cleaning records");

        let cleaned: Vec<CleanedRecord> = records.iter().map(|r| self.prepare(r)).collect();
        let report = Validator::new(&self.schema).validate(&cleaned)?;

        let options = self.generate_options();
        let outputs = self
            .options
            .dialects
            .iter()
            .map(|&dialect| {
                let out = transpiler::generate(&self.schema, &cleaned, &report, dialect, &options);
                (dialect, out)
            })
            .collect();

        Ok(self.finish(cleaned, report, outputs))
    }

    /// Run the pipeline with cleaning and validation split across `jobs`
    /// blocking tasks, then one generation task per dialect.
    ///
    /// Output order matches input order regardless of which task finishes first.
    pub async fn run_concurrent(
        &self,
        records: Vec<Record>,
        jobs: usize,
    ) -> ConvertResult<Conversion> {
        if records.is_empty() {
            return Err(ValidationError::NoRecords.into());
        }
        if self.schema.is_empty() {
            return Err(ValidationError::EmptySchema.into());
        }

        let chunk_size = records.len().div_ceil(jobs.max(1));
        debug!(rows = records.len(), jobs, chunk_size, "spawning workers");

        let mut handles = Vec::new();
        let mut offset = 0;
        let mut rest = records;
        while !rest.is_empty() {
            let tail = rest.split_off(chunk_size.min(rest.len()));
            let chunk = std::mem::replace(&mut rest, tail);
            let schema = Arc::clone(&self.schema);
            let policy = self.options.null_policy;
            let start = offset;
            offset += chunk.len();

            handles.push(tokio::task::spawn_blocking(move || {
                let cleaned: Vec<CleanedRecord> = chunk
                    .iter()
                    .map(|r| prepare_record(r, &schema, policy))
                    .collect();
                let report = Validator::new(&schema).check_rows(start, &cleaned);
                (cleaned, report)
            }));
        }

        let mut cleaned = Vec::with_capacity(offset);
        let mut report = ValidationReport::default();
        for handle in handles {
            let (chunk, chunk_report) = handle
                .await
                .map_err(|e| ConvertError::Worker(e.to_string()))?;
            cleaned.extend(chunk);
            report.merge(chunk_report);
        }

        let cleaned = Arc::new(cleaned);
        let report = Arc::new(report);
        let options = self.generate_options();
        let mut generators = Vec::new();
        for &dialect in &self.options.dialects {
            let schema = Arc::clone(&self.schema);
            let cleaned = Arc::clone(&cleaned);
            let report = Arc::clone(&report);
            generators.push((
                dialect,
                tokio::task::spawn_blocking(move || {
                    transpiler::generate(&schema, &cleaned, &report, dialect, &options)
                }),
            ));
        }

        let mut outputs = BTreeMap::new();
        for (dialect, handle) in generators {
            let out = handle
                .await
                .map_err(|e| ConvertError::Worker(e.to_string()))?;
            outputs.insert(dialect, out);
        }

        let cleaned = Arc::try_unwrap(cleaned).unwrap_or_else(|shared| (*shared).clone());
        let report = Arc::try_unwrap(report).unwrap_or_else(|shared| (*shared).clone());
        Ok(self.finish(cleaned, report, outputs))
    }

    fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            batch_size: self.options.batch_size,
        }
    }

    fn finish(
        &self,
        records: Vec<CleanedRecord>,
        report: ValidationReport,
        outputs: BTreeMap<Dialect, Result<GeneratedSql, GenerationError>>,
    ) -> Conversion {
        let summary = report.summary();
        info!(
            table = self.schema.table_name(),
            rows = summary.total_rows,
            valid = summary.valid_rows,
            issues = report.issues().len(),
            dialects = outputs.len(),
            "conversion finished"
        );
        Conversion {
            records,
            report,
            outputs,
        }
    }
}

fn prepare_record(record: &Record, schema: &Schema, policy: NullPolicy) -> CleanedRecord {
    let cleaned = clean(record, schema);
    match policy {
        NullPolicy::Strict => cleaned,
        NullPolicy::ApplyDefaults => apply_defaults(&cleaned, schema),
    }
}
