//! sheet2sql: spreadsheet rows to SQL scripts
//!
//! # Usage
//!
//! ```bash
//! # Convert rows exported as JSON, using the built-in cadastro table
//! sheet2sql convert clientes.json
//!
//! # With a schema, only PostgreSQL and SQLite, filling defaults
//! sheet2sql convert clientes.json --schema clientes.sql -d pg -d sqlite --fill-defaults
//!
//! # Inspect a schema
//! sheet2sql schema clientes.sql
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::{json, Value};
use sheet2sql::config::Config;
use sheet2sql::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheet2sql")]
#[command(version)]
#[command(
    about = "Convert spreadsheet rows into MySQL, PostgreSQL, SQLite and SQL Server scripts",
    long_about = None
)]
#[command(after_help = "EXAMPLES:
    sheet2sql convert clientes.json
    sheet2sql convert clientes.json --schema clientes.sql -d mysql -d sqlserver
    sheet2sql schema clientes.sql --json
    sheet2sql dialects")]
struct Cli {
    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a JSON row file into one SQL script per dialect
    Convert(ConvertArgs),
    /// Parse a CREATE TABLE file and show the resulting schema
    Schema {
        /// DDL file (the built-in cadastro table when omitted)
        file: Option<PathBuf>,

        /// Print the schema as JSON
        #[arg(long)]
        json: bool,
    },
    /// List supported dialects
    Dialects,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// JSON file: an array of arrays, or an array of objects keyed by column
    rows: PathBuf,

    /// CREATE TABLE file (the built-in cadastro table when omitted)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Target dialect, repeatable (default: all)
    #[arg(short, long = "dialect")]
    dialects: Vec<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows per INSERT statement
    #[arg(long)]
    batch_size: Option<usize>,

    /// Replace NULLs with column defaults before validating
    #[arg(long)]
    fill_defaults: bool,

    /// Exit with an error when any validation issue is found
    #[arg(long)]
    strict: bool,

    /// Parallel workers for cleaning and validation
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Don't write files, just report
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Configuration file
    #[arg(long, env = "SHEET2SQL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Convert(args) => convert(args).await,
        Commands::Schema { file, json } => show_schema(file.as_deref(), *json),
        Commands::Dialects => {
            show_dialects();
            Ok(true)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "sheet2sql=debug" } else { "sheet2sql=warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `false` when the run should exit with a failure status.
async fn convert(args: &ConvertArgs) -> Result<bool> {
    let mut settings = Config::load(args.config.as_deref())?.convert;
    if !args.dialects.is_empty() {
        settings.dialects = args.dialects.clone();
    }
    if let Some(n) = args.batch_size {
        settings.batch_size = n;
    }
    if args.fill_defaults {
        settings.null_policy = NullPolicy::ApplyDefaults;
    }
    if args.strict {
        settings.strict = true;
    }
    if let Some(jobs) = args.jobs {
        settings.jobs = jobs;
    }
    if let Some(dir) = &args.output {
        settings.output_dir = dir.clone();
    }
    let options = settings.to_options()?;

    let ddl = match &args.schema {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading schema {}", path.display()))?,
        ),
        None => None,
    };
    let converter = Converter::from_ddl(ddl.as_deref(), options)?;
    let rows = load_rows(&args.rows, converter.schema())?;

    let conversion = if settings.jobs > 1 {
        converter.run_concurrent(rows, settings.jobs).await?
    } else {
        converter.run(&rows)?
    };

    let mut written = Vec::new();
    if !args.dry_run {
        fs::create_dir_all(&settings.output_dir)
            .with_context(|| format!("creating {}", settings.output_dir.display()))?;
        let stem = args
            .rows
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| converter.schema().table_name().to_string());
        let source = args.rows.display().to_string();

        for generated in conversion.generated() {
            let path = settings
                .output_dir
                .join(format!("{}_{}.sql", stem, generated.dialect.slug()));
            fs::write(&path, generated.to_script(Some(&source)))
                .with_context(|| format!("writing {}", path.display()))?;
            written.push((generated.dialect, path));
        }
    }

    match args.format {
        OutputFormat::Json => print_json(&conversion, &written)?,
        OutputFormat::Table => print_table(&conversion, &written),
    }

    let failed = conversion.failures().next().is_some();
    let strict_failure = settings.strict && !conversion.report.is_clean();
    Ok(!failed && !strict_failure)
}

/// Read rows from JSON, mapping object keys to schema positions by name or
/// common header variant.
fn load_rows(path: &Path, schema: &Schema) -> Result<Vec<Record>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading rows {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing JSON in {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{}: expected a JSON array of rows", path.display());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Array(_) => serde_json::from_value::<Record>(item)
                .with_context(|| format!("row {}: unsupported cell value", i)),
            Value::Object(map) => {
                let (keys, values): (Vec<String>, Vec<Value>) = map.into_iter().unzip();
                let positions = schema.match_headers(&keys);
                let mut cells = vec![CellValue::Null; schema.len()];
                let mut extra = Vec::new();
                for ((key, value), position) in keys.iter().zip(values).zip(positions) {
                    let cell: CellValue = serde_json::from_value(value).with_context(|| {
                        format!("row {}, key '{}': unsupported cell value", i, key)
                    })?;
                    match position {
                        Some(pos) => cells[pos] = cell,
                        None => extra.push(cell),
                    }
                }
                cells.extend(extra);
                Ok(Record::new(cells))
            }
            other => bail!("row {}: expected an array or object, got {}", i, other),
        })
        .collect()
}

fn print_table(conversion: &Conversion, written: &[(Dialect, PathBuf)]) {
    let report = &conversion.report;
    let summary = report.summary();

    println!("{}", "Validation".cyan().bold());
    println!(
        "  Rows: {} ({} valid, {} blocked)",
        summary.total_rows,
        summary.valid_rows.to_string().green(),
        summary.blocked_rows.to_string().red()
    );
    if report.is_clean() {
        println!("  {}", "No issues".green());
    } else {
        println!(
            "  Issues: {} errors, {} warnings",
            summary.errors.to_string().red(),
            summary.warnings.to_string().yellow()
        );
        for issue in report.issues() {
            let label = match issue.severity {
                Severity::Error => issue.kind.to_string().red(),
                Severity::Warning => issue.kind.to_string().yellow(),
            };
            println!(
                "    row {:>5}  {:<16} {} {}",
                issue.row_index,
                issue.column_name,
                label,
                issue.message.dimmed()
            );
        }
    }

    println!();
    println!("{}", "Output".cyan().bold());
    for (dialect, result) in &conversion.outputs {
        match result {
            Ok(generated) => {
                let target = written
                    .iter()
                    .find(|(d, _)| d == dialect)
                    .map(|(_, p)| p.display().to_string())
                    .unwrap_or_else(|| "(dry run)".dimmed().to_string());
                println!(
                    "  {} {:<11} {} rows, {} statements → {}",
                    "✓".green(),
                    dialect.to_string(),
                    generated.row_count,
                    generated.inserts.len() + 1,
                    target
                );
            }
            Err(e) => println!("  {} {:<11} {}", "✗".red(), dialect.to_string(), e),
        }
    }
}

fn print_json(conversion: &Conversion, written: &[(Dialect, PathBuf)]) -> Result<()> {
    let outputs: Vec<Value> = conversion
        .outputs
        .iter()
        .map(|(dialect, result)| match result {
            Ok(generated) => json!({
                "dialect": dialect,
                "rows": generated.row_count,
                "skipped_rows": generated.skipped_rows,
                "file": written
                    .iter()
                    .find(|(d, _)| d == dialect)
                    .map(|(_, p)| p.display().to_string()),
            }),
            Err(e) => json!({ "dialect": dialect, "error": e.to_string() }),
        })
        .collect();

    let doc = json!({
        "summary": conversion.report.summary(),
        "issues": conversion.report.issues(),
        "outputs": outputs,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn show_schema(file: Option<&Path>, as_json: bool) -> Result<bool> {
    let schema = match file {
        Some(path) => {
            let ddl = fs::read_to_string(path)
                .with_context(|| format!("reading schema {}", path.display()))?;
            sheet2sql::parse(&ddl)?
        }
        None => default_schema().clone(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("{}", schema.summary());
    }
    Ok(true)
}

fn show_dialects() {
    println!("{}", "Supported dialects".cyan().bold());
    for dialect in Dialect::ALL {
        println!(
            "  {:<11} {:<11} {}",
            dialect.to_string().bold(),
            dialect.slug().yellow(),
            dialect.generator().connection_url_template().dimmed()
        );
    }
}
