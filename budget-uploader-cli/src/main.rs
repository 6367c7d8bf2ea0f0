use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use budget_uploader_lib::{
    backend::{HttpBackend, StatementFile},
    config::Config,
    filter::{FilterState, MonthFilter, YearFilter},
    session::Session,
};
use clap::{Parser, Subcommand, ValueEnum};
use csv::Writer;
use serde::Serialize;
use slog::{debug, info, warn, Logger};
use sloggers::{
    terminal::TerminalLoggerBuilder,
    types::{Severity, SourceLocation},
    Build,
};

/// Upload bank statements and categorize their transactions
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file with the backend url and the category list
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend url, overrides the config file
    #[arg(long)]
    backend_url: Option<String>,
    /// Log level
    #[arg(long)]
    log_level: Option<Severity>,
    // Subcommands
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
#[command()]
enum Command {
    /// Upload a statement and output its categorized transactions
    #[command()]
    Upload {
        /// Statement to upload
        file: PathBuf,
        /// Month to show, "01" through "12" or "all"
        #[arg(long, default_value = "all")]
        month: MonthFilter,
        /// Year to show, four digits or "all"
        #[arg(long, default_value = "all")]
        year: YearFilter,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Save the category of a transaction description
    #[command()]
    Categorize {
        description: String,
        category: String,
    },
    /// Output the remembered categories yaml
    #[command()]
    Memory,
    /// Output the configured categories
    #[command()]
    Categories,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Yaml,
}

/// Flat csv record of a visible row
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    index: usize,
    date: String,
    description: &'a str,
    original_line: String,
    category: &'a str,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logger = TerminalLoggerBuilder::new()
        .level(args.log_level.unwrap_or_default())
        .source_location(SourceLocation::None)
        .build()?;

    let mut config = match &args.config {
        Some(path) => Config::from_yaml_file(path).context("failed to parse config")?,
        None => Config::default(),
    };
    if let Some(backend_url) = args.backend_url {
        config.backend_url = backend_url;
    }
    let backend = HttpBackend::new(&config.backend_url);
    debug!(logger, "using backend"; "url" => backend.base_url());

    let mut session = Session::new(config);
    let change_logger = logger.clone();
    session.subscribe(move |change, view| {
        debug!(change_logger, "session changed"; "change" => ?change, "visible" => view.rows.len())
    });
    session.load_memory(&backend).await;
    info!(logger, "loaded category memory"; "entries" => session.memory().len());

    match args.command {
        Command::Upload {
            file,
            month,
            year,
            format,
        } => upload(&logger, &mut session, &backend, file, FilterState::new(month, year), format)
            .await?,
        Command::Categorize {
            description,
            category,
        } => {
            session
                .change_category(&backend, &description, &category)
                .await
                .context("failed to save category")?;
            info!(logger, "saved category"; "description" => &description, "category" => &category);
        }
        Command::Memory => {
            println!("{}", serde_yaml::to_string(session.memory())?);
        }
        Command::Categories => {
            for category in &session.config().categories {
                println!("{category}");
            }
        }
    }
    Ok(())
}

async fn upload(
    logger: &Logger,
    session: &mut Session,
    backend: &HttpBackend,
    file: PathBuf,
    filter: FilterState,
    format: Format,
) -> Result<()> {
    let bytes = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "statement.pdf".into());
    session.select_file(Some(StatementFile::new(name, bytes)));
    session
        .upload_statement(backend)
        .await
        .context("failed to upload statement")?;
    session.set_filter(filter);

    let view = session.view();
    let summary = view.summary();
    info!(logger, "extracted transactions";
        "total" => session.transactions().len(),
        "visible" => summary.visible,
        "uncategorized" => summary.uncategorized);
    if summary.visible == 0 && !session.transactions().is_empty() {
        warn!(logger, "no transactions match the filter";
            "month" => %filter.month, "year" => %filter.year);
    }

    match format {
        Format::Table => println!("{}", view.to_table()),
        Format::Csv => {
            let mut writer = Writer::from_writer(io::stdout());
            for row in &view.rows {
                writer.serialize(CsvRow {
                    index: row.index,
                    date: row
                        .transaction
                        .date
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    description: &row.transaction.description,
                    original_line: row.transaction.original_line.to_string(),
                    category: &row.category,
                })?;
            }
            writer.flush()?;
        }
        Format::Yaml => println!("{}", serde_yaml::to_string(view)?),
    }
    Ok(())
}
