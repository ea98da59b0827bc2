use anyhow::{bail, Context, Result};
use bib_ingest::config::{find_config_file, get_config, load_config, save_config, Config, LoggingConfig};
use bib_ingest::import::{import, ImportOptions};
use bib_ingest::models::{DraftRecord, DuplicateMatch, ImportFormat, ImportResult};
use bib_ingest::storage::MemoryStore;
use bib_ingest::utils::{
    export_bibtex, export_csv, export_json, format_citation, CitationStyle, DuplicateDetector,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// bib-ingest - Import bibliographies and find duplicates
#[derive(Parser, Debug)]
#[command(name = "bib-ingest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Import BibTeX, CSV and JSON bibliographies and detect duplicate records", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

/// Bibliography file format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Bibtex,
    Csv,
    Json,
}

impl From<FormatArg> for ImportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Bibtex => ImportFormat::Bibtex,
            FormatArg::Csv => ImportFormat::Csv,
            FormatArg::Json => ImportFormat::Json,
        }
    }
}

/// Citation style
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StyleArg {
    Ieee,
    Apa,
}

impl From<StyleArg> for CitationStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Ieee => CitationStyle::Ieee,
            StyleArg::Apa => CitationStyle::Apa,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a bibliography file and show the parsed records
    #[command(alias = "i")]
    Import {
        /// File to import
        file: PathBuf,

        /// Input format (default: from extension, config, then content)
        #[arg(long, short, value_enum)]
        format: Option<FormatArg>,
    },

    /// Import a file and check each record against an existing collection
    #[command(alias = "c")]
    Check {
        /// File to import
        file: PathBuf,

        /// Existing collection (JSON array of stored records)
        #[arg(long, short)]
        against: PathBuf,

        /// Input format
        #[arg(long, short, value_enum)]
        format: Option<FormatArg>,

        /// Record id to leave out of the comparison
        #[arg(long)]
        exclude: Option<Uuid>,
    },

    /// Look up a DOI in an existing collection
    LookupDoi {
        /// DOI, with or without a resolver prefix
        doi: String,

        /// Existing collection (JSON array of stored records)
        #[arg(long, short)]
        against: PathBuf,
    },

    /// Convert a bibliography file to another format
    Convert {
        /// File to convert
        file: PathBuf,

        /// Target format
        #[arg(long, value_enum)]
        to: FormatArg,

        /// Input format
        #[arg(long, short, value_enum)]
        format: Option<FormatArg>,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print formatted citations for every record in a file
    Cite {
        /// File to read
        file: PathBuf,

        /// Citation style
        #[arg(long, short, value_enum, default_value_t = StyleArg::Ieee)]
        style: StyleArg,

        /// Input format
        #[arg(long, short, value_enum)]
        format: Option<FormatArg>,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Where to write the file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Duplicate matches for one imported record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    title: String,
    matches: Vec<DuplicateMatch>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config().context("Failed to read configuration from environment")?,
    };

    init_logging(&cli, &config.logging);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let options = ImportOptions::from(&config.import);

    match cli.command {
        Some(Commands::Import { file, format }) => {
            let result = import_file(&file, format, &config, &options).await?;
            output_import(&result, cli.output)?;
            if let Some(message) = result.failure_message() {
                bail!("{}", message);
            }
        }

        Some(Commands::Check {
            file,
            against,
            format,
            exclude,
        }) => {
            let result = import_file(&file, format, &config, &options).await?;
            if let Some(message) = result.failure_message() {
                bail!("{}", message);
            }

            let store = load_corpus(&against).await?;
            let detector = DuplicateDetector::new(config.duplicates.clone());

            let mut reports = Vec::with_capacity(result.records.len());
            for record in &result.records {
                let matches = detector.find_duplicates_in(&store, record, exclude).await?;
                reports.push(CheckReport {
                    title: record.title.clone(),
                    matches,
                });
            }
            output_reports(&reports, cli.output)?;
        }

        Some(Commands::LookupDoi { doi, against }) => {
            let store = load_corpus(&against).await?;
            let detector = DuplicateDetector::new(config.duplicates.clone());

            match detector.find_by_identifier_in(&store, &doi, None).await? {
                Some(found) => output_reports(
                    &[CheckReport {
                        title: doi,
                        matches: vec![found],
                    }],
                    cli.output,
                )?,
                None => {
                    if !cli.quiet {
                        eprintln!("No record with DOI {}", doi);
                    }
                }
            }
        }

        Some(Commands::Convert {
            file,
            to,
            format,
            out,
        }) => {
            let result = import_file(&file, format, &config, &options).await?;
            if let Some(message) = result.failure_message() {
                bail!("{}", message);
            }

            let converted = match ImportFormat::from(to) {
                ImportFormat::Bibtex => export_bibtex(&result.records),
                ImportFormat::Csv => export_csv(&result.records)?,
                ImportFormat::Json => export_json(&result.records)?,
            };

            match out {
                Some(path) => {
                    tokio::fs::write(&path, converted)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    if !cli.quiet {
                        eprintln!(
                            "Wrote {} records to {}",
                            result.imported_count,
                            path.display()
                        );
                    }
                }
                None => print!("{}", converted),
            }
        }

        Some(Commands::Cite {
            file,
            style,
            format,
        }) => {
            let result = import_file(&file, format, &config, &options).await?;
            if let Some(message) = result.failure_message() {
                bail!("{}", message);
            }

            let style = CitationStyle::from(style);
            for (i, record) in result.records.iter().enumerate() {
                println!("[{}] {}", i + 1, format_citation(record, style));
            }
        }

        Some(Commands::InitConfig { path, force }) => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            save_config(&Config::default(), &path)?;
            if !cli.quiet {
                println!("Wrote default configuration to {}", path.display());
            }
        }

        None => {
            // No command provided - show help
            println!("No command provided. Use --help for usage information.");
            println!("Common commands:");
            println!("  import <file>                     - Parse a bibliography file");
            println!("  check <file> --against <corpus>   - Find duplicates of imported records");
            println!("  lookup-doi <doi> --against <corpus> - Find a record by DOI");
            println!("  convert <file> --to <format>      - Convert between formats");
            println!("  cite <file>                       - Print formatted citations");
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = match cli.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let level = if cli.quiet { "error" } else { level };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bib_ingest={}", level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable
    if logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Pick the input format: flag, then extension, then config default, then content
fn resolve_format(
    path: &Path,
    flag: Option<FormatArg>,
    config: &Config,
    content: &str,
) -> ImportFormat {
    flag.map(ImportFormat::from)
        .or_else(|| ImportFormat::from_path(path))
        .or_else(|| {
            config
                .import
                .default_format
                .as_deref()
                .and_then(ImportFormat::from_name)
        })
        .unwrap_or_else(|| ImportFormat::detect(content))
}

async fn import_file(
    path: &Path,
    flag: Option<FormatArg>,
    config: &Config,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let format = resolve_format(path, flag, config, &content);
    tracing::debug!(path = %path.display(), format = %format, "Importing");
    Ok(import(&content, format, options))
}

async fn load_corpus(path: &Path) -> Result<MemoryStore> {
    MemoryStore::load_json(path)
        .await
        .with_context(|| format!("Failed to load collection from {}", path.display()))
}

fn actual_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

/// Shorten to at most `max` characters, marking the cut with "..."
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn record_row(record: &DraftRecord) -> Vec<String> {
    vec![
        truncate(&record.title, 50),
        truncate(&record.authors.join(", "), 30),
        record.kind.display_name().to_string(),
        record.year.map(|y| y.to_string()).unwrap_or_default(),
        record.doi.clone().unwrap_or_default(),
    ]
}

fn output_import(result: &ImportResult, format: OutputFormat) -> Result<()> {
    match actual_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Plain => {
            for record in &result.records {
                println!("{} - {} ({})", record.title, record.authors_display(), record.kind);
                if let Some(ref doi) = record.doi {
                    println!("  DOI: {}", doi);
                }
            }
            for error in &result.errors {
                println!("error: {}", error);
            }
            println!(
                "{} of {} imported, {} skipped",
                result.imported_count, result.total_records, result.skipped_count
            );
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Title", "Authors", "Type", "Year", "DOI"]);

            for record in &result.records {
                let mut cells = record_row(record).into_iter();
                let title = cells.next().unwrap_or_default();
                let mut row = vec![Cell::new(title).add_attribute(Attribute::Bold)];
                row.extend(cells.map(Cell::new));
                table.add_row(row);
            }
            println!("{table}");

            if !result.errors.is_empty() {
                let mut errors = Table::new();
                errors.load_preset(comfy_table::presets::UTF8_FULL);
                errors.set_header(vec!["Row", "Key", "Field", "Message"]);
                for error in &result.errors {
                    errors.add_row(vec![
                        error.row.to_string(),
                        error.key.clone().unwrap_or_default(),
                        error.field.clone(),
                        error.message.clone(),
                    ]);
                }
                println!("{errors}");
            }

            println!(
                "{} of {} imported, {} skipped",
                result.imported_count, result.total_records, result.skipped_count
            );
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

fn output_reports(reports: &[CheckReport], format: OutputFormat) -> Result<()> {
    match actual_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports)?);
        }
        OutputFormat::Plain => {
            for report in reports {
                println!("{}", report.title);
                if report.matches.is_empty() {
                    println!("  no duplicates");
                }
                for m in &report.matches {
                    println!(
                        "  {}% {} ({}) {}",
                        m.percent(),
                        m.reason,
                        m.candidate_record_id,
                        m.title
                    );
                }
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Record", "Possible duplicate", "Confidence", "Reason", "Id"]);

            for report in reports {
                let record = Cell::new(truncate(&report.title, 40)).add_attribute(Attribute::Bold);
                if report.matches.is_empty() {
                    table.add_row(vec![record, Cell::new("-"), Cell::new(""), Cell::new(""), Cell::new("")]);
                    continue;
                }
                for (i, m) in report.matches.iter().enumerate() {
                    let first = if i == 0 { record.clone() } else { Cell::new("") };
                    table.add_row(vec![
                        first,
                        Cell::new(truncate(&m.title, 40)),
                        Cell::new(format!("{}%", m.percent())),
                        Cell::new(m.reason.to_string()),
                        Cell::new(m.candidate_record_id.to_string()),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Auto => unreachable!(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["bib-ingest"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.config.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_and_quiet() {
        let cli = Cli::parse_from(["bib-ingest", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["bib-ingest", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_output_format() {
        let cli = Cli::parse_from(["bib-ingest", "-o", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);

        let cli = Cli::parse_from(["bib-ingest", "--output", "plain"]);
        assert_eq!(cli.output, OutputFormat::Plain);
    }

    #[test]
    fn test_cli_import_command() {
        let cli = Cli::parse_from(["bib-ingest", "import", "refs.bib", "--format", "bibtex"]);
        match cli.command {
            Some(Commands::Import { file, format }) => {
                assert_eq!(file, PathBuf::from("refs.bib"));
                assert_eq!(format, Some(FormatArg::Bibtex));
            }
            _ => panic!("Expected Import command"),
        }
    }

    #[test]
    fn test_cli_check_command() {
        let id = Uuid::new_v4();
        let id_text = id.to_string();
        let cli = Cli::parse_from([
            "bib-ingest",
            "check",
            "new.csv",
            "--against",
            "corpus.json",
            "--exclude",
            id_text.as_str(),
        ]);
        match cli.command {
            Some(Commands::Check {
                file,
                against,
                format,
                exclude,
            }) => {
                assert_eq!(file, PathBuf::from("new.csv"));
                assert_eq!(against, PathBuf::from("corpus.json"));
                assert_eq!(format, None);
                assert_eq!(exclude, Some(id));
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_convert_and_cite() {
        let cli = Cli::parse_from(["bib-ingest", "convert", "a.json", "--to", "csv"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Convert { to: FormatArg::Csv, out: None, .. })
        ));

        let cli = Cli::parse_from(["bib-ingest", "cite", "a.bib", "--style", "apa"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Cite { style: StyleArg::Apa, .. })
        ));
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from(["bib-ingest", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_resolve_format() {
        let config = Config::default();
        let path = Path::new("refs.bib");
        assert_eq!(
            resolve_format(path, Some(FormatArg::Json), &config, ""),
            ImportFormat::Json
        );
        assert_eq!(resolve_format(path, None, &config, "[]"), ImportFormat::Bibtex);

        let path = Path::new("refs.txt");
        assert_eq!(resolve_format(path, None, &config, "[]"), ImportFormat::Json);

        let mut config = Config::default();
        config.import.default_format = Some("csv".to_string());
        assert_eq!(resolve_format(path, None, &config, "[]"), ImportFormat::Csv);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
