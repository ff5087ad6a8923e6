//! ELF table CLI
//!
//! Command-line tool for locating, querying, and merging ISO 20275 Entity
//! Legal Form snapshots.

use clap::{Args, Parser, Subcommand};
use elf_core::{
    snapshot_file_name, write_csv, write_json, ElfRegistry, LookupTable, MergeConfig,
    MergeReport, Record, SnapshotLocator, SnapshotQuery, Source,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "elf-cli")]
#[command(about = "ISO 20275 Entity Legal Form table tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which table to load
#[derive(Args)]
struct TableArgs {
    /// Directory holding the snapshot files
    #[arg(short, long, env = "ELF_DATA_DIR", default_value = ".")]
    dir: PathBuf,

    /// Use the original snapshot instead of the cleaned one
    #[arg(long)]
    original: bool,

    /// Load the snapshot with this exact date stamp (YYYY-MM-DD)
    #[arg(short, long)]
    timestamp: Option<String>,

    /// Load this CSV file directly instead of searching the directory
    #[arg(short, long, conflicts_with_all = ["original", "timestamp"])]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List snapshot files matching the criteria
    Locate {
        /// Directory holding the snapshot files
        #[arg(short, long, env = "ELF_DATA_DIR", default_value = ".")]
        dir: PathBuf,

        /// Keep only the newest snapshot (per variant unless one is chosen)
        #[arg(short, long)]
        newest: bool,

        /// Only cleaned snapshots
        #[arg(long, conflicts_with = "original")]
        cleaned: bool,

        /// Only original snapshots
        #[arg(long)]
        original: bool,

        /// Exact date stamp (YYYY-MM-DD)
        #[arg(short, long)]
        timestamp: Option<String>,
    },

    /// Show the records of one ELF code
    Show {
        #[command(flatten)]
        table: TableArgs,

        /// ELF code to look up
        code: String,
    },

    /// Count codes and records in a table
    Count {
        #[command(flatten)]
        table: TableArgs,
    },

    /// List every code with its records
    List {
        #[command(flatten)]
        table: TableArgs,

        /// Maximum number of codes to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Export a table to a file
    Export {
        #[command(flatten)]
        table: TableArgs,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge a supplementary legal forms file into a canonical snapshot
    Merge {
        /// Merge config file (JSON); other arguments are ignored when given
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Canonical snapshot CSV
        #[arg(long, required_unless_present = "config")]
        canonical: Option<PathBuf>,

        /// Supplementary legal forms file
        #[arg(long, required_unless_present = "config")]
        supplementary: Option<PathBuf>,

        /// Output CSV (default: a cleaned snapshot dated today next to the canonical file;
        /// the merge refuses to run if that is the canonical file itself)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report of conflicts and anomalies
        #[arg(long)]
        report: Option<PathBuf>,

        /// Width of synthetic codes
        #[arg(long, default_value_t = 4)]
        code_width: usize,
    },

    /// Create a merge config template
    CreateConfig {
        /// Output path for the config file
        #[arg(short, long)]
        output: PathBuf,

        /// Canonical snapshot CSV
        #[arg(long, default_value = "Cleaned - ISO-20275 - 2020-11-19.csv")]
        canonical: PathBuf,

        /// Supplementary legal forms file
        #[arg(long, default_value = "Additional legal forms.txt")]
        supplementary: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> elf_core::Result<()> {
    match cli.command {
        Commands::Locate {
            dir,
            newest,
            cleaned,
            original,
            timestamp,
        } => cmd_locate(&dir, newest, cleaned, original, timestamp),
        Commands::Show { table, code } => cmd_show(&table, &code),
        Commands::Count { table } => cmd_count(&table),
        Commands::List { table, limit } => cmd_list(&table, limit),
        Commands::Export {
            table,
            format,
            output,
        } => cmd_export(&table, &format, &output),
        Commands::Merge {
            config,
            canonical,
            supplementary,
            output,
            report,
            code_width,
        } => {
            let config = match config {
                Some(path) => MergeConfig::load(path)?,
                None => {
                    // clap enforces both when --config is absent
                    let canonical = canonical.unwrap_or_default();
                    let supplementary = supplementary.unwrap_or_default();
                    let output = output.unwrap_or_else(|| default_output(&canonical));
                    let mut config = MergeConfig::new(canonical, supplementary, output);
                    config.report = report;
                    config.code_width = code_width;
                    config
                }
            };
            cmd_merge(&config)
        }
        Commands::CreateConfig {
            output,
            canonical,
            supplementary,
        } => cmd_create_config(&output, canonical, supplementary),
    }
}

fn load_table(args: &TableArgs) -> elf_core::Result<Arc<LookupTable>> {
    if let Some(file) = &args.file {
        return Ok(Arc::new(LookupTable::load(Source::File(file.clone()))?));
    }

    let query = SnapshotQuery {
        newest: true,
        cleaned: Some(!args.original),
        timestamp: args.timestamp.clone(),
    };
    let registry = ElfRegistry::open_with(&args.dir, &query)?;
    Ok(registry.table())
}

fn default_output(canonical: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    canonical
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(snapshot_file_name(true, &today))
}

fn cmd_locate(
    dir: &Path,
    newest: bool,
    cleaned: bool,
    original: bool,
    timestamp: Option<String>,
) -> elf_core::Result<()> {
    let variant = match (cleaned, original) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let query = SnapshotQuery {
        newest,
        cleaned: variant,
        timestamp,
    };

    let locator = SnapshotLocator::new(dir)?;
    let snapshots = locator.locate(&query)?;

    if snapshots.is_empty() {
        println!(
            "No snapshots in {} matching {}",
            locator.directory().display(),
            query
        );
        return Ok(());
    }

    println!("Snapshots ({}):", snapshots.len());
    for snapshot in &snapshots {
        println!(
            "  {} [{}] {}",
            snapshot.date_stamp,
            snapshot.variant(),
            snapshot.path.display()
        );
    }

    Ok(())
}

fn cmd_show(args: &TableArgs, code: &str) -> elf_core::Result<()> {
    let table = load_table(args)?;

    let records = match table.get(code) {
        Ok(records) => records,
        Err(e) if e.is_not_found() => {
            println!("{} not found in {}", code, table.source());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("{} ({} records)", code, records.len());
    for record in records {
        println!();
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &Record) {
    let labels = [
        "Country",
        "Country code",
        "Jurisdiction",
        "Jurisdiction code",
        "Local name",
        "Language",
        "Language code",
        "Transliterated name",
        "Local abbreviations",
        "Transliterated abbreviations",
        "Created",
        "Status",
        "Modification",
        "Modified",
        "Reason",
    ];

    println!("{}", record);
    for (label, value) in labels.iter().zip(record.fields().iter().skip(1)) {
        if !value.is_empty() {
            println!("  {:<30} {}", label, value);
        }
    }
}

fn cmd_count(args: &TableArgs) -> elf_core::Result<()> {
    let table = load_table(args)?;

    println!("Source: {}", table.source());
    println!("Codes: {}", table.count());
    println!("Records: {}", table.record_count());
    println!(
        "Codes with several records: {}",
        table.multi_entry_codes().len()
    );

    Ok(())
}

fn cmd_list(args: &TableArgs, limit: Option<usize>) -> elf_core::Result<()> {
    let table = load_table(args)?;

    let code_limit = limit.unwrap_or(table.count());
    for (code, records) in table.entries().take(code_limit) {
        let names: Vec<String> = records
            .iter()
            .map(|r| format!("{} ({})", r.local_name(), r.language_code()))
            .collect();
        println!("{}\t{}\t{}", code, records[0].country_alpha2(), names.join("; "));
    }

    if table.count() > code_limit {
        println!("... ({} more codes)", table.count() - code_limit);
    }

    Ok(())
}

fn cmd_export(args: &TableArgs, format: &str, output: &Path) -> elf_core::Result<()> {
    let table = load_table(args)?;

    let written = match format.to_lowercase().as_str() {
        "csv" => write_csv(output, &[], table.records())?,
        "json" => write_json(output, table.records())?,
        _ => {
            eprintln!("Unknown format: {}. Supported formats: csv, json", format);
            std::process::exit(1);
        }
    };

    println!("Exported {} records to {}", written, output.display());

    Ok(())
}

fn cmd_merge(config: &MergeConfig) -> elf_core::Result<()> {
    tracing::debug!(?config, "running merge");
    println!("Canonical: {}", config.canonical.display());
    println!("Supplementary: {}", config.supplementary.display());

    let report = config.run()?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &MergeReport) {
    let stats = &report.stats;

    println!();
    println!("Merge complete:");
    println!("  {} canonical rows", stats.canonical_rows);
    println!("  {} new forms", stats.new_forms);
    println!("  {} completions merged", stats.merged_completions);
    println!("  {} completions appended as new entries", stats.rerouted);
    println!("  {} rows written to {}", stats.output_rows, report.output.display());

    if !report.conflicts.is_empty() {
        println!("\nConflicts ({}):", report.conflicts.len());
        for conflict in &report.conflicts {
            println!(
                "  {} [{}]: {} rows",
                conflict.code,
                conflict.language,
                conflict.records.len()
            );
            for record in &conflict.records {
                println!("    - {}", record);
            }
        }
    }

    if !report.rerouted.is_empty() {
        println!("\nCompletion rows that matched no canonical row ({}):", report.rerouted.len());
        for record in &report.rerouted {
            println!("  - {} [{}]", record, record.language());
        }
    }

    if !report.unmatched_codes.is_empty() {
        println!(
            "\nCompletion codes missing from the canonical table ({}): {}",
            report.unmatched_codes.len(),
            report.unmatched_codes.join(", ")
        );
    }
}

fn cmd_create_config(
    output: &Path,
    canonical: PathBuf,
    supplementary: PathBuf,
) -> elf_core::Result<()> {
    let merged = default_output(&canonical);
    let mut config = MergeConfig::new(canonical, supplementary, merged);
    config.report = Some(PathBuf::from("merge-report.json"));

    config.save(output)?;
    println!("Created merge config: {}", output.display());
    println!();
    println!("Edit the file to point at your inputs, then run:");
    println!("  elf-cli merge --config {}", output.display());

    Ok(())
}
