//! sqlbridge: Tableau SQL to Fabric SQL converter
//!
//! # Usage
//!
//! ```bash
//! # Convert files, writing <name>_fabric.sql next to each input
//! sqlbridge convert calcs.sql more.sql
//!
//! # Print converted SQL and a JSON report
//! sqlbridge convert calcs.sql --stdout --format json
//!
//! # Show how a single statement is converted
//! sqlbridge explain "SELECT DATEADD('month', 1, NOW())"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sqlbridge::cleaner::clean;
use sqlbridge::files;
use sqlbridge::prelude::*;

#[derive(Parser)]
#[command(name = "sqlbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert Tableau calculation SQL to Microsoft Fabric SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlbridge convert calcs.sql             # Writes calcs_fabric.sql
    sqlbridge convert a.sql --stdout        # Print converted SQL
    sqlbridge explain \"SELECT ZN(x)\"        # Per call site breakdown
    sqlbridge functions --category date     # List mapping rules")]
struct Cli {
    /// Configuration file (defaults to ./sqlbridge.toml)
    #[arg(short, long, global = true, env = "SQLBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more .sql/.txt files
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print converted SQL instead of writing output files
        #[arg(long)]
        stdout: bool,
        /// Summary format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,
        /// Back up an existing output file before overwriting it
        #[arg(long)]
        backup: bool,
    },
    /// Show how each call site of a statement is converted
    Explain { sql: String },
    /// List the mapping table
    Functions {
        /// Only show one category
        #[arg(long, value_enum)]
        category: Option<CliCategory>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliCategory {
    Date,
    String,
    Aggregate,
    Logical,
    Conversion,
    Mathematical,
    Other,
}

impl From<CliCategory> for Category {
    fn from(val: CliCategory) -> Self {
        match val {
            CliCategory::Date => Category::Date,
            CliCategory::String => Category::String,
            CliCategory::Aggregate => Category::Aggregate,
            CliCategory::Logical => Category::Logical,
            CliCategory::Conversion => Category::Conversion,
            CliCategory::Mathematical => Category::Mathematical,
            CliCategory::Other => Category::Other,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "sqlbridge=warn",
        1 => "sqlbridge=info",
        _ => "sqlbridge=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let table = config.mapping_table()?;
    let converter = Converter::with_table(&table).options(config.convert_options());

    match &cli.command {
        Commands::Convert {
            files,
            stdout,
            format,
            backup,
        } => convert_files(&converter, files, *stdout, *format, *backup),
        Commands::Explain { sql } => {
            explain(&converter, sql);
            Ok(())
        }
        Commands::Functions { category } => {
            show_functions(converter.table(), category.map(Category::from));
            Ok(())
        }
    }
}

fn convert_files(
    converter: &Converter<'_>,
    inputs: &[PathBuf],
    stdout: bool,
    format: ReportFormat,
    backup: bool,
) -> Result<()> {
    let mut reports = Vec::new();
    let mut failed = 0usize;

    for input in inputs {
        match convert_file(converter, input, stdout, backup) {
            Ok(report) => reports.push(report),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}", "✗".red(), e);
            }
        }
    }

    let report = ConversionReport::new(reports);
    match format {
        ReportFormat::Json => {
            let json = report.to_json()?;
            if stdout {
                eprintln!("{}", json);
            } else {
                println!("{}", json);
            }
        }
        ReportFormat::Text => print_summary(&report),
    }

    if failed > 0 {
        bail!("{} file(s) could not be converted", failed);
    }
    Ok(())
}

fn convert_file(
    converter: &Converter<'_>,
    input: &Path,
    stdout: bool,
    backup: bool,
) -> Result<FileReport> {
    let raw = files::read_input(input)?;
    let conversion = converter.convert(&clean(&raw));
    info!(
        input = %input.display(),
        statements = conversion.metrics.total_statements,
        "converted file"
    );

    if stdout {
        println!("{}", conversion.sql);
        return Ok(FileReport::new(input, None, conversion.metrics));
    }

    let output = files::output_path(input);
    if backup {
        if let Some(saved) = files::create_backup(&output)? {
            eprintln!("{} Backed up {} to {}", "•".dimmed(), output.display(), saved.display());
        }
    }
    files::write_output(&output, &conversion.sql)?;
    eprintln!(
        "{} {} → {}",
        "✓".green(),
        input.display(),
        output.display().to_string().white().bold()
    );
    Ok(FileReport::new(input, Some(output), conversion.metrics))
}

fn print_summary(report: &ConversionReport) {
    eprintln!();
    eprintln!("{}", "Conversion Summary".cyan().bold());
    eprintln!("  {} {}", "Statements:".dimmed(), report.total_statements);
    eprintln!("  {} {}", "Converted:".dimmed(), report.successful.to_string().green());
    eprintln!("  {} {}", "Flagged:".dimmed(), report.flagged.to_string().yellow());
    eprintln!("  {} {}", "Syntax errors:".dimmed(), report.syntax_errors.to_string().red());
    eprintln!("  {} {:.2}%", "Success rate:".dimmed(), report.success_rate);

    if !report.function_conversions.is_empty() {
        eprintln!();
        eprintln!("{}", "Functions converted".cyan());
        for (category, count) in &report.function_conversions {
            eprintln!("  {:14} {}", category.to_string(), count);
        }
    }

    if !report.unsupported_functions.is_empty() {
        eprintln!();
        let names: Vec<&str> = report.unsupported_functions.iter().map(String::as_str).collect();
        eprintln!("{} {}", "Unsupported:".red().bold(), names.join(", "));
    }

    if !report.flagged_items.is_empty() {
        eprintln!();
        eprintln!("{}", "Needs review".yellow().bold());
        for item in &report.flagged_items {
            eprintln!(
                "  {} {}",
                format!("line {}:", item.line).dimmed(),
                item.reason
            );
        }
    }
}

fn explain(converter: &Converter<'_>, sql: &str) {
    println!("{}", "Conversion Analysis".cyan().bold());
    println!();
    println!("  {} {}", "Input:".dimmed(), sql.yellow());

    let conversion = converter.convert(&clean(sql));
    for stmt in &conversion.statements {
        println!();
        println!(
            "  {} {} ({})",
            format!("Statement {}", stmt.index).white().bold(),
            disposition_label(stmt.disposition),
            format!("line {}", stmt.line).dimmed()
        );
        for issue in &stmt.issues {
            println!("    {} {}", "!".yellow(), issue);
        }
        for result in &stmt.results {
            let replacement = result.replacement.as_deref().unwrap_or("(unchanged)");
            println!(
                "    {:20} {:12} {}",
                result.function,
                disposition_label(result.disposition),
                replacement
            );
            if let Some(reason) = &result.reason {
                println!("    {:20} {}", "", reason.dimmed());
            }
        }
    }

    println!();
    println!("  {} {}", "SQL:".cyan(), conversion.sql.white().bold());
}

fn disposition_label(d: Disposition) -> ColoredString {
    let label = d.to_string();
    match d {
        Disposition::Converted => label.green(),
        Disposition::Flagged => label.yellow(),
        Disposition::Unsupported | Disposition::SyntaxError => label.red(),
    }
}

fn show_functions(table: &MappingTable, category: Option<Category>) {
    println!("{}", "Mapping Table (Tableau → Fabric)".cyan().bold());
    println!();
    println!(
        "{:20} {:10} {:14} {}",
        "Function".white().bold(),
        "Kind".white().bold(),
        "Category".white().bold(),
        "Target / Reason".white().bold()
    );
    println!("{}", "─".repeat(80).dimmed());

    for rule in table.rules() {
        if category.is_some_and(|c| c != rule.category) {
            continue;
        }
        let kind = match rule.kind() {
            RuleKind::Direct => rule.kind().to_string().green(),
            RuleKind::Reorder => rule.kind().to_string().cyan(),
            RuleKind::Flag => rule.kind().to_string().yellow(),
        };
        let detail = rule.target().or(rule.reason()).unwrap_or("");
        println!(
            "{:20} {:10} {:14} {}",
            rule.name,
            kind,
            rule.category.to_string(),
            detail
        );
    }

    let stats = table.statistics();
    println!();
    println!(
        "{} {} rules ({} direct, {} reorder, {} flag)",
        "Total:".dimmed(),
        stats.total,
        stats.direct,
        stats.reorder,
        stats.flag
    );
}
