//! SheetCompat command-line tool.
//!
//! Inspects how spreadsheet headers normalize and map, translates field
//! names, dumps rows of a fixture spreadsheet through the legacy API, and
//! generates a default configuration file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sheetcompat_core::config::CompatConfig;
use sheetcompat_core::header::{is_mappable, normalize, HeaderMap, RESERVED_FIELDS};
use sheetcompat_core::legacy::{GetRowsOptions, Spreadsheet};
use sheetcompat_core::SpreadsheetFixture;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// SheetCompat command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "sheetcompat",
    version,
    about = "Inspect legacy header mapping over spreadsheet data"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how a header row normalizes into field names.
    Map {
        /// Header row, left to right.
        #[arg(required = true)]
        headers: Vec<String>,
    },

    /// Translate a field name into the header it refers to.
    Translate {
        /// Header row, left to right (repeat the flag per header).
        #[arg(long = "header", required = true)]
        headers: Vec<String>,

        /// Field name in any spelling.
        field: String,
    },

    /// Print rows of a fixture spreadsheet as legacy JSON.
    Rows {
        /// Path to the TOML fixture file.
        fixture: PathBuf,

        /// 1-based worksheet index.
        #[arg(short, long, default_value = "1")]
        worksheet: usize,

        /// 1-based index of the first row to print.
        #[arg(long)]
        offset: Option<usize>,

        /// Maximum number of rows.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate a default configuration file.
    InitConfig {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./sheetcompat.toml")]
        output: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.level))
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Map { headers } => cmd_map(&config, &headers),
        Commands::Translate { headers, field } => cmd_translate(&config, &headers, &field),
        Commands::Rows {
            fixture,
            worksheet,
            offset,
            limit,
        } => cmd_rows(&config, &fixture, worksheet, offset, limit),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<CompatConfig> {
    match path {
        Some(path) => {
            CompatConfig::load_and_validate(path).context("failed to load configuration file")
        }
        None => Ok(CompatConfig::default()),
    }
}

fn build_map(config: &CompatConfig, headers: &[String]) -> Result<HeaderMap> {
    HeaderMap::build(headers, config.mapper.collision_policy)
        .context("failed to build header map")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

/// Outcome of one header in a header row.
#[derive(Debug, PartialEq, Eq)]
enum HeaderStatus {
    Mapped,
    /// Mapped, but under a name rows never expose as a field.
    Reserved,
    Skipped,
    /// Replaced by a later header with the same normalized name.
    Shadowed(String),
}

fn header_status(map: &HeaderMap, header: &str) -> HeaderStatus {
    if !is_mappable(header) {
        return HeaderStatus::Skipped;
    }
    let key = normalize(header);
    match map.get(&key) {
        Some(canonical) if canonical == header && RESERVED_FIELDS.contains(&key.as_str()) => {
            HeaderStatus::Reserved
        }
        Some(canonical) if canonical == header => HeaderStatus::Mapped,
        Some(canonical) => HeaderStatus::Shadowed(canonical.to_string()),
        None => HeaderStatus::Skipped,
    }
}

fn cmd_map(config: &CompatConfig, headers: &[String]) -> Result<()> {
    let map = build_map(config, headers)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Header", "Field", "Status"]);

    for (i, header) in headers.iter().enumerate() {
        let status = match header_status(&map, header) {
            HeaderStatus::Mapped => Cell::new("mapped").fg(Color::Green),
            HeaderStatus::Reserved => Cell::new("reserved").fg(Color::Yellow),
            HeaderStatus::Skipped => Cell::new("skipped").fg(Color::DarkGrey),
            HeaderStatus::Shadowed(by) => {
                Cell::new(format!("shadowed by {:?}", by)).fg(Color::Yellow)
            }
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{:?}", header)),
            Cell::new(normalize(header)),
            status,
        ]);
    }

    println!("{table}");
    println!();
    println!("Fields: {}", map.project_fields().join(", "));
    Ok(())
}

fn cmd_translate(config: &CompatConfig, headers: &[String], field: &str) -> Result<()> {
    let map = build_map(config, headers)?;
    match map.lookup(field) {
        Some(header) => println!("{}", header),
        None => {
            println!("{}", field);
            eprintln!("(no column for {:?}; name passed through unchanged)", field);
        }
    }
    Ok(())
}

fn cmd_rows(
    config: &CompatConfig,
    fixture: &Path,
    worksheet: usize,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    let doc = SpreadsheetFixture::load(fixture)
        .context("failed to load fixture")?
        .into_spreadsheet();
    let mut spreadsheet = Spreadsheet::with_config(doc, config.mapper.clone());

    let opts = GetRowsOptions {
        offset,
        limit,
        ..Default::default()
    };
    let rows = spreadsheet
        .get_rows(worksheet, &opts)
        .with_context(|| format!("failed to read rows of worksheet {}", worksheet))?;
    debug!(rows = rows.len(), worksheet, "read fixture rows");

    let json: Vec<_> = rows.iter().map(|row| row.to_json()).collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&json).context("failed to serialize rows")?
    );
    Ok(())
}

fn cmd_init_config(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    let body = CompatConfig::default()
        .to_toml()
        .context("failed to render default configuration")?;
    let contents = format!(
        "# SheetCompat configuration\n\
         # collision_policy: last_wins | warn | reject\n\
         # level: trace | debug | info | warn | error\n\n{}",
        body
    );
    std::fs::write(output, contents).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!(
        "Use it with: sheetcompat --config {} map <HEADER>...",
        output.display()
    );
    Ok(())
}
