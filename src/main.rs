use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use sheet_prices::config::Config;
use sheet_prices::io::SpreadsheetBackend;
use sheet_prices::io::auth::ServiceAccount;
use sheet_prices::io::google::GoogleSheets;
use sheet_prices::io::workbook::XlsxWorkbook;
use sheet_prices::model::{SheetRef, SheetTarget};
use sheet_prices::sync::{self, RunOptions};
use sheet_prices::{Result, ToolError};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&cli.log_level).and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        if let ToolError::InvalidRows(errors) = &error {
            for row_error in errors {
                eprintln!("  {row_error}");
            }
        }
        std::process::exit(1);
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|error| ToolError::Logging(error.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(key_file) = &cli.key_file {
        config.key_file = key_file.clone();
    }
    if let Some(spreadsheet_id) = &cli.spreadsheet_id {
        config.spreadsheet_id = Some(spreadsheet_id.clone());
    }

    match &cli.workbook {
        Some(path) => {
            let output = cli.output.as_deref().ok_or_else(|| {
                ToolError::Config("--workbook needs an --output path".into())
            })?;
            let mut backend = XlsxWorkbook::open(path, output)?;
            let target = cli
                .sheet
                .clone()
                .map(SheetTarget::Name)
                .unwrap_or(SheetTarget::First);
            dispatch(&mut backend, &target, &cli, &config)
        }
        None => {
            let sheet_ref = cli.sheet_ref(&config)?;
            info!(spreadsheet = %sheet_ref.spreadsheet_id, "authenticating with Google Sheets");
            let account = ServiceAccount::load(&config.key_file)?;
            let mut backend = GoogleSheets::connect(&sheet_ref.spreadsheet_id, &account)?;
            dispatch(&mut backend, &sheet_ref.target, &cli, &config)
        }
    }
}

fn dispatch(
    backend: &mut dyn SpreadsheetBackend,
    target: &SheetTarget,
    cli: &Cli,
    config: &Config,
) -> Result<()> {
    if cli.list {
        let sheets = backend.list_sheets()?;
        println!("Available sheets:");
        for line in sync::describe_sheets(&sheets) {
            println!("{line}");
        }
        return Ok(());
    }

    let sheet = sync::resolve_sheet(backend, target)?;
    let options = RunOptions {
        dry_run: cli.dry_run,
        skip_invalid: cli.skip_invalid,
    };
    let summary = sync::process_sheet(backend, &sheet, config, options)?;
    println!(
        "Normalized {} price(s) in sheet '{}': {} cell(s) updated, {} left untouched, {} skipped.",
        summary.normalized,
        summary.sheet,
        summary.updated_cells,
        summary.untouched,
        summary.skipped
    );
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert sheet prices to AUD and split case prices into per-bottle prices."
)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["url", "sheet", "list"])
))]
struct Cli {
    /// Full spreadsheet URL; a `gid` in the URL selects the worksheet.
    #[arg(long, conflicts_with = "workbook")]
    url: Option<String>,

    /// Worksheet name to process.
    #[arg(long, conflicts_with = "list")]
    sheet: Option<String>,

    /// List the available worksheets and exit.
    #[arg(long)]
    list: bool,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service account key file, overriding the configuration.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Spreadsheet used when no URL is given, overriding the configuration.
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Process a local .xlsx workbook instead of a Google Sheet.
    #[arg(long, requires = "output")]
    workbook: Option<PathBuf>,

    /// Where to write the processed workbook; must differ from --workbook.
    #[arg(long, requires = "workbook")]
    output: Option<PathBuf>,

    /// Log the changes without writing them.
    #[arg(long)]
    dry_run: bool,

    /// Skip invalid rows with a warning instead of aborting.
    #[arg(long)]
    skip_invalid: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn sheet_ref(&self, config: &Config) -> Result<SheetRef> {
        if let Some(url) = &self.url {
            return SheetRef::from_url(url, self.sheet.as_deref());
        }
        let spreadsheet_id = config.spreadsheet_id.clone().ok_or_else(|| {
            ToolError::Config("no spreadsheet given; pass --url or set spreadsheet_id".into())
        })?;
        let target = self
            .sheet
            .clone()
            .map(SheetTarget::Name)
            .unwrap_or(SheetTarget::First);
        Ok(SheetRef {
            spreadsheet_id,
            target,
        })
    }
}
