use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use fci_report::chart::RasterChartRenderer;
use fci_report::config::{DatabaseConfig, ReportConfig};
use fci_report::data::postgres::PgDataSource;
use fci_report::data::procedures::{read_procedure_names, run_procedures};
use fci_report::data::resolve_report_date;
use fci_report::fonts::AssetPaths;
use fci_report::render::PdfRenderer;
use fci_report::sections::ReportContext;
use fci_report::{Composer, ReportFamily, RunOutcome};
use log::{error, info, warn, LevelFilter};

/// Generates the FCI industry PDF report from the snapshot database.
///
/// Connection settings come from the `POSTGRES_*` environment (a `.env` file
/// is honoured); fonts and the logo are read from `FCI_REPORT_ASSETS_DIR`.
#[derive(Parser)]
#[command(author, version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Call every stored procedure listed in FILE, one name per line.
    Procedures {
        /// Procedure list; blank lines and `#` comments are ignored.
        file: PathBuf,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Report date (YYYY-MM-DD). Defaults to the latest snapshot date.
    date: Option<String>,

    /// Which report to build.
    #[arg(long, value_enum, default_value_t = Family::Industry)]
    family: Family,

    /// Directory the PDF is written to. Overrides the configured one.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Family {
    Industry,
    AumByFund,
}

impl From<Family> for ReportFamily {
    fn from(family: Family) -> Self {
        match family {
            Family::Industry => ReportFamily::Industry,
            Family::AumByFund => ReportFamily::AumByFund,
        }
    }
}

/// Loads `path` (or `.env` from the working directory upwards) into the
/// environment. A missing file is not an error.
fn load_env_file(path: Option<&Path>) -> Option<dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Err(err) if !err.not_found() => Some(err),
        _ => None,
    }
}

fn main() {
    // `.env` may set FCI_REPORT_LOG, so it is read before the logger.
    let env_error = load_env_file(None);
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("FCI_REPORT_LOG", "warn,fci_report=info"))
        .init();
    if let Some(err) = env_error {
        warn!("Ignoring unreadable .env file: {err}");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Procedures { file }) => procedures(file),
        None => report(cli.report),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {}", err);
            print_error_sources(err.as_ref());
            std::process::exit(1);
        }
    }
}

fn procedures(file: PathBuf) -> Result<bool, Box<dyn Error>> {
    let names = read_procedure_names(&file)?;
    let source = PgDataSource::new(&DatabaseConfig::from_env()?)?;
    run_procedures(&source, &names);
    Ok(true)
}

fn report(args: ReportArgs) -> Result<bool, Box<dyn Error>> {
    let config = ReportConfig::load()?;
    let source = PgDataSource::new(&DatabaseConfig::from_env()?)?;
    let family = ReportFamily::from(args.family);

    let date = resolve_report_date(args.date.as_deref(), &source, config.fallback_date);
    let now = Local::now();
    let output = args
        .output_dir
        .unwrap_or_else(|| config.output_dir.clone())
        .join(family.output_file_name(date, now.naive_local()));
    info!("Building {family:?} report for {date} into {}", output.display());

    let charts = RasterChartRenderer::new(config.scratch_dir());
    let renderer = PdfRenderer::new(
        AssetPaths::from_config(&config),
        family.header_title(),
        now.date_naive(),
    )
    .with_generated_by(config.generated_by.clone())
    .with_bookmarks(true);

    let ctx = ReportContext::new(&source, &charts);
    let outcome = Composer::for_family(family).run(&ctx, date, &renderer, &output);
    match &outcome {
        RunOutcome::Rendered { output } => println!("{}", output.display()),
        RunOutcome::DegradedRendered { output, dropped } => {
            warn!("{dropped} element(s) were left out of the report");
            println!("{}", output.display());
        }
        RunOutcome::Failed { reason } => error!("No report was written: {reason}"),
    }
    Ok(!outcome.is_failed())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
