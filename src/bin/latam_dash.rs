use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use latam_indicators::app::{Dashboard, ProgressSink};
use latam_indicators::config::ConfigLoader;
use latam_indicators::domain::{DEFAULT_COUNTRY, DEFAULT_INDICATOR, YearRange};
use latam_indicators::error::DashError;
use latam_indicators::output::{JsonOutput, OutputMode, TextOutput};
use latam_indicators::worldbank::{Fetcher, WorldBankHttpClient};

#[derive(Parser)]
#[command(name = "latam-dash")]
#[command(about = "Latin American development indicators from the World Bank API")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Print JSON instead of text panels")]
    non_interactive: bool,

    #[arg(
        long,
        global = true,
        help = "Path to a JSON config file (default: ./latam-dash.json when present)"
    )]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show what was loaded")]
    Summary,
    #[command(about = "KPI panel for one country")]
    Kpi(KpiArgs),
    #[command(about = "Line-chart series for selected countries")]
    Series(SeriesArgs),
    #[command(about = "Per-country comparison bars")]
    Compare(RangeArgs),
    #[command(about = "Choropleth data for the latest year in range")]
    Map(RangeArgs),
    #[command(about = "Write the indicator's full table as CSV")]
    Export(ExportArgs),
}

#[derive(Args)]
struct KpiArgs {
    #[arg(long, default_value = DEFAULT_INDICATOR)]
    indicator: String,

    #[arg(long, default_value = DEFAULT_COUNTRY)]
    country: String,

    #[arg(long, value_parser = parse_years, help = "Inclusive range, e.g. 2000:2024")]
    years: Option<YearRange>,
}

#[derive(Args)]
struct SeriesArgs {
    #[arg(long, default_value = DEFAULT_INDICATOR)]
    indicator: String,

    #[arg(
        long = "country",
        default_values_t = [DEFAULT_COUNTRY.to_string()],
        help = "Repeat for several countries"
    )]
    countries: Vec<String>,

    #[arg(long, value_parser = parse_years)]
    years: Option<YearRange>,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long, default_value = DEFAULT_INDICATOR)]
    indicator: String,

    #[arg(long, value_parser = parse_years)]
    years: Option<YearRange>,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(long, default_value = DEFAULT_INDICATOR)]
    indicator: String,

    #[arg(long, default_value = ".")]
    out_dir: Utf8PathBuf,
}

fn parse_years(value: &str) -> Result<YearRange, String> {
    value.parse::<YearRange>().map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<DashError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DashError) -> u8 {
    match error {
        DashError::UnknownIndicator(_)
        | DashError::UnknownCountry(_)
        | DashError::ConfigRead(_) => 2,
        err if err.is_upstream() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = WorldBankHttpClient::new(&config.base_url, config.timeout)?;
    let fetcher = Fetcher::new(client, config.per_page, config.cache_capacity);

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::NonInteractive => &JsonOutput,
        OutputMode::Interactive => &TextOutput,
    };
    let dashboard = Dashboard::load(&fetcher, &config, sink);

    let command = cli.command.unwrap_or(Commands::Kpi(KpiArgs {
        indicator: DEFAULT_INDICATOR.to_string(),
        country: DEFAULT_COUNTRY.to_string(),
        years: None,
    }));
    run_command(command, &dashboard, output_mode)
}

fn run_command(
    command: Commands,
    dashboard: &Dashboard,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let json = matches!(output_mode, OutputMode::NonInteractive);
    match command {
        Commands::Summary => {
            let summary = dashboard.summary();
            if json {
                JsonOutput::print(&summary).into_diagnostic()
            } else {
                TextOutput::print_summary(&summary).into_diagnostic()
            }
        }
        Commands::Kpi(args) => {
            let kpis = dashboard.kpis(&args.indicator, &args.country, args.years)?;
            if json {
                JsonOutput::print(&kpis).into_diagnostic()
            } else {
                TextOutput::print_kpis(&kpis).into_diagnostic()
            }
        }
        Commands::Series(args) => {
            let chart = dashboard.line_chart(&args.indicator, &args.countries, args.years)?;
            if json {
                JsonOutput::print(&chart).into_diagnostic()
            } else {
                TextOutput::print_line_chart(&chart).into_diagnostic()
            }
        }
        Commands::Compare(args) => {
            let chart = dashboard.bar_chart(&args.indicator, args.years)?;
            if json {
                JsonOutput::print(&chart).into_diagnostic()
            } else {
                TextOutput::print_bar_chart(&chart).into_diagnostic()
            }
        }
        Commands::Map(args) => {
            let map = dashboard.choropleth(&args.indicator, args.years)?;
            if json {
                JsonOutput::print(&map).into_diagnostic()
            } else {
                TextOutput::print_choropleth(&map).into_diagnostic()
            }
        }
        Commands::Export(args) => {
            let result = dashboard.export(&args.indicator, &args.out_dir)?;
            if json {
                JsonOutput::print(&result).into_diagnostic()
            } else {
                TextOutput::print_export(&result).into_diagnostic()
            }
        }
    }
}
