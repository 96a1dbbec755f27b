//! farmcal CLI - Farm Activity Calendar
//!
//! Command-line interface for building farm calendars from activity records
//! and exporting them as XLSX, text or JSON.

mod config;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use farmcal_core::{FarmCalendar, LandPrepReport};
use farmcal_grid::{
    land_prep_report, years_of, CalendarBuilder, ColorMode, OutOfRangePolicy, TimeAxisBuilder,
};
use farmcal_render::{ExcelExporter, LandPrepExporter, TextRenderer};
use farmcal_source::{open_source, ActivitySource, SourceOptions};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::FarmcalConfig;

const DEFAULT_CALENDAR_OUTPUT: &str = "farm_calendar.xlsx";
const DEFAULT_LAND_PREP_OUTPUT: &str = "land_preparation.xlsx";

#[derive(Parser)]
#[command(name = "farmcal")]
#[command(author, version, about = "Farm activity calendar builder", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the block x week activity calendar
    Calendar {
        /// Activity records (.json, .db, .sqlite, .sqlite3)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Config file (defaults to ./farmcal.toml when present)
        #[arg(short, long, env = "FARMCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Output file (xlsx defaults to farm_calendar.xlsx, text/json to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Xlsx)]
        format: OutputFormat,

        /// Years to lay out (defaults to the years in the records)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        years: Vec<i32>,

        /// Fail instead of skipping records outside the calendar weeks
        #[arg(long)]
        abort_on_out_of_range: bool,

        /// Where cell colors come from
        #[arg(long, value_enum)]
        color_mode: Option<ColorModeArg>,

        /// Only read records from this year onwards
        #[arg(long)]
        from_year: Option<i32>,

        /// Add a Land Preparation sheet (xlsx only)
        #[arg(long)]
        with_land_prep: bool,

        /// Reference day for the land preparation sheet (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Export the land preparation report
    LandPrep {
        /// Planting records (.json, .db, .sqlite, .sqlite3)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Config file (defaults to ./farmcal.toml when present)
        #[arg(short, long, env = "FARMCAL_CONFIG")]
        config: Option<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = DEFAULT_LAND_PREP_OUTPUT)]
        output: PathBuf,

        /// Reference day (YYYY-MM-DD, default today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Show how the ISO weeks of a year are grouped into months
    Weeks {
        #[arg(value_name = "YEAR", required = true)]
        years: Vec<i32>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColorModeArg {
    Crop,
    Action,
}

impl From<ColorModeArg> for ColorMode {
    fn from(value: ColorModeArg) -> Self {
        match value {
            ColorModeArg::Crop => ColorMode::Crop,
            ColorModeArg::Action => ColorMode::Action,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Calendar {
            input,
            config,
            output,
            format,
            years,
            abort_on_out_of_range,
            color_mode,
            from_year,
            with_land_prep,
            as_of,
        } => {
            let config = FarmcalConfig::load(config.as_deref())?;

            let mut source_options = config.source.clone();
            if from_year.is_some() {
                source_options.from_year = from_year;
            }
            let source = open(&input, source_options)?;
            let records = source
                .fetch_activities()
                .with_context(|| format!("Failed to read activities from {}", input.display()))?;
            info!(records = records.len(), "activities read");

            let mut options = config.calendar.options.clone();
            if abort_on_out_of_range {
                options.out_of_range = OutOfRangePolicy::Abort;
            }
            if let Some(mode) = color_mode {
                options.color_mode = mode.into();
            }

            let years = if !years.is_empty() {
                years
            } else if !config.calendar.years.is_empty() {
                config.calendar.years.clone()
            } else {
                years_of(&records)
            };

            let calendar = CalendarBuilder::new(options)
                .build(&records, &years)
                .context("Failed to build the calendar")?;
            info!(
                blocks = calendar.rows.len(),
                columns = calendar.column_count(),
                skipped = calendar.skipped.len(),
                "calendar built"
            );

            match format {
                OutputFormat::Xlsx => {
                    let mut exporter = ExcelExporter::new();
                    if let Some(name) = &config.export.sheet_name {
                        exporter = exporter.sheet_name(name.clone());
                    }
                    if !config.export.use_formulas {
                        exporter = exporter.static_values();
                    }
                    if with_land_prep {
                        let report = read_land_prep(source.as_ref(), &input, as_of)?;
                        exporter = exporter.with_land_prep(report);
                    }

                    let path = output
                        .or_else(|| config.export.output.clone())
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_CALENDAR_OUTPUT));
                    exporter
                        .save(&calendar, &path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Excel file created: {}", path.display());
                }
                OutputFormat::Text => {
                    let renderer = TextRenderer {
                        show_legend: true,
                        show_skipped: false,
                    };
                    emit(output.as_deref(), &renderer.render(&calendar))?;
                }
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&calendar)?;
                    emit(output.as_deref(), &json)?;
                }
            }

            report_skipped(&calendar);
        }

        Commands::LandPrep {
            input,
            config,
            output,
            as_of,
        } => {
            let config = FarmcalConfig::load(config.as_deref())?;
            let source = open(&input, config.source)?;
            let report = read_land_prep(source.as_ref(), &input, as_of)?;

            LandPrepExporter::new()
                .save(&report, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Excel file generated: {} ({} plantings, {} not cleared)",
                output.display(),
                report.rows.len(),
                report.not_cleared()
            );
        }

        Commands::Weeks { years } => {
            let axis = TimeAxisBuilder::new().build(years)?;
            let mut out = String::new();
            for year in axis.years() {
                out.push_str(&format!("{} ({} weeks)\n", year.year, year.week_count));
                for group in &year.months {
                    let weeks: Vec<String> = group.weeks.iter().map(ToString::to_string).collect();
                    out.push_str(&format!("  {:<10} {}\n", group.name(), weeks.join(" ")));
                }
            }
            emit(None, &out)?;
        }
    }

    Ok(())
}

/// Log to stderr; `-v` raises the level, `RUST_LOG` overrides it
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn open(input: &Path, options: SourceOptions) -> Result<Box<dyn ActivitySource>> {
    open_source(input, options).with_context(|| format!("Failed to open {}", input.display()))
}

fn read_land_prep(
    source: &dyn ActivitySource,
    input: &Path,
    as_of: Option<NaiveDate>,
) -> Result<LandPrepReport> {
    let records = source
        .fetch_land_prep()
        .with_context(|| format!("Failed to read land preparation rows from {}", input.display()))?;
    let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(land_prep_report(&records, as_of))
}

/// Write to `path`, or stdout when absent
fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Batch summary of records left out of the grid
fn report_skipped(calendar: &FarmCalendar) {
    if calendar.skipped.is_empty() {
        return;
    }
    eprintln!("{} record(s) skipped:", calendar.skipped.len());
    for skipped in &calendar.skipped {
        eprintln!("  {skipped}");
    }
}
