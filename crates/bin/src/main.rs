//! Fremantle CLI binary.
//!
//! Exposes the statement-analysis pipeline as subcommands: ratio analysis,
//! quick assessment, period trends, persistent storage and stored-series
//! queries, CSV export, and credit recommendations.

mod input;

use clap::{Parser, Subcommand};
use fremantle::{
    AggMethod, Granularity, add_period_parts, aggregate_by_period, compute_ratios,
    compute_variation, credit_decisions, quick_assessment, schema,
};
use fremantle::{AnalysisError, error::Result as AnalysisResult};
use fremantle_data::{PeriodLevel, RatioStore};
use fremantle_output::{AnalysisReport, to_csv_string, to_json_records};
use input::read_records;
use polars::prelude::DataFrame;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "fremantle")]
#[command(about = "Fremantle: financial-statement ratio analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute ratios and print the analysis report
    Analyze {
        /// Record file (JSON array of objects, or CSV)
        input: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Quick leverage/efficiency assessment over four required fields
    Assess {
        /// Record file
        input: PathBuf,
    },

    /// Aggregated period series with sequential and year-over-year changes
    Trends {
        /// Record file
        input: PathBuf,

        /// Series granularity (quarterly or yearly)
        #[arg(long, default_value = "quarterly")]
        granularity: String,

        /// Aggregation method (mean or sum)
        #[arg(long, default_value = "mean")]
        method: String,
    },

    /// Compute ratios and append them to the ratio store
    Store {
        /// Record file; must carry company and period columns
        input: PathBuf,

        /// Database path (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Stored series for a company
    Series {
        /// Database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Company name
        #[arg(long)]
        company: String,

        /// Inclusive period lower bound (e.g. 2023-Q1)
        #[arg(long)]
        start: Option<String>,

        /// Inclusive period upper bound
        #[arg(long)]
        end: Option<String>,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Stored-series variation computed in SQL
    Variation {
        /// Database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Company name
        #[arg(long)]
        company: String,

        /// Series granularity (quarterly or yearly)
        #[arg(long, default_value = "quarterly")]
        granularity: String,
    },

    /// Export computed ratios as CSV in the fixed reporting column order
    Export {
        /// Record file
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-record credit recommendations
    Recommend {
        /// Record file
        input: PathBuf,
    },

    /// Write a demo record file for trying the tool
    Demo {
        /// Output file
        #[arg(short, long, default_value = "financial_demo.csv")]
        output: PathBuf,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { input, format } => analyze(&input, &format),
        Commands::Assess { input } => assess(&input),
        Commands::Trends {
            input,
            granularity,
            method,
        } => trends(&input, &granularity, &method),
        Commands::Store { input, db } => store(&input, db),
        Commands::Series {
            db,
            company,
            start,
            end,
            format,
        } => series(db, &company, start.as_deref(), end.as_deref(), &format),
        Commands::Variation {
            db,
            company,
            granularity,
        } => variation(db, &company, &granularity),
        Commands::Export { input, output } => export(&input, output),
        Commands::Recommend { input } => recommend(&input),
        Commands::Demo { output } => demo(&output),
    }
}

fn analyze(input: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(input)?;
    let mapping = schema::column_mapping(&records);
    let ratios = compute_ratios(records)?;
    let report = AnalysisReport::from_ratios(&mapping, &ratios)?;

    if format == "json" {
        println!("{}", report.to_json()?);
    } else {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║{:^62}║", "FINANCIAL RATIO ANALYSIS");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        print!("{report}");
    }
    Ok(())
}

fn assess(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(input)?;
    let assessment = quick_assessment(records)?;
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

fn trends(input: &Path, granularity: &str, method: &str) -> Result<(), Box<dyn std::error::Error>> {
    let granularity: Granularity = granularity.parse()?;
    let method: AggMethod = method.parse()?;

    let records = read_records(input)?;
    require_column(&records, schema::PERIOD)?;
    let ratios = ratio_table_from(records)?;
    let series = aggregate_by_period(ratios, granularity, method)?;
    let with_change = compute_variation(series.clone(), granularity)?;

    let body = json!({
        "granularity": granularity.to_string(),
        "method": method.to_string(),
        "series": to_json_records(&series)?,
        "series_with_change": to_json_records(&with_change)?,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn store(input: &Path, db: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(input)?;
    require_series_columns(&records)?;

    let ratios = ratio_table_from(records)?;
    let db_path = resolve_db_path(db)?;
    let store = RatioStore::open(&db_path)?;
    let appended = store.append(&ratios)?;

    println!("Stored {appended} rows in {}", db_path.display());
    Ok(())
}

fn series(
    db: Option<PathBuf>,
    company: &str,
    start: Option<&str>,
    end: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = RatioStore::open(resolve_db_path(db)?)?;
    let rows = store.series(company, start, end)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&to_json_records(&rows)?)?);
    } else {
        print!("{}", to_csv_string(&rows)?);
    }
    Ok(())
}

fn variation(
    db: Option<PathBuf>,
    company: &str,
    granularity: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let granularity: Granularity = granularity.parse()?;
    let level = match granularity {
        Granularity::Quarterly => PeriodLevel::Quarterly,
        Granularity::Yearly => PeriodLevel::Yearly,
    };

    let store = RatioStore::open(resolve_db_path(db)?)?;
    let rows = store.sql_variation(company, level)?;
    let body = json!({
        "company": company,
        "level": level.to_db_str(),
        "rows": to_json_records(&rows)?,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn export(input: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let ratios = ratio_table(input)?;
    let csv = to_csv_string(&ratios)?;

    match output {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!("Exported {} rows to {}", ratios.height(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}

fn recommend(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(input)?;
    let ratios = compute_ratios(records)?;
    let decisions = credit_decisions(&ratios)?;
    println!("{}", serde_json::to_string_pretty(&json!({ "results": decisions }))?);
    Ok(())
}

/// Demo dataset: two companies over two quarters, Vietnamese headers.
const DEMO_HEADER: [&str; 16] = [
    "company",
    "period",
    "Doanh thu",
    "Tổng tài sản",
    "Tài sản ngắn hạn",
    "Hàng tồn kho",
    "Tiền",
    "Tổng nợ",
    "Nợ ngắn hạn",
    "Nợ dài hạn",
    "Vốn chủ sở hữu",
    "EBIT",
    "Lợi nhuận sau thuế",
    "Phải thu",
    "Phải trả",
    "Dòng tiền từ hoạt động",
];

const DEMO_ROWS: [[&str; 16]; 4] = [
    [
        "ABC", "2023-Q1", "1200000", "5000000", "2000000", "300000", "500000", "3000000",
        "1200000", "1800000", "2000000", "250000", "180000", "350000", "220000", "210000",
    ],
    [
        "ABC", "2023-Q2", "1300000", "5200000", "2100000", "320000", "520000", "3050000",
        "1250000", "1800000", "2150000", "270000", "190000", "360000", "230000", "230000",
    ],
    [
        "XYZ", "2023-Q1", "900000", "4000000", "1600000", "250000", "400000", "2200000",
        "900000", "1300000", "1800000", "180000", "120000", "280000", "180000", "150000",
    ],
    [
        "XYZ", "2023-Q2", "950000", "4100000", "1650000", "260000", "410000", "2250000",
        "920000", "1330000", "1850000", "190000", "130000", "285000", "185000", "170000",
    ],
];

fn demo(output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(output)?;
    wtr.write_record(DEMO_HEADER)?;
    for row in DEMO_ROWS {
        wtr.write_record(row)?;
    }
    wtr.flush()?;

    println!("Wrote demo records to {}", output.display());
    Ok(())
}

/// Read a record file and run it through ratio derivation and period parsing.
fn ratio_table(input: &Path) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let records = read_records(input)?;
    ratio_table_from(records).map_err(Into::into)
}

fn ratio_table_from(records: DataFrame) -> AnalysisResult<DataFrame> {
    let ratios = compute_ratios(records)?;
    add_period_parts(ratios)
}

/// The store and the time-series surfaces need company and period columns.
fn require_series_columns(records: &DataFrame) -> AnalysisResult<()> {
    require_column(records, schema::COMPANY)?;
    require_column(records, schema::PERIOD)
}

fn require_column(records: &DataFrame, column: &str) -> AnalysisResult<()> {
    let normalized = schema::normalize_columns(records.clone())?;
    if normalized.column(column).is_err() {
        return Err(AnalysisError::MissingColumn {
            column: column.to_string(),
        });
    }
    Ok(())
}

fn resolve_db_path(db: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = match db {
        Some(path) => path,
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fremantle")
            .join("ratios.db"),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(path)
}
