use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "onehealth", version, about = "Recall ingestion, feature join and consultation prediction")]
pub struct Cli {
    #[arg(long, global = true, help = "JSON configuration file; absent fields keep their defaults")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory holding the recall table and model artifacts")]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape the recall listing and merge it into the stored table
    Refresh {
        #[arg(long, default_value_t = 3, help = "Attempts after the first failed fetch")]
        retries: u32,
        #[arg(long, value_parser = parse_page_range, help = "Listing pages to read, e.g. 1..20")]
        pages: Option<(u32, u32)>,
        #[arg(long, help = "Read saved pages from this directory instead of the live site")]
        from_dir: Option<PathBuf>,
        #[arg(long, help = "Skip detail pages (no sales area)")]
        no_details: bool,
        #[arg(long, help = "Keep recalls published on or after this date (YYYY-MM-DD)")]
        since: Option<NaiveDate>,
        #[arg(long, help = "Keep recalls published on or before this date (YYYY-MM-DD)")]
        until: Option<NaiveDate>,
    },
    /// Print the most recent stored recalls
    Latest {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Join stored recalls with environmental and historical tables
    Features {
        #[arg(long, help = "Environmental table (CSV or Parquet)")]
        environment: Option<PathBuf>,
        #[arg(long, help = "Historical consultations table (CSV or Parquet)")]
        historical: Option<PathBuf>,
        #[arg(long, help = "Write feature rows here instead of stdout")]
        out: Option<PathBuf>,
        #[arg(long, help = "Only rows usable for training")]
        training: bool,
    },
    /// Predict consultations for one region and period
    Predict {
        #[arg(long)]
        region: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        uhii: f64,
        #[arg(long)]
        co2: f64,
        #[arg(long)]
        count_risk: u32,
        #[arg(long, help = "Print the prediction per week, rounded")]
        weekly: bool,
    },
    /// List the regions the model knows
    Regions,
}

/// Parse `A..B` or `A..=B` (both inclusive) or a single page `A`
pub fn parse_page_range(s: &str) -> Result<(u32, u32), String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid page '{part}': {e}"))
    };

    let (first, last) = match s.split_once("..") {
        Some((first, last)) => (parse(first)?, parse(last.trim_start_matches('='))?),
        None => {
            let page = parse(s)?;
            (page, page)
        }
    };
    if first == 0 || first > last {
        return Err(format!("invalid page range {first}..{last}"));
    }
    Ok((first, last))
}
