mod cli;

use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use log::{info, warn};

use onehealth::extract::{FileSource, HttpSource, PageSource, RecallExtractor};
use onehealth::{
    FeatureJoin, FeatureRow, PipelineConfig, PredictionInput, Predictor, RecallRecord, RecallStore, RegionResolver,
    TableLoader, weekly_rate, write_feature_csv,
};

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }

    match cli.command {
        Commands::Refresh {
            retries,
            pages,
            from_dir,
            no_details,
            since,
            until,
        } => {
            if let Some((first, last)) = pages {
                config.extractor.first_page = first;
                config.extractor.last_page = last;
            }
            if no_details {
                config.extractor.fetch_details = false;
            }
            if since.is_some() || until.is_some() {
                let from = since.unwrap_or(chrono::NaiveDate::MIN);
                let to = until.unwrap_or(chrono::NaiveDate::MAX);
                config.extractor.date_range = Some((from, to));
            }
            refresh(&config, retries, from_dir.as_deref())
        }
        Commands::Latest { count } => latest(&config, count),
        Commands::Features {
            environment,
            historical,
            out,
            training,
        } => features(&config, environment, historical, out.as_deref(), training),
        Commands::Predict {
            region,
            year,
            uhii,
            co2,
            count_risk,
            weekly,
        } => {
            let predictor = Predictor::load(&config.paths).context("Failed to load model artifacts")?;
            let input = PredictionInput {
                region,
                year,
                uhii,
                co2,
                count_risk,
            };
            let prediction = predictor.predict(&input)?;
            if weekly {
                println!("{}", weekly_rate(prediction));
            } else {
                println!("{prediction}");
            }
            Ok(())
        }
        Commands::Regions => {
            let predictor = Predictor::load(&config.paths).context("Failed to load model artifacts")?;
            for region in predictor.known_regions() {
                println!("{region}");
            }
            Ok(())
        }
    }
}

/// Run the extractor, retrying transport failures, then merge into the store
fn refresh(config: &PipelineConfig, retries: u32, from_dir: Option<&Path>) -> anyhow::Result<()> {
    let source: Box<dyn PageSource> = match from_dir {
        Some(dir) => {
            info!("Reading saved pages from {}", dir.display());
            Box::new(FileSource::new(dir))
        }
        None => Box::new(HttpSource::new(&config.extractor)?),
    };
    let extractor_config = if from_dir.is_some() {
        config.extractor.clone().offline()
    } else {
        config.extractor.clone()
    };
    let extractor = RecallExtractor::new(source, extractor_config)?;

    let mut attempt = 0;
    let records = loop {
        let mut stream = extractor.extract();
        let result: onehealth::Result<Vec<RecallRecord>> = stream.by_ref().collect();
        match result {
            Ok(records) => {
                let stats = stream.stats();
                info!(
                    "Extracted {} recalls from {} pages ({} rejected, {} out of range)",
                    records.len(),
                    stats.pages,
                    stats.rejected,
                    stats.out_of_range
                );
                break records;
            }
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                let backoff = Duration::from_secs(1 << attempt.min(5));
                warn!("Extraction failed ({e}); retry {attempt}/{retries} in {backoff:?}");
                thread::sleep(backoff);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Extraction failed after {} attempts", attempt + 1));
            }
        }
    };

    let store = RecallStore::new(config.paths.recalls_path());
    let report = store.merge(records)?;
    println!(
        "{} recalls stored in {} ({} new)",
        report.total,
        store.path().display(),
        report.added()
    );
    Ok(())
}

fn latest(config: &PipelineConfig, count: usize) -> anyhow::Result<()> {
    let store = RecallStore::new(config.paths.recalls_path());
    if !store.exists() {
        bail!("No recall table at {}; run `onehealth refresh` first", store.path().display());
    }

    for record in store.latest(count)? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.date, record.product, record.brand, record.risk_level, record.region
        );
    }
    Ok(())
}

fn features(
    config: &PipelineConfig,
    environment: Option<PathBuf>,
    historical: Option<PathBuf>,
    out: Option<&Path>,
    training_only: bool,
) -> anyhow::Result<()> {
    let environment = environment.unwrap_or_else(|| config.paths.environment_path());
    let historical = historical.unwrap_or_else(|| config.paths.historical_path());
    let loader = TableLoader::new(config.loader.clone(), RegionResolver::default());
    let store = RecallStore::new(config.paths.recalls_path());

    // The three inputs are independent reads
    let ((env_result, hist_result), recalls) = rayon::join(
        || rayon::join(|| loader.load_environment(&environment), || loader.load_historical(&historical)),
        || store.read_or_empty(),
    );
    let (env_table, env_report) =
        env_result.with_context(|| format!("Failed to load environmental table {}", environment.display()))?;
    let (hist_table, hist_report) =
        hist_result.with_context(|| format!("Failed to load historical table {}", historical.display()))?;
    let recalls = recalls?;

    for report in [&env_report, &hist_report] {
        info!(
            "{}: {} keys from {} rows ({} duplicates, {} rejected)",
            report.source,
            report.loaded,
            report.rows,
            report.duplicates,
            report.rejected.len()
        );
    }

    let join = FeatureJoin::new(config.join.clone(), RegionResolver::default());
    let output = join.join(&recalls, &env_table, &hist_table);
    for entry in &output.incomplete {
        warn!("Not training-ready: {} ({:?})", entry.key, entry.reason);
    }

    let rows: Vec<&FeatureRow> = if training_only {
        output.training_rows().collect()
    } else {
        output.prediction_rows().iter().collect()
    };

    match out {
        Some(path) => {
            let written = write_feature_csv(rows, path)?;
            println!("{written} feature rows written to {}", path.display());
        }
        None => {
            let mut writer = csv::Writer::from_writer(io::stdout().lock());
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
