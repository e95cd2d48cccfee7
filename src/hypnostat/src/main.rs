#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use hypnostat::{
    HypnogramInput,
    algo::{HypnogramReport, MetricsError, SleepMetrics, compute_metrics},
    types::Timeline,
};

#[derive(Parser)]
pub struct HypnostatCli {
    /// Epoch length used when the hypnogram file does not specify one
    #[arg(env, long, default_value_t = 30)]
    pub epoch_seconds: i64,
    #[clap(subcommand)]
    pub subcommand: HypnostatCommand,
}

#[derive(Subcommand)]
pub enum HypnostatCommand {
    ///
    /// Print sleep metrics for one night
    ///
    Metrics {
        file: PathBuf,
        /// Print the flat metric map as JSON
        #[arg(long)]
        json: bool,
    },
    ///
    /// Print the hypnogram report as JSON
    ///
    Report { file: PathBuf },
    ///
    /// Compare a night against a baseline night
    ///
    Compare { baseline: PathBuf, file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = HypnostatCli::parse();
    let epoch_seconds = cli.epoch_seconds;

    match cli.subcommand {
        HypnostatCommand::Metrics { file, json } => {
            let timeline = load_timeline(&file, epoch_seconds)?;
            let metrics = metrics_or_warn(&timeline);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&metrics.to_metric_result())?
                );
            } else {
                println!("{}", metrics);
            }
            Ok(())
        }
        HypnostatCommand::Report { file } => {
            let timeline = load_timeline(&file, epoch_seconds)?;
            let report = HypnogramReport::generate(&timeline);
            println!("{}", report.to_json()?);
            Ok(())
        }
        HypnostatCommand::Compare { baseline, file } => {
            let baseline = metrics_or_warn(&load_timeline(&baseline, epoch_seconds)?);
            let tonight = metrics_or_warn(&load_timeline(&file, epoch_seconds)?);
            println!("{}", &tonight - &baseline);
            Ok(())
        }
    }
}

fn load_timeline(path: &Path, epoch_seconds: i64) -> anyhow::Result<Timeline> {
    let timeline = HypnogramInput::from_path(path)?.into_timeline(epoch_seconds)?;
    info!("{}: {} epochs", path.display(), timeline.len());
    Ok(timeline)
}

fn metrics_or_warn(timeline: &Timeline) -> SleepMetrics {
    match compute_metrics(timeline) {
        Ok(metrics) => metrics,
        Err(MetricsError::NoSleepDetected { epochs }) => {
            warn!("no sleep detected in {} epochs", epochs);
            SleepMetrics::summarize(timeline)
        }
    }
}
