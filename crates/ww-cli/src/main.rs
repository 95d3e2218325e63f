//! CLI entry point for the waste_watch pipeline.
//!
//! Two subcommands, one per pipeline stage:
//!
//! - `build-features`: normalized input CSVs → visit feature table (Parquet)
//! - `score`: feature table → `visit_scores.csv` + `sp_metrics.csv`
//!
//! Everything algorithmic lives in the library crates; this binary only
//! parses arguments, wires file paths, and reports errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ww_anomaly::{EngineParams, build_sp_metrics, score_visits};
use ww_features::{build_features, load_capacity_csv, load_geo_csv, load_visits_csv};
use ww_output::{read_feature_table, write_feature_table, write_score_tables};

#[derive(Parser)]
#[command(name = "waste-watch")]
#[command(about = "Waste-container utilization anomaly pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the per-visit feature table from the normalized input tables
    BuildFeatures {
        /// Visit records CSV (service_point, material, visit_date, load_kg)
        #[arg(long)]
        visits: PathBuf,

        /// Per-asset capacity CSV (service_point, capacity_kg)
        #[arg(long)]
        capacity: PathBuf,

        /// Service-point coordinates CSV (service_point, lat, lon)
        #[arg(long)]
        geo: PathBuf,

        /// Output Parquet path for the feature table
        #[arg(long, default_value = "visits.parquet")]
        out: PathBuf,
    },
    /// Score visits and derive per-service-point risk metrics
    Score {
        /// Feature table written by `build-features`
        #[arg(long, default_value = "visits.parquet")]
        input: PathBuf,

        /// Output path for the visit-level scored table
        #[arg(long, default_value = "visit_scores.csv")]
        visit_scores: PathBuf,

        /// Output path for the service-point metrics table
        #[arg(long, default_value = "sp_metrics.csv")]
        sp_metrics: PathBuf,

        /// Expected fraction of anomalous visits, in (0, 1)
        #[arg(long, default_value_t = 0.05)]
        contamination: f64,

        /// Number of isolation trees
        #[arg(long, default_value_t = 400)]
        n_estimators: usize,

        /// Root seed for all random sampling
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::BuildFeatures { visits, capacity, geo, out } => {
            let visit_rows = load_visits_csv(&visits)
                .with_context(|| format!("loading {}", visits.display()))?;
            let capacity_rows = load_capacity_csv(&capacity)
                .with_context(|| format!("loading {}", capacity.display()))?;
            let geo_rows = load_geo_csv(&geo)
                .with_context(|| format!("loading {}", geo.display()))?;

            let (table, stats) = build_features(&visit_rows, &capacity_rows, &geo_rows)?;
            write_feature_table(&out, &table)
                .with_context(|| format!("writing {}", out.display()))?;

            tracing::info!(
                rows = stats.rows,
                excluded_material = stats.excluded_material,
                dropped_no_capacity = stats.dropped_no_capacity,
                out = %out.display(),
                "build-features complete"
            );
        }
        Commands::Score {
            input,
            visit_scores,
            sp_metrics,
            contamination,
            n_estimators,
            seed,
        } => {
            let params = EngineParams { contamination, n_estimators, seed };
            // Fail on bad parameters before reading any data.
            params.validate()?;

            let table = read_feature_table(&input)
                .with_context(|| format!("reading {}", input.display()))?;

            let scored = score_visits(&table, &params)?;
            let metrics = build_sp_metrics(&scored.rows, params.contamination);

            // Both tables or neither: a failure in the second write must not
            // leave the first one persisted.
            write_score_tables(&visit_scores, &scored.rows, &sp_metrics, &metrics)
                .with_context(|| {
                    format!(
                        "writing {} and {}",
                        visit_scores.display(),
                        sp_metrics.display()
                    )
                })?;

            tracing::info!(
                visits = scored.rows.len(),
                points = metrics.len(),
                threshold = scored.threshold,
                "score complete"
            );
        }
    }

    Ok(())
}
