//! Commandes CLI

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tracing::{debug, info, warn};

use shp2pq::config::{jobs_from_env, CrsPolicy, PipelineConfig, DEFAULT_JOBS};
use shp2pq::engine::NativeEngineFactory;
use shp2pq::external::{NativeGeometryLibrary, Ogr2Ogr};
use shp2pq::pipeline::batch::{collect_sources, run_batch};
use shp2pq::pipeline::stats::{collect_stats, save_ndjson};
use shp2pq::BatchStatus;

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every shapefile under PATH to a Parquet file next to it
    Convert(ConvertArgs),

    /// Write per-file geometry type histograms as NDJSON
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Root directory (searched recursively) or a single .shx file
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Number of worker threads (défaut : env SHP2PQ_JOBS / 8)
    #[arg(short, long, alias = "threads")]
    pub jobs: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Unresolved CRS handling: propagate_unresolved, default_to_standard_crs
    #[arg(long)]
    pub crs_policy: Option<CrsPolicy>,

    /// Swap axes when the reprojected minimum X is below this value
    #[arg(long)]
    pub flip_threshold: Option<f64>,

    /// Route every file with a known CRS through the geometry library
    #[arg(long)]
    pub force_fallback: bool,

    /// Write the JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Root directory (searched recursively) or a single .shx file
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// NDJSON output file
    #[arg(short, long, default_value = "shape_stats.json")]
    pub output: PathBuf,

    /// Files to leave out (repeatable)
    #[arg(long)]
    pub skip: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of worker threads (défaut : env SHP2PQ_JOBS / 8)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

/// Défaut < fichier < environnement
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

/// Configuration effective : défaut < fichier < environnement < CLI
fn resolve_config(args: &ConvertArgs) -> Result<PipelineConfig> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(policy) = args.crs_policy {
        config.crs_policy = policy;
    }
    if let Some(threshold) = args.flip_threshold {
        config.flip_threshold = threshold;
    }
    if args.force_fallback {
        config.force_fallback = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn resolve_jobs(jobs: Option<usize>) -> usize {
    jobs.filter(|&n| n > 0)
        .or_else(jobs_from_env)
        .unwrap_or(DEFAULT_JOBS)
}

/// Exécute la commande convert
pub fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let jobs = resolve_jobs(args.jobs);

    let sources = collect_sources(&args.path, &config.source_extension)?;
    if sources.is_empty() {
        bail!(
            "No .{} files found in {}",
            config.source_extension,
            args.path.display()
        );
    }

    info!(
        path = %args.path.display(),
        files = sources.len(),
        jobs,
        crs_policy = %config.crs_policy,
        flip_threshold = config.flip_threshold,
        "Converting"
    );

    let tool = Ogr2Ogr::new(config.ogr2ogr.clone(), config.ogr_driver.clone());
    debug!(program = tool.program(), "Reprojection tool");
    let report = run_batch(
        &args.path.display().to_string(),
        &sources,
        &NativeEngineFactory,
        &tool,
        &NativeGeometryLibrary,
        &config,
        jobs,
    )?;

    report.display();
    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!(report = %path.display(), "Report saved");
    }
    println!("{}", report.summary());

    if report.status == BatchStatus::Failed {
        bail!("No file could be converted");
    }
    Ok(())
}

/// Exécute la commande stats
pub fn cmd_stats(args: StatsArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    config.validate().context("Invalid configuration")?;
    let jobs = resolve_jobs(args.jobs);
    let sources = collect_sources(&args.path, &config.source_extension)?;
    let skip: Vec<PathBuf> = args.skip.iter().map(|p| normalize(p)).collect();
    let sources: Vec<PathBuf> = sources.iter().map(|p| normalize(p)).collect();

    let run = collect_stats(&sources, &skip, &NativeEngineFactory, jobs)?;
    save_ndjson(&run.records, &args.output)?;

    println!(
        "Stats complete: {} files, {} records written to {}, {} skipped, {} failed",
        sources.len(),
        run.records.len(),
        args.output.display(),
        run.skipped.len(),
        run.failures.len()
    );
    if !run.failures.is_empty() {
        warn!("{} files failed", run.failures.len());
    }
    Ok(())
}

/// Retire le préfixe `./` pour comparer les chemins de la liste d'exclusion
fn normalize(path: &Path) -> PathBuf {
    path.strip_prefix(".").unwrap_or(path).to_path_buf()
}
