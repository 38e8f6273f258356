//! Traitement d'un lot de fichiers par un pool de workers
//!
//! Chaque worker ouvre sa propre session moteur ; aucun état mutable n'est
//! partagé entre fichiers. Une session est rouverte après un échec.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::engine::EngineFactory;
use crate::external::{GeometryLibrary, ReprojectionTool};
use crate::report::{BatchReport, FileOutcome};

use super::writer::artifact_path;
use super::{convert_file, ConversionContext};

/// Liste récursive et triée des fichiers `*.<extension>` sous `path`.
///
/// Un chemin de fichier est accepté tel quel s'il a la bonne extension.
pub fn collect_sources(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    collect_into(path, extension, &mut sources)?;
    sources.sort();
    Ok(sources)
}

fn collect_into(path: &Path, extension: &str, sources: &mut Vec<PathBuf>) -> Result<()> {
    let wanted = |p: &Path| {
        p.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    };

    if path.is_file() {
        if wanted(path) {
            sources.push(path.to_path_buf());
        }
        return Ok(());
    }

    let entries = std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory {}", path.display()))?;
    for entry in entries {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_into(&entry_path, extension, sources)?;
        } else if wanted(&entry_path) {
            sources.push(entry_path);
        }
    }
    Ok(())
}

/// Construit un pool de `jobs` threads
pub fn build_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("shp2pq-worker-{}", i))
        .build()
        .context("Failed to build worker pool")
}

/// Convertit tous les fichiers de `sources`.
///
/// L'ordre des résultats suit celui de `sources`.
pub fn run_batch<F: EngineFactory>(
    label: &str,
    sources: &[PathBuf],
    factory: &F,
    tool: &dyn ReprojectionTool,
    library: &dyn GeometryLibrary,
    config: &PipelineConfig,
    jobs: usize,
) -> Result<BatchReport> {
    let start = Instant::now();
    let pool = build_pool(jobs)?;
    info!(files = sources.len(), jobs, "Starting conversion");

    let outcomes: Vec<FileOutcome> = pool.install(|| {
        sources
            .par_iter()
            .map_init(
                || factory.open(),
                |session, source| {
                    let outcome = match session {
                        Ok(engine) => {
                            let mut ctx = ConversionContext::new(engine, tool, library, config);
                            convert_file(&mut ctx, source)
                        }
                        Err(e) => {
                            let artifact = artifact_path(
                                source,
                                &config.source_extension,
                                &config.output_extension,
                            );
                            FileOutcome::new(source, &artifact)
                                .failed_with(format!("Engine session unavailable: {:#}", e))
                        }
                    };
                    if outcome.is_failed() {
                        *session = factory.open();
                    }
                    outcome
                },
            )
            .collect()
    });

    let mut report = BatchReport::new(label);
    for outcome in outcomes {
        report.record(outcome);
    }
    report.set_duration(start.elapsed());
    report.finalize();

    if report.files_failed > 0 {
        warn!("{} files failed", report.files_failed);
    }
    Ok(report)
}
