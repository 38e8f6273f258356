//! Statistiques de types de géométrie par fichier (NDJSON)

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::{EngineFactory, SpatialEngine};

use super::batch::build_pool;
use super::{classify, inspect, ConversionError};

/// Une ligne du fichier de statistiques
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeStat {
    pub shape_type: u8,
    pub num_recs: u64,
    pub filename: String,
}

/// Résultat d'une passe de statistiques
#[derive(Debug, Default)]
pub struct StatsRun {
    pub records: Vec<ShapeStat>,
    pub skipped: Vec<String>,
    /// `(fichier, erreur)`
    pub failures: Vec<(String, String)>,
}

/// Histogramme d'un fichier, une ligne par code de type croissant
pub fn file_stats(
    engine: &mut dyn SpatialEngine,
    source: &Path,
) -> Result<Vec<ShapeStat>, ConversionError> {
    let histogram = inspect::first_geometry_column(engine, source)
        .and_then(|column| classify::histogram(engine, &column));
    engine.release(source);
    let histogram = histogram?;
    let filename = source.display().to_string();
    Ok(histogram
        .iter()
        .map(|(shape_type, num_recs)| ShapeStat {
            shape_type,
            num_recs,
            filename: filename.clone(),
        })
        .collect())
}

/// Statistiques de tous les fichiers, hors `skip`
pub fn collect_stats<F: EngineFactory>(
    sources: &[PathBuf],
    skip: &[PathBuf],
    factory: &F,
    jobs: usize,
) -> Result<StatsRun> {
    let skip: HashSet<&Path> = skip.iter().map(PathBuf::as_path).collect();
    let (wanted, skipped): (Vec<&PathBuf>, Vec<&PathBuf>) =
        sources.iter().partition(|s| !skip.contains(s.as_path()));

    let pool = build_pool(jobs)?;
    let results: Vec<(String, Result<Vec<ShapeStat>, String>)> = pool.install(|| {
        wanted
            .par_iter()
            .map_init(
                || factory.open(),
                |session, source| {
                    let name = source.display().to_string();
                    let result = match session {
                        Ok(engine) => file_stats(engine, source).map_err(|e| e.to_string()),
                        Err(e) => Err(format!("Engine session unavailable: {:#}", e)),
                    };
                    (name, result)
                },
            )
            .collect()
    });

    let mut run = StatsRun {
        skipped: skipped.iter().map(|p| p.display().to_string()).collect(),
        ..Default::default()
    };
    for (name, result) in results {
        match result {
            Ok(records) => {
                debug!(source = %name, types = records.len(), "Histogram computed");
                run.records.extend(records);
            }
            Err(error) => {
                warn!(source = %name, %error, "Statistics failed");
                run.failures.push((name, error));
            }
        }
    }
    Ok(run)
}

/// Écrit une ligne JSON par enregistrement
pub fn write_ndjson<W: Write>(records: &[ShapeStat], mut out: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Écrit le fichier NDJSON `path`
pub fn save_ndjson(records: &[ShapeStat], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_ndjson(records, std::io::BufWriter::new(file))
}
