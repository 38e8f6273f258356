//! Écriture des artefacts Parquet
//!
//! L'export est écrit dans `<artefact>.tmp` puis renommé : un artefact
//! visible est toujours complet. Un artefact existant non vide marque le
//! fichier comme traité ; un artefact vide est une tentative ratée.

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::engine::{ColumnarSink, GeometryQuery, SortKey, SpatialEngine};

use super::ConversionError;

/// Chemin de l'artefact : même chemin que la source, extension remplacée
pub fn artifact_path(source: &Path, source_extension: &str, output_extension: &str) -> PathBuf {
    let matches_source = source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(source_extension));
    if matches_source {
        source.with_extension(output_extension)
    } else {
        let mut name = source.as_os_str().to_owned();
        name.push(".");
        name.push(output_extension);
        PathBuf::from(name)
    }
}

fn staging_path(artifact: &Path) -> PathBuf {
    let mut name: OsString = artifact.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// État de l'artefact avant conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Artefact non vide : rien à faire
    Complete,
    Absent,
    /// Artefact vide supprimé, à reconstruire
    Recovered,
}

pub fn check_artifact(artifact: &Path) -> Result<ArtifactState, ConversionError> {
    match fs::metadata(artifact) {
        Ok(meta) if meta.len() > 0 => Ok(ArtifactState::Complete),
        Ok(_) => {
            fs::remove_file(artifact).map_err(|e| ConversionError::io(artifact, e))?;
            Ok(ArtifactState::Recovered)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ArtifactState::Absent),
        Err(e) => Err(ConversionError::io(artifact, e)),
    }
}

/// Paramètres d'écriture communs à toutes les stratégies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialWriter {
    row_group_size: usize,
    compression_level: i32,
}

impl SpatialWriter {
    pub fn new(row_group_size: usize, compression_level: i32) -> Self {
        Self {
            row_group_size,
            compression_level,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.row_group_size, config.compression_level)
    }

    /// Exécute `query`, triée par clé de Hilbert, vers `artifact`.
    ///
    /// En cas d'échec, aucun fichier n'est laissé en place.
    pub fn write(
        &self,
        engine: &mut dyn SpatialEngine,
        query: GeometryQuery,
        artifact: &Path,
    ) -> Result<u64, ConversionError> {
        let staging = staging_path(artifact);
        if staging.exists() {
            fs::remove_file(&staging).map_err(|e| ConversionError::io(&staging, e))?;
        }

        let sink = ColumnarSink::new(&staging)
            .row_group_size(self.row_group_size)
            .compression_level(self.compression_level);
        let query = query.order_by(SortKey::HilbertCentroid);

        match engine.export(&query, &sink) {
            Ok(rows) => {
                if let Err(e) = fs::rename(&staging, artifact) {
                    let _ = fs::remove_file(&staging);
                    return Err(ConversionError::io(artifact, e));
                }
                Ok(rows)
            }
            Err(e) => {
                let _ = fs::remove_file(&staging);
                Err(ConversionError::engine(e))
            }
        }
    }
}

/// Calcule le hash BLAKE3 d'un fichier
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open file for checksum: {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file for checksum: {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}
