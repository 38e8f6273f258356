//! Erreurs de conversion d'un fichier

use thiserror::Error;

use crate::engine::QueryError;
use crate::external::ToolError;

/// Échec de conversion d'un fichier. N'interrompt jamais le lot.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No geometry column in {0}")]
    NoGeometryColumn(String),

    #[error("CRS of {0} is unresolved")]
    UnresolvedCrs(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Reprojection tool failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Geometry library failed: {0}")]
    Library(String),

    #[error("Spatial engine failed: {0}")]
    Engine(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub fn engine(error: anyhow::Error) -> Self {
        ConversionError::Engine(format!("{:#}", error))
    }

    pub fn library(error: anyhow::Error) -> Self {
        ConversionError::Library(format!("{:#}", error))
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ConversionError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
