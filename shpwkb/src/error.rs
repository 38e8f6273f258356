//! Types d'erreurs pour le crate shpwkb

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'un jeu shapefile
#[derive(Debug, Error)]
pub enum ShpError {
    /// Erreur d'I/O lors de la lecture des fichiers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur remontée par le lecteur shapefile
    #[error("Shapefile error in {file}: {reason}")]
    Shapefile { file: String, reason: String },

    /// Fichier compagnon manquant (.shp, .prj...)
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Fichier .prj illisible
    #[error("Invalid projection definition: {0}")]
    InvalidPrj(String),

    /// WKB tronqué ou incohérent
    #[error("Malformed WKB: {0}")]
    MalformedWkb(String),
}

impl ShpError {
    /// Crée une erreur shapefile avec contexte
    pub fn shapefile(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Shapefile {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}
