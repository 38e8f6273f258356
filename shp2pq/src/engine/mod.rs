//! Moteur d'analyse spatiale
//!
//! Le pipeline ne parle au moteur qu'à travers [`SpatialEngine`] : sonde de
//! schéma, parcours WKB brut, étendue reprojetée et export colonnaire trié.
//! Chaque worker ouvre sa propre session via [`EngineFactory`].

pub mod columnar;
pub mod hilbert;
pub mod native;
pub mod query;
pub mod reproject;

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

pub use columnar::ColumnarSink;
pub use native::{NativeEngine, NativeEngineFactory};
pub use query::{GeometryColumn, GeometryQuery, QueryError, QueryInput, SortKey};
pub use reproject::Reprojector;

/// Type physique d'une colonne telle que vue par le moteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalType {
    /// Géométrie brute en WKB (lecture sans conversion)
    WkbBlob,
    Geometry,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Other,
}

impl PhysicalType {
    pub fn is_geometry(self) -> bool {
        matches!(self, PhysicalType::WkbBlob | PhysicalType::Geometry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub physical_type: PhysicalType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self {
            name: name.into(),
            physical_type,
        }
    }
}

/// Session d'un moteur spatial
pub trait SpatialEngine {
    /// Schéma de `source` (géométries laissées en WKB)
    fn describe(&mut self, source: &Path) -> Result<Vec<ColumnDescriptor>>;

    /// Visite le WKB de chaque enregistrement (`None` pour une géométrie nulle).
    /// Retourne le nombre d'enregistrements.
    fn scan_wkb(
        &mut self,
        column: &GeometryColumn,
        visit: &mut dyn FnMut(Option<&[u8]>),
    ) -> Result<u64>;

    /// Plus petit X de l'étendue après reprojection `from -> to`.
    /// `None` si aucune géométrie n'a d'étendue.
    fn min_transformed_x(
        &mut self,
        column: &GeometryColumn,
        from_epsg: u32,
        to_epsg: u32,
    ) -> Result<Option<f64>>;

    /// Exécute `query` et écrit le résultat dans `sink`.
    /// Retourne le nombre de lignes écrites.
    fn export(&mut self, query: &GeometryQuery, sink: &ColumnarSink) -> Result<u64>;

    /// Libère les ressources tenues pour `source` (fin de traitement du fichier)
    fn release(&mut self, source: &Path);
}

/// Fabrique de sessions, partagée entre les workers
pub trait EngineFactory: Sync {
    type Session: SpatialEngine;

    fn open(&self) -> Result<Self::Session>;
}
