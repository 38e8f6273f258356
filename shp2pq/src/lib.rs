//! # shp2pq
//!
//! Conversion de collections régionales de shapefiles en Parquet trié par
//! courbe de Hilbert, compressé ZSTD, avec normalisation du CRS et de
//! l'ordre des axes.
//!
//! ## Features
//!
//! - Identification EPSG des `.prj` (UTM, Gauss-Krüger CGCS2000, autorités)
//! - Trois stratégies : requête directe, bibliothèque 2D, reprojection CLI
//! - Idempotence : les artefacts non vides sont conservés, les vides refaits
//! - Pool de workers rayon, une session moteur par worker
//!
//! ## Usage CLI
//!
//! ```bash
//! # Conversion de tous les .shx sous le répertoire courant
//! shp2pq convert --path . --jobs 8
//!
//! # Statistiques de types de géométrie (NDJSON)
//! shp2pq stats --path . --output shape_stats.json
//! ```

pub mod config;
pub mod engine;
pub mod external;
pub mod pipeline;
pub mod report;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{CrsPolicy, PipelineConfig};
pub use engine::{NativeEngine, NativeEngineFactory, SpatialEngine};
pub use external::{NativeGeometryLibrary, Ogr2Ogr};
pub use pipeline::{convert_file, ConversionContext, ConversionError, Strategy};
pub use report::{BatchReport, BatchStatus, FileOutcome, FileStatus};
