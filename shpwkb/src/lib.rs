//! # shpwkb
//!
//! Lecture de jeux shapefile (.shp/.shx/.dbf) sous forme de WKB ISO brut,
//! et identification EPSG des sidecars .prj.
//!
//! ## Features
//!
//! - WKB ISO fidèle aux dimensions d'origine (POLYGON Z = 1003, code 235)
//! - Décodage du code de type depuis l'en-tête WKB
//! - Aplatissement en géométries `geo` 2D (Z/M supprimés)
//! - Parser WKT minimal pour les .prj ESRI et OGC
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shpwkb::{code, prj, Dataset};
//! use std::path::Path;
//!
//! let dataset = Dataset::open(Path::new("China/Macau/Macau.shx"))?;
//! dataset.for_each_wkb(|wkb| {
//!     println!("type {:?}", code::shape_type_code(wkb));
//! })?;
//!
//! let epsg = prj::read_epsg(Path::new("China/Macau/Macau.prj"))?;
//! ```

pub mod code;
pub mod dataset;
pub mod error;
pub mod prj;
pub mod shape;

pub use code::{shape_type_code, Dimension, GeometryKind, MAX_SIMPLE_CODE};
pub use dataset::{Dataset, Field, FieldKind};
pub use error::ShpError;
