//! Bibliothèque géométrique du chemin de repli
//!
//! Charge un jeu complet, force chaque géométrie en 2D, la reprojette et la
//! restitue en WKT prêt à être mis en scène dans le moteur.

use std::path::Path;

use anyhow::{Context, Result};
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use shpwkb::Dataset;
use tracing::debug;

use crate::engine::Reprojector;

pub trait GeometryLibrary: Send + Sync {
    /// Géométries 2D de `source`, reprojetées `from -> to`, en WKT.
    /// Les géométries nulles sont ignorées.
    fn load_flattened_wkt(&self, source: &Path, from_epsg: u32, to_epsg: u32)
        -> Result<Vec<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeGeometryLibrary;

impl GeometryLibrary for NativeGeometryLibrary {
    fn load_flattened_wkt(
        &self,
        source: &Path,
        from_epsg: u32,
        to_epsg: u32,
    ) -> Result<Vec<String>> {
        let dataset = Dataset::open(source)?;
        let reprojector = Reprojector::new(from_epsg, to_epsg)?;

        let geometries = dataset.geometries_2d()?;
        let total = geometries.len();
        let mut rows = Vec::with_capacity(total);
        let mut wkt_buf: Vec<u8> = Vec::with_capacity(256);

        for geometry in geometries.iter().flatten() {
            let geometry = reprojector.transform_geometry(geometry)?;
            wkt_buf.clear();
            {
                let mut writer = WktWriter::new(&mut wkt_buf);
                geometry
                    .process_geom(&mut writer)
                    .context("Failed to encode geometry to WKT")?;
            }
            rows.push(String::from_utf8(wkt_buf.clone()).context("WKT is not valid UTF-8")?);
        }

        debug!(
            source = %source.display(),
            rows = rows.len(),
            nulls = total - rows.len(),
            "Flattened geometries"
        );
        Ok(rows)
    }
}
