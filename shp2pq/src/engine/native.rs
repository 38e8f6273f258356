//! Moteur spatial natif : lecture shapefile via `shpwkb`, géométries `geo`,
//! reprojection PROJ, tri Hilbert et écriture Parquet.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, Coord, Geometry, MapCoords};
use geozero::wkt::Wkt;
use geozero::ToGeo;
use shpwkb::{shape_type_code, Dataset, FieldKind};
use tracing::{debug, trace};

use super::columnar::{write_wkb_column, ColumnarSink};
use super::hilbert::centroid_key;
use super::query::{GeometryColumn, GeometryQuery, QueryInput, SortKey};
use super::reproject::Reprojector;
use super::{ColumnDescriptor, EngineFactory, PhysicalType, SpatialEngine};

/// Nom de la colonne géométrique exposée par `describe`
pub const GEOMETRY_COLUMN: &str = "geom";

/// Session du moteur natif. Garde en cache les jeux déjà ouverts.
#[derive(Debug, Default)]
pub struct NativeEngine {
    datasets: HashMap<PathBuf, Dataset>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn dataset(&mut self, source: &Path) -> Result<&Dataset> {
        if !self.datasets.contains_key(source) {
            let dataset = Dataset::open(source)?;
            self.datasets.insert(source.to_path_buf(), dataset);
        }
        self.datasets
            .get(source)
            .ok_or_else(|| anyhow!("Dataset cache miss for {}", source.display()))
    }

    /// Lignes d'une requête, décodées en `geo`
    fn load(&mut self, query: &GeometryQuery) -> Result<Vec<Geometry>> {
        match query.input() {
            QueryInput::Column(column) => {
                let limit = query.shape_type_limit();
                let mut raw = Vec::new();
                let mut dropped = 0u64;
                self.dataset(column.source())?.for_each_wkb(|wkb| {
                    let keep = match (shape_type_code(wkb), limit) {
                        (None, _) => false,
                        (Some(code), Some(max)) => code <= max,
                        (Some(_), None) => true,
                    };
                    match wkb {
                        Some(bytes) if keep => raw.push(bytes.to_vec()),
                        _ => dropped += 1,
                    }
                })?;
                if dropped > 0 {
                    debug!(
                        source = %column.source().display(),
                        dropped,
                        "Rows filtered out by shape type"
                    );
                }

                raw.iter()
                    .map(|bytes| {
                        wkb::wkb_to_geom(&mut bytes.as_slice())
                            .map_err(|e| anyhow!("Invalid WKB geometry: {:?}", e))
                    })
                    .collect()
            }
            QueryInput::StagedWkt(rows) => rows
                .iter()
                .map(|text| {
                    Wkt(text.as_str())
                        .to_geo()
                        .with_context(|| format!("Invalid staged WKT: {}", text))
                })
                .collect(),
        }
    }
}

impl SpatialEngine for NativeEngine {
    fn describe(&mut self, source: &Path) -> Result<Vec<ColumnDescriptor>> {
        let dataset = self.dataset(source)?;
        let mut columns: Vec<ColumnDescriptor> = dataset
            .fields()
            .iter()
            .map(|f| ColumnDescriptor::new(f.name.clone(), physical_type(f.kind)))
            .collect();
        if dataset.has_geometry() {
            columns.push(ColumnDescriptor::new(
                GEOMETRY_COLUMN,
                PhysicalType::WkbBlob,
            ));
        }
        Ok(columns)
    }

    fn scan_wkb(
        &mut self,
        column: &GeometryColumn,
        visit: &mut dyn FnMut(Option<&[u8]>),
    ) -> Result<u64> {
        let count = self.dataset(column.source())?.for_each_wkb(visit)?;
        Ok(count)
    }

    fn min_transformed_x(
        &mut self,
        column: &GeometryColumn,
        from_epsg: u32,
        to_epsg: u32,
    ) -> Result<Option<f64>> {
        let reprojector = Reprojector::new(from_epsg, to_epsg)?;
        let geometries = self.dataset(column.source())?.geometries_2d()?;

        let mut min_x: Option<f64> = None;
        for geometry in geometries.iter().flatten() {
            let Some(rect) = geometry.bounding_rect() else {
                continue;
            };
            let corners = Geometry::Polygon(rect.to_polygon());
            let transformed = reprojector.transform_geometry(&corners)?;
            if let Some(bounds) = transformed.bounding_rect() {
                let x = bounds.min().x;
                min_x = Some(min_x.map_or(x, |m| m.min(x)));
            }
        }
        trace!(source = %column.source().display(), ?min_x, "Transformed extent");
        Ok(min_x)
    }

    fn export(&mut self, query: &GeometryQuery, sink: &ColumnarSink) -> Result<u64> {
        let mut geometries = self.load(query)?;

        if let Some((from, to)) = query.transformation() {
            let reprojector = Reprojector::new(from, to)?;
            if !reprojector.is_identity() {
                geometries = geometries
                    .iter()
                    .map(|g| reprojector.transform_geometry(g))
                    .collect::<Result<_>>()?;
            }
        }

        if query.flips_axes() {
            geometries = geometries
                .into_iter()
                .map(|g| g.map_coords(|c| Coord { x: c.y, y: c.x }))
                .collect();
        }

        if let Some(SortKey::HilbertCentroid) = query.order() {
            let mut keyed: Vec<(Option<u128>, Geometry)> = geometries
                .into_iter()
                .map(|g| (centroid_key(&g), g))
                .collect();
            // Stable : les géométries sans centroïde gardent leur ordre, en fin
            keyed.sort_by_key(|(key, _)| (key.is_none(), *key));
            geometries = keyed.into_iter().map(|(_, g)| g).collect();
        }

        let rows = geometries
            .iter()
            .map(|g| wkb::geom_to_wkb(g).map_err(|e| anyhow!("WKB encoding failed: {:?}", e)))
            .collect::<Result<Vec<_>>>()?;

        write_wkb_column(sink, &rows)
    }

    fn release(&mut self, source: &Path) {
        if self.datasets.remove(source).is_some() {
            trace!(source = %source.display(), "Dataset released");
        }
    }
}

fn physical_type(kind: FieldKind) -> PhysicalType {
    match kind {
        FieldKind::Character => PhysicalType::Text,
        FieldKind::Numeric | FieldKind::Integer => PhysicalType::Integer,
        FieldKind::Float => PhysicalType::Float,
        FieldKind::Date => PhysicalType::Date,
        FieldKind::Logical => PhysicalType::Boolean,
        FieldKind::Other => PhysicalType::Other,
    }
}

/// Fabrique de sessions natives
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngineFactory;

impl EngineFactory for NativeEngineFactory {
    type Session = NativeEngine;

    fn open(&self) -> Result<NativeEngine> {
        Ok(NativeEngine::new())
    }
}
