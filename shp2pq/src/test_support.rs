//! Doublures de test : moteur spatial scripté, outil de reprojection
//! enregistreur et bibliothèque géométrique à réponses fixes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::engine::{
    ColumnDescriptor, ColumnarSink, EngineFactory, GeometryColumn, GeometryQuery, PhysicalType,
    QueryInput, SpatialEngine,
};
use crate::external::{GeometryLibrary, ReprojectionTool, ToolError};

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

pub const UTM_50N_PRJ: &str = r#"PROJCS["WGS_1984_UTM_Zone_50N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",117.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

fn file_stem_is(path: &Path, stem: &Option<String>) -> bool {
    match stem {
        Some(stem) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.split('.').next() == Some(stem.as_str())),
        None => false,
    }
}

/// Moteur scripté : tous les fichiers ont les mêmes codes de type.
///
/// Chaque appel est enregistré pour vérifier ce que le pipeline a demandé.
#[derive(Debug)]
pub struct StubEngine {
    pub columns: Vec<ColumnDescriptor>,
    pub codes: Vec<Option<u8>>,
    pub min_x: Option<f64>,
    pub fail_export: bool,
    pub fail_export_for: Option<String>,
    pub no_geometry_for: Option<String>,
    pub described: Vec<PathBuf>,
    pub released: Vec<PathBuf>,
    pub min_x_requests: Vec<(u32, u32)>,
    pub exports: Vec<(GeometryQuery, ColumnarSink)>,
    shared_exports: Option<Arc<AtomicUsize>>,
}

impl StubEngine {
    pub fn with_codes(codes: Vec<Option<u8>>) -> Self {
        Self {
            columns: vec![ColumnDescriptor::new("geom", PhysicalType::WkbBlob)],
            codes,
            min_x: Some(100.0),
            fail_export: false,
            fail_export_for: None,
            no_geometry_for: None,
            described: Vec::new(),
            released: Vec::new(),
            min_x_requests: Vec::new(),
            exports: Vec::new(),
            shared_exports: None,
        }
    }

    /// `n` enregistrements de points simples
    pub fn points(n: usize) -> Self {
        Self::with_codes(vec![Some(1); n])
    }

    pub fn column(&self) -> GeometryColumn {
        GeometryColumn::resolve(Path::new("stub.shx"), "geom", &self.columns)
            .expect("stub schema has a geometry column")
    }
}

impl SpatialEngine for StubEngine {
    fn describe(&mut self, source: &Path) -> Result<Vec<ColumnDescriptor>> {
        self.described.push(source.to_path_buf());
        if file_stem_is(source, &self.no_geometry_for) {
            return Ok(Vec::new());
        }
        Ok(self.columns.clone())
    }

    fn scan_wkb(
        &mut self,
        _column: &GeometryColumn,
        visit: &mut dyn FnMut(Option<&[u8]>),
    ) -> Result<u64> {
        for code in &self.codes {
            match code {
                Some(code) => visit(Some(&[1, *code, 0, 0, 0])),
                None => visit(None),
            }
        }
        Ok(self.codes.len() as u64)
    }

    fn min_transformed_x(
        &mut self,
        _column: &GeometryColumn,
        from_epsg: u32,
        to_epsg: u32,
    ) -> Result<Option<f64>> {
        self.min_x_requests.push((from_epsg, to_epsg));
        Ok(self.min_x)
    }

    fn export(&mut self, query: &GeometryQuery, sink: &ColumnarSink) -> Result<u64> {
        self.exports.push((query.clone(), sink.clone()));
        if self.fail_export || file_stem_is(&sink.path, &self.fail_export_for) {
            std::fs::write(&sink.path, b"partial")?;
            bail!("stub export failure");
        }

        let rows = match query.input() {
            QueryInput::Column(_) => self
                .codes
                .iter()
                .flatten()
                .filter(|code| query.shape_type_limit().map_or(true, |max| **code <= max))
                .count() as u64,
            QueryInput::StagedWkt(rows) => rows.len() as u64,
        };
        std::fs::write(&sink.path, format!("PAR1 stub rows={}", rows))?;
        if let Some(counter) = &self.shared_exports {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(rows)
    }

    fn release(&mut self, source: &Path) {
        self.released.push(source.to_path_buf());
    }
}

/// Ouvre des sessions [`StubEngine`] de points simples
#[derive(Debug, Default)]
pub struct StubFactory {
    fail_export_for: Option<String>,
    no_geometry_for: Option<String>,
    exports: Arc<AtomicUsize>,
}

impl StubFactory {
    /// L'export du fichier de radical `stem` échoue
    pub fn failing_on(stem: &str) -> Self {
        Self {
            fail_export_for: Some(stem.to_string()),
            ..Default::default()
        }
    }

    /// Le fichier de radical `stem` n'a pas de colonne géométrique
    pub fn without_geometry_for(stem: &str) -> Self {
        Self {
            no_geometry_for: Some(stem.to_string()),
            ..Default::default()
        }
    }

    /// Exports réussis, toutes sessions confondues
    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }
}

impl EngineFactory for StubFactory {
    type Session = StubEngine;

    fn open(&self) -> Result<StubEngine> {
        let mut engine = StubEngine::points(3);
        engine.fail_export_for = self.fail_export_for.clone();
        engine.no_geometry_for = self.no_geometry_for.clone();
        engine.shared_exports = Some(self.exports.clone());
        Ok(engine)
    }
}

/// Enregistre chaque appel ; crée une destination vide en cas de succès
#[derive(Debug, Default)]
pub struct StubTool {
    fail: bool,
    calls: Mutex<Vec<(PathBuf, PathBuf, u32)>>,
}

impl StubTool {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReprojectionTool for StubTool {
    fn reproject(
        &self,
        source: &Path,
        destination: &Path,
        target_epsg: u32,
    ) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push((
            source.to_path_buf(),
            destination.to_path_buf(),
            target_epsg,
        ));
        if self.fail {
            return Err(ToolError::Failed {
                command: format!("ogr2ogr -t_srs EPSG:{}", target_epsg),
                status: "exit status: 1".into(),
                stderr: "stub failure".into(),
            });
        }
        std::fs::write(destination, b"")?;
        Ok(())
    }
}

/// Renvoie des lignes WKT fixes
#[derive(Debug, Default)]
pub struct StubLibrary {
    rows: Vec<String>,
    calls: AtomicUsize,
}

impl StubLibrary {
    pub fn with_rows(rows: Vec<String>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeometryLibrary for StubLibrary {
    fn load_flattened_wkt(
        &self,
        _source: &Path,
        _from_epsg: u32,
        _to_epsg: u32,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }
}
