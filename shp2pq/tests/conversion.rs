//! Conversion de bout en bout avec le moteur natif

mod common;

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use geo::Geometry;
use parquet::basic::Compression;

use shp2pq::engine::columnar::read_wkb_column;
use shp2pq::engine::hilbert::centroid_key;
use shp2pq::external::{ReprojectionTool, ToolError};
use shp2pq::pipeline::batch::{collect_sources, run_batch};
use shp2pq::{
    convert_file, ConversionContext, FileOutcome, FileStatus, NativeEngine, NativeEngineFactory,
    NativeGeometryLibrary, Ogr2Ogr, PipelineConfig, Strategy,
};

fn convert(source: &Path, config: &PipelineConfig) -> FileOutcome {
    let mut engine = NativeEngine::new();
    let tool = Ogr2Ogr::default();
    let library = NativeGeometryLibrary;
    let mut ctx = ConversionContext::new(&mut engine, &tool, &library, config);
    convert_file(&mut ctx, source)
}

fn decode(path: &Path) -> Vec<Geometry> {
    read_wkb_column(path)
        .unwrap()
        .rows
        .iter()
        .map(|row| wkb::wkb_to_geom(&mut row.as_slice()).unwrap())
        .collect()
}

#[test]
fn test_points_take_direct_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::points(dir.path(), "China/Macau/Macau", &common::grid(10));
    let config = PipelineConfig {
        row_group_size: 4,
        ..Default::default()
    };

    let outcome = convert(&source, &config);
    assert_eq!(outcome.status, FileStatus::Written, "{:?}", outcome.error);
    assert_eq!(outcome.strategy, Some(Strategy::DirectSqlConvert));
    assert_eq!(outcome.rows, 10);
    assert!(!outcome.axis.unwrap().flip);

    let artifact = dir.path().join("China/Macau/Macau.pq");
    assert!(artifact.exists());
    assert!(!dir.path().join("China/Macau/Macau.pq.tmp").exists());

    let content = read_wkb_column(&artifact).unwrap();
    assert_eq!(content.rows.len(), 10);
    assert_eq!(content.row_groups, 3);
    assert!(matches!(content.compression, Some(Compression::ZSTD(_))));

    let keys: Vec<u128> = decode(&artifact).iter().filter_map(centroid_key).collect();
    assert_eq!(keys.len(), 10);
    assert!(keys.windows(2).all(|w| w[0] <= w[1]), "rows not in Hilbert order");
}

#[test]
fn test_low_longitudes_are_flipped() {
    let dir = tempfile::tempdir().unwrap();
    // lat/lon inversés : X minimal 20 < 60
    let swapped: Vec<(f64, f64)> = common::grid(6).iter().map(|(x, y)| (*y, *x)).collect();
    let source = common::points(dir.path(), "swapped", &swapped);

    let outcome = convert(&source, &PipelineConfig::default());
    assert_eq!(outcome.status, FileStatus::Written, "{:?}", outcome.error);
    let axis = outcome.axis.unwrap();
    assert!(axis.flip);
    assert_eq!(axis.min_x, Some(20.0));

    for geometry in decode(&dir.path().join("swapped.pq")) {
        let Geometry::Point(p) = geometry else {
            panic!("Expected Point geometry");
        };
        assert!(p.x() >= 100.0, "axes not flipped: {:?}", p);
    }
}

#[test]
fn test_polygon_z_takes_fallback_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::polygons_z(dir.path(), "zones", 3);

    let outcome = convert(&source, &PipelineConfig::default());
    assert_eq!(outcome.status, FileStatus::Written, "{:?}", outcome.error);
    assert_eq!(outcome.strategy, Some(Strategy::FallbackLibraryConvert));
    assert_eq!(outcome.complex_records, 3);
    assert_eq!(outcome.rows, 3);

    for geometry in decode(&dir.path().join("zones.pq")) {
        assert!(matches!(geometry, Geometry::Polygon(_)));
    }
}

#[test]
fn test_unresolved_crs_without_tool_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::points(dir.path(), "mystery", &common::grid(3));
    fs::remove_file(dir.path().join("mystery.prj")).unwrap();

    let config = PipelineConfig {
        ogr2ogr: "shp2pq-missing-ogr2ogr".into(),
        ..Default::default()
    };
    let mut engine = NativeEngine::new();
    let tool = Ogr2Ogr::new(config.ogr2ogr.clone(), config.ogr_driver.clone());
    let library = NativeGeometryLibrary;
    let mut ctx = ConversionContext::new(&mut engine, &tool, &library, &config);
    let outcome = convert_file(&mut ctx, &source);

    assert_eq!(outcome.status, FileStatus::Failed);
    assert!(outcome.error.unwrap().contains("shp2pq-missing-ogr2ogr"));
    assert!(!dir.path().join("mystery.pq").exists());
}

/// Reproduit la disposition d'ogr2ogr : une destination sans extension `.shp`
/// devient un répertoire contenant `<stem>.shp`
#[derive(Default)]
struct GdalLayoutTool {
    destinations: Mutex<Vec<std::path::PathBuf>>,
}

impl ReprojectionTool for GdalLayoutTool {
    fn reproject(
        &self,
        source: &Path,
        destination: &Path,
        _target_epsg: u32,
    ) -> Result<(), ToolError> {
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());
        let single_file = destination.extension().is_some_and(|ext| ext == "shp");
        let base = if single_file {
            destination.with_extension("")
        } else {
            fs::create_dir_all(destination)?;
            destination.join(source.file_stem().unwrap())
        };
        for ext in ["shp", "shx"] {
            fs::copy(source.with_extension(ext), base.with_extension(ext))?;
        }
        Ok(())
    }
}

#[test]
fn test_unresolved_crs_reads_tool_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::points(dir.path(), "China/mystery", &common::grid(5));
    fs::remove_file(dir.path().join("China/mystery.prj")).unwrap();

    let config = PipelineConfig::default();
    let mut engine = NativeEngine::new();
    let tool = GdalLayoutTool::default();
    let library = NativeGeometryLibrary;
    let mut ctx = ConversionContext::new(&mut engine, &tool, &library, &config);
    let outcome = convert_file(&mut ctx, &source);

    assert_eq!(outcome.status, FileStatus::Written, "{:?}", outcome.error);
    assert_eq!(outcome.strategy, Some(Strategy::ExternalCliReproject));
    assert_eq!(outcome.delegate, Some(Strategy::DirectSqlConvert));
    assert_eq!(outcome.rows, 5);

    let destinations = tool.destinations.lock().unwrap().clone();
    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0].file_name().unwrap(), "mystery.shp");
    assert!(!destinations[0].exists(), "scratch copy not cleaned up");

    let artifact = dir.path().join("China/mystery.pq");
    assert_eq!(read_wkb_column(&artifact).unwrap().rows.len(), 5);
}

#[test]
fn test_zero_byte_artifact_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::points(dir.path(), "points", &common::grid(4));
    let artifact = dir.path().join("points.pq");
    fs::write(&artifact, b"").unwrap();

    let outcome = convert(&source, &PipelineConfig::default());
    assert_eq!(outcome.status, FileStatus::Written, "{:?}", outcome.error);
    assert!(fs::metadata(&artifact).unwrap().len() > 0);
    assert_eq!(read_wkb_column(&artifact).unwrap().rows.len(), 4);
}

#[test]
fn test_batch_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    common::points(dir.path(), "Asia/Japan", &common::grid(7));
    common::points(dir.path(), "China/Macau/Macau", &common::grid(5));
    common::polygons_z(dir.path(), "China/Zones", 2);

    let config = PipelineConfig::default();
    let sources = collect_sources(dir.path(), "shx").unwrap();
    assert_eq!(sources.len(), 3);

    let run = |label: &str| {
        run_batch(
            label,
            &sources,
            &NativeEngineFactory,
            &Ogr2Ogr::default(),
            &NativeGeometryLibrary,
            &config,
            2,
        )
        .unwrap()
    };

    let first = run("first");
    assert_eq!(first.files_written, 3, "{:?}", first.outcomes);
    let artifacts: Vec<_> = glob::glob(&format!("{}/**/*.pq", dir.path().display()))
        .unwrap()
        .map(|p| p.unwrap())
        .collect();
    assert_eq!(artifacts.len(), 3);
    let before: Vec<Vec<u8>> = artifacts.iter().map(|p| fs::read(p).unwrap()).collect();

    let second = run("second");
    assert_eq!(second.files_skipped, 3);
    assert_eq!(second.files_written, 0);
    let after: Vec<Vec<u8>> = artifacts.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_rewrite_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let source = common::points(dir.path(), "points", &common::grid(12));
    let config = PipelineConfig::default();

    let first = convert(&source, &config);
    fs::remove_file(dir.path().join("points.pq")).unwrap();
    let second = convert(&source, &config);

    assert!(first.checksum.is_some());
    assert_eq!(first.checksum, second.checksum);
}
