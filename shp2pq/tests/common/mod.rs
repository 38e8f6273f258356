//! Jeux de test écrits à la volée

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use shapefile::{Point, PointZ, PolygonRing, PolygonZ, ShapeWriter};

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

fn prepare(dir: &Path, rel: &str) -> PathBuf {
    let base = dir.join(rel);
    fs::create_dir_all(base.parent().unwrap()).unwrap();
    base
}

/// Points en EPSG:4326, retourne le chemin du `.shx`
pub fn points(dir: &Path, rel: &str, coords: &[(f64, f64)]) -> PathBuf {
    let base = prepare(dir, rel);
    let shapes: Vec<Point> = coords.iter().map(|(x, y)| Point::new(*x, *y)).collect();
    ShapeWriter::from_path(base.with_extension("shp"))
        .unwrap()
        .write_shapes(&shapes)
        .unwrap();
    fs::write(base.with_extension("prj"), WGS84_PRJ).unwrap();
    base.with_extension("shx")
}

/// Triangles 3D en EPSG:4326 (code de type 235)
pub fn polygons_z(dir: &Path, rel: &str, count: usize) -> PathBuf {
    let base = prepare(dir, rel);
    let shapes: Vec<PolygonZ> = (0..count)
        .map(|i| {
            let x = 100.0 + i as f64;
            PolygonZ::new(PolygonRing::Outer(vec![
                PointZ::new(x, 20.0, 5.0, 0.0),
                PointZ::new(x, 21.0, 5.0, 0.0),
                PointZ::new(x + 1.0, 21.0, 5.0, 0.0),
                PointZ::new(x, 20.0, 5.0, 0.0),
            ]))
        })
        .collect();
    ShapeWriter::from_path(base.with_extension("shp"))
        .unwrap()
        .write_shapes(&shapes)
        .unwrap();
    fs::write(base.with_extension("prj"), WGS84_PRJ).unwrap();
    base.with_extension("shx")
}

/// Grille régulière de `n` points dans l'emprise de la Chine
pub fn grid(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| (100.0 + (i % 5) as f64 * 4.0, 20.0 + (i / 5) as f64 * 3.0))
        .collect()
}
