//! Reprojection de géométries avec PROJ
//!
//! La reprojection réelle n'est disponible qu'avec le feature `reproject`.
//! Une transformation identité (source == cible) fonctionne toujours, sans PROJ.

#[cfg(feature = "reproject")]
use anyhow::{Context, Result};
#[cfg(feature = "reproject")]
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection de géométries entre deux EPSG.
///
/// `Proj::new_known_crs` normalise l'ordre des axes en (lon, lat) pour les
/// systèmes géographiques.
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Option<Proj>,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            return Ok(Self { proj: None });
        }

        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None)
            .with_context(|| format!("Failed to create projection from {} to {}", source, target))?;

        Ok(Self { proj: Some(proj) })
    }

    /// Vrai si la transformation ne modifie pas les coordonnées
    pub fn is_identity(&self) -> bool {
        self.proj.is_none()
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        let Some(proj) = &self.proj else {
            return Ok(geom.clone());
        };

        match geom {
            Geometry::Point(p) => {
                let (x, y) = transform_coord(proj, p.0)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::LineString(ls) => Ok(Geometry::LineString(transform_linestring(proj, ls)?)),
            Geometry::Polygon(p) => Ok(Geometry::Polygon(transform_polygon(proj, p)?)),
            Geometry::MultiPoint(mp) => {
                let points: Result<Vec<Point>> =
                    mp.0.iter()
                        .map(|p| {
                            let (x, y) = transform_coord(proj, p.0)?;
                            Ok(Point::new(x, y))
                        })
                        .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(points?)))
            }
            Geometry::MultiLineString(mls) => {
                let lines: Result<Vec<LineString>> = mls
                    .0
                    .iter()
                    .map(|ls| transform_linestring(proj, ls))
                    .collect();
                Ok(Geometry::MultiLineString(MultiLineString::new(lines?)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>> =
                    mp.0.iter().map(|p| transform_polygon(proj, p)).collect();
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys?)))
            }
            Geometry::GeometryCollection(gc) => {
                let members: Result<Vec<Geometry>> =
                    gc.0.iter().map(|g| self.transform_geometry(g)).collect();
                Ok(Geometry::GeometryCollection(GeometryCollection(members?)))
            }
            Geometry::Rect(r) => self.transform_geometry(&Geometry::Polygon(r.to_polygon())),
            Geometry::Triangle(t) => self.transform_geometry(&Geometry::Polygon(t.to_polygon())),
            Geometry::Line(l) => {
                self.transform_geometry(&Geometry::LineString(LineString::new(vec![l.start, l.end])))
            }
        }
    }
}

#[cfg(feature = "reproject")]
fn transform_coord(proj: &Proj, coord: Coord) -> Result<(f64, f64)> {
    proj.convert((coord.x, coord.y))
        .context("Coordinate transformation failed")
}

#[cfg(feature = "reproject")]
fn transform_linestring(proj: &Proj, ls: &LineString) -> Result<LineString> {
    let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

    proj.convert_array(&mut coords)
        .context("Batch coordinate transformation failed")?;

    Ok(LineString::new(
        coords.into_iter().map(|(x, y)| Coord { x, y }).collect(),
    ))
}

#[cfg(feature = "reproject")]
fn transform_polygon(proj: &Proj, p: &Polygon) -> Result<Polygon> {
    let exterior = transform_linestring(proj, p.exterior())?;
    let interiors: Result<Vec<LineString>> = p
        .interiors()
        .iter()
        .map(|ls| transform_linestring(proj, ls))
        .collect();
    Ok(Polygon::new(exterior, interiors?))
}


/// Vrai si la reprojection PROJ est compilée
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}

#[cfg(not(feature = "reproject"))]
use anyhow::{bail, Result};
#[cfg(not(feature = "reproject"))]
use geo::Geometry;

/// Reprojector sans PROJ : seule l'identité est acceptée
#[cfg(not(feature = "reproject"))]
pub struct Reprojector;

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            Ok(Self)
        } else {
            bail!(
                "Reprojection from EPSG:{} to EPSG:{} requires the 'reproject' feature. \
                 Build with: cargo build --features reproject",
                source_epsg,
                target_epsg
            )
        }
    }

    pub fn is_identity(&self) -> bool {
        true
    }

    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        Ok(geom.clone())
    }
}
