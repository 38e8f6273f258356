//! Conversion des shapes shapefile en WKB ISO et en géométries `geo` 2D
//!
//! Un shape est d'abord aplati en [`FlatShape`] (disposition des parties +
//! dimension), puis sérialisé. Le WKB conserve Z/M comme le fait le pilote
//! shapefile de GDAL (PolygonZ → POLYGON Z, code 1003), alors que la
//! conversion `geo` force toujours la 2D.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{Patch, PolygonRing, Shape};

use crate::code::{iso_type_id, Dimension, GeometryKind};

/// Sommet avec une troisième ordonnée optionnelle (Z ou M)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub third: Option<f64>,
}

/// Disposition des parties d'un shape
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Point(Vertex),
    MultiPoint(Vec<Vertex>),
    /// Une polyligne par partie
    Lines(Vec<Vec<Vertex>>),
    /// Polygones: anneau extérieur puis trous
    Polygons(Vec<Vec<Vec<Vertex>>>),
}

/// Shape aplati, prêt à être sérialisé
#[derive(Debug, Clone, PartialEq)]
pub struct FlatShape {
    pub dim: Dimension,
    pub layout: Layout,
}

fn xy(p: &shapefile::Point) -> Vertex {
    Vertex { x: p.x, y: p.y, third: None }
}

fn xym(p: &shapefile::PointM) -> Vertex {
    Vertex { x: p.x, y: p.y, third: Some(p.m) }
}

// Les shapes Z portent aussi M ; GDAL les expose en 2.5D (Z seul).
fn xyz(p: &shapefile::PointZ) -> Vertex {
    Vertex { x: p.x, y: p.y, third: Some(p.z) }
}

fn parts<P>(parts: &[Vec<P>], f: fn(&P) -> Vertex) -> Vec<Vec<Vertex>> {
    parts.iter().map(|part| part.iter().map(f).collect()).collect()
}

/// Regroupe les anneaux: chaque anneau extérieur ouvre un polygone,
/// les anneaux intérieurs s'attachent au dernier polygone ouvert.
fn group_rings<P>(rings: &[PolygonRing<P>], f: fn(&P) -> Vertex) -> Vec<Vec<Vec<Vertex>>> {
    let mut polygons: Vec<Vec<Vec<Vertex>>> = Vec::new();
    for ring in rings {
        let (outer, points) = match ring {
            PolygonRing::Outer(points) => (true, points),
            PolygonRing::Inner(points) => (false, points),
        };
        let coords: Vec<Vertex> = points.iter().map(f).collect();
        if !outer {
            if let Some(polygon) = polygons.last_mut() {
                polygon.push(coords);
                continue;
            }
        }
        polygons.push(vec![coords]);
    }
    polygons
}

fn group_patches(patches: &[Patch]) -> Vec<Vec<Vec<Vertex>>> {
    let mut polygons: Vec<Vec<Vec<Vertex>>> = Vec::new();
    for patch in patches {
        let (opens, points) = match patch {
            Patch::OuterRing(points)
            | Patch::FirstRing(points)
            | Patch::TriangleStrip(points)
            | Patch::TriangleFan(points) => (true, points),
            Patch::InnerRing(points) | Patch::Ring(points) => (false, points),
        };
        let coords: Vec<Vertex> = points.iter().map(xyz).collect();
        if !opens {
            if let Some(polygon) = polygons.last_mut() {
                polygon.push(coords);
                continue;
            }
        }
        polygons.push(vec![coords]);
    }
    polygons
}

/// Aplati un shape. Retourne `None` pour un `NullShape`.
pub fn flatten(shape: &Shape) -> Option<FlatShape> {
    let (dim, layout) = match shape {
        Shape::NullShape => return None,
        Shape::Point(p) => (Dimension::Xy, Layout::Point(xy(p))),
        Shape::PointM(p) => (Dimension::Xym, Layout::Point(xym(p))),
        Shape::PointZ(p) => (Dimension::Xyz, Layout::Point(xyz(p))),
        Shape::Multipoint(mp) => (
            Dimension::Xy,
            Layout::MultiPoint(mp.points().iter().map(xy).collect()),
        ),
        Shape::MultipointM(mp) => (
            Dimension::Xym,
            Layout::MultiPoint(mp.points().iter().map(xym).collect()),
        ),
        Shape::MultipointZ(mp) => (
            Dimension::Xyz,
            Layout::MultiPoint(mp.points().iter().map(xyz).collect()),
        ),
        Shape::Polyline(pl) => (Dimension::Xy, Layout::Lines(parts(pl.parts(), xy))),
        Shape::PolylineM(pl) => (Dimension::Xym, Layout::Lines(parts(pl.parts(), xym))),
        Shape::PolylineZ(pl) => (Dimension::Xyz, Layout::Lines(parts(pl.parts(), xyz))),
        Shape::Polygon(pg) => (Dimension::Xy, Layout::Polygons(group_rings(pg.rings(), xy))),
        Shape::PolygonM(pg) => (
            Dimension::Xym,
            Layout::Polygons(group_rings(pg.rings(), xym)),
        ),
        Shape::PolygonZ(pg) => (
            Dimension::Xyz,
            Layout::Polygons(group_rings(pg.rings(), xyz)),
        ),
        Shape::Multipatch(mp) => (
            Dimension::Xyz,
            Layout::Polygons(group_patches(mp.patches())),
        ),
    };
    Some(FlatShape { dim, layout })
}

impl FlatShape {
    /// Famille OGC correspondante (une seule partie ⇒ type simple)
    pub fn kind(&self) -> GeometryKind {
        match &self.layout {
            Layout::Point(_) => GeometryKind::Point,
            Layout::MultiPoint(_) => GeometryKind::MultiPoint,
            Layout::Lines(lines) if lines.len() == 1 => GeometryKind::LineString,
            Layout::Lines(_) => GeometryKind::MultiLineString,
            Layout::Polygons(polys) if polys.len() == 1 => GeometryKind::Polygon,
            Layout::Polygons(_) => GeometryKind::MultiPolygon,
        }
    }

    /// Sérialise en WKB ISO little-endian
    pub fn to_wkb(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        let dim = self.dim;
        match (&self.layout, self.kind()) {
            (Layout::Point(v), _) => {
                header(&mut buf, GeometryKind::Point, dim);
                vertex(&mut buf, v, dim);
            }
            (Layout::MultiPoint(points), _) => {
                header(&mut buf, GeometryKind::MultiPoint, dim);
                count(&mut buf, points.len());
                for v in points {
                    header(&mut buf, GeometryKind::Point, dim);
                    vertex(&mut buf, v, dim);
                }
            }
            (Layout::Lines(lines), GeometryKind::LineString) => {
                header(&mut buf, GeometryKind::LineString, dim);
                sequence(&mut buf, &lines[0], dim);
            }
            (Layout::Lines(lines), _) => {
                header(&mut buf, GeometryKind::MultiLineString, dim);
                count(&mut buf, lines.len());
                for line in lines {
                    header(&mut buf, GeometryKind::LineString, dim);
                    sequence(&mut buf, line, dim);
                }
            }
            (Layout::Polygons(polys), GeometryKind::Polygon) => {
                header(&mut buf, GeometryKind::Polygon, dim);
                rings(&mut buf, &polys[0], dim);
            }
            (Layout::Polygons(polys), _) => {
                header(&mut buf, GeometryKind::MultiPolygon, dim);
                count(&mut buf, polys.len());
                for poly in polys {
                    header(&mut buf, GeometryKind::Polygon, dim);
                    rings(&mut buf, poly, dim);
                }
            }
        }
        buf
    }

    /// Convertit en géométrie `geo` en supprimant Z/M
    pub fn to_geo_2d(&self) -> Geometry {
        let coord = |v: &Vertex| Coord { x: v.x, y: v.y };
        let line = |vs: &Vec<Vertex>| LineString::new(vs.iter().map(coord).collect());
        let polygon = |rings: &Vec<Vec<Vertex>>| {
            let mut iter = rings.iter().map(line);
            let exterior = iter.next().unwrap_or_else(|| LineString::new(vec![]));
            Polygon::new(exterior, iter.collect())
        };

        match (&self.layout, self.kind()) {
            (Layout::Point(v), _) => Geometry::Point(Point::from(coord(v))),
            (Layout::MultiPoint(points), _) => Geometry::MultiPoint(MultiPoint::new(
                points.iter().map(|v| Point::from(coord(v))).collect(),
            )),
            (Layout::Lines(lines), GeometryKind::LineString) => Geometry::LineString(line(&lines[0])),
            (Layout::Lines(lines), _) => {
                Geometry::MultiLineString(MultiLineString::new(lines.iter().map(line).collect()))
            }
            (Layout::Polygons(polys), GeometryKind::Polygon) => Geometry::Polygon(polygon(&polys[0])),
            (Layout::Polygons(polys), _) => {
                Geometry::MultiPolygon(MultiPolygon::new(polys.iter().map(polygon).collect()))
            }
        }
    }
}

fn header(buf: &mut Vec<u8>, kind: GeometryKind, dim: Dimension) {
    buf.push(1);
    buf.extend_from_slice(&iso_type_id(kind, dim).to_le_bytes());
}

fn count(buf: &mut Vec<u8>, n: usize) {
    buf.extend_from_slice(&(n as u32).to_le_bytes());
}

fn vertex(buf: &mut Vec<u8>, v: &Vertex, dim: Dimension) {
    buf.extend_from_slice(&v.x.to_le_bytes());
    buf.extend_from_slice(&v.y.to_le_bytes());
    if dim != Dimension::Xy {
        buf.extend_from_slice(&v.third.unwrap_or(0.0).to_le_bytes());
    }
}

fn sequence(buf: &mut Vec<u8>, vs: &[Vertex], dim: Dimension) {
    count(buf, vs.len());
    for v in vs {
        vertex(buf, v, dim);
    }
}

fn rings(buf: &mut Vec<u8>, rings: &[Vec<Vertex>], dim: Dimension) {
    count(buf, rings.len());
    for ring in rings {
        sequence(buf, ring, dim);
    }
}
