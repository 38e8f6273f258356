//! Ouverture d'un jeu shapefile (.shp / .shx / .dbf)

use std::path::{Path, PathBuf};

use geo::Geometry;
use shapefile::{ShapeReader, ShapeType};
use tracing::debug;

use crate::shape::flatten;
use crate::ShpError;

/// Type physique d'un champ attributaire dBASE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Character,
    Numeric,
    Float,
    Integer,
    Date,
    Logical,
    Other,
}

/// Champ attributaire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// Jeu shapefile ouvert en lecture
#[derive(Debug, Clone)]
pub struct Dataset {
    shp_path: PathBuf,
    shape_type: ShapeType,
    fields: Vec<Field>,
}

impl Dataset {
    /// Ouvre un jeu à partir de n'importe lequel de ses fichiers (.shx, .shp...)
    pub fn open(path: &Path) -> Result<Self, ShpError> {
        let shp_path = path.with_extension("shp");
        if !shp_path.exists() {
            return Err(ShpError::MissingFile(shp_path.display().to_string()));
        }

        let reader = ShapeReader::from_path(&shp_path)
            .map_err(|e| ShpError::shapefile(shp_path.display().to_string(), e))?;
        let shape_type = reader.header().shape_type;

        let dbf_path = path.with_extension("dbf");
        let fields = if dbf_path.exists() {
            read_fields(&dbf_path)?
        } else {
            debug!(path = %dbf_path.display(), "No attribute table");
            Vec::new()
        };

        Ok(Self {
            shp_path,
            shape_type,
            fields,
        })
    }

    /// Faux si l'en-tête déclare un jeu sans géométrie (NullShape)
    pub fn has_geometry(&self) -> bool {
        self.shape_type != ShapeType::NullShape
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Parcourt les enregistrements en WKB ISO brut (`None` pour un shape nul).
    ///
    /// Retourne le nombre d'enregistrements visités.
    pub fn for_each_wkb<F>(&self, mut visit: F) -> Result<u64, ShpError>
    where
        F: FnMut(Option<&[u8]>),
    {
        let mut reader = self.reader()?;
        let mut count = 0u64;
        for shape in reader.iter_shapes() {
            let shape = shape.map_err(|e| self.error(e))?;
            let wkb = flatten(&shape).map(|flat| flat.to_wkb());
            visit(wkb.as_deref());
            count += 1;
        }
        Ok(count)
    }

    /// Toutes les géométries, forcées en 2D (`None` pour un shape nul)
    pub fn geometries_2d(&self) -> Result<Vec<Option<Geometry>>, ShpError> {
        let mut reader = self.reader()?;
        reader
            .iter_shapes()
            .map(|shape| {
                let shape = shape.map_err(|e| self.error(e))?;
                Ok(flatten(&shape).map(|flat| flat.to_geo_2d()))
            })
            .collect()
    }

    fn reader(&self) -> Result<ShapeReader<std::io::BufReader<std::fs::File>>, ShpError> {
        ShapeReader::from_path(&self.shp_path).map_err(|e| self.error(e))
    }

    fn error(&self, reason: impl std::fmt::Display) -> ShpError {
        ShpError::shapefile(self.shp_path.display().to_string(), reason)
    }
}

fn read_fields(dbf_path: &Path) -> Result<Vec<Field>, ShpError> {
    use shapefile::dbase::FieldType;

    let reader = shapefile::dbase::Reader::from_path(dbf_path)
        .map_err(|e| ShpError::shapefile(dbf_path.display().to_string(), e))?;

    Ok(reader
        .fields()
        .iter()
        .map(|info| Field {
            name: info.name().to_string(),
            kind: match info.field_type() {
                FieldType::Character => FieldKind::Character,
                FieldType::Numeric => FieldKind::Numeric,
                FieldType::Float | FieldType::Double => FieldKind::Float,
                FieldType::Integer => FieldKind::Integer,
                FieldType::Date | FieldType::DateTime => FieldKind::Date,
                FieldType::Logical => FieldKind::Logical,
                _ => FieldKind::Other,
            },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::{Point, PointZ, PolygonRing, PolygonZ, ShapeWriter};

    #[test]
    fn test_open_missing_shp() {
        let dir = tempfile::tempdir().unwrap();
        let result = Dataset::open(&dir.path().join("absent.shx"));
        assert!(matches!(result, Err(ShpError::MissingFile(_))));
    }

    #[test]
    fn test_points_roundtrip_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("points.shp");
        ShapeWriter::from_path(&shp)
            .unwrap()
            .write_shapes(&vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)])
            .unwrap();

        let dataset = Dataset::open(&dir.path().join("points.shx")).unwrap();
        assert!(dataset.has_geometry());
        assert!(dataset.fields().is_empty());

        let mut codes = Vec::new();
        let count = dataset
            .for_each_wkb(|wkb| codes.push(crate::code::shape_type_code(wkb)))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(codes, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_polygon_z_reports_code_235() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("zones.shp");
        let ring = vec![
            PointZ::new(0.0, 0.0, 1.0, 0.0),
            PointZ::new(0.0, 1.0, 1.0, 0.0),
            PointZ::new(1.0, 1.0, 1.0, 0.0),
            PointZ::new(0.0, 0.0, 1.0, 0.0),
        ];
        ShapeWriter::from_path(&shp)
            .unwrap()
            .write_shapes(&vec![PolygonZ::new(PolygonRing::Outer(ring))])
            .unwrap();

        let dataset = Dataset::open(&shp).unwrap();
        let mut codes = Vec::new();
        dataset
            .for_each_wkb(|wkb| codes.push(crate::code::shape_type_code(wkb)))
            .unwrap();
        assert_eq!(codes, vec![Some(235)]);

        let flat = dataset.geometries_2d().unwrap();
        assert!(matches!(flat[0], Some(Geometry::Polygon(_))));
    }
}
