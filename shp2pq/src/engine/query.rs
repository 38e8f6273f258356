//! Requêtes géométriques typées
//!
//! Une requête n'est jamais construite par concaténation de texte : la
//! colonne géométrique est validée contre le schéma introspecté
//! ([`GeometryColumn::resolve`]) et chaque étape (filtre de type,
//! reprojection, inversion d'axes, tri) est une option explicite.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::ColumnDescriptor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Column '{column}' not found in {source_path}")]
    UnknownColumn { column: String, source_path: String },

    #[error("Column '{column}' in {source_path} is not a geometry column")]
    NotGeometry { column: String, source_path: String },
}

/// Colonne géométrique dont l'existence a été vérifiée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryColumn {
    source: PathBuf,
    name: String,
}

impl GeometryColumn {
    /// Valide `name` contre le schéma `schema` de `source`
    pub fn resolve(
        source: &Path,
        name: &str,
        schema: &[ColumnDescriptor],
    ) -> Result<Self, QueryError> {
        let descriptor = schema.iter().find(|c| c.name == name).ok_or_else(|| {
            QueryError::UnknownColumn {
                column: name.to_string(),
                source_path: source.display().to_string(),
            }
        })?;

        if !descriptor.physical_type.is_geometry() {
            return Err(QueryError::NotGeometry {
                column: name.to_string(),
                source_path: source.display().to_string(),
            });
        }

        Ok(Self {
            source: source.to_path_buf(),
            name: name.to_string(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Origine des lignes d'une requête
#[derive(Debug, Clone, PartialEq)]
pub enum QueryInput {
    /// Colonne WKB d'un fichier source
    Column(GeometryColumn),
    /// Géométries WKT préparées en mémoire (chemin de repli)
    StagedWkt(Vec<String>),
}

/// Ordre de sortie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Courbe de Hilbert sur le centroïde, axes (lat, lon)
    HilbertCentroid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryQuery {
    input: QueryInput,
    max_shape_type: Option<u8>,
    transform: Option<(u32, u32)>,
    flip_axes: bool,
    order: Option<SortKey>,
}

impl GeometryQuery {
    pub fn from_column(column: GeometryColumn) -> Self {
        Self::new(QueryInput::Column(column))
    }

    pub fn from_staged_wkt(rows: Vec<String>) -> Self {
        Self::new(QueryInput::StagedWkt(rows))
    }

    fn new(input: QueryInput) -> Self {
        Self {
            input,
            max_shape_type: None,
            transform: None,
            flip_axes: false,
            order: None,
        }
    }

    /// Ne garde que les lignes dont le code de type est `<= code`.
    /// Les géométries nulles sont écartées.
    pub fn max_shape_type(mut self, code: u8) -> Self {
        self.max_shape_type = Some(code);
        self
    }

    /// Reprojette de `from` vers `to` (EPSG)
    pub fn transform(mut self, from: u32, to: u32) -> Self {
        self.transform = Some((from, to));
        self
    }

    /// Échange X et Y après reprojection
    pub fn flip_axes(mut self, flip: bool) -> Self {
        self.flip_axes = flip;
        self
    }

    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order = Some(key);
        self
    }

    pub fn input(&self) -> &QueryInput {
        &self.input
    }

    pub fn shape_type_limit(&self) -> Option<u8> {
        self.max_shape_type
    }

    pub fn transformation(&self) -> Option<(u32, u32)> {
        self.transform
    }

    pub fn flips_axes(&self) -> bool {
        self.flip_axes
    }

    pub fn order(&self) -> Option<SortKey> {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PhysicalType;

    fn schema() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("NAME", PhysicalType::Text),
            ColumnDescriptor::new("geom", PhysicalType::WkbBlob),
        ]
    }

    #[test]
    fn test_resolve_geometry_column() {
        let column = GeometryColumn::resolve(Path::new("a.shx"), "geom", &schema()).unwrap();
        assert_eq!(column.name(), "geom");
        assert_eq!(column.source(), Path::new("a.shx"));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = GeometryColumn::resolve(Path::new("a.shx"), "geom; DROP", &schema()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { .. }));
    }

    #[test]
    fn test_attribute_column_rejected() {
        let err = GeometryColumn::resolve(Path::new("a.shx"), "NAME", &schema()).unwrap_err();
        assert!(matches!(err, QueryError::NotGeometry { .. }));
    }

    #[test]
    fn test_builder() {
        let column = GeometryColumn::resolve(Path::new("a.shx"), "geom", &schema()).unwrap();
        let query = GeometryQuery::from_column(column)
            .max_shape_type(7)
            .transform(32650, 4326)
            .flip_axes(true)
            .order_by(SortKey::HilbertCentroid);

        assert_eq!(query.shape_type_limit(), Some(7));
        assert_eq!(query.transformation(), Some((32650, 4326)));
        assert!(query.flips_axes());
        assert_eq!(query.order(), Some(SortKey::HilbertCentroid));

        let staged = GeometryQuery::from_staged_wkt(vec!["POINT(1 2)".into()]);
        assert!(matches!(staged.input(), QueryInput::StagedWkt(rows) if rows.len() == 1));
        assert_eq!(staged.transformation(), None);
    }
}
