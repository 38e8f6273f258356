//! Sonde de schéma : recherche de la colonne géométrique

use std::path::Path;

use crate::engine::{GeometryColumn, SpatialEngine};

use super::ConversionError;

/// Première colonne géométrique, validée contre le schéma.
///
/// `NoGeometryColumn` si le fichier n'en a aucune.
pub fn first_geometry_column(
    engine: &mut dyn SpatialEngine,
    source: &Path,
) -> Result<GeometryColumn, ConversionError> {
    let schema = engine.describe(source).map_err(ConversionError::engine)?;
    let name = schema
        .iter()
        .find(|c| c.physical_type.is_geometry())
        .map(|c| c.name.clone())
        .ok_or_else(|| ConversionError::NoGeometryColumn(source.display().to_string()))?;

    Ok(GeometryColumn::resolve(source, &name, &schema)?)
}
