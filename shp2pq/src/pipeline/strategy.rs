//! Stratégies de conversion
//!
//! Chaque fichier est traité par une seule stratégie, choisie par [`plan`] :
//!
//! | CRS         | codes > max | stratégie                |
//! |-------------|-------------|--------------------------|
//! | inconnu     | -           | `ExternalCliReproject`   |
//! | connu       | oui         | `FallbackLibraryConvert` |
//! | connu       | non         | `DirectSqlConvert`       |

use serde::Serialize;
use tracing::debug;

use crate::engine::GeometryQuery;
use crate::external::ToolError;

use super::axis;
use super::crs::CrsIdentifier;
use super::{route, ArtifactResult, ConversionContext, ConversionError, Converted, WorkingFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Requête unique : filtre de type, reprojection, inversion, tri
    DirectSqlConvert,
    /// Bibliothèque géométrique : aplatissement 2D puis mise en scène WKT
    FallbackLibraryConvert,
    /// Reprojection préalable par l'outil CLI, puis direct ou repli
    ExternalCliReproject,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::DirectSqlConvert => "direct",
            Strategy::FallbackLibraryConvert => "fallback",
            Strategy::ExternalCliReproject => "external",
        }
    }

    pub fn convert(self, ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
        match self {
            Strategy::DirectSqlConvert => direct(ctx, file),
            Strategy::FallbackLibraryConvert => fallback(ctx, file),
            Strategy::ExternalCliReproject => external(ctx, file),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Choix de stratégie à partir du CRS et du résultat du contrôle de type
pub fn plan(crs: CrsIdentifier, exceeding: u64, force_fallback: bool) -> Strategy {
    match crs {
        CrsIdentifier::Unresolved => Strategy::ExternalCliReproject,
        CrsIdentifier::Epsg(_) if exceeding > 0 || force_fallback => {
            Strategy::FallbackLibraryConvert
        }
        CrsIdentifier::Epsg(_) => Strategy::DirectSqlConvert,
    }
}

fn direct(ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
    let config = ctx.config;
    let from = file.epsg()?;
    let column = file.geometry_column()?;

    let decision = axis::evaluate(
        ctx.engine,
        column,
        from,
        config.target_epsg,
        config.flip_threshold,
    )?;

    let query = GeometryQuery::from_column(column.clone())
        .max_shape_type(config.max_simple_shape_type)
        .transform(from, config.target_epsg)
        .flip_axes(decision.flip);
    let rows = ctx.writer.write(ctx.engine, query, &file.artifact)?;

    Ok(Converted::new(Strategy::DirectSqlConvert, rows).with_axis(decision))
}

fn fallback(ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
    let from = file.epsg()?;
    let rows = ctx
        .library
        .load_flattened_wkt(&file.input, from, ctx.config.target_epsg)
        .map_err(ConversionError::library)?;
    debug!(
        source = %file.source.display(),
        staged = rows.len(),
        "Staged flattened geometries"
    );

    let rows = ctx
        .writer
        .write(ctx.engine, GeometryQuery::from_staged_wkt(rows), &file.artifact)?;

    Ok(Converted::new(Strategy::FallbackLibraryConvert, rows))
}

fn external(ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
    let target = ctx.config.target_epsg;
    let scratch = tempfile::Builder::new()
        .prefix("shp2pq-")
        .tempdir()
        .map_err(ToolError::Scratch)?;
    let stem = file.input.file_stem().ok_or_else(|| {
        ConversionError::io(
            &file.input,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
        )
    })?;
    // Le pilote ESRI Shapefile n'écrit un fichier unique que vers un `.shp`
    let mut shp_name = stem.to_os_string();
    shp_name.push(".shp");
    let scratch_input = scratch.path().join(shp_name);

    ctx.tool.reproject(&file.input, &scratch_input, target)?;
    debug!(
        source = %file.source.display(),
        scratch = %scratch_input.display(),
        "Reprojected to scratch copy"
    );

    let relocated = file.relocated(scratch_input, CrsIdentifier::Epsg(target));
    let inner = route(ctx, &relocated);
    drop(scratch);

    let inner = inner?;
    Ok(Converted {
        strategy: Strategy::ExternalCliReproject,
        delegate: Some(inner.strategy),
        ..inner
    })
}
