//! Heuristique d'inversion des axes
//!
//! Pour une région dont les longitudes dépassent toutes le seuil, un X
//! minimal reprojeté sous le seuil signale des axes (lat, lon) : il faut
//! les échanger.

use serde::Serialize;
use tracing::debug;

use crate::engine::{GeometryColumn, SpatialEngine};

use super::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisFlipDecision {
    /// X minimal de l'étendue reprojetée
    pub min_x: Option<f64>,
    pub flip: bool,
}

/// Inversion si `min_x < threshold`. Pas d'inversion sans étendue.
pub fn decide(min_x: Option<f64>, threshold: f64) -> AxisFlipDecision {
    AxisFlipDecision {
        min_x,
        flip: min_x.is_some_and(|x| x < threshold),
    }
}

/// Mesure l'étendue reprojetée puis décide
pub fn evaluate(
    engine: &mut dyn SpatialEngine,
    column: &GeometryColumn,
    from_epsg: u32,
    to_epsg: u32,
    threshold: f64,
) -> Result<AxisFlipDecision, ConversionError> {
    let min_x = engine
        .min_transformed_x(column, from_epsg, to_epsg)
        .map_err(ConversionError::engine)?;
    let decision = decide(min_x, threshold);
    debug!(
        source = %column.source().display(),
        ?min_x,
        threshold,
        flip = decision.flip,
        "Axis order check"
    );
    Ok(decision)
}
