//! Classification des types de géométrie
//!
//! Le code de type est l'octet de poids faible du type WKB : `1..=7` pour les
//! types 2D simples, au-delà pour Z/M (ex: 235 pour POLYGON Z).

use std::collections::BTreeMap;

use serde::Serialize;
use shpwkb::shape_type_code;

use crate::engine::{GeometryColumn, SpatialEngine};

use super::ConversionError;

/// Répartition des enregistrements par code de type.
///
/// Les géométries nulles sont comptées dans le seau `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShapeTypeHistogram(BTreeMap<u8, u64>);

impl ShapeTypeHistogram {
    pub fn record(&mut self, code: Option<u8>) {
        *self.0.entry(code.unwrap_or(0)).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn count(&self, code: u8) -> u64 {
        self.0.get(&code).copied().unwrap_or(0)
    }

    /// Nombre d'enregistrements dont le code dépasse `max`
    pub fn exceeding(&self, max: u8) -> u64 {
        self.0
            .iter()
            .filter(|(code, _)| **code > max)
            .map(|(_, n)| n)
            .sum()
    }

    /// `(code, nombre)` par code croissant
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.0.iter().map(|(code, n)| (*code, *n))
    }
}

/// Histogramme complet d'une colonne
pub fn histogram(
    engine: &mut dyn SpatialEngine,
    column: &GeometryColumn,
) -> Result<ShapeTypeHistogram, ConversionError> {
    let mut histogram = ShapeTypeHistogram::default();
    engine
        .scan_wkb(column, &mut |wkb| histogram.record(shape_type_code(wkb)))
        .map_err(ConversionError::engine)?;
    Ok(histogram)
}

/// Nombre d'enregistrements non nuls dont le code dépasse `max_simple`.
///
/// Zéro : le chemin direct peut traiter le fichier.
pub fn gate_check(
    engine: &mut dyn SpatialEngine,
    column: &GeometryColumn,
    max_simple: u8,
) -> Result<u64, ConversionError> {
    let mut exceeding = 0u64;
    engine
        .scan_wkb(column, &mut |wkb| {
            if shape_type_code(wkb).is_some_and(|code| code > max_simple) {
                exceeding += 1;
            }
        })
        .map_err(ConversionError::engine)?;
    Ok(exceeding)
}
