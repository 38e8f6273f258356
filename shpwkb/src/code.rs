//! Codes de type de géométrie dans l'en-tête WKB
//!
//! L'en-tête WKB est `[ordre des octets: u8][type: u32]`. Le "code de type"
//! utilisé pour le routage est l'octet de poids faible du champ type :
//! `1..=7` pour les types 2D simples, `233` pour POINT Z (1001 = 0x03E9),
//! `235` pour POLYGON Z (1003 = 0x03EB), etc.

/// Code le plus élevé des types 2D simples (Point .. GeometryCollection)
pub const MAX_SIMPLE_CODE: u8 = 7;

const WKB_BIG_ENDIAN: u8 = 0;
const WKB_LITTLE_ENDIAN: u8 = 1;

/// Famille de géométrie OGC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
}

/// Dimensions portées par les coordonnées
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimension {
    #[default]
    Xy,
    Xyz,
    Xym,
}

impl Dimension {
    fn iso_offset(self) -> u32 {
        match self {
            Dimension::Xy => 0,
            Dimension::Xyz => 1000,
            Dimension::Xym => 2000,
        }
    }
}

/// Identifiant de type WKB ISO (ex: POLYGON Z = 1003)
pub fn iso_type_id(kind: GeometryKind, dim: Dimension) -> u32 {
    kind as u32 + dim.iso_offset()
}

/// Décode le code de type depuis les octets WKB bruts.
///
/// Retourne `None` pour une géométrie nulle ou un en-tête tronqué.
pub fn shape_type_code(wkb: Option<&[u8]>) -> Option<u8> {
    let header = wkb?.get(..5)?;
    match header[0] {
        WKB_LITTLE_ENDIAN => Some(header[1]),
        WKB_BIG_ENDIAN => Some(header[4]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_type_ids() {
        assert_eq!(iso_type_id(GeometryKind::Point, Dimension::Xy), 1);
        assert_eq!(iso_type_id(GeometryKind::Polygon, Dimension::Xyz), 1003);
        assert_eq!(iso_type_id(GeometryKind::MultiLineString, Dimension::Xym), 2005);
    }

    #[test]
    fn test_little_endian_polygon_z_is_235() {
        let wkb = [1u8, 0xEB, 0x03, 0x00, 0x00, 0, 0, 0, 0];
        assert_eq!(shape_type_code(Some(&wkb)), Some(235));
    }

    #[test]
    fn test_big_endian_uses_low_order_byte() {
        let wkb = [0u8, 0x00, 0x00, 0x00, 0x03, 0, 0, 0, 0];
        assert_eq!(shape_type_code(Some(&wkb)), Some(3));
    }

    #[test]
    fn test_null_and_truncated() {
        assert_eq!(shape_type_code(None), None);
        assert_eq!(shape_type_code(Some(&[1u8, 3])), None);
        assert_eq!(shape_type_code(Some(&[7u8, 1, 0, 0, 0])), None);
    }
}
