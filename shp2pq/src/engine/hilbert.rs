//! Clé de tri sur courbe de Hilbert
//!
//! Chaque coordonnée `f64` est projetée sur un `u64` qui conserve l'ordre,
//! puis les deux entiers sont entrelacés le long d'une courbe de Hilbert
//! à 64 niveaux (transformation de Skilling). La clé tient sur un `u128`.

use geo::{Centroid, Geometry};

const DIMENSIONS: usize = 2;

/// Projette un flottant sur un entier non signé de même ordre.
///
/// `-0.0` et `0.0` donnent la même valeur.
pub fn order_preserving_bits(value: f64) -> u64 {
    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

/// Index de Hilbert de `coords` sur une grille de `2^bits` cellules par axe.
pub fn hilbert_index(coords: [u64; DIMENSIONS], bits: u32) -> u128 {
    debug_assert!((1..=64).contains(&bits));
    let mut x = coords;
    let m: u64 = 1 << (bits - 1);

    // Axes -> transposée de Hilbert
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..DIMENSIONS {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Code de Gray
    for i in 1..DIMENSIONS {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[DIMENSIONS - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for v in x.iter_mut() {
        *v ^= t;
    }

    let mut key: u128 = 0;
    for b in (0..bits).rev() {
        for v in x {
            key = (key << 1) | u128::from((v >> b) & 1);
        }
    }
    key
}

/// Clé de Hilbert d'un point, ordre des axes (lat, lon)
pub fn encode_lat_lon(lat: f64, lon: f64) -> u128 {
    hilbert_index(
        [order_preserving_bits(lat), order_preserving_bits(lon)],
        64,
    )
}

/// Clé de tri d'une géométrie : Hilbert de son centroïde `(y, x)`.
///
/// `None` pour une géométrie vide (pas de centroïde).
pub fn centroid_key(geometry: &Geometry) -> Option<u128> {
    geometry
        .centroid()
        .map(|c| encode_lat_lon(c.y(), c.x()))
}
