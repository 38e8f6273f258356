//! Résolution du CRS d'un fichier à partir de son `.prj`

use std::path::Path;

use serde::Serialize;
use shpwkb::prj::read_epsg;
use shpwkb::ShpError;
use tracing::{debug, warn};

use crate::config::CrsPolicy;

/// CRS d'un fichier source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsIdentifier {
    Epsg(u32),
    Unresolved,
}

impl CrsIdentifier {
    pub fn epsg(self) -> Option<u32> {
        match self {
            CrsIdentifier::Epsg(code) => Some(code),
            CrsIdentifier::Unresolved => None,
        }
    }
}

impl std::fmt::Display for CrsIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrsIdentifier::Epsg(code) => write!(f, "EPSG:{}", code),
            CrsIdentifier::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// Identifie le CRS du fichier compagnon `<source>.<sidecar_extension>`.
///
/// Absence, illisibilité ou définition non reconnue donnent `Unresolved` ;
/// aucune erreur n'est remontée.
pub fn identify(source: &Path, sidecar_extension: &str) -> CrsIdentifier {
    let sidecar = source.with_extension(sidecar_extension);
    match read_epsg(&sidecar) {
        Ok(Some(code)) => CrsIdentifier::Epsg(code),
        Ok(None) => {
            debug!(sidecar = %sidecar.display(), "No authority match for projection");
            CrsIdentifier::Unresolved
        }
        Err(ShpError::MissingFile(_)) => {
            debug!(sidecar = %sidecar.display(), "No projection file");
            CrsIdentifier::Unresolved
        }
        Err(e) => {
            warn!(sidecar = %sidecar.display(), error = %e, "Unreadable projection file");
            CrsIdentifier::Unresolved
        }
    }
}

/// Applique la politique pour les CRS inconnus
pub fn apply_policy(crs: CrsIdentifier, policy: CrsPolicy, standard_epsg: u32) -> CrsIdentifier {
    match (crs, policy) {
        (CrsIdentifier::Unresolved, CrsPolicy::DefaultToStandardCrs) => {
            CrsIdentifier::Epsg(standard_epsg)
        }
        (crs, _) => crs,
    }
}

/// `identify` suivi de `apply_policy`
pub fn resolve(
    source: &Path,
    sidecar_extension: &str,
    policy: CrsPolicy,
    standard_epsg: u32,
) -> CrsIdentifier {
    apply_policy(identify(source, sidecar_extension), policy, standard_epsg)
}
