//! Configuration du pipeline
//!
//! Priorité : valeurs par défaut < fichier JSON (`--config`) < variables
//! d'environnement (`SHP2PQ_*`) < options de la ligne de commande.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Nombre de workers par défaut
pub const DEFAULT_JOBS: usize = 8;

/// Traitement d'un fichier dont le CRS n'a pas pu être identifié
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsPolicy {
    /// Le CRS reste inconnu : reprojection par l'outil externe (défaut)
    #[default]
    PropagateUnresolved,
    /// Le CRS inconnu est supposé être le CRS cible
    DefaultToStandardCrs,
}

impl std::str::FromStr for CrsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "propagate_unresolved" | "propagate" => Ok(CrsPolicy::PropagateUnresolved),
            "default_to_standard_crs" | "default" | "standard" => {
                Ok(CrsPolicy::DefaultToStandardCrs)
            }
            _ => Err(format!(
                "Invalid CRS policy: {}. Use: propagate_unresolved, default_to_standard_crs",
                s
            )),
        }
    }
}

impl fmt::Display for CrsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsPolicy::PropagateUnresolved => write!(f, "propagate_unresolved"),
            CrsPolicy::DefaultToStandardCrs => write!(f, "default_to_standard_crs"),
        }
    }
}

/// Paramètres d'une conversion
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub crs_policy: CrsPolicy,

    /// EPSG de sortie
    pub target_epsg: u32,

    /// Inversion des axes si le X minimal reprojeté est sous ce seuil
    pub flip_threshold: f64,

    /// Code de type le plus élevé accepté par le chemin direct
    pub max_simple_shape_type: u8,

    pub row_group_size: usize,

    /// Niveau ZSTD (1..=22)
    pub compression_level: i32,

    /// Extension des fichiers découverts
    pub source_extension: String,

    /// Extension du fichier de projection associé
    pub sidecar_extension: String,

    pub output_extension: String,

    /// Exécutable de reprojection
    pub ogr2ogr: String,

    pub ogr_driver: String,

    /// Force le chemin de repli pour tous les fichiers
    pub force_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crs_policy: CrsPolicy::default(),
            target_epsg: 4326,
            flip_threshold: 60.0,
            max_simple_shape_type: shpwkb::MAX_SIMPLE_CODE,
            row_group_size: 15_000,
            compression_level: 22,
            source_extension: "shx".into(),
            sidecar_extension: "prj".into(),
            output_extension: "pq".into(),
            ogr2ogr: "ogr2ogr".into(),
            ogr_driver: "ESRI Shapefile".into(),
            force_fallback: false,
        }
    }
}

impl PipelineConfig {
    /// Charge une configuration depuis un fichier JSON (champs absents = défaut)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Applique les variables d'environnement `SHP2PQ_*`
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SHP2PQ_CRS_POLICY") {
            self.crs_policy = value.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(value) = lookup("SHP2PQ_FLIP_THRESHOLD") {
            self.flip_threshold = value
                .parse()
                .with_context(|| format!("Invalid SHP2PQ_FLIP_THRESHOLD: {}", value))?;
        }
        if let Some(value) = lookup("SHP2PQ_TARGET_EPSG") {
            self.target_epsg = value
                .parse()
                .with_context(|| format!("Invalid SHP2PQ_TARGET_EPSG: {}", value))?;
        }
        if let Some(value) = lookup("SHP2PQ_OGR2OGR") {
            self.ogr2ogr = value;
        }
        Ok(())
    }

    /// Vérifie la cohérence des paramètres
    pub fn validate(&self) -> Result<()> {
        if !self.flip_threshold.is_finite() {
            bail!("flip_threshold must be finite, got {}", self.flip_threshold);
        }
        if self.target_epsg == 0 {
            bail!("target_epsg must be a valid EPSG code");
        }
        if self.row_group_size == 0 {
            bail!("row_group_size must be positive");
        }
        if !(1..=22).contains(&self.compression_level) {
            bail!(
                "compression_level must be between 1 and 22, got {}",
                self.compression_level
            );
        }
        for (name, ext) in [
            ("source_extension", &self.source_extension),
            ("sidecar_extension", &self.sidecar_extension),
            ("output_extension", &self.output_extension),
        ] {
            if ext.is_empty() || ext.starts_with('.') {
                bail!("{} must be a bare extension, got '{}'", name, ext);
            }
        }
        if self.source_extension == self.output_extension {
            bail!("output_extension must differ from source_extension");
        }
        Ok(())
    }
}

/// Nombre de workers depuis `SHP2PQ_JOBS`
pub fn jobs_from_env() -> Option<usize> {
    std::env::var("SHP2PQ_JOBS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n: &usize| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_epsg, 4326);
        assert_eq!(config.flip_threshold, 60.0);
        assert_eq!(config.max_simple_shape_type, 7);
        assert_eq!(config.row_group_size, 15_000);
        assert_eq!(config.compression_level, 22);
        assert_eq!(config.crs_policy, CrsPolicy::PropagateUnresolved);
        config.validate().unwrap();
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "propagate-unresolved".parse::<CrsPolicy>().unwrap(),
            CrsPolicy::PropagateUnresolved
        );
        assert_eq!(
            "DEFAULT_TO_STANDARD_CRS".parse::<CrsPolicy>().unwrap(),
            CrsPolicy::DefaultToStandardCrs
        );
        assert!("guess".parse::<CrsPolicy>().is_err());
        assert_eq!(
            CrsPolicy::DefaultToStandardCrs.to_string(),
            "default_to_standard_crs"
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"flip_threshold": 45.5, "crs_policy": "default_to_standard_crs"}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.flip_threshold, 45.5);
        assert_eq!(config.crs_policy, CrsPolicy::DefaultToStandardCrs);
        assert_eq!(config.row_group_size, 15_000);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHP2PQ_CRS_POLICY", "default"),
            ("SHP2PQ_FLIP_THRESHOLD", "55"),
            ("SHP2PQ_OGR2OGR", "/opt/gdal/bin/ogr2ogr"),
        ]
        .into_iter()
        .collect();

        let mut config = PipelineConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.crs_policy, CrsPolicy::DefaultToStandardCrs);
        assert_eq!(config.flip_threshold, 55.0);
        assert_eq!(config.ogr2ogr, "/opt/gdal/bin/ogr2ogr");
        assert_eq!(config.target_epsg, 4326);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = PipelineConfig::default();
        let result = config.apply_vars(|key| {
            (key == "SHP2PQ_TARGET_EPSG").then(|| "wgs84".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig {
            compression_level: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.compression_level = 22;
        config.output_extension = ".pq".into();
        assert!(config.validate().is_err());

        config.output_extension = "shx".into();
        assert!(config.validate().is_err());

        config.output_extension = "pq".into();
        config.flip_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }
}
