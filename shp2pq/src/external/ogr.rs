//! Reprojection par l'outil `ogr2ogr`

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Scratch directory error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Réécrit un jeu de données complet dans un autre système de coordonnées
pub trait ReprojectionTool: Send + Sync {
    fn reproject(
        &self,
        source: &Path,
        destination: &Path,
        target_epsg: u32,
    ) -> Result<(), ToolError>;
}

/// Appel de `ogr2ogr -f <driver> -t_srs EPSG:<code> <destination> <source>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ogr2Ogr {
    program: String,
    driver: String,
}

impl Default for Ogr2Ogr {
    fn default() -> Self {
        Self::new("ogr2ogr", "ESRI Shapefile")
    }
}

impl Ogr2Ogr {
    pub fn new(program: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            driver: driver.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self, source: &Path, destination: &Path, target_epsg: u32) -> Vec<OsString> {
        vec![
            "-f".into(),
            self.driver.clone().into(),
            "-t_srs".into(),
            format!("EPSG:{}", target_epsg).into(),
            destination.as_os_str().to_owned(),
            source.as_os_str().to_owned(),
        ]
    }

    fn command_line(&self, args: &[OsString]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

impl ReprojectionTool for Ogr2Ogr {
    fn reproject(
        &self,
        source: &Path,
        destination: &Path,
        target_epsg: u32,
    ) -> Result<(), ToolError> {
        let args = self.arguments(source, destination, target_epsg);
        let command = self.command_line(&args);
        debug!(%command, "Running reprojection tool");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ToolError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
