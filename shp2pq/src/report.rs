//! Rapport de conversion d'un lot
//!
//! Chaque fichier produit un [`FileOutcome`] ; un échec n'interrompt jamais
//! le lot et devient une ligne du rapport.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::pipeline::axis::AxisFlipDecision;
use crate::pipeline::crs::CrsIdentifier;
use crate::pipeline::{ConversionError, Converted, Strategy};

/// Statut global du lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchStatus {
    /// Tous les fichiers sont convertis ou déjà à jour
    Success,
    /// Certains fichiers ont échoué
    PartialSuccess,
    /// Aucun fichier n'a abouti
    Failed,
}

/// Statut d'un fichier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Written,
    /// Artefact déjà présent et non vide
    Skipped,
    Failed,
}

/// Résultat de la conversion d'un fichier
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: String,
    pub artifact: String,
    pub status: FileStatus,
    pub crs: Option<CrsIdentifier>,
    pub strategy: Option<Strategy>,
    /// Stratégie exécutée sur la copie reprojetée
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Strategy>,
    pub axis: Option<AxisFlipDecision>,
    /// Enregistrements dont le code de type dépasse le jeu simple
    pub complex_records: u64,
    pub rows: u64,
    /// BLAKE3 de l'artefact écrit
    pub checksum: Option<String>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn new(source: &Path, artifact: &Path) -> Self {
        Self {
            source: source.display().to_string(),
            artifact: artifact.display().to_string(),
            status: FileStatus::Failed,
            crs: None,
            strategy: None,
            delegate: None,
            axis: None,
            complex_records: 0,
            rows: 0,
            checksum: None,
            error: None,
        }
    }

    pub fn skipped(mut self) -> Self {
        self.status = FileStatus::Skipped;
        self
    }

    pub fn written(mut self, converted: Converted, checksum: Option<String>) -> Self {
        self.status = FileStatus::Written;
        self.strategy = Some(converted.strategy);
        self.delegate = converted.delegate;
        self.axis = converted.axis;
        self.complex_records = converted.complex_records;
        self.rows = converted.rows;
        self.checksum = checksum;
        self
    }

    pub fn failed(self, error: &ConversionError) -> Self {
        self.failed_with(error.to_string())
    }

    pub fn failed_with(mut self, message: impl Into<String>) -> Self {
        self.status = FileStatus::Failed;
        self.error = Some(message.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == FileStatus::Failed
    }
}

/// Rapport complet d'un lot
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Racine parcourue
    pub path: String,
    pub duration_secs: f64,
    pub status: BatchStatus,

    pub files_total: usize,
    pub files_written: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub rows_written: u64,

    /// Fichiers écrits par stratégie
    pub by_strategy: BTreeMap<Strategy, usize>,
    pub axis_flips: usize,

    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            duration_secs: 0.0,
            status: BatchStatus::Success,
            files_total: 0,
            files_written: 0,
            files_skipped: 0,
            files_failed: 0,
            rows_written: 0,
            by_strategy: BTreeMap::new(),
            axis_flips: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_total += 1;
        match outcome.status {
            FileStatus::Written => {
                self.files_written += 1;
                self.rows_written += outcome.rows;
                if let Some(strategy) = outcome.strategy {
                    *self.by_strategy.entry(strategy).or_default() += 1;
                }
                if outcome.axis.is_some_and(|a| a.flip) {
                    self.axis_flips += 1;
                }
            }
            FileStatus::Skipped => self.files_skipped += 1,
            FileStatus::Failed => self.files_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        let has_success = self.files_written > 0 || self.files_skipped > 0;
        self.status = if self.files_failed == 0 {
            BatchStatus::Success
        } else if has_success {
            BatchStatus::PartialSuccess
        } else {
            BatchStatus::Failed
        };
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CONVERSION REPORT - {}", self.path);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Files: {} total, {} written, {} skipped, {} failed",
            self.files_total, self.files_written, self.files_skipped, self.files_failed
        );
        println!(
            "Rows: {} written, {} files with swapped axes",
            self.rows_written, self.axis_flips
        );

        if !self.by_strategy.is_empty() {
            println!("\n--- BY STRATEGY ---");
            for (strategy, count) in &self.by_strategy {
                println!("  {}: {}", strategy, count);
            }
        }

        if self.files_failed > 0 {
            println!("\n--- ERRORS ({}) ---", self.files_failed);
            for outcome in self.failures().take(20) {
                println!(
                    "  [{}] {}",
                    outcome.source,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            if self.files_failed > 20 {
                println!("  ... and {} more", self.files_failed - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} written, {} skipped, {} failed, {} rows",
            self.path, self.files_written, self.files_skipped, self.files_failed, self.rows_written
        )
    }
}
