//! Pipeline de conversion d'un fichier
//!
//! ```text
//! source.shx ─► garde d'idempotence ─► CRS ─┬─ inconnu ─► ExternalCliReproject ─┐
//!                                           └─ EPSG ───────────────────────────┴─► colonne géométrique
//!                                              ─► contrôle de type ─┬─ simple ─► DirectSqlConvert
//!                                                                   └─ Z/M ────► FallbackLibraryConvert
//! ```

pub mod axis;
pub mod batch;
pub mod classify;
pub mod crs;
mod error;
pub mod inspect;
pub mod stats;
pub mod strategy;
pub mod writer;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::{GeometryColumn, SpatialEngine};
use crate::external::{GeometryLibrary, ReprojectionTool};
use crate::report::FileOutcome;

use self::axis::AxisFlipDecision;
use self::crs::CrsIdentifier;
use self::writer::{artifact_path, check_artifact, compute_file_checksum, ArtifactState};

pub use self::error::ConversionError;
pub use self::strategy::{plan, Strategy};
pub use self::writer::SpatialWriter;

/// Collaborateurs d'un worker pour la conversion d'un fichier
pub struct ConversionContext<'a> {
    pub engine: &'a mut dyn SpatialEngine,
    pub tool: &'a dyn ReprojectionTool,
    pub library: &'a dyn GeometryLibrary,
    pub config: &'a PipelineConfig,
    writer: SpatialWriter,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        engine: &'a mut dyn SpatialEngine,
        tool: &'a dyn ReprojectionTool,
        library: &'a dyn GeometryLibrary,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            engine,
            tool,
            library,
            config,
            writer: SpatialWriter::from_config(config),
        }
    }
}

/// Fichier en cours de conversion
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingFile {
    /// Fichier découvert
    pub source: PathBuf,
    /// Fichier effectivement lu (copie reprojetée le cas échéant)
    pub input: PathBuf,
    pub crs: CrsIdentifier,
    pub column: Option<GeometryColumn>,
    pub artifact: PathBuf,
}

impl WorkingFile {
    pub fn new(source: &Path, artifact: &Path, crs: CrsIdentifier) -> Self {
        Self {
            source: source.to_path_buf(),
            input: source.to_path_buf(),
            crs,
            column: None,
            artifact: artifact.to_path_buf(),
        }
    }

    /// Même fichier, lu depuis `input` dans le CRS `crs`
    pub fn relocated(&self, input: PathBuf, crs: CrsIdentifier) -> Self {
        Self {
            input,
            crs,
            column: None,
            ..self.clone()
        }
    }

    pub fn with_column(mut self, column: GeometryColumn) -> Self {
        self.column = Some(column);
        self
    }

    pub fn epsg(&self) -> Result<u32, ConversionError> {
        self.crs
            .epsg()
            .ok_or_else(|| ConversionError::UnresolvedCrs(self.source.display().to_string()))
    }

    pub fn geometry_column(&self) -> Result<&GeometryColumn, ConversionError> {
        self.column
            .as_ref()
            .ok_or_else(|| ConversionError::NoGeometryColumn(self.input.display().to_string()))
    }
}

/// Conversion réussie
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub strategy: Strategy,
    pub delegate: Option<Strategy>,
    pub rows: u64,
    pub axis: Option<AxisFlipDecision>,
    pub complex_records: u64,
}

impl Converted {
    pub fn new(strategy: Strategy, rows: u64) -> Self {
        Self {
            strategy,
            delegate: None,
            rows,
            axis: None,
            complex_records: 0,
        }
    }

    pub fn with_axis(mut self, axis: AxisFlipDecision) -> Self {
        self.axis = Some(axis);
        self
    }
}

pub type ArtifactResult = Result<Converted, ConversionError>;

/// Convertit un fichier source. Ne panique pas et n'échoue pas : tout
/// problème est rapporté dans le [`FileOutcome`].
pub fn convert_file(ctx: &mut ConversionContext<'_>, source: &Path) -> FileOutcome {
    let config = ctx.config;
    let artifact = artifact_path(source, &config.source_extension, &config.output_extension);
    let mut outcome = FileOutcome::new(source, &artifact);

    match check_artifact(&artifact) {
        Ok(ArtifactState::Complete) => {
            info!(artifact = %artifact.display(), "Already processed");
            return outcome.skipped();
        }
        Ok(ArtifactState::Recovered) => {
            warn!(artifact = %artifact.display(), "Removed empty artifact, rebuilding");
        }
        Ok(ArtifactState::Absent) => {}
        Err(e) => {
            warn!(source = %source.display(), error = %e, "Conversion failed");
            return outcome.failed(&e);
        }
    }

    let crs = crs::resolve(
        source,
        &config.sidecar_extension,
        config.crs_policy,
        config.target_epsg,
    );
    outcome.crs = Some(crs);
    debug!(source = %source.display(), %crs, "CRS resolved");

    let file = WorkingFile::new(source, &artifact, crs);
    let result = match crs {
        CrsIdentifier::Unresolved => Strategy::ExternalCliReproject.convert(ctx, &file),
        CrsIdentifier::Epsg(_) => route(ctx, &file),
    };

    match result {
        Ok(converted) => {
            let checksum = match compute_file_checksum(&artifact) {
                Ok(sum) => Some(sum),
                Err(e) => {
                    warn!(artifact = %artifact.display(), error = %e, "Checksum failed");
                    None
                }
            };
            info!(
                source = %source.display(),
                strategy = %converted.strategy,
                rows = converted.rows,
                flip = converted.axis.map(|a| a.flip),
                "Converted"
            );
            outcome.written(converted, checksum)
        }
        Err(e) => {
            warn!(source = %source.display(), error = %e, "Conversion failed");
            outcome.failed(&e)
        }
    }
}

/// Fichier au CRS connu : inspection, contrôle de type, direct ou repli.
///
/// La session moteur libère `file.input` en sortie, succès ou échec.
pub(crate) fn route(ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
    let result = dispatch(ctx, file);
    ctx.engine.release(&file.input);
    result
}

fn dispatch(ctx: &mut ConversionContext<'_>, file: &WorkingFile) -> ArtifactResult {
    let config = ctx.config;
    let column = inspect::first_geometry_column(ctx.engine, &file.input)?;
    let complex_records =
        classify::gate_check(ctx.engine, &column, config.max_simple_shape_type)?;

    let strategy = plan(file.crs, complex_records, config.force_fallback);
    debug!(
        source = %file.source.display(),
        complex_records,
        %strategy,
        "Strategy selected"
    );

    let mut converted = strategy.convert(ctx, &file.clone().with_column(column))?;
    converted.complex_records = complex_records;
    Ok(converted)
}
