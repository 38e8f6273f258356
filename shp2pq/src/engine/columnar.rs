//! Écriture (et relecture) d'une colonne WKB en Parquet

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{Array, ArrayRef, BinaryArray, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

/// Destination colonnaire d'un export
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarSink {
    pub path: PathBuf,
    pub column: String,
    pub row_group_size: usize,
    pub compression_level: i32,
}

impl ColumnarSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            column: "geom".to_string(),
            row_group_size: 15_000,
            compression_level: 22,
        }
    }

    pub fn row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = rows;
        self
    }

    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    fn properties(&self) -> Result<WriterProperties> {
        let level = ZstdLevel::try_new(self.compression_level)
            .with_context(|| format!("Invalid ZSTD level {}", self.compression_level))?;
        Ok(WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .set_max_row_group_size(self.row_group_size.max(1))
            .build())
    }
}

/// Écrit les géométries WKB (déjà ordonnées) dans `sink.path`.
///
/// Retourne le nombre de lignes écrites.
pub fn write_wkb_column(sink: &ColumnarSink, rows: &[Vec<u8>]) -> Result<u64> {
    let schema = Arc::new(Schema::new(vec![Field::new(
        &sink.column,
        DataType::Binary,
        false,
    )]));

    let properties = sink.properties()?;
    let file = File::create(&sink.path)
        .with_context(|| format!("Failed to create {}", sink.path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(properties))
        .context("Failed to open Parquet writer")?;

    for chunk in rows.chunks(sink.row_group_size.max(1)) {
        let array: ArrayRef = Arc::new(BinaryArray::from_iter_values(chunk.iter()));
        let batch = RecordBatch::try_new(schema.clone(), vec![array])
            .context("Failed to build record batch")?;
        writer.write(&batch).context("Failed to write record batch")?;
    }

    writer.close().context("Failed to finalize Parquet file")?;
    Ok(rows.len() as u64)
}

/// Contenu relu d'un artefact Parquet
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarContent {
    pub rows: Vec<Vec<u8>>,
    pub row_groups: usize,
    pub compression: Option<Compression>,
}

/// Relit la première colonne binaire d'un fichier Parquet
pub fn read_wkb_column(path: &Path) -> Result<ColumnarContent> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("Not a Parquet file: {}", path.display()))?;

    let metadata = builder.metadata().clone();
    let row_groups = metadata.num_row_groups();
    let compression = (row_groups > 0).then(|| metadata.row_group(0).column(0).compression());

    let mut rows = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<BinaryArray>()
            .context("First column is not binary")?;
        for i in 0..column.len() {
            rows.push(column.value(i).to_vec());
        }
    }

    Ok(ColumnarContent {
        rows,
        row_groups,
        compression,
    })
}
