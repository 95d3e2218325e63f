//! Parquet persistence for the visit feature table.
//!
//! The feature table is the handoff between the two pipeline stages, so it
//! round-trips through this module: [`write_feature_table`] after the
//! feature builder, [`read_feature_table`] before the anomaly engine.
//! Snappy compression; nullable columns only where a feature can genuinely
//! be absent (coordinates, interval, generation rate).

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use ww_core::{GeoPoint, SpId};
use ww_features::VisitFeatureRow;

use crate::atomic::atomic_write;
use crate::error::{OutputError, OutputResult};

fn feature_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("service_point", DataType::Utf8,    false),
        Field::new("visit_date",    DataType::Date32,  false),
        Field::new("load_kg",       DataType::Float64, false),
        Field::new("capacity_kg",   DataType::Float64, false),
        Field::new("fill_ratio",    DataType::Float64, false),
        Field::new("lat",           DataType::Float64, true),
        Field::new("lon",           DataType::Float64, true),
        Field::new("interval_days", DataType::Float64, true),
        Field::new("gen_rate",      DataType::Float64, true),
        Field::new("load_mean6",    DataType::Float64, false),
        Field::new("load_std6",     DataType::Float64, false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

// ── Write ─────────────────────────────────────────────────────────────────────

/// Persist the feature table to `path` (atomically; see [`crate::atomic`]).
///
/// An empty table writes a valid zero-row file — downstream tolerates it.
pub fn write_feature_table(path: &Path, rows: &[VisitFeatureRow]) -> OutputResult<()> {
    atomic_write(path, |tmp| {
        let schema = feature_schema();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.service_point.as_str()),
            )),
            Arc::new(Date32Array::from_iter_values(
                rows.iter()
                    .map(|r| (r.visit_date - epoch()).num_days() as i32),
            )),
            float_col(rows, |r| Some(r.load_kg)),
            float_col(rows, |r| Some(r.capacity_kg)),
            float_col(rows, |r| Some(r.fill_ratio)),
            float_col(rows, |r| r.geo.map(|g| g.lat)),
            float_col(rows, |r| r.geo.map(|g| g.lon)),
            float_col(rows, |r| r.interval_days),
            float_col(rows, |r| r.gen_rate),
            float_col(rows, |r| Some(r.load_mean6)),
            float_col(rows, |r| Some(r.load_std6)),
        ];

        let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;
        let mut writer = ArrowWriter::try_new(File::create(tmp)?, schema, Some(snappy_props()))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    })?;

    tracing::info!(rows = rows.len(), path = %path.display(), "feature table written");
    Ok(())
}

fn float_col<F>(rows: &[VisitFeatureRow], get: F) -> ArrayRef
where
    F: Fn(&VisitFeatureRow) -> Option<f64>,
{
    Arc::new(rows.iter().map(get).collect::<Float64Array>())
}

// ── Read ──────────────────────────────────────────────────────────────────────

/// Reload a feature table written by [`write_feature_table`].
pub fn read_feature_table(path: &Path) -> OutputResult<Vec<VisitFeatureRow>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        decode_batch(&batch, &mut rows)?;
    }
    Ok(rows)
}

fn decode_batch(batch: &RecordBatch, rows: &mut Vec<VisitFeatureRow>) -> OutputResult<()> {
    let sp = string_column(batch, "service_point")?;
    let date = date_column(batch, "visit_date")?;
    let load = float_column(batch, "load_kg")?;
    let capacity = float_column(batch, "capacity_kg")?;
    let fill = float_column(batch, "fill_ratio")?;
    let lat = float_column(batch, "lat")?;
    let lon = float_column(batch, "lon")?;
    let interval = float_column(batch, "interval_days")?;
    let gen_rate = float_column(batch, "gen_rate")?;
    let mean6 = float_column(batch, "load_mean6")?;
    let std6 = float_column(batch, "load_std6")?;

    for i in 0..batch.num_rows() {
        let geo = match (opt(lat, i), opt(lon, i)) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };
        rows.push(VisitFeatureRow {
            service_point: SpId::from(sp.value(i)),
            visit_date:    epoch() + chrono::TimeDelta::days(date.value(i) as i64),
            load_kg:       load.value(i),
            capacity_kg:   capacity.value(i),
            fill_ratio:    fill.value(i),
            geo,
            interval_days: opt(interval, i),
            gen_rate:      opt(gen_rate, i),
            load_mean6:    mean6.value(i),
            load_std6:     std6.value(i),
        });
    }
    Ok(())
}

fn opt(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> OutputResult<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| OutputError::Schema(format!("missing column `{name}`")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> OutputResult<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| OutputError::Schema(format!("column `{name}` is not Utf8")))
}

fn date_column<'a>(batch: &'a RecordBatch, name: &str) -> OutputResult<&'a Date32Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| OutputError::Schema(format!("column `{name}` is not Date32")))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> OutputResult<&'a Float64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| OutputError::Schema(format!("column `{name}` is not Float64")))
}
