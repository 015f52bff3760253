use crate::report::ReportTable;
use crate::types::{CategoryCounts, Config, OutputFormat};
use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Writes report tables to Parquet or CSV files
#[derive(Debug, Default)]
pub struct OutputWriter;

impl OutputWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write one table into the configured output directory
    pub fn write_table(&self, config: &Config, table: &ReportTable) -> Result<PathBuf> {
        std::fs::create_dir_all(&config.output_dir)?;

        let filename = self.generate_filename(config, table);
        let output_path = config.output_dir.join(&filename);

        match config.out_format {
            OutputFormat::Parquet => write_parquet(&output_path, table)?,
            OutputFormat::Csv => write_csv(&output_path, table)?,
        }

        info!("Wrote {} rows to {}", table.num_rows(), output_path.display());
        Ok(output_path)
    }

    /// `{report}_{table}_{groups}_{timestamp}.{ext}`
    fn generate_filename(&self, config: &Config, table: &ReportTable) -> String {
        let groups = match table.group() {
            Some(group) => group.to_string(),
            None => config.sources.join("+"),
        };
        let groups = groups.replace(['/', '\\', ' '], "-");

        format!(
            "{}_{}_{}_{}.{}",
            config.report,
            table.name(),
            groups,
            Utc::now().format("%Y%m%dT%H%M%S"),
            config.out_format.extension()
        )
    }
}

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn str_column<'a, T: 'a>(rows: &'a [T], value: impl Fn(&'a T) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(value).collect::<Vec<_>>()))
}

fn f64_column<T>(rows: &[T], value: impl Fn(&T) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(value).collect::<Vec<_>>()))
}

fn proportions_batch(rows: &[CategoryCounts]) -> Result<RecordBatch> {
    let categories = rows.first().map(|r| r.categories.clone()).unwrap_or_default();

    let mut fields = vec![utf8("group")];
    let mut columns = vec![str_column(rows, |r| r.group.as_str())];

    let proportions: Vec<Vec<f64>> = rows.iter().map(|r| r.proportions()).collect();
    for (i, category) in categories.iter().enumerate() {
        fields.push(Field::new(format!("{}_count", category), DataType::UInt64, false));
        columns.push(Arc::new(UInt64Array::from(
            rows.iter().map(|r| r.counts[i]).collect::<Vec<_>>(),
        )));
        // Proportions stay NaN for groups without any requested track
        fields.push(Field::new(category.as_str(), DataType::Float64, false));
        columns.push(f64_column(&proportions, |p| p[i]));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Convert a table into a single Arrow record batch
pub fn to_record_batch(table: &ReportTable) -> Result<RecordBatch> {
    let (fields, columns): (Vec<Field>, Vec<ArrayRef>) = match table {
        ReportTable::Proportions(rows) => return proportions_batch(rows),
        ReportTable::TrackSpeeds(rows) => (
            vec![
                utf8("group"),
                utf8("track_id"),
                utf8("category"),
                Field::new("mean_speed", DataType::Float64, false),
            ],
            vec![
                str_column(rows, |r| r.group.as_str()),
                str_column(rows, |r| r.track_id.as_str()),
                str_column(rows, |r| r.category.as_str()),
                f64_column(rows, |r| r.mean_speed),
            ],
        ),
        ReportTable::Histogram(rows) => (
            vec![
                utf8("group"),
                utf8("category"),
                Field::new("lower", DataType::Float64, false),
                Field::new("upper", DataType::Float64, false),
                Field::new("count", DataType::UInt64, false),
                Field::new("percent", DataType::Float64, false),
            ],
            vec![
                str_column(rows, |r| r.group.as_str()),
                str_column(rows, |r| r.category.as_str()),
                f64_column(rows, |r| r.lower),
                f64_column(rows, |r| r.upper),
                Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.count))) as ArrayRef,
                f64_column(rows, |r| r.percent),
            ],
        ),
        ReportTable::SpeedGrid { grid, .. } => {
            // Dense long format, row-major from y_min; empty cells are null
            let (w, h) = (grid.width(), grid.height());
            let cx: Vec<u32> = (0..h).flat_map(|_| 0..w as u32).collect();
            let cy: Vec<u32> = (0..h as u32).flat_map(|y| std::iter::repeat(y).take(w)).collect();
            let means: Vec<Option<f64>> = grid
                .values()
                .iter()
                .map(|v| (!v.is_nan()).then_some(*v))
                .collect();
            (
                vec![
                    Field::new("cx", DataType::UInt32, false),
                    Field::new("cy", DataType::UInt32, false),
                    Field::new("count", DataType::UInt32, false),
                    Field::new("mean_speed", DataType::Float64, true),
                ],
                vec![
                    Arc::new(UInt32Array::from(cx)) as ArrayRef,
                    Arc::new(UInt32Array::from(cy)) as ArrayRef,
                    Arc::new(UInt32Array::from(grid.counts().to_vec())) as ArrayRef,
                    Arc::new(Float64Array::from(means)) as ArrayRef,
                ],
            )
        }
        ReportTable::Trajectories { group, points } => (
            vec![
                utf8("group"),
                utf8("category"),
                Field::new("x", DataType::Float64, false),
                Field::new("y", DataType::Float64, false),
            ],
            vec![
                Arc::new(StringArray::from(vec![group.as_str(); points.len()])) as ArrayRef,
                str_column(points, |p| p.category.as_str()),
                f64_column(points, |p| p.x),
                f64_column(points, |p| p.y),
            ],
        ),
    };

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn write_parquet(path: &Path, table: &ReportTable) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(path: &Path, table: &ReportTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    match table {
        ReportTable::Proportions(rows) => {
            let categories = rows.first().map(|r| r.categories.clone()).unwrap_or_default();
            let mut header = vec!["group".to_string()];
            for category in &categories {
                header.push(format!("{}_count", category));
                header.push(category.to_string());
            }
            wtr.write_record(&header)?;

            for row in rows {
                let mut record = vec![row.group.clone()];
                for (count, proportion) in row.counts.iter().zip(row.proportions()) {
                    record.push(count.to_string());
                    record.push(proportion.to_string());
                }
                wtr.write_record(&record)?;
            }
        }
        ReportTable::TrackSpeeds(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportTable::Histogram(rows) => {
            for row in rows {
                wtr.serialize(row)?;
            }
        }
        ReportTable::SpeedGrid { grid, .. } => {
            wtr.write_record(["cx", "cy", "count", "mean_speed"])?;
            for cy in 0..grid.height() {
                for cx in 0..grid.width() {
                    wtr.serialize((cx, cy, grid.count(cx, cy), grid.value(cx, cy)))?;
                }
            }
        }
        ReportTable::Trajectories { group, points } => {
            wtr.write_record(["group", "category", "x", "y"])?;
            for p in points {
                wtr.serialize((group, p.category, p.x, p.y))?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
