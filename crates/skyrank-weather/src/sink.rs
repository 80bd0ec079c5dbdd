//! Destinations for reduced per-city rows.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use skyrank_core::OutputFormat;

use crate::error::SinkError;
use crate::types::{CityStat, DayStat};

/// Receives one row per reduced city, in reporting order
pub trait CitySink {
    fn put(&mut self, city: &CityStat) -> Result<(), SinkError>;

    /// Flush everything written so far
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Serialized shape of a city row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRow {
    pub city: String,
    pub days: Vec<DayStat>,
    pub avg_temp: Option<f64>,
    pub avg_dry: Option<f64>,
}

impl From<&CityStat> for CityRow {
    fn from(stat: &CityStat) -> Self {
        Self {
            city: stat.city.clone(),
            days: stat.days.clone(),
            avg_temp: stat.avg_temp(),
            avg_dry: stat.avg_dry(),
        }
    }
}

/// Keeps rows in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<CityRow>,
}

impl CitySink for MemorySink {
    fn put(&mut self, city: &CityStat) -> Result<(), SinkError> {
        self.rows.push(CityRow::from(city));
        Ok(())
    }
}

/// Writes all rows as one JSON array when finished
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    rows: Vec<CityRow>,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rows: Vec::new(),
        }
    }
}

impl CitySink for JsonSink {
    fn put(&mut self, city: &CityStat) -> Result<(), SinkError> {
        self.rows.push(CityRow::from(city));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &self.rows)?;
        writer.flush()?;
        tracing::info!("Wrote {} cities to {}", self.rows.len(), self.path.display());
        Ok(())
    }
}

/// Writes one CSV record per city: `city, day_1..day_n, avg_temp, avg_dry`.
///
/// The header is sized from the first city; the file is created on the
/// first row so an empty run leaves nothing behind.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            rows: 0,
        }
    }

    fn open(&self, days: usize) -> Result<csv::Writer<File>, SinkError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let mut header = vec!["city".to_string()];
        header.extend((1..=days).map(|i| format!("day_{}", i)));
        header.push("avg_temp".to_string());
        header.push("avg_dry".to_string());
        writer.write_record(&header)?;
        Ok(writer)
    }
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl CitySink for CsvSink {
    fn put(&mut self, city: &CityStat) -> Result<(), SinkError> {
        if self.writer.is_none() {
            self.writer = Some(self.open(city.days.len())?);
        }

        let mut record = Vec::with_capacity(city.days.len() + 3);
        record.push(city.city.clone());
        record.extend(
            city.days
                .iter()
                .map(|d| format!("{}/{}", d.avg_temp, d.dry_hours)),
        );
        record.push(optional_cell(city.avg_temp()));
        record.push(optional_cell(city.avg_dry()));

        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(&record)?;
            self.rows += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            tracing::info!("Wrote {} cities to {}", self.rows, self.path.display());
        }
        Ok(())
    }
}

/// Build the sink for `format` writing to `path`
pub fn create_sink(format: OutputFormat, path: &Path) -> Box<dyn CitySink + Send> {
    match format {
        OutputFormat::Json => Box::new(JsonSink::new(path)),
        OutputFormat::Csv => Box::new(CsvSink::new(path)),
    }
}
