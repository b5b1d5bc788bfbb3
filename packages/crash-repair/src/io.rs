//! CSV input/output for tracking recordings
//!
//! Recordings come from an upstream exporter that is loose about types:
//! timestamps can be blank or non-numeric, counters may be written as floats
//! and flags as `True`/`False`. Fields are coerced rather than rejected so the
//! resampler can drop bad rows later.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::{RepairError, Result};
use crate::types::{TimeSeries, TrackingSample};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Numeric field; anything unparseable becomes NaN
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawField::deserialize(deserializer)? {
        RawField::Number(v) => v,
        RawField::Bool(_) => f64::NAN,
        RawField::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
    })
}

/// Integer counter written either as `3` or `3.0`
pub(crate) fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawField::deserialize(deserializer)? {
        RawField::Number(v) => v,
        RawField::Bool(b) => f64::from(u8::from(b)),
        RawField::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            serde::de::Error::custom(format!("invalid crash_count value '{}'", s))
        })?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "invalid crash_count value {}",
            value
        )));
    }
    Ok(value.round() as i64)
}

/// Flag written as `True`/`False`, `true`/`false` or `1`/`0`
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match RawField::deserialize(deserializer)? {
        RawField::Bool(b) => Ok(b),
        RawField::Number(v) => Ok(v != 0.0),
        RawField::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid did_crash value '{}'",
                other
            ))),
        },
    }
}

/// Read a tracking CSV from any reader
pub fn read_tracking<R: std::io::Read>(reader: R) -> Result<TimeSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for record in csv_reader.deserialize::<TrackingSample>() {
        samples.push(record?);
    }

    Ok(TimeSeries::new(samples))
}

/// Read a tracking CSV file
pub fn read_tracking_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeries> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RepairError::FileNotFound(path.display().to_string()));
    }

    let file = std::fs::File::open(path)?;
    let series = read_tracking(file)?;
    log::debug!("Read {} samples from {}", series.len(), path.display());
    Ok(series)
}

/// Write any serializable rows as CSV with a header line
pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_tracking_csv<P: AsRef<Path>>(path: P, series: &TimeSeries) -> Result<()> {
    write_csv(path, &series.samples)
}
