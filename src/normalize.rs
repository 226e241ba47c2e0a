//! Flattens a raw payload's parallel hourly arrays into one observation per
//! timestamp.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde_json::Value;
use tracing::debug;

use crate::model::{Measurements, Observation, RawPayload};

/// Structural problems that make a whole payload unusable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("payload has no hourly section")]
    MissingHourly,
    #[error("payload has no time sequence")]
    MissingTimestamps,
    #[error("sequence {field} has {found} values, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("payload has no location")]
    MissingLocation,
}

/// Naive formats the measurement source and sample generator emit.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a timestamp as a UTC instant. Naive values are taken as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Coerces a JSON value to a finite real number. Anything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Builds observations from `payload`.
///
/// The location is the payload's own `city` when present, otherwise
/// `fallback_location` (usually taken from the audit file name). Rows whose
/// six core pollutants are all missing are dropped.
pub fn normalize(
    payload: &RawPayload,
    fallback_location: Option<&str>,
) -> Result<Vec<Observation>, NormalizeError> {
    let location = payload
        .city
        .as_deref()
        .or(fallback_location)
        .ok_or(NormalizeError::MissingLocation)?;
    let hourly = payload
        .hourly
        .as_ref()
        .ok_or(NormalizeError::MissingHourly)?;
    let times = hourly
        .time
        .as_ref()
        .ok_or(NormalizeError::MissingTimestamps)?;
    let len = times.len();

    let columns = [
        ("pm10", &hourly.pm10),
        ("pm2_5", &hourly.pm2_5),
        ("carbon_monoxide", &hourly.carbon_monoxide),
        ("nitrogen_dioxide", &hourly.nitrogen_dioxide),
        ("sulphur_dioxide", &hourly.sulphur_dioxide),
        ("ozone", &hourly.ozone),
        ("uv_index", &hourly.uv_index),
    ];
    for (field, column) in columns {
        if let Some(values) = column {
            if values.len() != len {
                return Err(NormalizeError::LengthMismatch {
                    field,
                    expected: len,
                    found: values.len(),
                });
            }
        }
    }

    let at = |column: &Option<Vec<Value>>, i: usize| {
        column.as_ref().and_then(|values| coerce_number(&values[i]))
    };

    let mut observations = Vec::with_capacity(len);
    let mut dropped = 0usize;

    for (i, time) in times.iter().enumerate() {
        let measurements = Measurements {
            pm10: at(&hourly.pm10, i),
            pm2_5: at(&hourly.pm2_5, i),
            carbon_monoxide: at(&hourly.carbon_monoxide, i),
            nitrogen_dioxide: at(&hourly.nitrogen_dioxide, i),
            sulphur_dioxide: at(&hourly.sulphur_dioxide, i),
            ozone: at(&hourly.ozone, i),
            uv_index: at(&hourly.uv_index, i),
        };

        if measurements.all_core_missing() {
            dropped += 1;
            continue;
        }

        let timestamp = parse_timestamp(time);
        observations.push(Observation {
            location: location.to_string(),
            timestamp,
            hour: timestamp.map(|t| t.hour()),
            measurements,
        });
    }

    debug!(
        location,
        rows = len,
        kept = observations.len(),
        dropped,
        "Payload normalized"
    );

    Ok(observations)
}
