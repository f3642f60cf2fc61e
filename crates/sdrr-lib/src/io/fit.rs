use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use fitparser::de::from_bytes;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};

use crate::record::{EventKind, Record};

/// FIT stores positions as signed 32-bit semicircles.
const SEMICIRCLES_TO_DEG: f64 = 180.0 / 2_147_483_648.0;

/// Decode a FIT recording into the typed record stream, keeping only the
/// message kinds the decoder consumes and preserving file order.
pub fn read_fit_records(path: &Path) -> Result<Vec<Record>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let messages = from_bytes(&bytes)
        .map_err(|e| anyhow!("failed to parse FIT file {}: {e}", path.display()))?;

    let mut records = Vec::new();
    for message in &messages {
        match message.kind() {
            MesgNum::Hrv => records.push(hrv_record(message)),
            MesgNum::Record => records.push(telemetry_record(message)),
            MesgNum::Event => records.extend(event_record(message)),
            _ => {}
        }
    }
    Ok(records)
}

fn hrv_record(message: &FitDataRecord) -> Record {
    let mut rr_s = Vec::new();
    for field in message.fields() {
        if field.name() != "time" {
            continue;
        }
        match field.value() {
            Value::Array(values) => rr_s.extend(values.iter().map(value_to_f64)),
            value => rr_s.push(value_to_f64(value)),
        }
    }
    Record::Hrv { rr_s }
}

fn telemetry_record(message: &FitDataRecord) -> Record {
    let mut timestamp = None;
    let mut heart_rate = None;
    let mut latitude = None;
    let mut longitude = None;
    for field in message.fields() {
        match field.name() {
            "timestamp" => {
                if let Value::Timestamp(ts) = field.value() {
                    timestamp = Some(ts.with_timezone(&Utc));
                }
            }
            "heart_rate" => heart_rate = value_to_f64(field.value()).map(|v| v as u8),
            "position_lat" => {
                latitude = value_to_f64(field.value()).map(|v| v * SEMICIRCLES_TO_DEG)
            }
            "position_long" => {
                longitude = value_to_f64(field.value()).map(|v| v * SEMICIRCLES_TO_DEG)
            }
            _ => {}
        }
    }
    Record::Telemetry {
        timestamp,
        heart_rate,
        latitude,
        longitude,
    }
}

fn event_record(message: &FitDataRecord) -> Option<Record> {
    for field in message.fields() {
        if field.name() == "event_type" {
            let kind = match field.value() {
                Value::String(s) => EventKind::from(s.as_str()),
                _ => EventKind::Other,
            };
            return Some(Record::Event { kind });
        }
    }
    None
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(f64::from(*v)),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(f64::from(*v)),
        Value::UInt8(v) => Some(f64::from(*v)),
        Value::UInt8z(v) => Some(f64::from(*v)),
        Value::SInt16(v) => Some(f64::from(*v)),
        Value::UInt16(v) => Some(f64::from(*v)),
        Value::UInt16z(v) => Some(f64::from(*v)),
        Value::SInt32(v) => Some(f64::from(*v)),
        Value::UInt32(v) => Some(f64::from(*v)),
        Value::UInt32z(v) => Some(f64::from(*v)),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::UInt64z(v) => Some(*v as f64),
        Value::Byte(v) => Some(f64::from(*v)),
        _ => None,
    }
}
