//! Health Record Log Crate
//!
//! Timestamped, typed metric entries per patient. A record is written once
//! by the owning patient and never updated or deleted. Each record type has
//! a fixed string encoding so rows persisted by earlier versions of the
//! system keep reading back.

pub mod store;

pub use store::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trackhealth_shared::{CsvExport, HealthError, HealthResult};

/// Metric categories a patient can log
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecordType {
    BloodPressure,
    HeartRate,
    BloodSugar,
    Weight,
    Temperature,
    Exercise,
    Medication,
}

impl RecordType {
    pub const ALL: [RecordType; 7] = [
        RecordType::BloodPressure,
        RecordType::HeartRate,
        RecordType::BloodSugar,
        RecordType::Weight,
        RecordType::Temperature,
        RecordType::Exercise,
        RecordType::Medication,
    ];

    /// Stable string form used in the `health_records.record_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::BloodPressure => "BloodPressure",
            RecordType::HeartRate => "HeartRate",
            RecordType::BloodSugar => "BloodSugar",
            RecordType::Weight => "Weight",
            RecordType::Temperature => "Temperature",
            RecordType::Exercise => "Exercise",
            RecordType::Medication => "Medication",
        }
    }

    pub fn parse(s: &str) -> HealthResult<Self> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HealthError::Validation(format!("unknown record type: {s}")))
    }
}

/// Typed metric value.
///
/// The string encoding is fixed per type: "systolic/diastolic" for blood
/// pressure, a plain numeric string for the scalar metrics,
/// "activity: minutes" for exercise, and "name: dose" for medication.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RecordValue {
    /// Encoded as "systolic/diastolic", e.g. "120/80"
    BloodPressure { systolic: u32, diastolic: u32 },
    /// Beats per minute
    HeartRate(f64),
    /// Blood glucose in mg/dL
    BloodSugar(f64),
    /// Body weight in kilograms
    Weight(f64),
    /// Body temperature in degrees Celsius
    Temperature(f64),
    /// Encoded as "activity: minutes", e.g. "Running: 30"
    Exercise {
        activity: String,
        duration_minutes: u32,
    },
    /// Encoded as "name: dose", e.g. "Metformin: 500mg"
    Medication { name: String, dose: String },
}

impl RecordValue {
    /// The metric category this value belongs to.
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordValue::BloodPressure { .. } => RecordType::BloodPressure,
            RecordValue::HeartRate(_) => RecordType::HeartRate,
            RecordValue::BloodSugar(_) => RecordType::BloodSugar,
            RecordValue::Weight(_) => RecordType::Weight,
            RecordValue::Temperature(_) => RecordType::Temperature,
            RecordValue::Exercise { .. } => RecordType::Exercise,
            RecordValue::Medication { .. } => RecordType::Medication,
        }
    }

    /// Fixed per-type string encoding, as stored in the `value` column.
    pub fn encode(&self) -> String {
        match self {
            RecordValue::BloodPressure {
                systolic,
                diastolic,
            } => format!("{systolic}/{diastolic}"),
            RecordValue::HeartRate(v)
            | RecordValue::BloodSugar(v)
            | RecordValue::Weight(v)
            | RecordValue::Temperature(v) => format_number(*v),
            RecordValue::Exercise {
                activity,
                duration_minutes,
            } => format!("{activity}: {duration_minutes}"),
            RecordValue::Medication { name, dose } => format!("{name}: {dose}"),
        }
    }

    /// Decode a stored value for the given type.
    pub fn decode(record_type: RecordType, raw: &str) -> HealthResult<Self> {
        match record_type {
            RecordType::BloodPressure => {
                let (systolic, diastolic) = raw
                    .split_once('/')
                    .ok_or_else(|| malformed(record_type, raw))?;
                Ok(RecordValue::BloodPressure {
                    systolic: systolic
                        .trim()
                        .parse()
                        .map_err(|_| malformed(record_type, raw))?,
                    diastolic: diastolic
                        .trim()
                        .parse()
                        .map_err(|_| malformed(record_type, raw))?,
                })
            }
            RecordType::HeartRate => Ok(RecordValue::HeartRate(parse_number(record_type, raw)?)),
            RecordType::BloodSugar => Ok(RecordValue::BloodSugar(parse_number(record_type, raw)?)),
            RecordType::Weight => Ok(RecordValue::Weight(parse_number(record_type, raw)?)),
            RecordType::Temperature => {
                Ok(RecordValue::Temperature(parse_number(record_type, raw)?))
            }
            RecordType::Exercise => {
                let (activity, minutes) = raw
                    .rsplit_once(": ")
                    .ok_or_else(|| malformed(record_type, raw))?;
                Ok(RecordValue::Exercise {
                    activity: activity.to_string(),
                    duration_minutes: minutes
                        .trim()
                        .parse()
                        .map_err(|_| malformed(record_type, raw))?,
                })
            }
            RecordType::Medication => {
                let (name, dose) = raw
                    .split_once(": ")
                    .ok_or_else(|| malformed(record_type, raw))?;
                Ok(RecordValue::Medication {
                    name: name.to_string(),
                    dose: dose.to_string(),
                })
            }
        }
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn parse_number(record_type: RecordType, raw: &str) -> HealthResult<f64> {
    raw.trim()
        .parse()
        .map_err(|_| malformed(record_type, raw))
}

fn malformed(record_type: RecordType, raw: &str) -> HealthError {
    HealthError::Validation(format!(
        "malformed {} value: {raw}",
        record_type.as_str()
    ))
}

/// One timestamped patient-entered metric observation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthRecord {
    /// Unique record identifier (REC_ prefixed)
    pub id: String,
    /// Owning patient profile
    pub patient_id: String,
    /// Observation time
    pub recorded_at: DateTime<Utc>,
    /// Typed metric value
    pub value: RecordValue,
    /// Free-text notes
    pub notes: Option<String>,
}

impl HealthRecord {
    pub fn record_type(&self) -> RecordType {
        self.value.record_type()
    }
}

/// Input for logging a new record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddRecordInput {
    pub value: RecordValue,
    pub notes: Option<String>,
    /// Observation time; defaults to now
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Validation for record values, with plausibility ranges on the vitals
pub fn validate_record(value: &RecordValue) -> HealthResult<()> {
    match value {
        RecordValue::BloodPressure {
            systolic,
            diastolic,
        } => {
            if *systolic == 0 || *diastolic == 0 {
                return Err(HealthError::Validation(
                    "blood pressure readings must be positive".to_string(),
                ));
            }
        }
        RecordValue::HeartRate(bpm) => {
            if !(20.0..=300.0).contains(bpm) {
                return Err(HealthError::Validation(
                    "heart rate out of valid range".to_string(),
                ));
            }
        }
        RecordValue::BloodSugar(mgdl) => {
            if !mgdl.is_finite() || *mgdl <= 0.0 {
                return Err(HealthError::Validation(
                    "blood sugar must be a positive number".to_string(),
                ));
            }
        }
        RecordValue::Weight(kg) => {
            if !kg.is_finite() || *kg <= 0.0 {
                return Err(HealthError::Validation(
                    "weight must be a positive number".to_string(),
                ));
            }
        }
        RecordValue::Temperature(celsius) => {
            if !(30.0..=45.0).contains(celsius) {
                return Err(HealthError::Validation(
                    "temperature out of valid range".to_string(),
                ));
            }
        }
        RecordValue::Exercise {
            activity,
            duration_minutes,
        } => {
            if activity.is_empty() || *duration_minutes == 0 {
                return Err(HealthError::Validation(
                    "exercise entries need an activity and a duration".to_string(),
                ));
            }
        }
        RecordValue::Medication { name, dose } => {
            if name.is_empty() || dose.is_empty() {
                return Err(HealthError::Validation(
                    "medication entries need a name and a dose".to_string(),
                ));
            }
        }
    }
    Ok(())
}

impl CsvExport for HealthRecord {
    fn csv_header() -> &'static [&'static str] {
        &["Record ID", "Type", "Date & Time", "Value", "Notes"]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.record_type().as_str().to_string(),
            self.recorded_at.to_rfc3339(),
            self.value.encode(),
            self.notes.clone().unwrap_or_default(),
        ]
    }
}
