//! Appointment Ledger Crate
//!
//! Booking records linking a patient profile to a hospital profile (or an
//! unmanaged external hospital), with a guarded status lifecycle:
//! - `Scheduled` is the only initial state
//! - `Completed`, `Cancelled`, and `NoShow` are terminal
//! - nothing leaves a terminal state
//!
//! Appointments are never physically deleted; history views keep every
//! terminal record.

pub mod store;

pub use store::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trackhealth_shared::{CsvExport, HealthError, HealthResult};

/// Sentinel stored in `appointments.hospital_id` for external bookings.
pub const EXTERNAL_HOSPITAL_SENTINEL: &str = "EXTERNAL";

/// A scheduled interaction between a patient and a hospital
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Unique appointment identifier (APT_ prefixed)
    pub id: String,
    /// Booking patient profile
    pub patient_id: String,
    /// Hospital side of the booking
    pub hospital: HospitalRef,
    /// Scheduled time
    pub scheduled_at: DateTime<Utc>,
    /// Reason for visit
    pub reason: String,
    /// Current lifecycle status
    pub status: AppointmentStatus,
}

/// Hospital side of an appointment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum HospitalRef {
    /// A hospital profile managed by this system
    Registered(String),
    /// Free-text description of a hospital outside the system
    External(String),
}

/// Appointment lifecycle status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    /// Stable string form used in the `appointments.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::NoShow => "NoShow",
        }
    }

    pub fn parse(s: &str) -> HealthResult<Self> {
        match s {
            "Scheduled" => Ok(AppointmentStatus::Scheduled),
            "Completed" => Ok(AppointmentStatus::Completed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            "NoShow" => Ok(AppointmentStatus::NoShow),
            other => Err(HealthError::Validation(format!(
                "unknown appointment status: {other}"
            ))),
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Whether the lifecycle permits moving to `next`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(self, AppointmentStatus::Scheduled) && next != AppointmentStatus::Scheduled
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for booking a new appointment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookAppointmentInput {
    pub hospital: HospitalRef,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
}

/// Validation for bookings
pub fn validate_booking(input: &BookAppointmentInput) -> HealthResult<()> {
    if input.reason.is_empty() {
        return Err(HealthError::Validation(
            "reason for visit is required".to_string(),
        ));
    }
    if let HospitalRef::External(info) = &input.hospital {
        if info.is_empty() {
            return Err(HealthError::Validation(
                "external hospital info is required".to_string(),
            ));
        }
    }
    Ok(())
}

/// Patient-facing listing row, hospital display name resolved
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientAppointmentRow {
    pub id: String,
    pub hospital_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

/// Hospital-facing listing row, patient display name resolved
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HospitalAppointmentRow {
    pub id: String,
    pub patient_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
}

impl CsvExport for PatientAppointmentRow {
    fn csv_header() -> &'static [&'static str] {
        &["Appointment ID", "Hospital", "Date & Time", "Reason", "Status"]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.hospital_name.clone(),
            self.scheduled_at.to_rfc3339(),
            self.reason.clone(),
            self.status.as_str().to_string(),
        ]
    }
}

impl CsvExport for HospitalAppointmentRow {
    fn csv_header() -> &'static [&'static str] {
        &[
            "Appointment ID",
            "Patient Name",
            "Date & Time",
            "Reason",
            "Status",
        ]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.patient_name.clone(),
            self.scheduled_at.to_rfc3339(),
            self.reason.clone(),
            self.status.as_str().to_string(),
        ]
    }
}
