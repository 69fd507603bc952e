//! Patient Profile Crate
//!
//! Defines the patient demographic profile record, its validation, and the
//! repository operations over the `patients` table. A profile is created in
//! the same transaction as its owning identity and removed with it.

pub mod store;

pub use store::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use trackhealth_shared::{HealthError, HealthResult};

/// Patient demographic profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    /// Unique profile identifier (PAT_ prefixed)
    pub id: String,
    /// Owning identity
    pub identity_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Date of birth
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
}

impl PatientProfile {
    /// Name shown on hospital dashboards.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Stable string form used in the `patients.gender` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> HealthResult<Self> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(HealthError::Validation(format!("unknown gender: {other}"))),
        }
    }
}

/// Validation for patient profiles
pub fn validate_profile(profile: &PatientProfile) -> HealthResult<()> {
    if profile.first_name.is_empty() || profile.last_name.is_empty() {
        return Err(HealthError::Validation(
            "patient first and last name are required".to_string(),
        ));
    }
    Ok(())
}
