//! Identity and Access Crate
//!
//! Defines the account entry type and the registration, authentication,
//! and credential management operations. Registration creates the account
//! row and its role profile row in a single transaction, so a rejected
//! registration leaves nothing behind.

pub mod store;

pub use store::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use trackhealth_patient::Gender;
use trackhealth_shared::{HealthError, HealthResult, Role};

/// Default password assigned to patient registrations that omit one.
pub const DEFAULT_PATIENT_PASSWORD: &str = "patient123";
/// Default password assigned to hospital registrations that omit one.
pub const DEFAULT_HOSPITAL_PASSWORD: &str = "hospital123";

/// An authenticable account with a role
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    /// Unique account identifier (USR_PAT_/USR_HOS_/USR_ADM_ prefixed)
    pub id: String,
    /// Login name, unique across all identities
    pub username: String,
    /// SHA-256 hex digest of the password
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role fixed at registration; no update path exists
    pub role: Role,
    /// Name shown by dashboards
    pub display_name: String,
    /// Contact email; absent only for the bootstrap admin
    pub email: Option<String>,
}

/// Input for registering a patient account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterPatientInput {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub email: String,
    /// Login name; defaults to firstname.lastname when absent
    pub username: Option<String>,
    /// Password; defaults to the fixed patient default when absent
    pub password: Option<String>,
}

/// Input for registering a hospital account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterHospitalInput {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    /// Login name; defaults to the facility name without spaces when absent
    pub username: Option<String>,
    /// Password; defaults to the fixed hospital default when absent
    pub password: Option<String>,
}

/// Validation for patient registrations
pub fn validate_register_patient(input: &RegisterPatientInput) -> HealthResult<()> {
    if input.first_name.is_empty() || input.last_name.is_empty() {
        return Err(HealthError::Validation(
            "first and last name are required".to_string(),
        ));
    }
    if input.email.is_empty() {
        return Err(HealthError::Validation("email is required".to_string()));
    }
    Ok(())
}

/// Validation for hospital registrations
pub fn validate_register_hospital(input: &RegisterHospitalInput) -> HealthResult<()> {
    if input.name.is_empty() {
        return Err(HealthError::Validation(
            "hospital name is required".to_string(),
        ));
    }
    if input.address.is_empty() || input.phone.is_empty() {
        return Err(HealthError::Validation(
            "hospital address and phone number are required".to_string(),
        ));
    }
    if input.email.is_empty() {
        return Err(HealthError::Validation("email is required".to_string()));
    }
    Ok(())
}

/// Deterministic default login for patients: `firstname.lastname`.
pub fn default_patient_username(first_name: &str, last_name: &str) -> String {
    format!(
        "{}.{}",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    )
}

/// Deterministic default login for hospitals: facility name, lowercased,
/// spaces removed.
pub fn default_hospital_username(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}
