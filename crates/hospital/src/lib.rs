//! Hospital Profile Crate
//!
//! Defines the hospital contact profile record, its validation, and the
//! repository operations over the `hospitals` table. Same lifecycle as the
//! patient profile: created with its identity, removed with it.

pub mod store;

pub use store::*;

use serde::{Deserialize, Serialize};

use trackhealth_shared::{HealthError, HealthResult};

/// Hospital contact profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HospitalProfile {
    /// Unique profile identifier (HOS_ prefixed)
    pub id: String,
    /// Owning identity
    pub identity_id: String,
    /// Facility name shown in booking selectors
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Validation for hospital profiles
pub fn validate_profile(profile: &HospitalProfile) -> HealthResult<()> {
    if profile.name.is_empty() {
        return Err(HealthError::Validation(
            "hospital name is required".to_string(),
        ));
    }
    if profile.address.is_empty() {
        return Err(HealthError::Validation(
            "hospital address is required".to_string(),
        ));
    }
    if profile.phone.is_empty() {
        return Err(HealthError::Validation(
            "hospital phone number is required".to_string(),
        ));
    }
    Ok(())
}
