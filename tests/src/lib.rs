//! Track My Health Test Suite
//!
//! Integration tests for all workspace crates over an in-memory store:
//! - Identity registration, authentication, and credential management
//! - Profile lifecycle and cascade behavior
//! - Appointment booking and the guarded status lifecycle
//! - Health record encodings and listing projections
//! - CSV export of listing rows

pub mod appointments;
pub mod records;

use chrono::NaiveDate;

use trackhealth_hospital::HospitalProfile;
use trackhealth_identity::{RegisterHospitalInput, RegisterPatientInput};
use trackhealth_patient::{Gender, PatientProfile};
use trackhealth_shared::db::Db;
use trackhealth_shared::Session;

/// Fresh in-memory store with schema and bootstrap admin in place.
pub fn test_db() -> Db {
    let db = Db::open_in_memory().expect("in-memory store");
    db.migrate().expect("schema");
    db.seed().expect("seed");
    db
}

pub fn sample_patient_input() -> RegisterPatientInput {
    RegisterPatientInput {
        first_name: "Alice".to_string(),
        last_name: "Johnson".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        gender: Gender::Female,
        email: "alice@example.com".to_string(),
        username: None,
        password: None,
    }
}

pub fn sample_hospital_input() -> RegisterHospitalInput {
    RegisterHospitalInput {
        name: "General Hospital".to_string(),
        address: "1 Care Way".to_string(),
        phone: "+1-555-0123".to_string(),
        email: "contact@general.example.com".to_string(),
        username: None,
        password: None,
    }
}

/// Register the sample patient and log in.
pub fn patient_session(db: &mut Db) -> (PatientProfile, Session) {
    let (identity, profile) =
        trackhealth_identity::register_patient(db.conn_mut(), &sample_patient_input())
            .expect("register patient");
    let session = trackhealth_identity::authenticate(db.conn(), &identity.username, "patient123")
        .expect("authenticate patient");
    (profile, session)
}

/// Register the sample hospital and log in.
pub fn hospital_session(db: &mut Db) -> (HospitalProfile, Session) {
    let (identity, profile) =
        trackhealth_identity::register_hospital(db.conn_mut(), &sample_hospital_input())
            .expect("register hospital");
    let session = trackhealth_identity::authenticate(db.conn(), &identity.username, "hospital123")
        .expect("authenticate hospital");
    (profile, session)
}

/// Log in as the seeded bootstrap admin.
pub fn admin_session(db: &Db) -> Session {
    trackhealth_identity::authenticate(db.conn(), "admin", "admin123").expect("authenticate admin")
}
