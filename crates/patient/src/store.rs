//! Patient profile repository.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use trackhealth_shared::{HealthError, HealthResult};

use crate::{validate_profile, Gender, PatientProfile};

const COLUMNS: &str = "id, user_id, first_name, last_name, date_of_birth, gender";

/// Insert a profile row.
///
/// Runs inside the registration transaction alongside the identity insert.
pub fn insert_profile(conn: &Connection, profile: &PatientProfile) -> HealthResult<()> {
    validate_profile(profile)?;
    conn.execute(
        "INSERT INTO patients (id, user_id, first_name, last_name, date_of_birth, gender)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            profile.id,
            profile.identity_id,
            profile.first_name,
            profile.last_name,
            profile.date_of_birth.to_string(),
            profile.gender.as_str(),
        ],
    )?;
    Ok(())
}

/// Fetch a profile by its id.
pub fn get_profile(conn: &Connection, id: &str) -> HealthResult<PatientProfile> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            read_row,
        )
        .optional()?;
    row.ok_or_else(|| HealthError::NotFound {
        entity: "PatientProfile",
        id: id.to_string(),
    })?
    .into_profile()
}

/// Resolve the profile owned by an identity.
pub fn profile_for_identity(conn: &Connection, identity_id: &str) -> HealthResult<PatientProfile> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM patients WHERE user_id = ?1"),
            params![identity_id],
            read_row,
        )
        .optional()?;
    row.ok_or_else(|| HealthError::NotFound {
        entity: "PatientProfile",
        id: identity_id.to_string(),
    })?
    .into_profile()
}

/// All patient profiles, ordered by name.
pub fn list_profiles(conn: &Connection) -> HealthResult<Vec<PatientProfile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM patients ORDER BY last_name ASC, first_name ASC"
    ))?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(ProfileRow::into_profile).collect()
}

/// Raw row as stored; converted after the statement completes.
struct ProfileRow {
    id: String,
    identity_id: String,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    gender: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        identity_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        date_of_birth: row.get(4)?,
        gender: row.get(5)?,
    })
}

impl ProfileRow {
    fn into_profile(self) -> HealthResult<PatientProfile> {
        let date_of_birth =
            NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").map_err(|e| {
                HealthError::Validation(format!("stored date_of_birth is malformed: {e}"))
            })?;
        Ok(PatientProfile {
            id: self.id,
            identity_id: self.identity_id,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth,
            gender: Gender::parse(&self.gender)?,
        })
    }
}
