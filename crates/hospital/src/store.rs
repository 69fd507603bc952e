//! Hospital profile repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use trackhealth_shared::{HealthError, HealthResult};

use crate::{validate_profile, HospitalProfile};

const COLUMNS: &str = "id, user_id, name, address, phone";

/// Insert a profile row.
///
/// Runs inside the registration transaction alongside the identity insert.
pub fn insert_profile(conn: &Connection, profile: &HospitalProfile) -> HealthResult<()> {
    validate_profile(profile)?;
    conn.execute(
        "INSERT INTO hospitals (id, user_id, name, address, phone)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            profile.id,
            profile.identity_id,
            profile.name,
            profile.address,
            profile.phone,
        ],
    )?;
    Ok(())
}

/// Fetch a profile by its id.
pub fn get_profile(conn: &Connection, id: &str) -> HealthResult<HospitalProfile> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM hospitals WHERE id = ?1"),
        params![id],
        read_row,
    )
    .optional()?
    .ok_or_else(|| HealthError::NotFound {
        entity: "HospitalProfile",
        id: id.to_string(),
    })
}

/// Resolve the profile owned by an identity.
pub fn profile_for_identity(conn: &Connection, identity_id: &str) -> HealthResult<HospitalProfile> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM hospitals WHERE user_id = ?1"),
        params![identity_id],
        read_row,
    )
    .optional()?
    .ok_or_else(|| HealthError::NotFound {
        entity: "HospitalProfile",
        id: identity_id.to_string(),
    })
}

/// All registered hospitals, ordered by name. Feeds the booking selector.
pub fn list_hospitals(conn: &Connection) -> HealthResult<Vec<HospitalProfile>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM hospitals ORDER BY name ASC"))?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<HospitalProfile> {
    Ok(HospitalProfile {
        id: row.get(0)?,
        identity_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
    })
}
