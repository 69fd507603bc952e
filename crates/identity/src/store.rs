//! Identity repository - registration, authentication, credential management.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, info};

use trackhealth_hospital::HospitalProfile;
use trackhealth_patient::PatientProfile;
use trackhealth_shared::{
    auth, new_entity_id, require_admin, HealthError, HealthResult, Role, Session,
};

use crate::{
    default_hospital_username, default_patient_username, validate_register_hospital,
    validate_register_patient, Identity, RegisterHospitalInput, RegisterPatientInput,
    DEFAULT_HOSPITAL_PASSWORD, DEFAULT_PATIENT_PASSWORD,
};

const COLUMNS: &str = "id, username, password_hash, role, name, email";

/// Register a patient account and its demographic profile atomically.
pub fn register_patient(
    conn: &mut Connection,
    input: &RegisterPatientInput,
) -> HealthResult<(Identity, PatientProfile)> {
    validate_register_patient(input)?;
    let username = input
        .username
        .clone()
        .unwrap_or_else(|| default_patient_username(&input.first_name, &input.last_name));
    let password = input.password.as_deref().unwrap_or(DEFAULT_PATIENT_PASSWORD);

    let tx = conn.transaction()?;
    ensure_username_free(&tx, &username)?;
    let identity = Identity {
        id: new_entity_id("USR_PAT"),
        username,
        password_hash: auth::hash_password(password),
        role: Role::Patient,
        display_name: format!("{} {}", input.first_name, input.last_name),
        email: Some(input.email.clone()),
    };
    insert_identity(&tx, &identity)?;
    let profile = PatientProfile {
        id: new_entity_id("PAT"),
        identity_id: identity.id.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        date_of_birth: input.date_of_birth,
        gender: input.gender,
    };
    trackhealth_patient::insert_profile(&tx, &profile)?;
    tx.commit()?;

    info!(identity = %identity.id, "registered patient account");
    Ok((identity, profile))
}

/// Register a hospital account and its contact profile atomically.
pub fn register_hospital(
    conn: &mut Connection,
    input: &RegisterHospitalInput,
) -> HealthResult<(Identity, HospitalProfile)> {
    validate_register_hospital(input)?;
    let username = input
        .username
        .clone()
        .unwrap_or_else(|| default_hospital_username(&input.name));
    let password = input
        .password
        .as_deref()
        .unwrap_or(DEFAULT_HOSPITAL_PASSWORD);

    let tx = conn.transaction()?;
    ensure_username_free(&tx, &username)?;
    let identity = Identity {
        id: new_entity_id("USR_HOS"),
        username,
        password_hash: auth::hash_password(password),
        role: Role::Hospital,
        display_name: input.name.clone(),
        email: Some(input.email.clone()),
    };
    insert_identity(&tx, &identity)?;
    let profile = HospitalProfile {
        id: new_entity_id("HOS"),
        identity_id: identity.id.clone(),
        name: input.name.clone(),
        address: input.address.clone(),
        phone: input.phone.clone(),
    };
    trackhealth_hospital::insert_profile(&tx, &profile)?;
    tx.commit()?;

    info!(identity = %identity.id, "registered hospital account");
    Ok((identity, profile))
}

/// Verify credentials and open a role-scoped session.
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller. Repeating the call has no side effects.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> HealthResult<Session> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            read_row,
        )
        .optional()?;
    let identity = match row {
        Some(raw) => raw.into_identity()?,
        None => return Err(HealthError::InvalidCredentials),
    };
    if !auth::verify_password(password, &identity.password_hash) {
        debug!(username, "credential mismatch");
        return Err(HealthError::InvalidCredentials);
    }
    Ok(Session {
        identity_id: identity.id,
        role: identity.role,
        display_name: identity.display_name,
    })
}

/// Overwrite an account's password with a newly generated one. Admin only.
///
/// Returns the plaintext to the caller, matching the legacy behavior.
pub fn reset_password(conn: &Connection, session: &Session, username: &str) -> HealthResult<String> {
    require_admin(session)?;
    let new_password = auth::generate_password();
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2",
        params![auth::hash_password(&new_password), username],
    )?;
    if changed == 0 {
        return Err(HealthError::NotFound {
            entity: "Identity",
            id: username.to_string(),
        });
    }
    info!(username, "password reset by admin");
    Ok(new_password)
}

/// Destructive removal of an account. Admin only.
///
/// Profile rows, appointments, and health records bound to the account go
/// with it through the schema's cascades.
pub fn delete_identity(conn: &Connection, session: &Session, identity_id: &str) -> HealthResult<()> {
    require_admin(session)?;
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![identity_id])?;
    if changed == 0 {
        return Err(HealthError::NotFound {
            entity: "Identity",
            id: identity_id.to_string(),
        });
    }
    info!(identity = identity_id, "identity deleted by admin");
    Ok(())
}

/// Fetch an identity by id.
pub fn get_identity(conn: &Connection, identity_id: &str) -> HealthResult<Identity> {
    let row = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
            params![identity_id],
            read_row,
        )
        .optional()?;
    row.ok_or_else(|| HealthError::NotFound {
        entity: "Identity",
        id: identity_id.to_string(),
    })?
    .into_identity()
}

/// All identities, ordered by username. Admin only.
pub fn list_identities(conn: &Connection, session: &Session) -> HealthResult<Vec<Identity>> {
    require_admin(session)?;
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY username ASC"))?;
    let rows = stmt
        .query_map([], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(IdentityRow::into_identity).collect()
}

fn ensure_username_free(tx: &Transaction<'_>, username: &str) -> HealthResult<()> {
    let taken: i64 = tx.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(HealthError::DuplicateUsername(username.to_string()));
    }
    Ok(())
}

fn insert_identity(tx: &Transaction<'_>, identity: &Identity) -> HealthResult<()> {
    tx.execute(
        "INSERT INTO users (id, username, password_hash, role, name, email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            identity.id,
            identity.username,
            identity.password_hash,
            identity.role.as_str(),
            identity.display_name,
            identity.email,
        ],
    )?;
    Ok(())
}

/// Raw row as stored; converted after the statement completes.
struct IdentityRow {
    id: String,
    username: String,
    password_hash: String,
    role: String,
    display_name: String,
    email: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<IdentityRow> {
    Ok(IdentityRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        display_name: row.get(4)?,
        email: row.get(5)?,
    })
}

impl IdentityRow {
    fn into_identity(self) -> HealthResult<Identity> {
        Ok(Identity {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role: Role::parse(&self.role)?,
            display_name: self.display_name,
            email: self.email,
        })
    }
}
