//! Appointment repository - booking, status transitions, listing projections.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use trackhealth_shared::{
    new_entity_id, require_role, HealthError, HealthResult, PaginatedResult, PaginationInput,
    Role, Session,
};

use crate::{
    validate_booking, Appointment, AppointmentStatus, BookAppointmentInput,
    HospitalAppointmentRow, HospitalRef, PatientAppointmentRow, EXTERNAL_HOSPITAL_SENTINEL,
};

/// Book a new appointment for the calling patient.
///
/// Two bookings for the same slot both succeed; the ledger carries no
/// conflict detection.
pub fn book(
    conn: &Connection,
    session: &Session,
    input: &BookAppointmentInput,
) -> HealthResult<Appointment> {
    require_role(session, Role::Patient)?;
    validate_booking(input)?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;
    if let HospitalRef::Registered(hospital_id) = &input.hospital {
        // hospital_id shares its column with the EXTERNAL sentinel, so the
        // schema carries no FK; the reference is checked here instead
        trackhealth_hospital::get_profile(conn, hospital_id)?;
    }

    let appointment = Appointment {
        id: new_entity_id("APT"),
        patient_id: patient.id,
        hospital: input.hospital.clone(),
        scheduled_at: input.scheduled_at,
        reason: input.reason.clone(),
        status: AppointmentStatus::Scheduled,
    };
    let (hospital_id, external_info) = match &appointment.hospital {
        HospitalRef::Registered(id) => (id.as_str(), None),
        HospitalRef::External(info) => (EXTERNAL_HOSPITAL_SENTINEL, Some(info.as_str())),
    };
    conn.execute(
        "INSERT INTO appointments
             (id, patient_id, hospital_id, scheduled_at, reason, status, external_hospital_info)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appointment.id,
            appointment.patient_id,
            hospital_id,
            appointment.scheduled_at.to_rfc3339(),
            appointment.reason,
            appointment.status.as_str(),
            external_info,
        ],
    )?;
    info!(appointment = %appointment.id, "booked appointment");
    Ok(appointment)
}

/// Cancel the calling patient's own scheduled appointment.
pub fn cancel(
    conn: &Connection,
    session: &Session,
    appointment_id: &str,
) -> HealthResult<Appointment> {
    require_role(session, Role::Patient)?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;
    let appointment = get_appointment(conn, appointment_id)?;
    if appointment.patient_id != patient.id {
        // another patient's booking is indistinguishable from a missing one
        return Err(HealthError::NotFound {
            entity: "Appointment",
            id: appointment_id.to_string(),
        });
    }
    transition(conn, appointment, AppointmentStatus::Cancelled)
}

/// Move an appointment bound to the calling hospital into a terminal
/// status.
pub fn update_status(
    conn: &Connection,
    session: &Session,
    appointment_id: &str,
    status: AppointmentStatus,
) -> HealthResult<Appointment> {
    require_role(session, Role::Hospital)?;
    let hospital = trackhealth_hospital::profile_for_identity(conn, &session.identity_id)?;
    let appointment = get_appointment(conn, appointment_id)?;
    match &appointment.hospital {
        HospitalRef::Registered(id) if *id == hospital.id => {}
        _ => {
            return Err(HealthError::NotFound {
                entity: "Appointment",
                id: appointment_id.to_string(),
            })
        }
    }
    transition(conn, appointment, status)
}

fn transition(
    conn: &Connection,
    appointment: Appointment,
    next: AppointmentStatus,
) -> HealthResult<Appointment> {
    if !appointment.status.can_transition_to(next) {
        warn!(
            appointment = %appointment.id,
            current = %appointment.status,
            requested = %next,
            "rejected status transition"
        );
        return Err(HealthError::InvalidTransition {
            from: appointment.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![next.as_str(), appointment.id],
    )?;
    info!(appointment = %appointment.id, status = %next, "appointment status updated");
    Ok(Appointment {
        status: next,
        ..appointment
    })
}

/// Fetch an appointment by id.
pub fn get_appointment(conn: &Connection, id: &str) -> HealthResult<Appointment> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, hospital_id, scheduled_at, reason, status,
                    external_hospital_info
             FROM appointments WHERE id = ?1",
            params![id],
            read_appointment_row,
        )
        .optional()?;
    row.ok_or_else(|| HealthError::NotFound {
        entity: "Appointment",
        id: id.to_string(),
    })?
    .into_appointment()
}

/// Upcoming appointments for the calling patient, soonest first.
pub fn upcoming_for_patient(
    conn: &Connection,
    session: &Session,
) -> HealthResult<Vec<PatientAppointmentRow>> {
    require_role(session, Role::Patient)?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;
    let mut stmt = conn.prepare(
        "SELECT a.id, COALESCE(h.name, a.external_hospital_info), a.scheduled_at,
                a.reason, a.status
         FROM appointments a
         LEFT JOIN hospitals h ON a.hospital_id = h.id
         WHERE a.patient_id = ?1 AND a.status = ?2
         ORDER BY a.scheduled_at ASC",
    )?;
    let rows = stmt
        .query_map(
            params![patient.id, AppointmentStatus::Scheduled.as_str()],
            read_patient_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawPatientRow::into_row).collect()
}

/// Full appointment history for the calling patient, newest first.
pub fn history_for_patient(
    conn: &Connection,
    session: &Session,
    pagination: &PaginationInput,
) -> HealthResult<PaginatedResult<PatientAppointmentRow>> {
    require_role(session, Role::Patient)?;
    pagination.validate()?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE patient_id = ?1",
        params![patient.id],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(
        "SELECT a.id, COALESCE(h.name, a.external_hospital_info), a.scheduled_at,
                a.reason, a.status
         FROM appointments a
         LEFT JOIN hospitals h ON a.hospital_id = h.id
         WHERE a.patient_id = ?1
         ORDER BY a.scheduled_at DESC
         LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt
        .query_map(
            params![patient.id, pagination.limit as i64, pagination.offset as i64],
            read_patient_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    let items = rows
        .into_iter()
        .map(RawPatientRow::into_row)
        .collect::<HealthResult<Vec<_>>>()?;
    Ok(PaginatedResult::new(items, total as usize, pagination))
}

/// Upcoming appointments bound to the calling hospital, soonest first.
pub fn upcoming_for_hospital(
    conn: &Connection,
    session: &Session,
) -> HealthResult<Vec<HospitalAppointmentRow>> {
    require_role(session, Role::Hospital)?;
    let hospital = trackhealth_hospital::profile_for_identity(conn, &session.identity_id)?;
    let mut stmt = conn.prepare(
        "SELECT a.id, u.name, a.scheduled_at, a.reason, a.status
         FROM appointments a
         JOIN patients p ON a.patient_id = p.id
         JOIN users u ON p.user_id = u.id
         WHERE a.hospital_id = ?1 AND a.status = ?2
         ORDER BY a.scheduled_at ASC",
    )?;
    let rows = stmt
        .query_map(
            params![hospital.id, AppointmentStatus::Scheduled.as_str()],
            read_hospital_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawHospitalRow::into_row).collect()
}

/// Appointment history bound to the calling hospital, newest first,
/// optionally restricted to one status.
pub fn history_for_hospital(
    conn: &Connection,
    session: &Session,
    status: Option<AppointmentStatus>,
    pagination: &PaginationInput,
) -> HealthResult<PaginatedResult<HospitalAppointmentRow>> {
    require_role(session, Role::Hospital)?;
    pagination.validate()?;
    let hospital = trackhealth_hospital::profile_for_identity(conn, &session.identity_id)?;
    let status_filter = status.map(|s| s.as_str());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE hospital_id = ?1 AND (?2 IS NULL OR status = ?2)",
        params![hospital.id, status_filter],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(
        "SELECT a.id, u.name, a.scheduled_at, a.reason, a.status
         FROM appointments a
         JOIN patients p ON a.patient_id = p.id
         JOIN users u ON p.user_id = u.id
         WHERE a.hospital_id = ?1 AND (?2 IS NULL OR a.status = ?2)
         ORDER BY a.scheduled_at DESC
         LIMIT ?3 OFFSET ?4",
    )?;
    let rows = stmt
        .query_map(
            params![
                hospital.id,
                status_filter,
                pagination.limit as i64,
                pagination.offset as i64
            ],
            read_hospital_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    let items = rows
        .into_iter()
        .map(RawHospitalRow::into_row)
        .collect::<HealthResult<Vec<_>>>()?;
    Ok(PaginatedResult::new(items, total as usize, pagination))
}

// ── Row conversion ─────────────────────────────────────────────────────────

struct AppointmentRow {
    id: String,
    patient_id: String,
    hospital_id: String,
    scheduled_at: String,
    reason: String,
    status: String,
    external_hospital_info: Option<String>,
}

fn read_appointment_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        hospital_id: row.get(2)?,
        scheduled_at: row.get(3)?,
        reason: row.get(4)?,
        status: row.get(5)?,
        external_hospital_info: row.get(6)?,
    })
}

impl AppointmentRow {
    fn into_appointment(self) -> HealthResult<Appointment> {
        let hospital = if self.hospital_id == EXTERNAL_HOSPITAL_SENTINEL {
            let info = self.external_hospital_info.ok_or_else(|| {
                HealthError::Validation(
                    "external appointment row is missing its hospital info".to_string(),
                )
            })?;
            HospitalRef::External(info)
        } else {
            HospitalRef::Registered(self.hospital_id)
        };
        Ok(Appointment {
            id: self.id,
            patient_id: self.patient_id,
            hospital,
            scheduled_at: parse_timestamp(&self.scheduled_at)?,
            reason: self.reason,
            status: AppointmentStatus::parse(&self.status)?,
        })
    }
}

struct RawPatientRow(String, String, String, String, String);

fn read_patient_row(row: &Row<'_>) -> rusqlite::Result<RawPatientRow> {
    Ok(RawPatientRow(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

impl RawPatientRow {
    fn into_row(self) -> HealthResult<PatientAppointmentRow> {
        Ok(PatientAppointmentRow {
            id: self.0,
            hospital_name: self.1,
            scheduled_at: parse_timestamp(&self.2)?,
            reason: self.3,
            status: AppointmentStatus::parse(&self.4)?,
        })
    }
}

struct RawHospitalRow(String, String, String, String, String);

fn read_hospital_row(row: &Row<'_>) -> rusqlite::Result<RawHospitalRow> {
    Ok(RawHospitalRow(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

impl RawHospitalRow {
    fn into_row(self) -> HealthResult<HospitalAppointmentRow> {
        Ok(HospitalAppointmentRow {
            id: self.0,
            patient_name: self.1,
            scheduled_at: parse_timestamp(&self.2)?,
            reason: self.3,
            status: AppointmentStatus::parse(&self.4)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> HealthResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HealthError::Validation(format!("stored timestamp is malformed: {e}")))
}
