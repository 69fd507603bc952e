//! Health record repository - append and newest-first listing.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::info;

use trackhealth_shared::{
    new_entity_id, require_role, HealthError, HealthResult, PaginatedResult, PaginationInput,
    Role, Session,
};

use crate::{validate_record, AddRecordInput, HealthRecord, RecordType, RecordValue};

/// Log a new record for the calling patient.
///
/// Records are immutable once written; there is no update or delete path.
pub fn add_record(
    conn: &Connection,
    session: &Session,
    input: &AddRecordInput,
) -> HealthResult<HealthRecord> {
    require_role(session, Role::Patient)?;
    validate_record(&input.value)?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;

    let record = HealthRecord {
        id: new_entity_id("REC"),
        patient_id: patient.id,
        recorded_at: input.recorded_at.unwrap_or_else(Utc::now),
        value: input.value.clone(),
        notes: input.notes.clone(),
    };
    conn.execute(
        "INSERT INTO health_records (id, patient_id, recorded_at, record_type, value, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.patient_id,
            record.recorded_at.to_rfc3339(),
            record.record_type().as_str(),
            record.value.encode(),
            record.notes,
        ],
    )?;
    info!(
        record = %record.id,
        record_type = record.record_type().as_str(),
        "logged health record"
    );
    Ok(record)
}

/// The calling patient's records, newest first, optionally one type only.
pub fn list_records(
    conn: &Connection,
    session: &Session,
    type_filter: Option<RecordType>,
    pagination: &PaginationInput,
) -> HealthResult<PaginatedResult<HealthRecord>> {
    require_role(session, Role::Patient)?;
    pagination.validate()?;
    let patient = trackhealth_patient::profile_for_identity(conn, &session.identity_id)?;
    let type_str = type_filter.map(|t| t.as_str());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM health_records
         WHERE patient_id = ?1 AND (?2 IS NULL OR record_type = ?2)",
        params![patient.id, type_str],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, recorded_at, record_type, value, notes
         FROM health_records
         WHERE patient_id = ?1 AND (?2 IS NULL OR record_type = ?2)
         ORDER BY recorded_at DESC
         LIMIT ?3 OFFSET ?4",
    )?;
    let rows = stmt
        .query_map(
            params![
                patient.id,
                type_str,
                pagination.limit as i64,
                pagination.offset as i64
            ],
            read_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    let items = rows
        .into_iter()
        .map(RecordRow::into_record)
        .collect::<HealthResult<Vec<_>>>()?;
    Ok(PaginatedResult::new(items, total as usize, pagination))
}

/// Raw row as stored; converted after the statement completes.
struct RecordRow {
    id: String,
    patient_id: String,
    recorded_at: String,
    record_type: String,
    value: String,
    notes: Option<String>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        recorded_at: row.get(2)?,
        record_type: row.get(3)?,
        value: row.get(4)?,
        notes: row.get(5)?,
    })
}

impl RecordRow {
    fn into_record(self) -> HealthResult<HealthRecord> {
        let record_type = RecordType::parse(&self.record_type)?;
        let recorded_at = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| HealthError::Validation(format!("stored timestamp is malformed: {e}")))?;
        Ok(HealthRecord {
            id: self.id,
            patient_id: self.patient_id,
            recorded_at,
            value: RecordValue::decode(record_type, &self.value)?,
            notes: self.notes,
        })
    }
}
