//! Health Record Tests
//!
//! Per-type value encodings, owner-only writes, and newest-first listing
//! with type filters.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rusqlite::params;

    use trackhealth_records::{
        add_record, list_records, AddRecordInput, HealthRecord, RecordType, RecordValue,
    };
    use trackhealth_shared::db::Db;
    use trackhealth_shared::{HealthError, PaginationInput, Session};

    use crate::{hospital_session, patient_session, test_db};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, day, hour, 0, 0).unwrap()
    }

    fn add_at(
        db: &Db,
        session: &Session,
        value: RecordValue,
        recorded_at: DateTime<Utc>,
    ) -> HealthRecord {
        let input = AddRecordInput {
            value,
            notes: None,
            recorded_at: Some(recorded_at),
        };
        add_record(db.conn(), session, &input).expect("add record")
    }

    #[test]
    fn blood_pressure_round_trips_as_systolic_over_diastolic() {
        let mut db = test_db();
        let (profile, patient) = patient_session(&mut db);

        let record = add_at(
            &db,
            &patient,
            RecordValue::BloodPressure {
                systolic: 120,
                diastolic: 80,
            },
            at(1, 8),
        );
        assert!(record.id.starts_with("REC_"));
        assert_eq!(record.patient_id, profile.id);

        let stored: String = db
            .conn()
            .query_row(
                "SELECT value FROM health_records WHERE id = ?1",
                params![record.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, "120/80");

        let listed = list_records(db.conn(), &patient, None, &PaginationInput::default()).unwrap();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(
            listed.items[0].value,
            RecordValue::BloodPressure {
                systolic: 120,
                diastolic: 80,
            }
        );
    }

    #[test]
    fn exercise_and_medication_store_their_label_encodings() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);

        let exercise = add_at(
            &db,
            &patient,
            RecordValue::Exercise {
                activity: "Running".to_string(),
                duration_minutes: 30,
            },
            at(1, 7),
        );
        let medication = add_at(
            &db,
            &patient,
            RecordValue::Medication {
                name: "Metformin".to_string(),
                dose: "500mg".to_string(),
            },
            at(1, 9),
        );

        let stored = |id: &str| -> String {
            db.conn()
                .query_row(
                    "SELECT value FROM health_records WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .unwrap()
        };
        assert_eq!(stored(&exercise.id), "Running: 30");
        assert_eq!(stored(&medication.id), "Metformin: 500mg");
    }

    #[test]
    fn type_filter_returns_newest_first() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);

        let old_weight = add_at(&db, &patient, RecordValue::Weight(71.0), at(1, 8));
        add_at(&db, &patient, RecordValue::HeartRate(72.0), at(2, 8));
        let new_weight = add_at(&db, &patient, RecordValue::Weight(70.5), at(3, 8));

        let weights = list_records(
            db.conn(),
            &patient,
            Some(RecordType::Weight),
            &PaginationInput::default(),
        )
        .unwrap();
        assert_eq!(weights.total, 2);
        let order: Vec<&str> = weights.items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec![&new_weight.id, &old_weight.id]);
        assert!(weights
            .items
            .iter()
            .all(|r| r.record_type() == RecordType::Weight));
    }

    #[test]
    fn records_default_their_timestamp_to_now() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);
        let before = Utc::now();
        let record = add_record(
            db.conn(),
            &patient,
            &AddRecordInput {
                value: RecordValue::BloodSugar(95.0),
                notes: Some("fasting".to_string()),
                recorded_at: None,
            },
        )
        .unwrap();
        assert!(record.recorded_at >= before);
        assert_eq!(record.notes.as_deref(), Some("fasting"));
    }

    #[test]
    fn implausible_vitals_are_rejected() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);
        let input = AddRecordInput {
            value: RecordValue::HeartRate(500.0),
            notes: None,
            recorded_at: None,
        };
        assert!(matches!(
            add_record(db.conn(), &patient, &input),
            Err(HealthError::Validation(_))
        ));
    }

    #[test]
    fn hospital_sessions_cannot_write_records() {
        let mut db = test_db();
        let (_, hospital) = hospital_session(&mut db);
        let input = AddRecordInput {
            value: RecordValue::Weight(70.0),
            notes: None,
            recorded_at: None,
        };
        assert!(matches!(
            add_record(db.conn(), &hospital, &input),
            Err(HealthError::Unauthorized(_))
        ));
    }

    #[test]
    fn listings_are_scoped_to_the_calling_patient() {
        let mut db = test_db();
        let (_, alice) = patient_session(&mut db);
        add_at(&db, &alice, RecordValue::Weight(70.0), at(1, 8));

        let mut input = crate::sample_patient_input();
        input.first_name = "Ben".to_string();
        input.last_name = "Adams".to_string();
        input.email = "ben@example.com".to_string();
        trackhealth_identity::register_patient(db.conn_mut(), &input).unwrap();
        let ben =
            trackhealth_identity::authenticate(db.conn(), "ben.adams", "patient123").unwrap();

        let listed = list_records(db.conn(), &ben, None, &PaginationInput::default()).unwrap();
        assert_eq!(listed.total, 0);
        assert!(listed.items.is_empty());
    }

    #[test]
    fn malformed_persisted_values_surface_as_validation_errors() {
        let mut db = test_db();
        let (profile, patient) = patient_session(&mut db);
        db.conn()
            .execute(
                "INSERT INTO health_records (id, patient_id, recorded_at, record_type, value, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                params![
                    "REC_bad001",
                    profile.id,
                    at(1, 8).to_rfc3339(),
                    "BloodPressure",
                    "120-80",
                ],
            )
            .unwrap();

        assert!(matches!(
            list_records(db.conn(), &patient, None, &PaginationInput::default()),
            Err(HealthError::Validation(_))
        ));
    }
}
