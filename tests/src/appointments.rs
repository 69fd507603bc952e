//! Appointment Ledger Tests
//!
//! Booking, the guarded status lifecycle, tenant isolation, and the
//! role-scoped listing projections.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use trackhealth_appointments::{
        book, cancel, history_for_hospital, history_for_patient, update_status,
        upcoming_for_hospital, upcoming_for_patient, Appointment, AppointmentStatus,
        BookAppointmentInput, HospitalRef,
    };
    use trackhealth_shared::{HealthError, PaginationInput, Session};
    use trackhealth_shared::db::Db;

    use crate::{hospital_session, patient_session, sample_hospital_input, sample_patient_input, test_db};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, day, hour, 0, 0).unwrap()
    }

    fn book_at(
        db: &Db,
        session: &Session,
        hospital: HospitalRef,
        scheduled_at: DateTime<Utc>,
        reason: &str,
    ) -> Appointment {
        let input = BookAppointmentInput {
            hospital,
            scheduled_at,
            reason: reason.to_string(),
        };
        book(db.conn(), session, &input).expect("book appointment")
    }

    fn second_patient(db: &mut Db) -> Session {
        let mut input = sample_patient_input();
        input.first_name = "Ben".to_string();
        input.last_name = "Adams".to_string();
        input.email = "ben@example.com".to_string();
        trackhealth_identity::register_patient(db.conn_mut(), &input).unwrap();
        trackhealth_identity::authenticate(db.conn(), "ben.adams", "patient123").unwrap()
    }

    fn second_hospital(db: &mut Db) -> Session {
        let mut input = sample_hospital_input();
        input.name = "City Clinic".to_string();
        input.email = "contact@cityclinic.example.com".to_string();
        trackhealth_identity::register_hospital(db.conn_mut(), &input).unwrap();
        trackhealth_identity::authenticate(db.conn(), "cityclinic", "hospital123").unwrap()
    }

    #[test]
    fn booking_appears_in_the_upcoming_listing() {
        let mut db = test_db();
        let (hospital, _) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);

        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::Registered(hospital.id.clone()),
            at(1, 9),
            "Annual checkup",
        );
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert!(appointment.id.starts_with("APT_"));

        let upcoming = upcoming_for_patient(db.conn(), &patient).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, appointment.id);
        assert_eq!(upcoming[0].hospital_name, "General Hospital");
        assert_eq!(upcoming[0].status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn cancelling_twice_violates_the_lifecycle() {
        let mut db = test_db();
        let (hospital, _) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::Registered(hospital.id),
            at(1, 9),
            "Annual checkup",
        );

        let cancelled = cancel(db.conn(), &patient, &appointment.id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let err = cancel(db.conn(), &patient, &appointment.id).unwrap_err();
        assert!(matches!(
            err,
            HealthError::InvalidTransition { ref from, ref to }
                if from == "Cancelled" && to == "Cancelled"
        ));
    }

    #[test]
    fn hospitals_move_their_appointments_to_terminal_states() {
        let mut db = test_db();
        let (hospital, hospital_login) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::Registered(hospital.id),
            at(1, 9),
            "Annual checkup",
        );

        let completed = update_status(
            db.conn(),
            &hospital_login,
            &appointment.id,
            AppointmentStatus::Completed,
        )
        .unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);

        // completed appointments are frozen
        assert!(matches!(
            update_status(
                db.conn(),
                &hospital_login,
                &appointment.id,
                AppointmentStatus::NoShow,
            ),
            Err(HealthError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn foreign_appointments_are_indistinguishable_from_missing_ones() {
        let mut db = test_db();
        let (hospital, _) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let other_patient = second_patient(&mut db);
        let other_hospital = second_hospital(&mut db);
        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::Registered(hospital.id),
            at(1, 9),
            "Annual checkup",
        );

        assert!(matches!(
            cancel(db.conn(), &other_patient, &appointment.id),
            Err(HealthError::NotFound { .. })
        ));
        assert!(matches!(
            update_status(
                db.conn(),
                &other_hospital,
                &appointment.id,
                AppointmentStatus::Completed,
            ),
            Err(HealthError::NotFound { .. })
        ));
        // and the record is untouched
        let upcoming = upcoming_for_patient(db.conn(), &patient).unwrap();
        assert_eq!(upcoming.len(), 1);
    }

    #[test]
    fn external_bookings_carry_their_free_text_hospital() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);
        let hospital_login = {
            let (_, login) = hospital_session(&mut db);
            login
        };

        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::External("St. Vincent, Downtown".to_string()),
            at(2, 14),
            "Second opinion",
        );
        assert_eq!(
            appointment.hospital,
            HospitalRef::External("St. Vincent, Downtown".to_string())
        );

        let upcoming = upcoming_for_patient(db.conn(), &patient).unwrap();
        assert_eq!(upcoming[0].hospital_name, "St. Vincent, Downtown");

        // no registered hospital owns an external booking
        assert!(matches!(
            update_status(
                db.conn(),
                &hospital_login,
                &appointment.id,
                AppointmentStatus::Completed,
            ),
            Err(HealthError::NotFound { .. })
        ));
    }

    #[test]
    fn bookings_against_unknown_hospitals_are_rejected() {
        let mut db = test_db();
        let (_, patient) = patient_session(&mut db);
        let input = BookAppointmentInput {
            hospital: HospitalRef::Registered("HOS_ffffff".to_string()),
            scheduled_at: at(1, 9),
            reason: "Annual checkup".to_string(),
        };
        assert!(matches!(
            book(db.conn(), &patient, &input),
            Err(HealthError::NotFound { .. })
        ));
    }

    #[test]
    fn role_gates_reject_the_wrong_session_kind() {
        let mut db = test_db();
        let (hospital, hospital_login) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let appointment = book_at(
            &db,
            &patient,
            HospitalRef::Registered(hospital.id.clone()),
            at(1, 9),
            "Annual checkup",
        );

        let input = BookAppointmentInput {
            hospital: HospitalRef::Registered(hospital.id),
            scheduled_at: at(1, 10),
            reason: "Walk-in".to_string(),
        };
        assert!(matches!(
            book(db.conn(), &hospital_login, &input),
            Err(HealthError::Unauthorized(_))
        ));
        assert!(matches!(
            update_status(
                db.conn(),
                &patient,
                &appointment.id,
                AppointmentStatus::Completed,
            ),
            Err(HealthError::Unauthorized(_))
        ));
    }

    #[test]
    fn upcoming_ascends_and_history_descends_by_scheduled_time() {
        let mut db = test_db();
        let (hospital, hospital_login) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let hospital_ref = HospitalRef::Registered(hospital.id);

        let first = book_at(&db, &patient, hospital_ref.clone(), at(3, 9), "Follow-up");
        let second = book_at(&db, &patient, hospital_ref.clone(), at(1, 9), "Checkup");
        let third = book_at(&db, &patient, hospital_ref, at(2, 9), "Lab review");

        let upcoming = upcoming_for_patient(db.conn(), &patient).unwrap();
        let order: Vec<&str> = upcoming.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(order, vec![&second.id, &third.id, &first.id]);

        update_status(
            db.conn(),
            &hospital_login,
            &second.id,
            AppointmentStatus::Completed,
        )
        .unwrap();

        let history =
            history_for_patient(db.conn(), &patient, &PaginationInput::default()).unwrap();
        let order: Vec<&str> = history.items.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(order, vec![&first.id, &third.id, &second.id]);
        assert_eq!(history.total, 3);
        assert!(!history.has_more);

        // completed bookings leave the upcoming view only
        assert_eq!(upcoming_for_patient(db.conn(), &patient).unwrap().len(), 2);
    }

    #[test]
    fn hospital_history_filters_by_status_and_paginates() {
        let mut db = test_db();
        let (hospital, hospital_login) = hospital_session(&mut db);
        let (_, patient) = patient_session(&mut db);
        let hospital_ref = HospitalRef::Registered(hospital.id);

        let mut ids = Vec::new();
        for day in 1..=4 {
            ids.push(book_at(&db, &patient, hospital_ref.clone(), at(day, 9), "Visit").id);
        }
        update_status(
            db.conn(),
            &hospital_login,
            &ids[0],
            AppointmentStatus::NoShow,
        )
        .unwrap();
        update_status(
            db.conn(),
            &hospital_login,
            &ids[1],
            AppointmentStatus::Completed,
        )
        .unwrap();

        let upcoming = upcoming_for_hospital(db.conn(), &hospital_login).unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].patient_name, "Alice Johnson");

        let no_shows = history_for_hospital(
            db.conn(),
            &hospital_login,
            Some(AppointmentStatus::NoShow),
            &PaginationInput::default(),
        )
        .unwrap();
        assert_eq!(no_shows.total, 1);
        assert_eq!(no_shows.items[0].id, ids[0]);

        let page = history_for_hospital(
            db.conn(),
            &hospital_login,
            None,
            &PaginationInput {
                offset: 0,
                limit: 3,
            },
        )
        .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total, 4);
        assert!(page.has_more);
    }
}
