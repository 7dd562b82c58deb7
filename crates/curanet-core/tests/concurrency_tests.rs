//! Races between independent connections sharing one database file.
//!
//! Each thread opens its own `Database`, so the portal mutex plays no part:
//! only IMMEDIATE transactions and UNIQUE constraints keep the data sound.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDate;
use curanet_core::auth::{Session, MIN_BCRYPT_COST};
use curanet_core::booking::{BookingError, Scheduler};
use curanet_core::models::{BookingRequest, NewDoctor, NewHospital, NewPatient, Role};
use curanet_core::registration::{MedicalIdGenerator, Registrar, RegistrationError, RegistrationRequest};
use curanet_core::Database;
use tempfile::TempDir;

const CONTENDERS: usize = 4;

fn staff() -> Session {
    Session {
        sub: 1,
        username: "scheduler".into(),
        role: Some(Role::Staff),
        patient_id: None,
        doctor_id: None,
        iat: 0,
        exp: i64::MAX,
        jti: "race".into(),
    }
}

#[test]
fn test_concurrent_booking_of_one_slot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("portal.db");

    let (doctor_id, patient_ids) = {
        let db = Database::open(&path).unwrap();
        let hospital_id = db.insert_hospital(&NewHospital::new("General")).unwrap();
        let doctor_id = db
            .insert_doctor(&NewDoctor::new("Dr. Race", Some(hospital_id)))
            .unwrap();
        let patient_ids: Vec<i64> = (0..CONTENDERS)
            .map(|n| {
                db.insert_patient(&NewPatient {
                    name: format!("Patient {}", n),
                    date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                    gender: None,
                    contact_number: None,
                    email: None,
                    medical_id: format!("MED50000{}", n),
                })
                .unwrap()
            })
            .collect();
        (doctor_id, patient_ids)
    };

    let slot = NaiveDate::from_ymd_opt(2032, 1, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = patient_ids
        .into_iter()
        .map(|patient_id| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                barrier.wait();
                Scheduler::new(&db).create_appointment(
                    &staff(),
                    &BookingRequest {
                        patient_id,
                        doctor_id,
                        hospital_id: None,
                        scheduled_at: slot,
                        reason: None,
                        is_teleconsultation: false,
                    },
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let booked = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::SlotUnavailable)))
        .count();

    assert_eq!(booked, 1, "results: {:?}", results);
    assert_eq!(rejected, CONTENDERS - 1);

    let db = Database::open(&path).unwrap();
    assert_eq!(db.count_appointments().unwrap(), 1);
}

#[test]
fn test_concurrent_registration_of_one_username() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("portal.db");
    drop(Database::open(&path).unwrap());

    let barrier = Arc::new(Barrier::new(CONTENDERS));
    let handles: Vec<_> = (0..CONTENDERS)
        .map(|n| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                let mut ids = MedicalIdGenerator::seeded(n as u64);
                barrier.wait();
                Registrar::new(&db, &mut ids, MIN_BCRYPT_COST).register(&RegistrationRequest {
                    username: "popular".into(),
                    password: "pw-123456".into(),
                    email: format!("popular{}@example.com", n),
                    role: "patient".into(),
                    name: Some("Popular Name".into()),
                    date_of_birth: Some("2000-01-01".into()),
                    ..Default::default()
                })
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(RegistrationError::DuplicateAccount))));

    let db = Database::open(&path).unwrap();
    assert_eq!(db.count_accounts().unwrap(), 1);
    assert_eq!(db.count_patients().unwrap(), 1);
    assert_eq!(db.count_role_assignments().unwrap(), 1);
}
