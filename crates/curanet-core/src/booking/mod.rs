//! Appointment booking with double-booking prevention.
//!
//! A doctor's slot is the pair `(doctor_id, scheduled_at)`. Conflicts are
//! exact-timestamp matches against non-cancelled appointments; durations are
//! not modeled. Each check-then-write runs inside an IMMEDIATE transaction,
//! and the partial UNIQUE index on the slot backs it up at the store level.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::db::{Database, DbError};
use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, BookingRequest, NewAppointment, Role,
    ScheduleSlot,
};
use crate::policy::{authorize, authorize_appointment_change, AccessRule, Decision, DenyReason};

/// Booking errors.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor is not available at this time")]
    SlotUnavailable,

    #[error("Access denied")]
    Denied(DenyReason),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for BookingError {
    fn from(err: rusqlite::Error) -> Self {
        BookingError::Database(DbError::Sqlite(err))
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

/// Status a new booking starts in, by the role of whoever books it.
///
/// Patients request; clinical and administrative callers confirm directly.
pub fn initial_status_for(role: Option<Role>) -> AppointmentStatus {
    match role {
        Some(Role::Patient) | None => AppointmentStatus::Pending,
        Some(Role::Doctor | Role::Hospital | Role::Staff | Role::Admin) => {
            AppointmentStatus::Confirmed
        }
    }
}

fn check(decision: Decision) -> BookingResult<()> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(BookingError::Denied(reason)),
    }
}

fn slot_conflict(err: DbError) -> BookingError {
    match err {
        DbError::Constraint(_) => BookingError::SlotUnavailable,
        other => BookingError::Database(other),
    }
}

/// Appointment scheduler bound to a store.
pub struct Scheduler<'a> {
    db: &'a Database,
}

impl<'a> Scheduler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Book a slot for a patient.
    pub fn create_appointment(
        &self,
        session: &Session,
        request: &BookingRequest,
    ) -> BookingResult<Appointment> {
        check(authorize(
            Some(session),
            &AccessRule::patient_data(request.patient_id),
        ))
        .inspect_err(|_| {
            warn!(
                account_id = session.account_id(),
                patient_id = request.patient_id,
                "booking denied"
            )
        })?;

        let tx = self.db.begin_immediate()?;

        if self.db.get_patient(request.patient_id)?.is_none() {
            return Err(BookingError::NotFound("Patient"));
        }
        let doctor = self
            .db
            .get_doctor(request.doctor_id)?
            .ok_or(BookingError::NotFound("Doctor"))?;

        let hospital_id = match request.hospital_id {
            Some(id) => {
                self.db
                    .get_hospital(id)?
                    .ok_or(BookingError::NotFound("Hospital"))?;
                Some(id)
            }
            None => doctor.hospital_id,
        };

        if self.db.slot_taken(doctor.id, request.scheduled_at, None)? {
            warn!(
                doctor_id = doctor.id,
                scheduled_at = %request.scheduled_at,
                "slot already booked"
            );
            return Err(BookingError::SlotUnavailable);
        }

        let id = self
            .db
            .insert_appointment(&NewAppointment {
                patient_id: request.patient_id,
                doctor_id: doctor.id,
                hospital_id,
                scheduled_at: request.scheduled_at,
                status: initial_status_for(session.role),
                reason: request.reason.clone(),
                is_teleconsultation: request.is_teleconsultation,
            })
            .map_err(slot_conflict)?;

        let appointment = self
            .db
            .get_appointment(id)?
            .ok_or(BookingError::NotFound("Appointment"))?;
        tx.commit()?;

        info!(
            appointment_id = id,
            doctor_id = doctor.id,
            patient_id = request.patient_id,
            status = %appointment.status,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Change an appointment's status and/or time.
    ///
    /// Checks run in a fixed order: existence, authorization, non-empty
    /// patch, slot availability. Nothing is written unless all pass.
    pub fn update_appointment(
        &self,
        session: &Session,
        id: i64,
        patch: &AppointmentPatch,
    ) -> BookingResult<Appointment> {
        let tx = self.db.begin_immediate()?;

        let existing = self
            .db
            .get_appointment(id)?
            .ok_or(BookingError::NotFound("Appointment"))?;

        check(authorize_appointment_change(Some(session), &existing)).inspect_err(|_| {
            warn!(
                account_id = session.account_id(),
                appointment_id = id,
                "appointment change denied"
            )
        })?;

        if patch.is_empty() {
            return Err(BookingError::NoFieldsToUpdate);
        }

        let status = patch.status.unwrap_or(existing.status);
        let scheduled_at = patch.scheduled_at.unwrap_or(existing.scheduled_at);
        let moves = scheduled_at != existing.scheduled_at;
        let reactivates = !existing.status.holds_slot();

        if status.holds_slot()
            && (moves || reactivates)
            && self.db.slot_taken(existing.doctor_id, scheduled_at, Some(id))?
        {
            warn!(
                appointment_id = id,
                doctor_id = existing.doctor_id,
                scheduled_at = %scheduled_at,
                "reschedule conflicts with existing booking"
            );
            return Err(BookingError::SlotUnavailable);
        }

        if !self
            .db
            .apply_appointment_patch(id, patch)
            .map_err(slot_conflict)?
        {
            return Err(BookingError::NotFound("Appointment"));
        }

        let updated = self
            .db
            .get_appointment(id)?
            .ok_or(BookingError::NotFound("Appointment"))?;
        tx.commit()?;

        info!(
            appointment_id = id,
            status = %updated.status,
            scheduled_at = %updated.scheduled_at,
            "appointment updated"
        );
        Ok(updated)
    }

    /// Upcoming non-cancelled slots for a doctor.
    pub fn doctor_schedule(
        &self,
        doctor_id: i64,
        from: NaiveDateTime,
    ) -> BookingResult<Vec<ScheduleSlot>> {
        if self.db.get_doctor(doctor_id)?.is_none() {
            return Err(BookingError::NotFound("Doctor"));
        }
        let slots = self.db.doctor_schedule(doctor_id, from)?;
        debug!(doctor_id, count = slots.len(), "schedule loaded");
        Ok(slots)
    }

    /// All appointments of one patient, subject to the ownership rule.
    pub fn patient_appointments(
        &self,
        session: &Session,
        patient_id: i64,
    ) -> BookingResult<Vec<Appointment>> {
        check(authorize(Some(session), &AccessRule::patient_data(patient_id)))?;
        Ok(self.db.list_appointments_for_patient(patient_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewDoctor, NewHospital, NewPatient};
    use chrono::NaiveDate;

    struct Fixture {
        db: Database,
        patient_id: i64,
        other_patient_id: i64,
        doctor_id: i64,
        hospital_id: i64,
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn patient(name: &str, medical_id: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            gender: None,
            contact_number: None,
            email: None,
            medical_id: medical_id.into(),
        }
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let hospital_id = db.insert_hospital(&NewHospital::new("General")).unwrap();
        let doctor_id = db
            .insert_doctor(&NewDoctor::new("Dr. House", Some(hospital_id)))
            .unwrap();
        let patient_id = db.insert_patient(&patient("Jane", "MED100001")).unwrap();
        let other_patient_id = db.insert_patient(&patient("John", "MED100002")).unwrap();
        Fixture {
            db,
            patient_id,
            other_patient_id,
            doctor_id,
            hospital_id,
        }
    }

    fn session(role: Role, patient_id: Option<i64>, doctor_id: Option<i64>) -> Session {
        Session {
            sub: 1,
            username: "u".into(),
            role: Some(role),
            patient_id,
            doctor_id,
            iat: 0,
            exp: i64::MAX,
            jti: "jti".into(),
        }
    }

    fn request(f: &Fixture, patient_id: i64, when: NaiveDateTime) -> BookingRequest {
        BookingRequest {
            patient_id,
            doctor_id: f.doctor_id,
            hospital_id: None,
            scheduled_at: when,
            reason: Some("checkup".into()),
            is_teleconsultation: false,
        }
    }

    #[test]
    fn test_patient_books_pending() {
        let f = setup();
        let me = session(Role::Patient, Some(f.patient_id), None);

        let appt = Scheduler::new(&f.db)
            .create_appointment(&me, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();

        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.hospital_id, Some(f.hospital_id));
        assert_eq!(appt.scheduled_at, at(10, 0));
    }

    #[test]
    fn test_staff_books_confirmed() {
        let f = setup();
        let staff = session(Role::Staff, None, None);

        let appt = Scheduler::new(&f.db)
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn test_double_booking_rejected() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);

        scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        let err = scheduler
            .create_appointment(&staff, &request(&f, f.other_patient_id, at(10, 0)))
            .unwrap_err();

        assert!(matches!(err, BookingError::SlotUnavailable));
        assert_eq!(f.db.count_appointments().unwrap(), 1);
    }

    #[test]
    fn test_adjacent_minute_is_free() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);

        scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        scheduler
            .create_appointment(&staff, &request(&f, f.other_patient_id, at(10, 1)))
            .unwrap();
        assert_eq!(f.db.count_appointments().unwrap(), 2);
    }

    #[test]
    fn test_cancelled_slot_is_reusable() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);

        let first = scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        scheduler
            .update_appointment(
                &staff,
                first.id,
                &AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    scheduled_at: None,
                },
            )
            .unwrap();

        scheduler
            .create_appointment(&staff, &request(&f, f.other_patient_id, at(10, 0)))
            .unwrap();
    }

    #[test]
    fn test_reactivating_cancelled_rechecks_slot() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);

        let first = scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        let cancel = AppointmentPatch {
            status: Some(AppointmentStatus::Cancelled),
            scheduled_at: None,
        };
        scheduler.update_appointment(&staff, first.id, &cancel).unwrap();
        scheduler
            .create_appointment(&staff, &request(&f, f.other_patient_id, at(10, 0)))
            .unwrap();

        let revive = AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            scheduled_at: None,
        };
        let err = scheduler
            .update_appointment(&staff, first.id, &revive)
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable));

        let unchanged = f.db.get_appointment(first.id).unwrap().unwrap();
        assert_eq!(unchanged.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_patient_cannot_book_for_others() {
        let f = setup();
        let me = session(Role::Patient, Some(f.patient_id), None);

        let err = Scheduler::new(&f.db)
            .create_appointment(&me, &request(&f, f.other_patient_id, at(10, 0)))
            .unwrap_err();
        assert!(matches!(err, BookingError::Denied(DenyReason::Forbidden)));
        assert_eq!(f.db.count_appointments().unwrap(), 0);
    }

    #[test]
    fn test_unknown_doctor() {
        let f = setup();
        let staff = session(Role::Staff, None, None);
        let mut req = request(&f, f.patient_id, at(10, 0));
        req.doctor_id = 999;

        let err = Scheduler::new(&f.db)
            .create_appointment(&staff, &req)
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound("Doctor")));
    }

    #[test]
    fn test_update_check_order() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let owner = session(Role::Patient, Some(f.patient_id), None);
        let stranger = session(Role::Patient, Some(f.other_patient_id), None);

        let appt = scheduler
            .create_appointment(&owner, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();

        // Unknown id wins over everything
        let err = scheduler
            .update_appointment(&stranger, 999, &AppointmentPatch::default())
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));

        // Authorization before the empty-patch check
        let err = scheduler
            .update_appointment(&stranger, appt.id, &AppointmentPatch::default())
            .unwrap_err();
        assert!(matches!(err, BookingError::Denied(DenyReason::Forbidden)));

        let err = scheduler
            .update_appointment(&owner, appt.id, &AppointmentPatch::default())
            .unwrap_err();
        assert!(matches!(err, BookingError::NoFieldsToUpdate));
    }

    #[test]
    fn test_reschedule_into_taken_slot_leaves_row() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);

        scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        let second = scheduler
            .create_appointment(&staff, &request(&f, f.other_patient_id, at(11, 0)))
            .unwrap();

        let err = scheduler
            .update_appointment(
                &staff,
                second.id,
                &AppointmentPatch {
                    status: None,
                    scheduled_at: Some(at(10, 0)),
                },
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable));
        assert_eq!(
            f.db.get_appointment(second.id).unwrap().unwrap().scheduled_at,
            at(11, 0)
        );
    }

    #[test]
    fn test_assigned_doctor_reschedules() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let doctor = session(Role::Doctor, None, Some(f.doctor_id));

        let appt = scheduler
            .create_appointment(&doctor, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        let moved = scheduler
            .update_appointment(
                &doctor,
                appt.id,
                &AppointmentPatch {
                    status: Some(AppointmentStatus::InProgress),
                    scheduled_at: Some(at(12, 30)),
                },
            )
            .unwrap();

        assert_eq!(moved.status, AppointmentStatus::InProgress);
        assert_eq!(moved.scheduled_at, at(12, 30));
    }

    #[test]
    fn test_hospital_role_cannot_modify() {
        let f = setup();
        let scheduler = Scheduler::new(&f.db);
        let staff = session(Role::Staff, None, None);
        let hospital = session(Role::Hospital, None, None);

        let appt = scheduler
            .create_appointment(&staff, &request(&f, f.patient_id, at(10, 0)))
            .unwrap();
        let err = scheduler
            .update_appointment(
                &hospital,
                appt.id,
                &AppointmentPatch {
                    status: Some(AppointmentStatus::Completed),
                    scheduled_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::Denied(DenyReason::Forbidden)));
    }

    #[test]
    fn test_initial_status_by_role() {
        assert_eq!(initial_status_for(Some(Role::Patient)), AppointmentStatus::Pending);
        assert_eq!(initial_status_for(Some(Role::Doctor)), AppointmentStatus::Confirmed);
        assert_eq!(initial_status_for(Some(Role::Admin)), AppointmentStatus::Confirmed);
    }
}
