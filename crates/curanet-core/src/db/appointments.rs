//! Appointment database operations.

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{unique_or_sqlite, Database, DbError, DbResult};
use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, NewAppointment, ScheduleSlot,
};

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    id: i64,
    patient_id: i64,
    doctor_id: i64,
    hospital_id: Option<i64>,
    scheduled_at: NaiveDateTime,
    status: String,
    reason: Option<String>,
    is_teleconsultation: bool,
    created_at: String,
}

impl AppointmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            hospital_id: row.get(3)?,
            scheduled_at: row.get(4)?,
            status: row.get(5)?,
            reason: row.get(6)?,
            is_teleconsultation: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        Ok(Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            hospital_id: row.hospital_id,
            scheduled_at: row.scheduled_at,
            status,
            reason: row.reason,
            is_teleconsultation: row.is_teleconsultation,
            created_at: row.created_at,
        })
    }
}

fn parse_status(s: &str) -> DbResult<AppointmentStatus> {
    s.parse::<AppointmentStatus>()
        .map_err(|e| DbError::Corrupt(e.to_string()))
}

const APPOINTMENT_COLUMNS: &str = r#"
    id, patient_id, doctor_id, hospital_id, scheduled_at,
    status, reason, is_teleconsultation, created_at
"#;

impl Database {
    /// Insert an appointment.
    ///
    /// Returns [`DbError::Constraint`] when the doctor already holds the slot.
    pub fn insert_appointment(&self, appointment: &NewAppointment) -> DbResult<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO appointments (
                    patient_id, doctor_id, hospital_id, scheduled_at,
                    status, reason, is_teleconsultation
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    appointment.patient_id,
                    appointment.doctor_id,
                    appointment.hospital_id,
                    appointment.scheduled_at,
                    appointment.status.as_str(),
                    appointment.reason,
                    appointment.is_teleconsultation,
                ],
            )
            .map_err(|e| unique_or_sqlite(e, "appointments.doctor_slot"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get an appointment by id.
    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS),
                [id],
                AppointmentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Whether a live appointment already holds `(doctor_id, scheduled_at)`.
    ///
    /// `excluding` skips one appointment id, so a reschedule does not collide
    /// with itself.
    pub fn slot_taken(
        &self,
        doctor_id: i64,
        scheduled_at: NaiveDateTime,
        excluding: Option<i64>,
    ) -> DbResult<bool> {
        let taken: bool = self.conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM appointments
                WHERE doctor_id = ?1
                  AND scheduled_at = ?2
                  AND status <> 'cancelled'
                  AND (?3 IS NULL OR id <> ?3)
            )
            "#,
            params![doctor_id, scheduled_at, excluding],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    /// Apply a typed partial update. Absent fields keep their stored value.
    pub fn apply_appointment_patch(&self, id: i64, patch: &AppointmentPatch) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                r#"
                UPDATE appointments SET
                    status = COALESCE(?2, status),
                    scheduled_at = COALESCE(?3, scheduled_at),
                    updated_at = datetime('now')
                WHERE id = ?1
                "#,
                params![
                    id,
                    patch.status.map(|s| s.as_str()),
                    patch.scheduled_at,
                ],
            )
            .map_err(|e| unique_or_sqlite(e, "appointments.doctor_slot"))?;
        Ok(rows_affected > 0)
    }

    /// All appointments of a patient, earliest first.
    pub fn list_appointments_for_patient(&self, patient_id: i64) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM appointments WHERE patient_id = ? ORDER BY scheduled_at",
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], AppointmentRow::from_row)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?.try_into()?);
        }
        Ok(appointments)
    }

    /// A doctor's live slots from `from` onwards.
    pub fn doctor_schedule(
        &self,
        doctor_id: i64,
        from: NaiveDateTime,
    ) -> DbResult<Vec<ScheduleSlot>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT scheduled_at, status, is_teleconsultation
            FROM appointments
            WHERE doctor_id = ?1 AND scheduled_at >= ?2 AND status <> 'cancelled'
            ORDER BY scheduled_at
            "#,
        )?;

        let rows = stmt.query_map(params![doctor_id, from], |row| {
            Ok((
                row.get::<_, NaiveDateTime>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        let mut slots = Vec::new();
        for row in rows {
            let (scheduled_at, status, is_teleconsultation) = row?;
            slots.push(ScheduleSlot {
                scheduled_at,
                status: parse_status(&status)?,
                is_teleconsultation,
            });
        }
        Ok(slots)
    }

    /// Count all appointment rows.
    pub fn count_appointments(&self) -> DbResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
        Ok(count)
    }
}
