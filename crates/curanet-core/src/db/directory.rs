//! Hospital and doctor directory operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{contains_pattern, Database, DbResult};
use crate::models::{Doctor, Hospital, NewDoctor, NewHospital};

fn hospital_from_row(row: &Row<'_>) -> rusqlite::Result<Hospital> {
    Ok(Hospital {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        contact_number: row.get(3)?,
    })
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        specialization: row.get(2)?,
        hospital_id: row.get(3)?,
        hospital_name: row.get(4)?,
    })
}

const DOCTOR_SELECT: &str = r#"
    SELECT d.id, d.name, d.specialization, d.hospital_id, h.name
    FROM doctors d
    LEFT JOIN hospitals h ON d.hospital_id = h.id
"#;

impl Database {
    /// Provision a hospital.
    pub fn insert_hospital(&self, hospital: &NewHospital) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO hospitals (name, address, contact_number) VALUES (?1, ?2, ?3)",
            params![hospital.name, hospital.address, hospital.contact_number],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Provision a doctor.
    pub fn insert_doctor(&self, doctor: &NewDoctor) -> DbResult<i64> {
        self.conn.execute(
            "INSERT INTO doctors (name, specialization, hospital_id) VALUES (?1, ?2, ?3)",
            params![doctor.name, doctor.specialization, doctor.hospital_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_hospital(&self, id: i64) -> DbResult<Option<Hospital>> {
        self.conn
            .query_row(
                "SELECT id, name, address, contact_number FROM hospitals WHERE id = ?",
                [id],
                hospital_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_hospitals(&self) -> DbResult<Vec<Hospital>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, address, contact_number FROM hospitals ORDER BY name")?;
        let rows = stmt.query_map([], hospital_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_doctor(&self, id: i64) -> DbResult<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("{} WHERE d.id = ?", DOCTOR_SELECT),
                [id],
                doctor_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Doctors affiliated with a hospital.
    pub fn list_doctors_for_hospital(&self, hospital_id: i64) -> DbResult<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE d.hospital_id = ? ORDER BY d.name",
            DOCTOR_SELECT
        ))?;
        let rows = stmt.query_map([hospital_id], doctor_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search doctors by name or specialization.
    pub fn search_doctors(&self, keyword: &str, limit: usize) -> DbResult<Vec<Doctor>> {
        let pattern = contains_pattern(keyword);
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE d.name LIKE ?1 ESCAPE '\\' OR d.specialization LIKE ?1 ESCAPE '\\' ORDER BY d.name LIMIT ?2",
            DOCTOR_SELECT
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], doctor_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_joined_with_hospital() {
        let db = Database::open_in_memory().unwrap();
        let hospital_id = db.insert_hospital(&NewHospital::new("St. Mary")).unwrap();

        let mut doctor = NewDoctor::new("Dr. Grey", Some(hospital_id));
        doctor.specialization = Some("Cardiology".into());
        let doctor_id = db.insert_doctor(&doctor).unwrap();

        let stored = db.get_doctor(doctor_id).unwrap().unwrap();
        assert_eq!(stored.hospital_name.as_deref(), Some("St. Mary"));

        let listed = db.list_doctors_for_hospital(hospital_id).unwrap();
        assert_eq!(listed.len(), 1);

        let found = db.search_doctors("cardio", 10).unwrap();
        assert_eq!(found[0].id, doctor_id);
    }

    #[test]
    fn test_unaffiliated_doctor() {
        let db = Database::open_in_memory().unwrap();
        let doctor_id = db.insert_doctor(&NewDoctor::new("Dr. Solo", None)).unwrap();

        let stored = db.get_doctor(doctor_id).unwrap().unwrap();
        assert_eq!(stored.hospital_id, None);
        assert_eq!(stored.hospital_name, None);
        assert!(db.list_hospitals().unwrap().is_empty());
    }
}
