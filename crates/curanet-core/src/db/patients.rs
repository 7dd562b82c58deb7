//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{contains_pattern, unique_or_sqlite, Database, DbResult};
use crate::models::{NewPatient, Patient};

const PATIENT_COLUMNS: &str = r#"
    id, name, date_of_birth, gender, contact_number, email, medical_id, created_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        date_of_birth: row.get(2)?,
        gender: row.get(3)?,
        contact_number: row.get(4)?,
        email: row.get(5)?,
        medical_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl Database {
    /// Insert a new patient, returning its generated id.
    ///
    /// A clash on `medical_id` surfaces as [`super::DbError::Constraint`].
    pub fn insert_patient(&self, patient: &NewPatient) -> DbResult<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO patients (
                    name, date_of_birth, gender, contact_number, email, medical_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    patient.name,
                    patient.date_of_birth,
                    patient.gender,
                    patient.contact_number,
                    patient.email,
                    patient.medical_id,
                ],
            )
            .map_err(|e| unique_or_sqlite(e, "patients.medical_id"))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by medical identifier.
    pub fn get_patient_by_medical_id(&self, medical_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE medical_id = ?", PATIENT_COLUMNS),
                [medical_id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Check whether a medical identifier is already issued.
    pub fn medical_id_exists(&self, medical_id: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE medical_id = ?)",
            [medical_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Search patients by name or medical id (substring, case-insensitive).
    pub fn search_patients(&self, keyword: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = contains_pattern(keyword);
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM patients
            WHERE name LIKE ?1 ESCAPE '\' OR medical_id LIKE ?1 ESCAPE '\'
            ORDER BY name
            LIMIT ?2
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count all patients.
    pub fn count_patients(&self) -> DbResult<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use chrono::NaiveDate;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_patient(name: &str, medical_id: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            gender: Some("female".into()),
            contact_number: Some("555-0100".into()),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            medical_id: medical_id.into(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let id = db.insert_patient(&new_patient("Jane", "MED123456")).unwrap();

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Jane");
        assert_eq!(retrieved.medical_id, "MED123456");
        assert_eq!(
            retrieved.date_of_birth,
            NaiveDate::from_ymd_opt(1990, 4, 12).unwrap()
        );

        let by_medical_id = db.get_patient_by_medical_id("MED123456").unwrap().unwrap();
        assert_eq!(by_medical_id.id, id);
    }

    #[test]
    fn test_duplicate_medical_id_is_constraint() {
        let db = setup_db();
        db.insert_patient(&new_patient("Jane", "MED123456")).unwrap();

        let err = db.insert_patient(&new_patient("John", "MED123456")).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
        assert!(db.medical_id_exists("MED123456").unwrap());
        assert!(!db.medical_id_exists("MED654321").unwrap());
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();
        db.insert_patient(&new_patient("Max", "MED100001")).unwrap();
        db.insert_patient(&new_patient("Maxine", "MED100002")).unwrap();
        db.insert_patient(&new_patient("Luna", "MED200003")).unwrap();

        let results = db.search_patients("max", 10).unwrap();
        assert_eq!(results.len(), 2);

        let results = db.search_patients("MED2000", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Luna");
    }

    #[test]
    fn test_search_wildcards_are_literal() {
        let db = setup_db();
        db.insert_patient(&new_patient("Max", "MED100001")).unwrap();
        db.insert_patient(&new_patient("Luna_Ray", "MED200003")).unwrap();

        assert!(db.search_patients("%", 10).unwrap().is_empty());
        assert!(db.search_patients("M_x", 10).unwrap().is_empty());

        let results = db.search_patients("a_R", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Luna_Ray");
    }
}
