//! Medical record, prescription and pharmacy order operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{contains_pattern, Database, DbResult};
use crate::models::{
    DiagnosisCount, MedicalRecord, MedicationCount, NewMedicalRecord, NewPrescription,
    PharmacyOrder, PharmacyOrderRequest, Prescription,
};

const RECORD_SELECT: &str = r#"
    SELECT r.id, r.patient_id, r.hospital_id, r.doctor_id, r.diagnosis, r.treatment,
           r.notes, r.record_date, r.follow_up_date, r.uploaded_by, d.name, h.name
    FROM records r
    LEFT JOIN doctors d ON r.doctor_id = d.id
    LEFT JOIN hospitals h ON r.hospital_id = h.id
"#;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        hospital_id: row.get(2)?,
        doctor_id: row.get(3)?,
        diagnosis: row.get(4)?,
        treatment: row.get(5)?,
        notes: row.get(6)?,
        record_date: row.get(7)?,
        follow_up_date: row.get(8)?,
        uploaded_by: row.get(9)?,
        doctor_name: row.get(10)?,
        hospital_name: row.get(11)?,
    })
}

const PRESCRIPTION_SELECT: &str = r#"
    SELECT p.id, p.record_id, p.patient_id, p.doctor_id, p.medication_name, p.dosage,
           p.frequency, p.duration, p.instructions, p.issued_date, d.name
    FROM prescriptions p
    LEFT JOIN doctors d ON p.doctor_id = d.id
"#;

fn prescription_from_row(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        record_id: row.get(1)?,
        patient_id: row.get(2)?,
        doctor_id: row.get(3)?,
        medication_name: row.get(4)?,
        dosage: row.get(5)?,
        frequency: row.get(6)?,
        duration: row.get(7)?,
        instructions: row.get(8)?,
        issued_date: row.get(9)?,
        doctor_name: row.get(10)?,
    })
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.patient_id, o.prescription_id, o.pharmacy_name, o.delivery_address,
           o.status, o.order_date, p.medication_name, p.dosage
    FROM pharmacy_orders o
    LEFT JOIN prescriptions p ON o.prescription_id = p.id
"#;

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<PharmacyOrder> {
    Ok(PharmacyOrder {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        prescription_id: row.get(2)?,
        pharmacy_name: row.get(3)?,
        delivery_address: row.get(4)?,
        status: row.get(5)?,
        order_date: row.get(6)?,
        medication_name: row.get(7)?,
        dosage: row.get(8)?,
    })
}

impl Database {
    // =========================================================================
    // Records
    // =========================================================================

    pub fn insert_record(&self, record: &NewMedicalRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO records (
                patient_id, hospital_id, doctor_id, diagnosis, treatment,
                notes, follow_up_date, uploaded_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.patient_id,
                record.hospital_id,
                record.doctor_id,
                record.diagnosis,
                record.treatment,
                record.notes,
                record.follow_up_date,
                record.uploaded_by,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_record(&self, id: i64) -> DbResult<Option<MedicalRecord>> {
        self.conn
            .query_row(&format!("{} WHERE r.id = ?", RECORD_SELECT), [id], record_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// A patient's records, newest first.
    pub fn list_records_for_patient(&self, patient_id: i64) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE r.patient_id = ? ORDER BY r.record_date DESC, r.id DESC",
            RECORD_SELECT
        ))?;
        let rows = stmt.query_map([patient_id], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search records by diagnosis or treatment.
    pub fn search_records(&self, keyword: &str, limit: usize) -> DbResult<Vec<MedicalRecord>> {
        let pattern = contains_pattern(keyword);
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE r.diagnosis LIKE ?1 ESCAPE '\\' OR r.treatment LIKE ?1 ESCAPE '\\' ORDER BY r.record_date DESC LIMIT ?2",
            RECORD_SELECT
        ))?;
        let rows = stmt.query_map(params![pattern, limit as i64], record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Most frequent diagnoses for a patient.
    pub fn top_diagnoses(&self, patient_id: i64, limit: usize) -> DbResult<Vec<DiagnosisCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT diagnosis, COUNT(*) AS n
            FROM records
            WHERE patient_id = ?1 AND diagnosis <> ''
            GROUP BY diagnosis
            ORDER BY n DESC, diagnosis
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, limit as i64], |row| {
            Ok(DiagnosisCount {
                diagnosis: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_records_for_patient(&self, patient_id: i64) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE patient_id = ?",
            [patient_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // =========================================================================
    // Prescriptions
    // =========================================================================

    pub fn insert_prescription(&self, prescription: &NewPrescription) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                record_id, patient_id, doctor_id, medication_name, dosage,
                frequency, duration, instructions
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                prescription.record_id,
                prescription.patient_id,
                prescription.doctor_id,
                prescription.medication_name,
                prescription.dosage,
                prescription.frequency,
                prescription.duration,
                prescription.instructions,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_prescription(&self, id: i64) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                &format!("{} WHERE p.id = ?", PRESCRIPTION_SELECT),
                [id],
                prescription_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A patient's prescriptions, newest first.
    pub fn list_prescriptions_for_patient(&self, patient_id: i64) -> DbResult<Vec<Prescription>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE p.patient_id = ? ORDER BY p.issued_date DESC, p.id DESC",
            PRESCRIPTION_SELECT
        ))?;
        let rows = stmt.query_map([patient_id], prescription_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Most prescribed medications for a patient.
    pub fn top_medications(&self, patient_id: i64, limit: usize) -> DbResult<Vec<MedicationCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT medication_name, COUNT(*) AS n
            FROM prescriptions
            WHERE patient_id = ?1 AND medication_name <> ''
            GROUP BY medication_name
            ORDER BY n DESC, medication_name
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![patient_id, limit as i64], |row| {
            Ok(MedicationCount {
                medication: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_prescriptions_for_patient(&self, patient_id: i64) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM prescriptions WHERE patient_id = ?",
            [patient_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // =========================================================================
    // Pharmacy orders
    // =========================================================================

    pub fn insert_pharmacy_order(&self, order: &PharmacyOrderRequest) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO pharmacy_orders (patient_id, prescription_id, pharmacy_name, delivery_address)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                order.patient_id,
                order.prescription_id,
                order.pharmacy_name,
                order.delivery_address,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_pharmacy_order(&self, id: i64) -> DbResult<Option<PharmacyOrder>> {
        self.conn
            .query_row(
                &format!("{} WHERE o.id = ?", ORDER_SELECT),
                [id],
                order_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// A patient's orders with the prescribed medication, newest first.
    pub fn list_pharmacy_orders_for_patient(&self, patient_id: i64) -> DbResult<Vec<PharmacyOrder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE o.patient_id = ? ORDER BY o.order_date DESC, o.id DESC",
            ORDER_SELECT
        ))?;
        let rows = stmt.query_map([patient_id], order_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;
    use chrono::NaiveDate;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let patient_id = db
            .insert_patient(&NewPatient {
                name: "Jane".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                gender: None,
                contact_number: None,
                email: None,
                medical_id: "MED123456".into(),
            })
            .unwrap();
        (db, patient_id)
    }

    fn record(patient_id: i64, diagnosis: &str) -> NewMedicalRecord {
        NewMedicalRecord {
            patient_id,
            hospital_id: None,
            doctor_id: None,
            diagnosis: diagnosis.into(),
            treatment: Some("rest".into()),
            notes: None,
            follow_up_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            uploaded_by: "admin".into(),
        }
    }

    fn prescription(patient_id: i64, medication: &str) -> NewPrescription {
        NewPrescription {
            record_id: None,
            patient_id,
            doctor_id: None,
            medication_name: medication.into(),
            dosage: "500mg".into(),
            frequency: Some("twice daily".into()),
            duration: None,
            instructions: None,
        }
    }

    #[test]
    fn test_records_round_trip() {
        let (db, patient_id) = setup();
        let id = db.insert_record(&record(patient_id, "Influenza")).unwrap();

        let stored = db.get_record(id).unwrap().unwrap();
        assert_eq!(stored.diagnosis, "Influenza");
        assert_eq!(stored.follow_up_date, NaiveDate::from_ymd_opt(2024, 6, 1));

        assert_eq!(db.list_records_for_patient(patient_id).unwrap().len(), 1);
        assert_eq!(db.search_records("influ", 10).unwrap().len(), 1);
        assert_eq!(db.count_records_for_patient(patient_id).unwrap(), 1);
    }

    #[test]
    fn test_top_diagnoses_ordered_by_frequency() {
        let (db, patient_id) = setup();
        for diagnosis in ["Asthma", "Influenza", "Asthma", "Migraine", "Asthma", "Influenza"] {
            db.insert_record(&record(patient_id, diagnosis)).unwrap();
        }

        let top = db.top_diagnoses(patient_id, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].diagnosis, "Asthma");
        assert_eq!(top[0].count, 3);
        assert_eq!(top[1].diagnosis, "Influenza");
    }

    #[test]
    fn test_prescriptions_and_orders() {
        let (db, patient_id) = setup();
        let prescription_id = db
            .insert_prescription(&prescription(patient_id, "Amoxicillin"))
            .unwrap();
        db.insert_prescription(&prescription(patient_id, "Amoxicillin"))
            .unwrap();

        assert_eq!(db.count_prescriptions_for_patient(patient_id).unwrap(), 2);
        let top = db.top_medications(patient_id, 5).unwrap();
        assert_eq!(top[0].medication, "Amoxicillin");
        assert_eq!(top[0].count, 2);

        db.insert_pharmacy_order(&PharmacyOrderRequest {
            patient_id,
            prescription_id,
            pharmacy_name: "Corner Pharmacy".into(),
            delivery_address: Some("1 Main St".into()),
        })
        .unwrap();

        let orders = db.list_pharmacy_orders_for_patient(patient_id).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].medication_name.as_deref(), Some("Amoxicillin"));
        assert_eq!(orders[0].status, "placed");
    }
}
