//! SQLite schema definition.

/// Complete database schema for the portal.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Directory (pre-provisioned)
-- ============================================================================

CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT,
    contact_number TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS doctors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    specialization TEXT,
    hospital_id INTEGER REFERENCES hospitals(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_doctors_hospital ON doctors(hospital_id);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    gender TEXT,
    contact_number TEXT,
    email TEXT,
    medical_id TEXT NOT NULL UNIQUE,             -- MED + 6 digits
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);

-- ============================================================================
-- Credential Store
-- ============================================================================

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    patient_id INTEGER REFERENCES patients(id),
    doctor_id INTEGER REFERENCES doctors(id),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One role per account
CREATE TABLE IF NOT EXISTS role_assignments (
    account_id INTEGER PRIMARY KEY REFERENCES accounts(id),
    role TEXT NOT NULL CHECK (role IN ('patient', 'doctor', 'hospital', 'staff', 'admin')),
    assigned_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Appointments (never deleted, cancellation is a status)
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    doctor_id INTEGER NOT NULL REFERENCES doctors(id),
    hospital_id INTEGER REFERENCES hospitals(id),
    scheduled_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'confirmed', 'in-progress', 'completed', 'cancelled')),
    reason TEXT,
    is_teleconsultation INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- A doctor holds each slot at most once among live appointments
CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_active_slot
    ON appointments(doctor_id, scheduled_at)
    WHERE status <> 'cancelled';

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);

-- ============================================================================
-- Clinical
-- ============================================================================

CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    hospital_id INTEGER REFERENCES hospitals(id),
    doctor_id INTEGER REFERENCES doctors(id),
    diagnosis TEXT NOT NULL,
    treatment TEXT,
    notes TEXT,
    record_date TEXT NOT NULL DEFAULT (datetime('now')),
    follow_up_date TEXT,
    uploaded_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_patient ON records(patient_id);

CREATE TABLE IF NOT EXISTS prescriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id INTEGER REFERENCES records(id),
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    doctor_id INTEGER REFERENCES doctors(id),
    medication_name TEXT NOT NULL,
    dosage TEXT NOT NULL,
    frequency TEXT,
    duration TEXT,
    instructions TEXT,
    issued_date TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_patient ON prescriptions(patient_id);

CREATE TABLE IF NOT EXISTS pharmacy_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    prescription_id INTEGER NOT NULL REFERENCES prescriptions(id),
    pharmacy_name TEXT NOT NULL,
    delivery_address TEXT,
    status TEXT NOT NULL DEFAULT 'placed',
    order_date TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_pharmacy_orders_patient ON pharmacy_orders(patient_id);

-- ============================================================================
-- Emergency dispatch
-- ============================================================================

CREATE TABLE IF NOT EXISTS emergency_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER NOT NULL REFERENCES patients(id),
    location TEXT NOT NULL,
    coordinates TEXT,
    emergency_type TEXT NOT NULL,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'dispatched', 'completed', 'cancelled')),
    responded_by TEXT,
    requested_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_emergency_status ON emergency_requests(status);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO hospitals (name) VALUES ('General');
            INSERT INTO doctors (name, hospital_id) VALUES ('Dr. House', 1);
            INSERT INTO patients (name, date_of_birth, medical_id) VALUES ('Jane', '1990-01-01', 'MED111111');
            INSERT INTO patients (name, date_of_birth, medical_id) VALUES ('John', '1985-01-01', 'MED222222');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_active_slot_unique() {
        let conn = seeded();
        conn.execute(
            "INSERT INTO appointments (patient_id, doctor_id, scheduled_at) VALUES (1, 1, '2024-05-01 10:00:00')",
            [],
        )
        .unwrap();

        // Second live booking of the same slot is rejected
        let result = conn.execute(
            "INSERT INTO appointments (patient_id, doctor_id, scheduled_at) VALUES (2, 1, '2024-05-01 10:00:00')",
            [],
        );
        assert!(result.is_err());

        // Once the first is cancelled the slot is free again
        conn.execute("UPDATE appointments SET status = 'cancelled' WHERE id = 1", [])
            .unwrap();
        let result = conn.execute(
            "INSERT INTO appointments (patient_id, doctor_id, scheduled_at) VALUES (2, 1, '2024-05-01 10:00:00')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = seeded();
        conn.execute(
            "INSERT INTO accounts (username, email, password_hash) VALUES ('a', 'a@x', 'h')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO role_assignments (account_id, role) VALUES (1, 'superuser')",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO role_assignments (account_id, role) VALUES (1, 'staff')",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_medical_id_unique() {
        let conn = seeded();
        let result = conn.execute(
            "INSERT INTO patients (name, date_of_birth, medical_id) VALUES ('Copy', '2000-01-01', 'MED111111')",
            [],
        );
        assert!(result.is_err());
    }
}
