//! Emergency request operations.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{
    ActiveEmergency, EmergencyPatch, EmergencyRequest, EmergencyStatus, NewEmergencyRequest,
};

const EMERGENCY_COLUMNS: &str = r#"
    e.id, e.patient_id, e.location, e.coordinates, e.emergency_type,
    e.notes, e.status, e.responded_by, e.requested_at
"#;

/// Intermediate row struct for database mapping.
struct EmergencyRow {
    id: i64,
    patient_id: i64,
    location: String,
    coordinates: Option<String>,
    emergency_type: String,
    notes: Option<String>,
    status: String,
    responded_by: Option<String>,
    requested_at: String,
}

impl EmergencyRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            location: row.get(2)?,
            coordinates: row.get(3)?,
            emergency_type: row.get(4)?,
            notes: row.get(5)?,
            status: row.get(6)?,
            responded_by: row.get(7)?,
            requested_at: row.get(8)?,
        })
    }
}

impl TryFrom<EmergencyRow> for EmergencyRequest {
    type Error = DbError;

    fn try_from(row: EmergencyRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<EmergencyStatus>()
            .map_err(|e| DbError::Corrupt(e.to_string()))?;
        Ok(EmergencyRequest {
            id: row.id,
            patient_id: row.patient_id,
            location: row.location,
            coordinates: row.coordinates,
            emergency_type: row.emergency_type,
            notes: row.notes,
            status,
            responded_by: row.responded_by,
            requested_at: row.requested_at,
        })
    }
}

impl Database {
    pub fn insert_emergency_request(&self, request: &NewEmergencyRequest) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO emergency_requests (patient_id, location, coordinates, emergency_type, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                request.patient_id,
                request.location,
                request.coordinates,
                request.emergency_type,
                request.notes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_emergency_request(&self, id: i64) -> DbResult<Option<EmergencyRequest>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM emergency_requests e WHERE e.id = ?", EMERGENCY_COLUMNS),
                [id],
                EmergencyRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Pending and dispatched requests, oldest first, with patient contact details.
    pub fn list_active_emergencies(&self) -> DbResult<Vec<ActiveEmergency>> {
        let active: Vec<&str> = EmergencyStatus::ALL
            .iter()
            .filter(|status| status.is_active())
            .map(|status| status.as_str())
            .collect();
        let placeholders = vec!["?"; active.len()].join(", ");

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}, p.name, p.contact_number, p.medical_id
            FROM emergency_requests e
            JOIN patients p ON e.patient_id = p.id
            WHERE e.status IN ({})
            ORDER BY e.requested_at, e.id
            "#,
            EMERGENCY_COLUMNS, placeholders
        ))?;

        let rows = stmt.query_map(params_from_iter(active), |row| {
            Ok((
                EmergencyRow::from_row(row)?,
                row.get::<_, String>(9)?,
                row.get::<_, Option<String>>(10)?,
                row.get::<_, String>(11)?,
            ))
        })?;

        let mut active = Vec::new();
        for row in rows {
            let (request, patient_name, contact_number, medical_id) = row?;
            active.push(ActiveEmergency {
                request: request.try_into()?,
                patient_name,
                contact_number,
                medical_id,
            });
        }
        Ok(active)
    }

    /// Apply a dispatcher update. Absent fields keep their stored value.
    pub fn apply_emergency_patch(&self, id: i64, patch: &EmergencyPatch) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE emergency_requests SET
                status = COALESCE(?2, status),
                responded_by = COALESCE(?3, responded_by)
            WHERE id = ?1
            "#,
            params![id, patch.status.map(|s| s.as_str()), patch.responded_by],
        )?;
        Ok(rows_affected > 0)
    }
}
