//! Pharmacy orders and emergency dispatch.

use tracing::info;

use super::{check, required, Clinic, ClinicalError, ClinicalResult};
use crate::auth::Session;
use crate::models::{
    ActiveEmergency, EmergencyPatch, EmergencyRequest, NewEmergencyRequest, PharmacyOrder,
    PharmacyOrderRequest,
};
use crate::policy::{AccessRule, DISPATCHERS};

impl<'a> Clinic<'a> {
    // =========================================================================
    // Pharmacy
    // =========================================================================

    /// Order delivery of one of the patient's own prescriptions.
    pub fn place_pharmacy_order(
        &self,
        session: &Session,
        request: &PharmacyOrderRequest,
    ) -> ClinicalResult<PharmacyOrder> {
        check(session, &AccessRule::patient_data(request.patient_id))?;
        required(&request.pharmacy_name, "pharmacyName")?;

        let prescription = self
            .db
            .get_prescription(request.prescription_id)?
            .ok_or(ClinicalError::NotFound("Prescription"))?;
        if prescription.patient_id != request.patient_id {
            return Err(ClinicalError::Validation(
                "Prescription belongs to a different patient".into(),
            ));
        }

        let id = self.db.insert_pharmacy_order(request)?;
        info!(order_id = id, patient_id = request.patient_id, "pharmacy order placed");

        self.db
            .get_pharmacy_order(id)?
            .ok_or(ClinicalError::NotFound("Order"))
    }

    pub fn pharmacy_orders(&self, session: &Session, patient_id: i64) -> ClinicalResult<Vec<PharmacyOrder>> {
        check(session, &AccessRule::patient_data(patient_id))?;
        Ok(self.db.list_pharmacy_orders_for_patient(patient_id)?)
    }

    // =========================================================================
    // Emergency dispatch
    // =========================================================================

    pub fn request_emergency(
        &self,
        session: &Session,
        request: &NewEmergencyRequest,
    ) -> ClinicalResult<EmergencyRequest> {
        check(session, &AccessRule::patient_data(request.patient_id))?;
        required(&request.location, "location")?;
        required(&request.emergency_type, "emergencyType")?;

        if self.db.get_patient(request.patient_id)?.is_none() {
            return Err(ClinicalError::NotFound("Patient"));
        }

        let id = self.db.insert_emergency_request(request)?;
        info!(
            request_id = id,
            patient_id = request.patient_id,
            emergency_type = %request.emergency_type,
            "emergency requested"
        );

        self.db
            .get_emergency_request(id)?
            .ok_or(ClinicalError::NotFound("Emergency request"))
    }

    /// Pending and dispatched requests, oldest first.
    pub fn active_emergencies(&self, session: &Session) -> ClinicalResult<Vec<ActiveEmergency>> {
        check(session, &AccessRule::roles(DISPATCHERS))?;
        Ok(self.db.list_active_emergencies()?)
    }

    pub fn update_emergency(
        &self,
        session: &Session,
        id: i64,
        patch: &EmergencyPatch,
    ) -> ClinicalResult<EmergencyRequest> {
        check(session, &AccessRule::roles(DISPATCHERS))?;

        if self.db.get_emergency_request(id)?.is_none() {
            return Err(ClinicalError::NotFound("Emergency request"));
        }
        if patch.is_empty() {
            return Err(ClinicalError::NoFieldsToUpdate);
        }

        self.db.apply_emergency_patch(id, patch)?;
        let updated = self
            .db
            .get_emergency_request(id)?
            .ok_or(ClinicalError::NotFound("Emergency request"))?;
        info!(request_id = id, status = %updated.status, "emergency updated");
        Ok(updated)
    }
}
