use chrono::NaiveDateTime;

use crate::db::Table;
use crate::models::{AppointmentRequest, AppointmentSubmission};
use crate::services::practice::resolve_practice;
use crate::state::AppState;

/// Writes an appointment the assistant agreed with the caller. Without an
/// explicit `tenant_id` it is filed under the default practice.
pub fn store_appointment(
    state: &AppState,
    submission: &AppointmentSubmission,
    scheduled_at: NaiveDateTime,
) -> anyhow::Result<AppointmentRequest> {
    let tenant_id = submission.tenant_id.clone().or_else(|| {
        resolve_practice(state.store.as_ref(), None).map(|p| p.practice_id)
    });
    let appointment = AppointmentRequest::from_submission(submission, scheduled_at, tenant_id);
    state
        .store
        .insert(Table::Appointments, appointment.to_record())?;

    tracing::info!(
        appointment_id = %appointment.id,
        call_id = %appointment.call_id,
        scheduled_at = ?appointment.scheduled_at,
        "appointment stored"
    );
    Ok(appointment)
}
