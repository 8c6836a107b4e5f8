use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Record;

use super::{BookingSession, IntentCategory};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    InProgress,
    Completed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
        }
    }
}

/// One analysed utterance or finished call, as logged to the `calls` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: String,
    pub tenant_id: Option<String>,
    pub caller_number: String,
    pub status: CallStatus,
    pub transcript: String,
    pub intent: IntentCategory,
    pub intent_confidence: f64,
    pub faq_matched: Option<String>,
    pub response_text: String,
}

impl CallRecord {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("call_id".into(), self.call_id.clone().into());
        record.insert("tenant_id".into(), self.tenant_id.clone().into());
        record.insert("caller_number".into(), self.caller_number.clone().into());
        record.insert("status".into(), self.status.as_str().into());
        record.insert("transcript".into(), self.transcript.clone().into());
        record.insert("intent".into(), self.intent.as_str().into());
        record.insert("intent_confidence".into(), self.intent_confidence.into());
        record.insert("faq_matched".into(), self.faq_matched.clone().into());
        record.insert("response_text".into(), self.response_text.clone().into());
        record.insert(
            "created_at".into(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string().into(),
        );
        record
    }
}

pub const APPOINTMENT_REQUESTED: &str = "requested";
pub const APPOINTMENT_SCHEDULED: &str = "scheduled";

const DEFAULT_REASON: &str = "Dental appointment";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];
const SPOKEN_DATETIME_FORMATS: &[&str] = &["%B %d %H:%M:%S %Y", "%B %d %H:%M %Y"];

/// A row in the `appointments` table: either a request written when a booking
/// flow hands off, or an appointment the assistant stored directly.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentRequest {
    pub id: String,
    pub call_id: String,
    pub tenant_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub urgency: String,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub scheduled_at: Option<String>,
    pub notes: Option<String>,
    pub status: &'static str,
}

impl AppointmentRequest {
    pub fn from_session(session: &BookingSession, tenant_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: session.call_id.clone(),
            tenant_id,
            customer_name: session.customer_name.clone(),
            customer_phone: session.customer_phone.clone(),
            service_type: session.service_type.clone(),
            urgency: session.urgency.as_str().to_string(),
            preferred_date: session.preferred_date.clone(),
            preferred_time: session.preferred_time.clone(),
            scheduled_at: None,
            notes: None,
            status: APPOINTMENT_REQUESTED,
        }
    }

    pub fn from_submission(
        submission: &AppointmentSubmission,
        scheduled_at: NaiveDateTime,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_id: submission
                .call_id
                .clone()
                .unwrap_or_else(|| "function_call".to_string()),
            tenant_id,
            customer_name: submission.patient_name.clone(),
            customer_phone: submission.phone_number.clone(),
            service_type: Some(
                submission
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            ),
            urgency: "normal".to_string(),
            preferred_date: submission.appointment_date.clone(),
            preferred_time: submission.appointment_time.clone(),
            scheduled_at: Some(scheduled_at.format("%Y-%m-%dT%H:%M:%S").to_string()),
            notes: submission.notes.clone(),
            status: APPOINTMENT_SCHEDULED,
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), self.id.clone().into());
        record.insert("call_id".into(), self.call_id.clone().into());
        record.insert("tenant_id".into(), self.tenant_id.clone().into());
        record.insert("customer_name".into(), self.customer_name.clone().into());
        record.insert("customer_phone".into(), self.customer_phone.clone().into());
        record.insert("service_type".into(), self.service_type.clone().into());
        record.insert("urgency".into(), self.urgency.clone().into());
        record.insert("preferred_date".into(), self.preferred_date.clone().into());
        record.insert("preferred_time".into(), self.preferred_time.clone().into());
        record.insert("scheduled_at".into(), self.scheduled_at.clone().into());
        record.insert("notes".into(), self.notes.clone().into());
        record.insert("status".into(), self.status.into());
        record
    }
}

/// Appointment details the assistant sends once the caller has agreed on a
/// date and time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentSubmission {
    pub call_id: Option<String>,
    pub patient_name: Option<String>,
    pub phone_number: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub reason: Option<String>,
    pub tenant_id: Option<String>,
    pub notes: Option<String>,
}

impl AppointmentSubmission {
    /// Reads the fields from `function.arguments` (a JSON string or object),
    /// or from the top level when the arguments are absent or empty.
    pub fn from_payload(payload: &Value) -> Self {
        let arguments = payload
            .get("function")
            .and_then(|f| f.get("arguments"))
            .and_then(|raw| match raw {
                Value::String(text) => match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        tracing::warn!(error = %e, "appointment arguments are not valid JSON");
                        None
                    }
                },
                other => Some(other.clone()),
            })
            .filter(|args| args.as_object().is_some_and(|m| !m.is_empty()));
        let source = arguments.as_ref().unwrap_or(payload);

        let field = |key: &str| {
            source
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Self {
            call_id: payload
                .get("call_id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from),
            patient_name: field("patient_name"),
            phone_number: field("phone_number"),
            appointment_date: field("appointment_date"),
            appointment_time: field("appointment_time"),
            reason: field("reason"),
            tenant_id: field("tenant_id"),
            notes: field("notes"),
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("patient_name", &self.patient_name),
            ("phone_number", &self.phone_number),
            ("appointment_date", &self.appointment_date),
            ("appointment_time", &self.appointment_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Combines date and time into one timestamp. Spoken dates
    /// ("Monday, March 3") carry no year, so `year` is used.
    pub fn scheduled_at(&self, year: i32) -> Result<NaiveDateTime, String> {
        let combined = format!(
            "{} {}",
            self.appointment_date.as_deref().unwrap_or_default(),
            self.appointment_time.as_deref().unwrap_or_default()
        );
        parse_appointment_datetime(&combined, year)
            .ok_or_else(|| format!("Could not parse datetime: {combined}"))
    }
}

fn parse_appointment_datetime(text: &str, year: i32) -> Option<NaiveDateTime> {
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(parsed);
    }

    // the weekday is ignored; it need not agree with `year`
    let (_, rest) = text.split_once(", ")?;
    let with_year = format!("{rest} {year}");
    SPOKEN_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&with_year, fmt).ok())
}
