use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    InitialIntent,
    GatherName,
    GatherPhone,
    GatherService,
    ConfirmDetails,
    CheckAvailability,
    SelectSlot,
    FinalConfirmation,
    Completed,
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::InitialIntent => "initial_intent",
            BookingStep::GatherName => "gather_name",
            BookingStep::GatherPhone => "gather_phone",
            BookingStep::GatherService => "gather_service",
            BookingStep::ConfirmDetails => "confirm_details",
            BookingStep::CheckAvailability => "check_availability",
            BookingStep::SelectSlot => "select_slot",
            BookingStep::FinalConfirmation => "final_confirmation",
            BookingStep::Completed => "completed",
        }
    }

    /// Steps owned by the slot-lookup collaborator rather than this machine.
    pub fn is_handed_off(&self) -> bool {
        matches!(
            self,
            BookingStep::CheckAvailability
                | BookingStep::SelectSlot
                | BookingStep::FinalConfirmation
                | BookingStep::Completed
        )
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectedSlot {
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingSession {
    pub session_id: String,
    pub call_id: String,
    pub current_step: BookingStep,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub urgency: Urgency,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub selected_slot: Option<SelectedSlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingSession {
    pub fn new(session_id: String, call_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            call_id,
            current_step: BookingStep::InitialIntent,
            customer_name: None,
            customer_phone: None,
            service_type: None,
            urgency: Urgency::Normal,
            preferred_date: None,
            preferred_time: None,
            selected_slot: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            call_id: self.call_id.clone(),
            current_step: self.current_step,
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            service_type: self.service_type.clone(),
            urgency: self.urgency,
            preferred_date: self.preferred_date.clone(),
            preferred_time: self.preferred_time.clone(),
            selected_slot: self.selected_slot.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

/// Read-only projection of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub call_id: String,
    pub current_step: BookingStep,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub urgency: Urgency,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub selected_slot: Option<SelectedSlot>,
    pub created_at: String,
    pub updated_at: String,
}

/// Extra payload attached to a prompt, only for the steps that carry one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepData {
    Confirmation {
        name: String,
        phone: String,
        service: String,
    },
    NextAction {
        action: BookingStep,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingPrompt {
    pub question: String,
    pub step: BookingStep,
    pub session_id: String,
    pub requires_response: bool,
    pub step_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StepData>,
}
