use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    AppointmentBooking,
    AppointmentCancel,
    AppointmentReschedule,
    HoursInquiry,
    InsuranceInquiry,
    ServicesInquiry,
    LocationInquiry,
    Emergency,
    PaymentInquiry,
    FaqSpecific,
    GeneralInfo,
    Unknown,
}

impl IntentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::AppointmentBooking => "appointment_booking",
            IntentCategory::AppointmentCancel => "appointment_cancel",
            IntentCategory::AppointmentReschedule => "appointment_reschedule",
            IntentCategory::HoursInquiry => "hours_inquiry",
            IntentCategory::InsuranceInquiry => "insurance_inquiry",
            IntentCategory::ServicesInquiry => "services_inquiry",
            IntentCategory::LocationInquiry => "location_inquiry",
            IntentCategory::Emergency => "emergency",
            IntentCategory::PaymentInquiry => "payment_inquiry",
            IntentCategory::FaqSpecific => "faq_specific",
            IntentCategory::GeneralInfo => "general_info",
            IntentCategory::Unknown => "unknown",
        }
    }
}

/// Structured values pulled out of a transcript. At most one per key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_level: Option<String>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.day.is_none()
            && self.date.is_none()
            && self.insurance_provider.is_none()
            && self.service_type.is_none()
            && self.pain_level.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: IntentCategory,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
    pub extracted_entities: Entities,
    pub suggested_response: String,
    /// True only when the answer came from the practice's own FAQ list.
    pub tenant_specific: bool,
    pub faq_matched: Option<String>,
}
