pub mod booking;
pub mod call;
pub mod intent;
pub mod practice;
pub mod webhook;

pub use booking::{
    BookingPrompt, BookingSession, BookingStep, SelectedSlot, SessionSummary, StepData, Urgency,
};
pub use call::{AppointmentRequest, AppointmentSubmission, CallRecord, CallStatus};
pub use intent::{Entities, IntentCategory, IntentResult};
pub use practice::{DayHours, FaqEntry, Location, PracticeProfile};
pub use webhook::CallEvent;
