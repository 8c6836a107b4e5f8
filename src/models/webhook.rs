use serde::Serialize;
use serde_json::Value;

pub const EVENT_END_OF_CALL: &str = "end-of-call-report";
pub const EVENT_FUNCTION_CALL: &str = "function-call";
pub const INTERMEDIATE_EVENTS: &[&str] = &["conversation-update", "speech-update", "status-update"];

// Stand-ins used when the platform sent no call id.
const PLACEHOLDER_CALL_IDS: &[&str] = &["function_call", "unknown"];

/// Normalised view of any of the payload shapes the voice platform posts.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CallEvent {
    pub call_id: Option<String>,
    pub event_type: String,
    pub caller_number: Option<String>,
    pub called_number: Option<String>,
    pub assistant_id: Option<String>,
    pub transcript: String,
    pub tool_call_id: String,
    pub practice_key: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<f64>,
    pub ended_reason: Option<String>,
    pub cost: Option<f64>,
    pub summary: Option<String>,
    pub recording_url: Option<String>,
}

fn str_at(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn first_str(candidates: &[(&Value, &str)]) -> Option<String> {
    candidates.iter().find_map(|(value, key)| str_at(value, key))
}

fn first_f64(candidates: &[(&Value, &str)]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|(value, key)| value.get(*key).and_then(Value::as_f64))
}

impl CallEvent {
    pub fn from_payload(payload: &Value) -> Self {
        let mut event = if let Some(arguments) = payload
            .get("function")
            .and_then(|f| f.get("arguments"))
        {
            Self::from_function_arguments(payload, arguments)
        } else if ["query", "phone_number", "caller_number"]
            .iter()
            .any(|k| payload.get(k).is_some())
        {
            Self::from_direct_function_call(payload, payload)
        } else {
            Self::from_standard_webhook(payload)
        };

        event.tool_call_id = tool_call_id(payload);
        event.practice_key = practice_key(payload);
        event
    }

    fn from_function_arguments(payload: &Value, arguments: &Value) -> Self {
        let parsed = match arguments {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "function-call arguments are not valid JSON");
                    Value::Null
                }
            },
            other => other.clone(),
        };
        Self::from_direct_function_call(payload, &parsed)
    }

    fn from_direct_function_call(payload: &Value, args: &Value) -> Self {
        Self {
            call_id: Some(
                str_at(payload, "call_id").unwrap_or_else(|| "function_call".to_string()),
            ),
            event_type: EVENT_FUNCTION_CALL.to_string(),
            caller_number: first_str(&[(args, "caller_number"), (args, "phone_number")]),
            assistant_id: str_at(args, "assistant_id"),
            transcript: str_at(args, "query").unwrap_or_default(),
            ..Default::default()
        }
    }

    fn from_standard_webhook(payload: &Value) -> Self {
        let message = payload.get("message").filter(|m| m.is_object());
        let empty = Value::Null;
        let message_data = message.unwrap_or(&empty);
        let call = message_data.get("call").unwrap_or(&empty);
        let customer = message_data.get("customer").unwrap_or(&empty);

        let transcript = first_str(&[(message_data, "transcript"), (payload, "transcript")])
            .or_else(|| {
                payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .unwrap_or_default();

        Self {
            call_id: first_str(&[(call, "id"), (payload, "call_id")]),
            event_type: first_str(&[(message_data, "type"), (payload, "event")])
                .unwrap_or_else(|| "unknown".to_string()),
            caller_number: first_str(&[(customer, "number"), (payload, "from")]),
            called_number: first_str(&[(call, "phoneNumber"), (call, "phoneNumberId")]),
            assistant_id: str_at(call, "assistantId"),
            transcript,
            started_at: first_str(&[(call, "startedAt"), (message_data, "startedAt")]),
            ended_at: first_str(&[(call, "endedAt"), (message_data, "endedAt")]),
            duration_seconds: first_f64(&[
                (call, "durationSeconds"),
                (message_data, "durationSeconds"),
            ]),
            ended_reason: first_str(&[(call, "endedReason"), (message_data, "endedReason")]),
            cost: first_f64(&[(call, "cost"), (message_data, "cost")]),
            summary: str_at(message_data, "summary"),
            recording_url: first_str(&[
                (message_data, "recordingUrl"),
                (call, "recordingUrl"),
            ]),
            ..Default::default()
        }
    }

    pub fn call_id_or_unknown(&self) -> &str {
        self.call_id.as_deref().unwrap_or("unknown")
    }

    /// Ties the turns of one conversation together: the platform call id, or
    /// the caller's number when only a placeholder id was sent. `None` when
    /// neither identifies the conversation.
    pub fn conversation_key(&self) -> Option<String> {
        match self.call_id.as_deref() {
            Some(id) if !PLACEHOLDER_CALL_IDS.contains(&id) => Some(id.to_string()),
            _ => self
                .caller_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| format!("caller:{n}")),
        }
    }

    pub fn is_intermediate(&self) -> bool {
        INTERMEDIATE_EVENTS.contains(&self.event_type.as_str())
    }
}

fn tool_call_id(payload: &Value) -> String {
    payload
        .get("toolCalls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first())
        .and_then(|c| str_at(c, "id"))
        .or_else(|| str_at(payload, "id"))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Picks the identifier used to look up the practice: dialed number first,
/// then assistant id, then any practice id carried in metadata.
fn practice_key(payload: &Value) -> Option<String> {
    let empty = Value::Null;
    let message = payload.get("message").filter(|m| m.is_object()).unwrap_or(&empty);
    let call = message.get("call").unwrap_or(&empty);

    if let Some(number) = first_str(&[
        (call, "phoneNumber"),
        (call, "phoneNumberId"),
        (payload, "phoneNumber"),
    ]) {
        return Some(number);
    }

    if let Some(assistant) = first_str(&[(call, "assistantId"), (payload, "assistantId")]) {
        return Some(assistant);
    }

    [call, message, payload]
        .iter()
        .filter_map(|source| source.get("metadata").filter(|m| m.is_object()))
        .find_map(|metadata| {
            first_str(&[
                (metadata, "practice_id"),
                (metadata, "tenant_id"),
                (metadata, "practiceId"),
            ])
        })
}
