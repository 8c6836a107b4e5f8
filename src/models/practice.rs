use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Record;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayHours {
    pub day: String,
    pub ranges: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Tenant configuration used to personalise replies. Read-only per request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PracticeProfile {
    pub practice_id: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub hours: Vec<DayHours>,
    pub insurances: Vec<String>,
    pub services: Vec<String>,
    pub faqs: Vec<FaqEntry>,
    pub location: Option<Location>,
}

impl PracticeProfile {
    /// Builds a profile from a `tenants` row. Malformed JSON columns are
    /// dropped with a warning instead of failing the whole profile.
    pub fn from_record(record: &Record) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        };
        let practice_id = record
            .get("id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        Self {
            practice_id,
            name: text("name").unwrap_or_default(),
            phone_number: text("phone_number"),
            hours: record.get("hours_json").map(parse_hours).unwrap_or_default(),
            insurances: record
                .get("insurances_json")
                .map(|v| parse_string_list("insurances_json", v))
                .unwrap_or_default(),
            services: record
                .get("services_json")
                .map(|v| parse_string_list("services_json", v))
                .unwrap_or_default(),
            faqs: record.get("faq_json").map(parse_faqs).unwrap_or_default(),
            location: record.get("location_json").and_then(parse_location),
        }
    }

    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("id".into(), Value::from(self.practice_id.clone()));
        record.insert("name".into(), Value::from(self.name.clone()));
        record.insert(
            "phone_number".into(),
            self.phone_number.clone().map(Value::from).unwrap_or(Value::Null),
        );

        let hours: serde_json::Map<String, Value> = self
            .hours
            .iter()
            .map(|h| (h.day.clone(), Value::from(h.ranges.clone())))
            .collect();
        record.insert("hours_json".into(), Value::Object(hours));
        record.insert("insurances_json".into(), Value::from(self.insurances.clone()));
        record.insert("services_json".into(), Value::from(self.services.clone()));

        let faqs: serde_json::Map<String, Value> = self
            .faqs
            .iter()
            .map(|f| (f.question.clone(), Value::from(f.answer.clone())))
            .collect();
        record.insert("faq_json".into(), Value::Object(faqs));
        record.insert(
            "location_json".into(),
            self.location
                .as_ref()
                .and_then(|l| serde_json::to_value(l).ok())
                .unwrap_or(Value::Null),
        );
        record
    }
}

fn parse_hours(value: &Value) -> Vec<DayHours> {
    let Some(days) = value.as_object() else {
        if !value.is_null() {
            tracing::warn!("hours_json is not an object, ignoring");
        }
        return vec![];
    };

    days.iter()
        .map(|(day, times)| {
            let ranges = match times {
                Value::Array(items) => items
                    .iter()
                    .map(|t| match t {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                Value::String(s) if !s.is_empty() => vec![s.clone()],
                Value::Null | Value::String(_) => vec![],
                other => vec![other.to_string()],
            };
            DayHours {
                day: day.clone(),
                ranges,
            }
        })
        .collect()
}

fn parse_string_list(column: &str, value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Value::Null => vec![],
        _ => {
            tracing::warn!(column, "expected a list of strings, ignoring");
            vec![]
        }
    }
}

fn parse_faqs(value: &Value) -> Vec<FaqEntry> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(question, answer)| {
                answer.as_str().map(|a| FaqEntry {
                    question: question.clone(),
                    answer: a.to_string(),
                })
            })
            .collect(),
        Value::Null => vec![],
        _ => {
            tracing::warn!("faq_json is not an object, ignoring");
            vec![]
        }
    }
}

fn parse_location(value: &Value) -> Option<Location> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(location) => Some(location),
        Err(e) => {
            tracing::warn!(error = %e, "location_json is malformed, ignoring");
            None
        }
    }
}
