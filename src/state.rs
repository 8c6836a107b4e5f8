use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::AppConfig;
use crate::db::RecordStore;
use crate::services::booking::BookingFlowManager;
use crate::services::intent::IntentEngine;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: AppConfig,
    pub intents: IntentEngine,
    pub bookings: BookingFlowManager,
    // call id -> booking session id
    call_sessions: Mutex<HashMap<String, String>>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        Self {
            store,
            intents: IntentEngine::new(config.faq_similarity_threshold),
            bookings: BookingFlowManager::new(),
            call_sessions: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn call_sessions(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.call_sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_for_call(&self, call_id: &str) -> Option<String> {
        self.call_sessions().get(call_id).cloned()
    }

    /// Points the call at a new session, returning the one it replaced.
    pub fn bind_session(&self, call_id: &str, session_id: &str) -> Option<String> {
        self.call_sessions()
            .insert(call_id.to_string(), session_id.to_string())
    }

    pub fn take_session(&self, call_id: &str) -> Option<String> {
        self.call_sessions().remove(call_id)
    }
}
