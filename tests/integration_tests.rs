use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use dental_voice::config::AppConfig;
use dental_voice::db::{self, SqliteStore, Table};
use dental_voice::handlers;
use dental_voice::models::{FaqEntry, PracticeProfile};
use dental_voice::services::practice::create_practice;
use dental_voice::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 8000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        webhook_secret: String::new(), // empty = skip secret check
        faq_similarity_threshold: 0.7,
        environment: "test".to_string(),
    }
}

fn test_state_with(config: AppConfig) -> Arc<AppState> {
    let store = Arc::new(SqliteStore::new(db::init_db(":memory:").unwrap()));
    create_practice(
        &*store,
        PracticeProfile {
            name: "Bright Smile Dental".into(),
            phone_number: Some("+15551112222".into()),
            insurances: vec!["Delta Dental".into(), "Aetna".into()],
            services: vec!["cleanings".into(), "whitening".into(), "crowns".into()],
            faqs: vec![FaqEntry {
                question: "Do you see children?".into(),
                answer: "Yes, we see patients of all ages.".into(),
            }],
            ..Default::default()
        },
    )
    .unwrap();
    Arc::new(AppState::new(store, config))
}

fn test_state() -> Arc<AppState> {
    test_state_with(test_config())
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/vapi/incoming_call", post(handlers::webhook::incoming_call))
        .route("/vapi/analyze_intent", post(handlers::webhook::analyze_intent))
        .route(
            "/vapi/appointment_store",
            post(handlers::webhook::appointment_store),
        )
        .route("/api/admin/status", get(handlers::admin::get_status))
        .route(
            "/api/admin/practices",
            get(handlers::admin::list_practices).post(handlers::admin::create_practice),
        )
        .route("/api/admin/calls", get(handlers::admin::list_calls))
        .route("/api/admin/sessions/:id", get(handlers::admin::get_session))
        .route(
            "/api/admin/sessions/:id/end",
            post(handlers::admin::end_session),
        )
        .with_state(state)
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn function_call(call_id: &str, query: &str) -> Value {
    let arguments = json!({
        "query": query,
        "caller_number": "+15553334444",
        "phone_number": "+15551112222",
    });
    json!({
        "id": format!("tool-{call_id}"),
        "call_id": call_id,
        "function": {"name": "dental_assistant", "arguments": arguments.to_string()},
    })
}

/// Sends one function-call turn and returns the spoken result.
async fn say(state: &Arc<AppState>, call_id: &str, query: &str) -> String {
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/incoming_call", &function_call(call_id, query)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    json["results"][0]["result"].as_str().unwrap().to_string()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let app = test_app(test_state());
    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "connected");
    assert_eq!(json["environment"], "test");
    assert_eq!(json["active_booking_sessions"], 0);
}

// ── Webhook Tests ──

#[tokio::test]
async fn test_function_call_answers_faq() {
    let state = test_state();
    let res = test_app(state.clone())
        .oneshot(json_post(
            "/vapi/incoming_call",
            &function_call("call-faq", "Do you see children?"),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["results"][0]["toolCallId"], "tool-call-faq");
    assert_eq!(json["results"][0]["result"], "Yes, we see patients of all ages.");

    let calls = state
        .store
        .select(Table::Calls, &[("call_id", "call-faq")], None)
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["status"], "in_progress");
    assert_eq!(calls[0]["intent"], "faq_specific");
    assert_eq!(calls[0]["faq_matched"], "Do you see children?");
    assert_eq!(calls[0]["caller_number"], "+15553334444");
}

#[tokio::test]
async fn test_function_call_missing_query() {
    let app = test_app(test_state());
    let payload = json!({"function": {"arguments": "{\"caller_number\":\"+15553334444\"}"}});
    let res = app
        .oneshot(json_post("/vapi/incoming_call", &payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_conversation_over_function_calls() {
    let state = test_state();

    let reply = say(&state, "call-b", "I need to schedule an appointment").await;
    assert!(reply.contains("What's your name?"));
    assert_eq!(state.bookings.active_count(), 1);

    let reply = say(&state, "call-b", "Jane Doe").await;
    assert!(reply.contains("Thank you, Jane Doe."));

    say(&state, "call-b", "555-111-2222").await;
    let reply = say(&state, "call-b", "I have a cavity").await;
    // confirmation text is flattened to a single line
    assert!(!reply.contains('\n'));
    assert!(reply.contains("• Service: filling"));

    let reply = say(&state, "call-b", "no, wrong phone number").await;
    assert_eq!(reply, "What's the correct phone number?");
    say(&state, "call-b", "5559990000").await;
    say(&state, "call-b", "filling please").await;

    let reply = say(&state, "call-b", "yes").await;
    assert_eq!(reply, "Perfect! Let me check our available appointment times...");
    assert_eq!(state.bookings.active_count(), 0);
    assert!(state.session_for_call("call-b").is_none());

    let appointments = state
        .store
        .select(Table::Appointments, &[("call_id", "call-b")], None)
        .unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0]["customer_name"], "Jane Doe");
    assert_eq!(appointments[0]["customer_phone"], "(555) 999-0000");
    assert_eq!(appointments[0]["service_type"], "filling");
    assert_eq!(appointments[0]["urgency"], "normal");
}

/// Function call with no platform call id, as some assistants send them.
fn anonymous_function_call(caller: &str, query: &str) -> Value {
    let arguments = json!({"query": query, "caller_number": caller});
    json!({"function": {"name": "dental_assistant", "arguments": arguments.to_string()}})
}

#[tokio::test]
async fn test_callers_without_call_id_get_separate_bookings() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(json_post(
            "/vapi/incoming_call",
            &anonymous_function_call("+15550000001", "I need to schedule an appointment"),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert!(json["results"][0]["result"]
        .as_str()
        .unwrap()
        .contains("What's your name?"));

    let res = test_app(state.clone())
        .oneshot(json_post(
            "/vapi/incoming_call",
            &anonymous_function_call("+15550000002", "what are your hours"),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    let reply = json["results"][0]["result"].as_str().unwrap();
    assert!(reply.starts_with("Our office hours vary by day."), "{reply}");
    assert!(!reply.contains("Thank you"));
    assert_eq!(state.bookings.active_count(), 1);
    assert!(state.session_for_call("caller:+15550000001").is_some());
}

#[tokio::test]
async fn test_function_call_phone_number_is_not_a_practice_key() {
    let state = test_state();
    let arguments = json!({"query": "Do you see children?", "phone_number": "+15553334444"});
    let payload = json!({
        "call_id": "call-p",
        "function": {"name": "dental_assistant", "arguments": arguments.to_string()},
    });
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/incoming_call", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["results"][0]["result"], "Yes, we see patients of all ages.");

    let calls = state
        .store
        .select(Table::Calls, &[("call_id", "call-p")], None)
        .unwrap();
    assert_eq!(calls[0]["caller_number"], "+15553334444");
}

#[tokio::test]
async fn test_end_of_call_report_logs_and_ends_session() {
    let state = test_state();
    say(&state, "call-e", "can I book an appointment").await;
    assert_eq!(state.bookings.active_count(), 1);

    let payload = json!({
        "message": {
            "type": "end-of-call-report",
            "transcript": "I want to book an appointment",
            "call": {"id": "call-e", "phoneNumber": "+15551112222", "durationSeconds": 42},
            "customer": {"number": "+15553334444"}
        }
    });
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/incoming_call", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "logged");
    assert_eq!(json["call_id"], "call-e");
    assert_eq!(json["event_type"], "end-of-call-report");
    assert_eq!(json["processed"], true);
    assert_eq!(state.bookings.active_count(), 0);

    let calls = state
        .store
        .select(Table::Calls, &[("status", "completed")], None)
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["intent"], "appointment_booking");
}

#[tokio::test]
async fn test_end_of_call_report_requires_caller() {
    let app = test_app(test_state());
    let payload = json!({"message": {"type": "end-of-call-report", "call": {"id": "c"}}});
    let res = app
        .oneshot(json_post("/vapi/incoming_call", &payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_intermediate_event_is_skipped() {
    let state = test_state();
    let payload = json!({
        "message": {
            "type": "speech-update",
            "transcript": "what are your hours",
            "customer": {"number": "+15553334444"}
        }
    });
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/incoming_call", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["processed"], false);
    assert!(state.store.select(Table::Calls, &[], None).unwrap().is_empty());
}

#[tokio::test]
async fn test_non_object_payload_rejected() {
    let app = test_app(test_state());
    let res = app
        .oneshot(json_post("/vapi/incoming_call", &json!(["not", "an", "object"])))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_secret_enforced() {
    let mut config = test_config();
    config.webhook_secret = "s3cret".to_string();
    let state = test_state_with(config);

    let res = test_app(state.clone())
        .oneshot(json_post(
            "/vapi/incoming_call",
            &function_call("call-s", "what are your hours"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/vapi/incoming_call")
                .header("Content-Type", "application/json")
                .header("x-vapi-secret", "s3cret")
                .body(Body::from(function_call("call-s", "what are your hours").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Appointment Store Tests ──

fn appointment_call(arguments: Value) -> Value {
    json!({
        "call_id": "call-a",
        "function": {"name": "store_appointment", "arguments": arguments.to_string()},
    })
}

#[tokio::test]
async fn test_appointment_store() {
    let state = test_state();
    let payload = appointment_call(json!({
        "patient_name": "Jane Doe",
        "phone_number": "+15553334444",
        "appointment_date": "2025-03-04",
        "appointment_time": "14:30",
        "reason": "cleaning",
    }));
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/appointment_store", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["patient_name"], "Jane Doe");
    assert_eq!(json["appointment_time"], "14:30");
    let appointment_id = json["appointment_id"].as_str().unwrap();
    assert!(json["message"].as_str().unwrap().ends_with(appointment_id));

    let practice_id = state.store.select(Table::Tenants, &[], Some(1)).unwrap()[0]["id"].clone();
    let rows = state
        .store
        .select(Table::Appointments, &[("id", appointment_id)], None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["call_id"], "call-a");
    assert_eq!(rows[0]["tenant_id"], practice_id);
    assert_eq!(rows[0]["customer_name"], "Jane Doe");
    assert_eq!(rows[0]["service_type"], "cleaning");
    assert_eq!(rows[0]["scheduled_at"], "2025-03-04T14:30:00");
    assert_eq!(rows[0]["status"], "scheduled");
}

#[tokio::test]
async fn test_appointment_store_spoken_date() {
    let state = test_state();
    let payload = json!({
        "patient_name": "Sam Lee",
        "phone_number": "5553334444",
        "appointment_date": "Tuesday, March 4",
        "appointment_time": "09:15",
    });
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/appointment_store", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let rows = state
        .store
        .select(Table::Appointments, &[("status", "scheduled")], None)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["scheduled_at"]
        .as_str()
        .unwrap()
        .ends_with("-03-04T09:15:00"));
    assert_eq!(rows[0]["service_type"], "Dental appointment");
}

#[tokio::test]
async fn test_appointment_store_missing_fields() {
    let app = test_app(test_state());
    let payload = appointment_call(json!({"patient_name": "Jane Doe", "appointment_date": ""}));
    let res = app
        .oneshot(json_post("/vapi/appointment_store", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .ends_with("Missing required fields: phone_number, appointment_date, appointment_time"));
}

#[tokio::test]
async fn test_appointment_store_unreadable_datetime() {
    let state = test_state();
    let payload = appointment_call(json!({
        "patient_name": "Jane Doe",
        "phone_number": "+15553334444",
        "appointment_date": "next week",
        "appointment_time": "after lunch",
    }));
    let res = test_app(state.clone())
        .oneshot(json_post("/vapi/appointment_store", &payload))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Invalid appointment date/time format"));
    assert!(state
        .store
        .select(Table::Appointments, &[], None)
        .unwrap()
        .is_empty());
}

// ── Intent Analysis Tests ──

#[tokio::test]
async fn test_analyze_intent() {
    let app = test_app(test_state());
    let res = app
        .oneshot(json_post(
            "/vapi/analyze_intent",
            &json!({"transcript": "Do you accept my insurance? I have Aetna"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "analyzed");
    assert_eq!(json["intent_analysis"]["intent"], "insurance_inquiry");
    assert_eq!(json["intent_analysis"]["extracted_entities"]["insurance_provider"], "aetna");
    assert_eq!(json["practice_info"]["identified"], true);
    assert_eq!(json["practice_info"]["name"], "Bright Smile Dental");
    assert_eq!(json["response"]["should_speak"], true);
    assert!(json["response"]["text"]
        .as_str()
        .unwrap()
        .starts_with("We accept Delta Dental and Aetna insurance plans."));
}

#[tokio::test]
async fn test_analyze_intent_empty_transcript() {
    let app = test_app(test_state());
    let res = app
        .oneshot(json_post("/vapi/analyze_intent", &json!({"transcript": "   "})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert!(json["error"].as_str().unwrap().contains("transcript"));
}

#[tokio::test]
async fn test_analyze_intent_emergency_priority() {
    let app = test_app(test_state());
    let res = app
        .oneshot(json_post(
            "/vapi/analyze_intent",
            &json!({"transcript": "This is an emergency, I'm in severe pain"}),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["intent_analysis"]["intent"], "emergency");
    assert_eq!(json["response"]["priority"], "urgent");
}

// ── Admin API Tests ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let app = test_app(test_state());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let app = test_app(test_state());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/practices")
                .header("Authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_status() {
    let app = test_app(test_state());
    let res = app.oneshot(admin_get("/api/admin/status")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["practices"], 1);
    assert_eq!(json["recent_calls"], 0);
    assert_eq!(json["appointment_requests"], 0);
    assert_eq!(json["active_booking_sessions"], 0);
}

#[tokio::test]
async fn test_admin_create_and_list_practices() {
    let state = test_state();

    let res = test_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/practices")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Downtown Dental",
                        "phone_number": "+15557778888",
                        "hours": [{"day": "mon", "ranges": ["8-4"]}],
                        "faqs": [{"question": "Is parking free?", "answer": "Yes, behind the building."}]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = body_json(res).await;
    assert!(!created["practice_id"].as_str().unwrap().is_empty());

    let res = test_app(state.clone())
        .oneshot(admin_get("/api/admin/practices"))
        .await
        .unwrap();
    let json = body_json(res).await;
    let practices = json.as_array().unwrap();
    assert_eq!(practices.len(), 2);
    assert_eq!(practices[1]["name"], "Downtown Dental");
    assert_eq!(practices[1]["hours"][0]["ranges"][0], "8-4");

    // Calls to the new number use its own FAQ list.
    let res = test_app(state)
        .oneshot(json_post(
            "/vapi/analyze_intent",
            &json!({"transcript": "is parking free", "tenant_id": created["practice_id"]}),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["intent_analysis"]["intent"], "faq_specific");
    assert_eq!(json["response"]["text"], "Yes, behind the building.");
}

#[tokio::test]
async fn test_admin_create_practice_requires_name() {
    let app = test_app(test_state());
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/practices")
                .header("Authorization", "Bearer test-token")
                .header("Content-Type", "application/json")
                .body(Body::from(json!({"name": "  "}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_calls_newest_first() {
    let state = test_state();
    say(&state, "call-1", "what are your hours").await;
    say(&state, "call-2", "where are you located").await;

    let res = test_app(state)
        .oneshot(admin_get("/api/admin/calls?limit=1"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let calls = json.as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["call_id"], "call-2");
    assert_eq!(calls[0]["intent"], "location_inquiry");
}

#[tokio::test]
async fn test_admin_sessions() {
    let state = test_state();
    say(&state, "call-x", "I want to book an appointment").await;
    let session_id = state.session_for_call("call-x").unwrap();

    let res = test_app(state.clone())
        .oneshot(admin_get(&format!("/api/admin/sessions/{session_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["call_id"], "call-x");
    assert_eq!(json["current_step"], "gather_name");

    let end = |id: String| {
        Request::builder()
            .method("POST")
            .uri(format!("/api/admin/sessions/{id}/end"))
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap()
    };

    let res = test_app(state.clone())
        .oneshot(end(session_id.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = test_app(state.clone())
        .oneshot(end(session_id.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = test_app(state)
        .oneshot(admin_get(&format!("/api/admin/sessions/{session_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
