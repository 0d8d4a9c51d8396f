//! Test doubles: a scriptable LightUpPi server and a recording outcome sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::TransportConfig;
use crate::sync::{OutcomeSink, SyncKind, SyncOutcome};

/// Transport timeouts short enough for tests
pub fn fast_transport() -> TransportConfig {
    TransportConfig {
        connect_timeout: Duration::from_millis(300),
        read_timeout: Duration::from_millis(300),
    }
}

/// A server alarm object as LightUpPi sends it (weekdays only)
pub fn server_alarm_json(id: i64, hour: i64, minute: i64, label: &str) -> Value {
    json!({
        "id": id,
        "hour": hour,
        "minute": minute,
        "enabled": true,
        "monday": true,
        "tuesday": true,
        "wednesday": true,
        "thursday": true,
        "friday": true,
        "saturday": false,
        "sunday": false,
        "label": label,
        "timestamp": 1_000 + id
    })
}

struct FakeState {
    ping_status: u16,
    get_status: u16,
    alarms: Value,
    add_response: Value,
    edit_response: Value,
    delete_response: Value,
    requests: Vec<String>,
}

type SharedState = Arc<Mutex<FakeState>>;

/// In-process LightUpPi server on `127.0.0.1:<random port>`.
///
/// `ping` answers with the ping status; every other endpoint answers with
/// the get status, and with its scripted JSON body when that status is 200.
pub struct FakeLightUpPi {
    address: String,
    state: SharedState,
}

impl FakeLightUpPi {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            ping_status: 200,
            get_status: 200,
            alarms: json!([]),
            add_response: json!({"success": true, "id": 1}),
            edit_response: json!({"success": true, "id": 1, "timestamp": 1}),
            delete_response: json!({"success": true}),
            requests: Vec::new(),
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { address, state }
    }

    pub fn address(&self) -> String {
        self.address.clone()
    }

    pub fn set_ping_status(&self, status: u16) {
        self.state.lock().unwrap().ping_status = status;
    }

    pub fn set_get_status(&self, status: u16) {
        self.state.lock().unwrap().get_status = status;
    }

    pub fn set_alarms(&self, alarms: Value) {
        self.state.lock().unwrap().alarms = alarms;
    }

    pub fn set_add_response(&self, body: Value) {
        self.state.lock().unwrap().add_response = body;
    }

    pub fn set_edit_response(&self, body: Value) {
        self.state.lock().unwrap().edit_response = body;
    }

    pub fn set_delete_response(&self, body: Value) {
        self.state.lock().unwrap().delete_response = body;
    }

    /// Path and query of every request received so far
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

async fn handle(State(state): State<SharedState>, uri: Uri) -> Response {
    let mut state = state.lock().unwrap();
    state.requests.push(
        uri.path_and_query()
            .map(|path| path.as_str().to_string())
            .unwrap_or_default(),
    );

    let Some(endpoint) = uri.path().strip_prefix("/LightUpPi/") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if endpoint == "ping" {
        return StatusCode::from_u16(state.ping_status)
            .unwrap()
            .into_response();
    }

    let status = StatusCode::from_u16(state.get_status).unwrap();
    if status != StatusCode::OK {
        return status.into_response();
    }
    let body = match endpoint {
        "getAlarm" => json!({"alarms": state.alarms.clone()}),
        "addAlarm" => state.add_response.clone(),
        "editAlarm" => state.edit_response.clone(),
        "deleteAlarm" => state.delete_response.clone(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(body).into_response()
}

/// Address of a listener that accepts connections and never answers
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    address
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Started(SyncKind),
    Finished(SyncKind),
    Reported(SyncKind, SyncOutcome),
}

/// Outcome sink that remembers every call
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<SyncOutcome> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Reported(_, outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl OutcomeSink for RecordingSink {
    fn progress_started(&self, kind: SyncKind) {
        self.events.lock().unwrap().push(SinkEvent::Started(kind));
    }

    fn progress_finished(&self, kind: SyncKind) {
        self.events.lock().unwrap().push(SinkEvent::Finished(kind));
    }

    fn report(&self, kind: SyncKind, outcome: &SyncOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Reported(kind, outcome.clone()));
    }
}
