use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Query, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::net::TcpListener;

pub const SEND_PATH: &str = "/robot/send";

/// `errcode` returned when the signature is missing, stale or wrong.
pub const SIGN_MISMATCH_CODE: i64 = 310000;

/// How far the `timestamp` parameter may drift from the server clock.
pub const SIGNATURE_WINDOW: Duration = Duration::from_secs(3600);

/// How the mock answers every send.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub secret: Option<String>,
    pub status: u16,
    pub errcode: i64,
    pub errmsg: String,
    /// Replaces the JSON reply body verbatim when set.
    pub raw_body: Option<String>,
    pub application_host: Option<String>,
    pub location_host: Option<String>,
    pub delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            secret: None,
            status: 200,
            errcode: 0,
            errmsg: "ok".to_string(),
            raw_body: None,
            application_host: None,
            location_host: None,
            delay: Duration::ZERO,
        }
    }
}

/// One call as seen by the mock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Received {
    pub method: String,
    pub raw_query: String,
    pub query: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    config: RwLock<MockConfig>,
    received: Mutex<Vec<Received>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub type SharedState = Arc<MockState>;

impl MockState {
    pub fn new(config: MockConfig) -> SharedState {
        Arc::new(Self {
            config: RwLock::new(config),
            ..Self::default()
        })
    }

    pub fn config(&self) -> MockConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_config(&self, config: MockConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Highest number of sends that were being handled at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, received: Received) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(received);
    }
}

pub fn app(state: SharedState) -> Router {
    Router::new()
        .route(SEND_PATH, any(robot_send))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Standard-base64 HMAC-SHA256 of `"{timestamp}\n{secret}"`.
pub fn expected_signature(secret: &str, timestamp: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts keys of any length"));
    mac.update(format!("{timestamp}\n{secret}").as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn signature_valid(secret: &str, query: &HashMap<String, String>) -> bool {
    let (Some(timestamp), Some(sign)) = (query.get("timestamp"), query.get("sign")) else {
        return false;
    };
    let Ok(ts) = timestamp.parse::<u128>() else {
        return false;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    if now.abs_diff(ts) > SIGNATURE_WINDOW.as_millis() {
        return false;
    }
    *sign == expected_signature(secret, timestamp)
}

async fn robot_send(
    State(state): State<SharedState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let in_flight = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

    let config = state.config();
    if !config.delay.is_zero() {
        tokio::time::sleep(config.delay).await;
    }

    let (errcode, errmsg) = match &config.secret {
        Some(secret) if !signature_valid(secret, &query) => {
            (SIGN_MISMATCH_CODE, "sign not match".to_string())
        }
        _ => (config.errcode, config.errmsg.clone()),
    };
    tracing::info!(%method, errcode, "robot send received");

    state.record(Received {
        method: method.to_string(),
        raw_query: raw_query.unwrap_or_default(),
        query,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    let response = reply(&config, errcode, &errmsg);
    state.in_flight.fetch_sub(1, Ordering::SeqCst);
    response
}

fn reply(config: &MockConfig, errcode: i64, errmsg: &str) -> Response {
    let status = StatusCode::from_u16(config.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = config.raw_body.clone().unwrap_or_else(|| {
        serde_json::json!({ "errcode": errcode, "errmsg": errmsg }).to_string()
    });

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let hints = [
        ("application-host", &config.application_host),
        ("location-host", &config.location_host),
    ];
    for (name, value) in hints {
        if let Some(value) = value.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }
    (status, headers, body).into_response()
}
