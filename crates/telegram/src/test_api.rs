//! In-process mock of the Telegram Bot API for adapter tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use {
    axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
    serde_json::{Value, json},
    tokio::{sync::oneshot, task::JoinHandle},
};

pub const NOT_MODIFIED: &str = "Bad Request: message is not modified: specified new message content and reply markup are exactly the same as a current content and reply markup of the message";
pub const EDIT_NOT_FOUND: &str = "Bad Request: message to edit not found";

/// How the mock answers.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Every `editMessageText` fails with this description.
    pub edit_error: Option<&'static str>,
    /// Number of `sendMessage` calls answered with `retry_after`.
    pub rate_limited_sends: usize,
    /// Every `sendMessage` fails with a generic 400.
    pub fail_sends: bool,
    /// Every chat action and reaction request fails.
    pub fail_actions: bool,
}

#[derive(Debug, Default)]
struct MockState {
    behavior: MockBehavior,
    requests: Vec<(String, Value)>,
    next_message_id: i64,
}

#[derive(Clone)]
struct Shared(Arc<Mutex<MockState>>);

pub struct MockTelegramApi {
    state: Shared,
    addr: std::net::SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

fn error(code: u16, description: &str) -> Value {
    json!({ "ok": false, "error_code": code, "description": description })
}

fn message(id: i64, chat_id: &Value, text: &Value) -> Value {
    json!({
        "ok": true,
        "result": {
            "message_id": id,
            "date": 0,
            "chat": { "id": chat_id, "type": "private" },
            "text": text,
        }
    })
}

async fn handler(State(state): State<Shared>, uri: Uri, body: Bytes) -> Json<Value> {
    let method = uri
        .path()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let mut state = state.0.lock().unwrap();
    state.requests.push((method.clone(), body.clone()));

    let response = match method.as_str() {
        "sendmessage" => {
            if state.behavior.rate_limited_sends > 0 {
                state.behavior.rate_limited_sends -= 1;
                json!({
                    "ok": false,
                    "error_code": 429,
                    "description": "Too Many Requests: retry after 1",
                    "parameters": { "retry_after": 1 }
                })
            } else if state.behavior.fail_sends {
                error(400, "Bad Request: chat not found")
            } else {
                state.next_message_id += 1;
                message(state.next_message_id, &body["chat_id"], &body["text"])
            }
        },
        "editmessagetext" => match state.behavior.edit_error {
            Some(description) => error(400, description),
            None => message(
                body["message_id"].as_i64().unwrap_or_default(),
                &body["chat_id"],
                &body["text"],
            ),
        },
        "sendchataction" | "setmessagereaction" if state.behavior.fail_actions => {
            error(400, "Bad Request: not enough rights")
        },
        _ => json!({ "ok": true, "result": true }),
    };
    Json(response)
}

impl MockTelegramApi {
    pub async fn start(behavior: MockBehavior) -> Self {
        let state = Shared(Arc::new(Mutex::new(MockState {
            behavior,
            ..Default::default()
        })));
        let app = Router::new()
            .route("/{*path}", post(handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        Self {
            state,
            addr,
            shutdown: Some(shutdown_tx),
            server: Some(server),
        }
    }

    pub fn bot(&self) -> teloxide::Bot {
        let api_url = reqwest::Url::parse(&format!("http://{}/", self.addr)).expect("parse api url");
        teloxide::Bot::new("test-token").set_api_url(api_url)
    }

    /// Captured request bodies for `method` (case-insensitive), in order.
    pub fn requests_for(&self, method: &str) -> Vec<Value> {
        let method = method.to_ascii_lowercase();
        self.state
            .0
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Every captured method name, in order.
    pub fn methods(&self) -> Vec<String> {
        self.state
            .0
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.state.0.lock().unwrap().behavior = behavior;
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = server.await;
        }
    }
}
