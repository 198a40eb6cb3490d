//! In-process fake of the iThenticate XML-RPC endpoint.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::Router;

use ithenticate_bridge::xmlrpc::{decode_call, encode_response, structure, Value};

pub const USERNAME: &str = "editor";
pub const PASSWORD: &str = "secret";
pub const SID: &str = "fake-sid";
/// `document.get` for this ID answers with field errors.
pub const MISSING_DOCUMENT: i64 = 404;
pub const FIRST_DOCUMENT_ID: i64 = 1000;
pub const PERCENT_MATCH: i64 = 23;
/// Report IDs are the document ID plus this offset.
pub const REPORT_OFFSET: i64 = 5000;

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub params: Value,
}

pub struct FakeState {
    pub pending: AtomicBool,
    next_document_id: AtomicI64,
    calls: Mutex<Vec<Call>>,
}

impl FakeState {
    fn new() -> Self {
        Self {
            pending: AtomicBool::new(true),
            next_document_id: AtomicI64::new(FIRST_DOCUMENT_ID),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_pending(&self, pending: bool) {
        self.pending.store(pending, Ordering::SeqCst);
    }

    pub fn calls(&self, method: &str) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }
}

pub struct FakeVendor {
    pub url: String,
    pub state: Arc<FakeState>,
}

impl FakeVendor {
    /// Serve on an ephemeral port from a background thread.
    pub fn start() -> Self {
        let state = Arc::new(FakeState::new());
        let server_state = state.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                let app = Router::new()
                    .route("/rpc", post(handle_rpc))
                    .with_state(server_state);
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        FakeVendor {
            url: format!("http://{}/rpc", addr),
            state,
        }
    }
}

async fn handle_rpc(State(state): State<Arc<FakeState>>, body: String) -> String {
    let (method, params) = match decode_call(&body) {
        Ok(call) => call,
        Err(e) => return encode_response(&rejected(400, &e.to_string())),
    };
    let params = params.into_iter().next().unwrap_or(Value::Nil);
    state.calls.lock().unwrap().push(Call {
        method: method.clone(),
        params: params.clone(),
    });

    let response = if method == "login" {
        login(&params)
    } else if params.get("sid").and_then(Value::as_str) != Some(SID) {
        rejected(401, "Invalid session")
    } else {
        match method.as_str() {
            "document.add" => {
                let id = state.next_document_id.fetch_add(1, Ordering::SeqCst);
                ok(vec![(
                    "uploaded",
                    Value::Array(vec![structure([("id", Value::Int(id))])]),
                )])
            }
            "document.get" => document_get(&state, &params),
            "report.get" => {
                let id = params.get("id").and_then(Value::as_i64).unwrap_or(0);
                ok(vec![(
                    "report_url",
                    Value::from(format!("https://fake.test/report/{}", id)),
                )])
            }
            other => rejected(404, &format!("unknown method {}", other)),
        }
    };

    encode_response(&response)
}

fn login(params: &Value) -> Value {
    let user = params.get("username").and_then(Value::as_str);
    let pass = params.get("password").and_then(Value::as_str);
    if user == Some(USERNAME) && pass == Some(PASSWORD) {
        ok(vec![("sid", Value::from(SID))])
    } else {
        rejected(401, "Invalid username or password")
    }
}

fn document_get(state: &FakeState, params: &Value) -> Value {
    let id = params.get("id").and_then(Value::as_i64).unwrap_or(0);
    if id == MISSING_DOCUMENT {
        return structure([
            ("status", Value::Int(400)),
            (
                "errors",
                structure([(
                    "id",
                    Value::Array(vec![Value::from("Document does not exist")]),
                )]),
            ),
        ]);
    }

    let pending = state.pending.load(Ordering::SeqCst);
    let parts = if pending {
        Vec::new()
    } else {
        vec![structure([("id", Value::Int(id + REPORT_OFFSET))])]
    };
    let document = structure([
        ("id", Value::Int(id)),
        ("is_pending", Value::Int(i64::from(pending))),
        ("percent_match", Value::Int(PERCENT_MATCH)),
        ("parts", Value::Array(parts)),
    ]);
    ok(vec![("documents", Value::Array(vec![document]))])
}

fn ok(members: Vec<(&str, Value)>) -> Value {
    let mut all = vec![("status", Value::Int(200))];
    all.extend(members);
    structure(all)
}

fn rejected(status: i64, message: &str) -> Value {
    structure([
        ("status", Value::Int(status)),
        ("messages", Value::Array(vec![Value::from(message)])),
    ])
}
