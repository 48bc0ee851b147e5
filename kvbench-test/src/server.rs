//! Exposes an in-process mock of the key-value service for use in integration tests.
//!
//! The mock serves `POST /set`, `GET /get?key=` and `DELETE /remove?key=` backed by an in-memory
//! map. Every call is appended to an event log in arrival order, and the number of concurrently
//! handled calls is tracked.
//!
//! ```
//! use kvbench_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url();
//!    // point the benchmark at the URL...
//! }
//! ```

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use serde_json::json;

/// Decides the status code of the `n`-th call (starting at zero) to an endpoint.
type StatusFn = Arc<dyn Fn(usize) -> StatusCode + Send + Sync>;

/// The endpoint hit by a call.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Call {
    /// `POST /set`
    Set,
    /// `GET /get`
    Get,
    /// `DELETE /remove`
    Remove,
}

/// An entry of the event log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// The endpoint that was called.
    pub call: Call,
    /// The key passed to the call.
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct SetBody {
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: String,
}

struct Inner {
    store: Mutex<HashMap<String, String>>,
    events: Mutex<Vec<Event>>,
    set_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    set_status: Option<StatusFn>,
    remove_status: Option<StatusFn>,
}

impl Inner {
    /// Registers a call and applies the configured delay.
    async fn enter(&self, call: Call, key: &str) -> InFlight<'_> {
        self.events.lock().unwrap().push(Event {
            call,
            key: key.to_owned(),
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        guard
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

type ServerState = Arc<Inner>;

async fn set(State(state): State<ServerState>, Json(body): Json<SetBody>) -> Response {
    let _guard = state.enter(Call::Set, &body.key).await;
    let n = state.set_calls.fetch_add(1, Ordering::SeqCst);

    let status = state.set_status.as_ref().map_or(StatusCode::OK, |f| f(n));
    if status != StatusCode::OK {
        return status.into_response();
    }

    tracing::debug!(key = %body.key, "value set");
    state.store.lock().unwrap().insert(body.key, body.value);
    (StatusCode::OK, "Value set").into_response()
}

async fn get(State(state): State<ServerState>, Query(query): Query<KeyQuery>) -> Response {
    let _guard = state.enter(Call::Get, &query.key).await;

    let value = state.store.lock().unwrap().get(&query.key).cloned();
    match value {
        Some(value) => (StatusCode::OK, Json(json!({ "value": value }))).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
    }
}

async fn remove(State(state): State<ServerState>, Query(query): Query<KeyQuery>) -> Response {
    let _guard = state.enter(Call::Remove, &query.key).await;
    let n = state.remove_calls.fetch_add(1, Ordering::SeqCst);

    state.store.lock().unwrap().remove(&query.key);

    let status = state.remove_status.as_ref().map_or(StatusCode::OK, |f| f(n));
    tracing::debug!(key = %query.key, %status, "value removed");
    (status, "Value removed").into_response()
}

/// A builder for a [`TestServer`] with custom behavior.
#[must_use]
#[derive(Default)]
pub struct TestServerBuilder {
    delay: Duration,
    set_status: Option<StatusFn>,
    remove_status: Option<StatusFn>,
}

impl TestServerBuilder {
    /// Delays every response by `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the status of `set` calls. Non-`200` responses do not store the value.
    pub fn set_status(mut self, f: impl Fn(usize) -> StatusCode + Send + Sync + 'static) -> Self {
        self.set_status = Some(Arc::new(f));
        self
    }

    /// Overrides the status of `remove` calls. The key is removed regardless.
    pub fn remove_status(
        mut self,
        f: impl Fn(usize) -> StatusCode + Send + Sync + 'static,
    ) -> Self {
        self.remove_status = Some(Arc::new(f));
        self
    }

    /// Binds a random port on localhost and spawns the server onto the current runtime.
    pub async fn start(self) -> TestServer {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let state = Arc::new(Inner {
            store: Mutex::default(),
            events: Mutex::default(),
            set_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay: self.delay,
            set_status: self.set_status,
            remove_status: self.remove_status,
        });

        let router = Router::new()
            .route("/set", routing::post(set))
            .route("/get", routing::get(get))
            .route("/remove", routing::delete(remove))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, router).await.unwrap();
        });

        TestServer {
            handle,
            socket,
            state,
        }
    }
}

/// An in-process mock key-value service for use in integration tests.
///
/// The server listens on a random available port on localhost and is shut down when dropped.
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    state: ServerState,
}

impl TestServer {
    /// Starts a server which answers every call with `200 OK`.
    pub async fn new() -> Self {
        Self::builder().start().await
    }

    /// Returns a builder to customize delays and status codes.
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Returns the base URL of the server.
    pub fn url(&self) -> String {
        format!("http://{}", self.socket)
    }

    /// Returns all calls received so far, in arrival order.
    pub fn events(&self) -> Vec<Event> {
        self.state.events.lock().unwrap().clone()
    }

    /// Returns the maximum number of calls that were handled at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Returns the number of keys currently stored.
    pub fn stored_keys(&self) -> usize {
        self.state.store.lock().unwrap().len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Returns a base URL on localhost where nothing is listening.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    let socket = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{socket}")
}
