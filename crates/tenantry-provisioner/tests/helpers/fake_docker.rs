//! In-process stand-in for the Docker Engine API endpoints the runtime uses.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const API_VERSION: &str = "v1.43";

#[derive(Debug, Default)]
pub struct DockerState {
    next_id: u64,
    /// container name -> id
    pub containers: HashMap<String, String>,
    pub running: HashSet<String>,
    /// Create request bodies, in order.
    pub create_bodies: Vec<Value>,
    pub create_calls: u32,
    pub start_calls: u32,
    /// Answer every create with 500.
    pub fail_creates: bool,
}

type Shared = Arc<Mutex<DockerState>>;

pub struct FakeDocker {
    pub addr: SocketAddr,
    state: Shared,
}

impl FakeDocker {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(DockerState::default()));

        let app = Router::new()
            .route(
                &format!("/{}/containers/create", API_VERSION),
                post(create_container),
            )
            .route(
                &format!("/{}/containers/{{container}}/json", API_VERSION),
                get(inspect_container),
            )
            .route(
                &format!("/{}/containers/{{container}}/start", API_VERSION),
                post(start_container),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake docker");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake docker");
        });

        Self { addr, state }
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> MutexGuard<'_, DockerState> {
        self.state.lock().expect("docker state poisoned")
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, DockerState> {
    state.lock().expect("docker state poisoned")
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn create_container(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    state.create_calls += 1;

    if state.fail_creates {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "daemon on fire");
    }

    let name = query.get("name").cloned().unwrap_or_default();
    if let Some(existing) = state.containers.get(&name) {
        return message(
            StatusCode::CONFLICT,
            &format!(
                "Conflict. The container name \"/{}\" is already in use by container \"{}\".",
                name, existing
            ),
        );
    }

    state.next_id += 1;
    let id = format!("c0ffee{:04}", state.next_id);
    state.containers.insert(name, id.clone());
    state.create_bodies.push(body);

    (StatusCode::CREATED, Json(json!({ "Id": id, "Warnings": [] }))).into_response()
}

async fn inspect_container(State(state): State<Shared>, Path(container): Path<String>) -> Response {
    let state = lock(&state);
    let id = state.containers.get(&container).cloned().or_else(|| {
        state
            .containers
            .values()
            .find(|id| **id == container)
            .cloned()
    });

    match id {
        Some(id) => Json(json!({ "Id": id, "Name": format!("/{}", container) })).into_response(),
        None => message(StatusCode::NOT_FOUND, &format!("No such container: {}", container)),
    }
}

async fn start_container(State(state): State<Shared>, Path(container): Path<String>) -> Response {
    let mut state = lock(&state);
    state.start_calls += 1;

    if !state.containers.values().any(|id| *id == container) {
        return message(StatusCode::NOT_FOUND, &format!("No such container: {}", container));
    }
    if !state.running.insert(container) {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}
