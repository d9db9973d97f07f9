//! Minimal todo service used as a flow evaluation target
//!
//! State lives in a [`TodoStore`] created by the caller and handed to
//! [`router`]; nothing is global, so every test can run its own instance.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Default listen address of the fixture binary
pub const DEFAULT_ADDR: &str = "127.0.0.1:38080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(rename = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Value>,
}

/// In-memory todos plus the id counter. Ids are handed out from
/// `next_id`, which only ever grows.
#[derive(Debug)]
pub struct TodoStore {
    next_id: u64,
    todos: IndexMap<String, Todo>,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            todos: IndexMap::new(),
        }
    }

    pub fn create(&mut self, title: String, due_date: Option<Value>) -> Todo {
        let id = self.next_id.to_string();
        self.next_id += 1;
        let todo = Todo {
            id: id.clone(),
            title,
            completed: false,
            due_date,
        };
        self.todos.insert(id, todo.clone());
        todo
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.get(id)
    }

    pub fn list(&self) -> Vec<Todo> {
        self.todos.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

pub type SharedStore = Arc<RwLock<TodoStore>>;

pub fn shared(store: TodoStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/todos", get(list_todos_handler).post(create_todo_handler))
        .route("/todos/:id", get(get_todo_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Serve on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, store: SharedStore) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Fixture service listening on {}", addr);
    }
    axum::serve(listener, router(store)).await
}

/// Bind an ephemeral local port and serve in the background. Returns the
/// bound address.
pub async fn spawn_local(store: SharedStore) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve(listener, store));
    Ok(addr)
}

// ============================================================================
// Handlers
// ============================================================================

fn error_body(code: StatusCode, error: &str) -> Response {
    (code, Json(json!({ "error": error }))).into_response()
}

async fn not_found() -> Response {
    error_body(StatusCode::NOT_FOUND, "not_found")
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn list_todos_handler(State(store): State<SharedStore>) -> impl IntoResponse {
    Json(store.read().await.list())
}

async fn get_todo_handler(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Response {
    match store.read().await.get(&id) {
        Some(todo) => Json(todo.clone()).into_response(),
        None => error_body(StatusCode::NOT_FOUND, "not_found"),
    }
}

async fn create_todo_handler(State(store): State<SharedStore>, body: Bytes) -> Response {
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                debug!("rejecting malformed todo body: {}", e);
                return error_body(StatusCode::BAD_REQUEST, "invalid_json");
            }
        }
    };

    let title = match payload.get("title").and_then(Value::as_str) {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => return error_body(StatusCode::UNPROCESSABLE_ENTITY, "validation: title"),
    };
    let due_date = payload.get("dueDate").cloned();

    let todo = store.write().await.create(title, due_date);
    (StatusCode::CREATED, Json(todo)).into_response()
}
