#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

pub type Store = Arc<Mutex<Vec<Value>>>;

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskis-{nanos}-{file_name}"))
}

async fn list_tasks(State(store): State<Store>) -> Json<Value> {
    Json(Value::Array(store.lock().unwrap().clone()))
}

async fn create_task(State(store): State<Store>, Json(task): Json<Value>) -> Json<Value> {
    store.lock().unwrap().push(task.clone());
    Json(task)
}

async fn create_bulk(State(store): State<Store>, Json(body): Json<Value>) -> Json<Value> {
    let mut tasks = store.lock().unwrap();
    let created: Vec<Value> = body["tasks"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(offset, title)| json!({ "id": 500 + offset, "title": title, "completed": false }))
        .collect();
    tasks.extend(created.iter().cloned());
    Json(Value::Array(created))
}

async fn update_task(
    State(store): State<Store>,
    Path(id): Path<i64>,
    Json(task): Json<Value>,
) -> Json<Value> {
    let mut tasks = store.lock().unwrap();
    if let Some(entry) = tasks.iter_mut().find(|entry| entry["id"] == json!(id)) {
        *entry = task.clone();
    }
    Json(task)
}

async fn delete_task(State(store): State<Store>, Path(id): Path<i64>) -> Json<Value> {
    store.lock().unwrap().retain(|entry| entry["id"] != json!(id));
    Json(json!({ "message": "deleted" }))
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    Json(json!({ "response": format!("you said: {message}") }))
}

/// Starts an in-process task store seeded with `tasks`; returns its base URL.
pub async fn spawn_backend(tasks: Value) -> (String, Store) {
    let store: Store = Arc::new(Mutex::new(tasks.as_array().cloned().unwrap_or_default()));
    let router = Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/bulk", post(create_bulk))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/chat", post(chat))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), store)
}

pub fn seeded_tasks() -> Value {
    json!([
        { "id": 1, "title": "Learn FastAPI", "completed": true },
        { "id": 2, "title": "Learn React", "completed": false },
        { "id": 3, "title": "Deploy to Render", "completed": false }
    ])
}

/// Runs the binary off the async runtime so the mock backend keeps serving.
pub async fn run_cli(base_url: &str, args: &[&str], stdin: Option<&str>) -> Output {
    let exe = env!("CARGO_BIN_EXE_taskis");
    let config_path = temp_path("missing-config.json");
    let mut argv: Vec<String> = vec!["--base-url".to_string(), base_url.to_string()];
    argv.extend(args.iter().map(|arg| arg.to_string()));
    let input = stdin.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        let mut child = Command::new(exe)
            .args(&argv)
            .env("TASKIS_CONFIG_PATH", &config_path)
            .env_remove("TASKIS_BASE_URL")
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn taskis");

        if let Some(input) = input {
            child
                .stdin
                .as_mut()
                .expect("stdin")
                .write_all(input.as_bytes())
                .expect("failed to write to stdin");
        }
        drop(child.stdin.take());

        child.wait_with_output().expect("failed to read output")
    })
    .await
    .expect("cli task panicked")
}

/// An address nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
