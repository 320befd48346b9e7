//! HTTP seam for the UI shell: a JSON state frame, an SSE frame stream, one
//! action endpoint, and the save-slot pass-through. Handlers never panic on
//! bad input; failures are logged and reported as `{ok: false}` with the
//! in-memory session untouched.

use std::{convert::Infallible, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::warn;

use crate::content::Content;
use crate::engine::{Action, Engine};
use crate::persist::{FileSaveStore, SaveStore};
use crate::runtime::Runtime;

struct AppState {
    runtime: Arc<Runtime>,
    store: Arc<dyn SaveStore>,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub seed: Option<u64>,
}

pub async fn run(config: ServerConfig) -> Result<()> {
    let ServerConfig {
        host,
        port,
        data_dir,
        seed,
    } = config;

    let store: Arc<dyn SaveStore> = Arc::new(FileSaveStore::new(&data_dir)?);
    let engine = match seed {
        Some(seed) => Engine::with_seed(Content::standard(), seed),
        None => Engine::new(Content::standard()),
    };
    let runtime = Runtime::new(engine);

    // Resume the previous session when the pointer leads somewhere loadable.
    if let Some(name) = store.last() {
        match store.load(&name) {
            Ok(document) => match runtime.with_engine(|engine| engine.import(&document)) {
                Ok(()) => println!("Resumed save '{name}'."),
                Err(err) => warn!(%name, %err, "last save corrupt, starting fresh"),
            },
            Err(err) => warn!(%name, %err, "last save unreadable, starting fresh"),
        }
    }

    let timers = runtime.clone();
    tokio::spawn(async move { timers.run().await });

    let state = Arc::new(AppState { runtime, store });
    let router = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    println!("Valley Legend live at http://{addr} (Ctrl+C to stop)");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    println!("Shutting down...");
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(state_frame))
        .route("/api/events", get(stream_events))
        .route("/api/action", post(apply_action))
        .route("/api/new-game", post(new_game))
        .route("/api/saves", get(list_saves))
        .route("/api/saves/last", get(last_save))
        .route("/api/saves/:name", put(write_save).delete(delete_save))
        .route("/api/saves/:name/load", post(load_save))
        .with_state(state)
}

async fn state_frame(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(
        state
            .runtime
            .read(|engine| serde_json::to_value(engine.frame()).unwrap_or(Value::Null)),
    )
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.runtime.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

async fn apply_action(
    State(state): State<Arc<AppState>>,
    Json(action): Json<Action>,
) -> Json<Value> {
    let applied = state.runtime.apply(action);
    Json(json!({ "applied": applied }))
}

async fn new_game(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.runtime.with_engine(|engine| engine.new_game());
    Json(json!({ "ok": true }))
}

async fn list_saves(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.store.list()))
}

async fn last_save(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "name": state.store.last() }))
}

async fn write_save(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Json<Value> {
    match persist_session(&state, &name) {
        Ok(()) => Json(json!({ "ok": true })),
        Err(err) => {
            warn!(%name, %err, "failed to write save");
            Json(json!({ "ok": false }))
        }
    }
}

fn persist_session(state: &AppState, name: &str) -> Result<()> {
    let document = state.runtime.read(|engine| engine.export())?;
    state.store.save(name, &document)?;
    state.store.set_last(name)?;
    Ok(())
}

async fn load_save(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Json<Value> {
    match restore_session(&state, &name) {
        Ok(()) => Json(json!({ "ok": true })),
        Err(err) => {
            warn!(%name, %err, "failed to load save");
            Json(json!({ "ok": false }))
        }
    }
}

fn restore_session(state: &AppState, name: &str) -> Result<()> {
    let document = state.store.load(name)?;
    state.runtime.with_engine(|engine| engine.import(&document))?;
    state.store.set_last(name)?;
    Ok(())
}

async fn delete_save(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Json<Value> {
    match state.store.delete(&name) {
        Ok(()) => Json(json!({ "ok": true })),
        Err(err) => {
            warn!(%name, %err, "failed to delete save");
            Json(json!({ "ok": false }))
        }
    }
}
