//! Shared helpers for integration tests.
//!
//! Spins up local axum servers standing in for the monitored page and the
//! notification service, so the HTTP fetcher and sink run against real
//! sockets.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use notification_system::{telemetry, Configuration, FieldSpec};

/// Initialize tracing once; respects `RUST_LOG`.
/// Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    telemetry::init_tracing("warn,notification_system=debug");
}

/// Local notification service.
///
/// Answers each request with the next scripted status (200 once the script
/// runs out) and records every body it receives.
pub struct TestSink {
    pub base_url: String,
    state: SinkState,
}

#[derive(Clone, Default)]
struct SinkState {
    script: Arc<Mutex<VecDeque<u16>>>,
    hits: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl TestSink {
    pub async fn spawn(script: impl IntoIterator<Item = u16>) -> Self {
        let state = SinkState::default();
        state.script.lock().unwrap().extend(script);

        let app = Router::new()
            .route("/api/v1/notification/save", post(save))
            .with_state(state.clone());

        Self {
            base_url: serve(app).await,
            state,
        }
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.state.bodies.lock().unwrap().clone()
    }
}

async fn save(State(state): State<SinkState>, Json(body): Json<Value>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);

    let status = state.script.lock().unwrap().pop_front().unwrap_or(200);
    let status = StatusCode::from_u16(status).unwrap();

    if status == StatusCode::OK {
        (status, Json(json!({"status": "saved"}))).into_response()
    } else {
        (status, "notification service error").into_response()
    }
}

/// Local page server serving a swappable HTML body at `/`.
pub struct TestPage {
    pub url: String,
    html: Arc<RwLock<String>>,
}

impl TestPage {
    pub async fn spawn(html: impl Into<String>) -> Self {
        let html = Arc::new(RwLock::new(html.into()));

        let app = Router::new()
            .route("/", get(page))
            .with_state(html.clone());

        Self {
            url: format!("{}/", serve(app).await),
            html,
        }
    }

    pub fn set(&self, html: impl Into<String>) {
        *self.html.write().unwrap() = html.into();
    }
}

async fn page(State(html): State<Arc<RwLock<String>>>) -> Html<String> {
    Html(html.read().unwrap().clone())
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Notice-board markup in the shape of the default configuration.
pub fn notice_board(items: &[(&str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, href, date)| {
            format!(
                r#"<li><h6><a href="{}">{}</a></h6><small>{}</small></li>"#,
                href, title, date
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="tab_content"><div class="latest_tab"><ul>{}</ul></div></div></body></html>"#,
        items
    )
}

/// Links keyed by `href`, titles compared.
pub fn link_config() -> Configuration {
    Configuration::new(
        "li",
        vec![
            FieldSpec::attribute("link", "a", "href"),
            FieldSpec::text("title", "a"),
        ],
        "link",
    )
    .unwrap()
}

/// `<ul>` of `<li><a href=..>title</a></li>` items.
pub fn link_list(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(href, title)| format!(r#"<li><a href="{}">{}</a></li>"#, href, title))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", items)
}
