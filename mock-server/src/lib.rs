use std::{collections::BTreeMap, convert::Infallible, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    items: BTreeMap<u64, Item>,
    next_id: u64,
}

impl Store {
    fn insert(&mut self, name: String) -> Item {
        self.next_id += 1;
        let item = Item {
            id: self.next_id,
            name,
        };
        self.items.insert(item.id, item.clone());
        item
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Vec::new())
}

/// Router preloaded with `names`, assigned ids 1..=n in order.
pub fn app_with(names: Vec<&str>) -> Router {
    let mut store = Store::default();
    for name in names {
        store.insert(name.to_string());
    }
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/batch", post(create_batch))
        .route("/items/stream", get(stream_items))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/search", get(search_items))
        .route("/failing/{status}", get(failing))
        .route("/echo/headers", get(echo_headers))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let store = db.read().await;
    Json(store.items.values().cloned().collect())
}

async fn create_item(State(db): State<Db>, Json(input): Json<CreateItem>) -> (StatusCode, Json<Item>) {
    let item = db.write().await.insert(input.name);
    tracing::debug!(id = item.id, "item created");
    (StatusCode::CREATED, Json(item))
}

async fn create_batch(
    State(db): State<Db>,
    Json(input): Json<Vec<CreateItem>>,
) -> (StatusCode, Json<Vec<Item>>) {
    let mut store = db.write().await;
    let created: Vec<Item> = input.into_iter().map(|c| store.insert(c.name)).collect();
    tracing::debug!(count = created.len(), "batch created");
    (StatusCode::CREATED, Json(created))
}

/// Every item as a JSON array, one element per body chunk.
async fn stream_items(State(db): State<Db>) -> Response {
    let items: Vec<Item> = db.read().await.items.values().cloned().collect();
    let mut chunks = Vec::with_capacity(items.len() + 2);
    chunks.push(Bytes::from_static(b"["));
    for (i, item) in items.iter().enumerate() {
        let mut chunk = if i == 0 { Vec::new() } else { b",".to_vec() };
        match serde_json::to_writer(&mut chunk, item) {
            Ok(()) => chunks.push(Bytes::from(chunk)),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize item");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }
    chunks.push(Bytes::from_static(b"]"));
    let body = Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)));
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn get_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Item>, StatusCode> {
    let store = db.read().await;
    store.items.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<CreateItem>,
) -> Result<Json<Item>, StatusCode> {
    let mut store = db.write().await;
    let item = store.items.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    item.name = input.name;
    Ok(Json(item.clone()))
}

async fn delete_item(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    match db.write().await.items.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn search_items(State(db): State<Db>, Query(params): Query<SearchParams>) -> Json<Vec<Item>> {
    let store = db.read().await;
    let found = store
        .items
        .values()
        .filter(|item| params.name.as_deref().map_or(true, |name| item.name.contains(name)))
        .cloned()
        .collect();
    Json(found)
}

/// Responds with `status` and a plain-text body naming it.
async fn failing(Path(status): Path<u16>) -> Response {
    match StatusCode::from_u16(status) {
        Ok(code) => (code, format!("failure {status}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status").into_response(),
    }
}

async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let echoed = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(echoed)
}
