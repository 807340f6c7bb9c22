//! Shared fixtures: the item service interface, a typed facade over it and
//! an executor that dispatches into an in-process axum router.

#![allow(dead_code)]

use axum::http;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt, TryStreamExt};
use reactive_client_core::{
    Arg, Body, Client, ClientError, DeclaredType, Executor, InterfaceDescriptor, MethodDescriptor,
    ParamSpec, RawResponse, Request,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateItem {
    pub name: String,
}

impl CreateItem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

pub fn item_api() -> InterfaceDescriptor {
    InterfaceDescriptor::new("ItemApi")
        .method(MethodDescriptor::get("list_items", "/items").returns(DeclaredType::multi("Item")))
        .method(MethodDescriptor::get("stream_items", "/items/stream").returns(DeclaredType::multi("Item")))
        .method(
            MethodDescriptor::get("get_item", "/items/{id}")
                .param(ParamSpec::variable("id"))
                .returns(DeclaredType::single("Item")),
        )
        .method(
            MethodDescriptor::post("create_item", "/items")
                .param(ParamSpec::body("item", DeclaredType::plain("CreateItem")))
                .returns(DeclaredType::single("Item")),
        )
        .method(
            MethodDescriptor::post("create_batch", "/items/batch")
                .param(ParamSpec::body("items", DeclaredType::multi("CreateItem")))
                .returns(DeclaredType::multi("Item")),
        )
        .method(
            MethodDescriptor::put("update_item", "/items/{id}")
                .param(ParamSpec::variable("id"))
                .param(ParamSpec::body("item", DeclaredType::plain("CreateItem")))
                .returns(DeclaredType::single("Item")),
        )
        .method(MethodDescriptor::delete("delete_item", "/items/{id}").param(ParamSpec::variable("id")))
        .method(
            MethodDescriptor::get("search", "/search")
                .param(ParamSpec::query("name").optional())
                .returns(DeclaredType::multi("Item")),
        )
        .method(
            MethodDescriptor::get("failing", "/failing/{status}")
                .param(ParamSpec::variable("status"))
                .returns(DeclaredType::multi("Item")),
        )
        .method(
            MethodDescriptor::get("echo_headers", "/echo/headers")
                .header("X-Tenant", "{tenant}")
                .param(ParamSpec::variable("tenant").optional())
                .returns(DeclaredType::single("Headers")),
        )
}

/// Typed view of a client built from `item_api`.
pub struct ItemApi {
    pub client: Client,
}

impl ItemApi {
    pub fn list_items(&self) -> BoxStream<'static, Result<Item, ClientError>> {
        self.client.call("list_items", Vec::new()).into_stream()
    }

    pub fn stream_items(&self) -> BoxStream<'static, Result<Item, ClientError>> {
        self.client.call("stream_items", Vec::new()).into_stream()
    }

    pub fn get_item(&self, id: u64) -> BoxFuture<'static, Result<Item, ClientError>> {
        self.client.call("get_item", vec![Arg::from(serde_json::json!(id))]).into_single()
    }

    pub fn create_item(&self, item: &CreateItem) -> BoxFuture<'static, Result<Item, ClientError>> {
        match Arg::new(item) {
            Ok(arg) => self.client.call("create_item", vec![arg]).into_single(),
            Err(e) => futures::future::ready(Err(e)).boxed(),
        }
    }

    pub fn create_batch(
        &self,
        items: BoxStream<'static, CreateItem>,
    ) -> BoxStream<'static, Result<Item, ClientError>> {
        self.client.call("create_batch", vec![Arg::stream(items)]).into_stream()
    }

    pub fn update_item(&self, id: u64, item: &CreateItem) -> BoxFuture<'static, Result<Item, ClientError>> {
        match Arg::new(item) {
            Ok(arg) => self
                .client
                .call("update_item", vec![Arg::from(serde_json::json!(id)), arg])
                .into_single(),
            Err(e) => futures::future::ready(Err(e)).boxed(),
        }
    }

    pub fn delete_item(&self, id: u64) -> BoxFuture<'static, Result<(), ClientError>> {
        self.client.call("delete_item", vec![Arg::from(serde_json::json!(id))]).into_empty()
    }

    pub fn search(&self, name: Option<&str>) -> BoxStream<'static, Result<Item, ClientError>> {
        let arg = name.map_or(Arg::Null, |name| Arg::from(serde_json::json!(name)));
        self.client.call("search", vec![arg]).into_stream()
    }

    pub fn failing(&self, status: u16) -> BoxStream<'static, Result<Item, ClientError>> {
        self.client.call("failing", vec![Arg::from(serde_json::json!(status))]).into_stream()
    }
}

/// Dispatches requests straight into an axum router, keeping both request
/// and response bodies streamed.
#[derive(Clone)]
pub struct RouterExecutor(pub axum::Router);

impl Executor for RouterExecutor {
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<RawResponse, ClientError>> {
        let router = self.0.clone();
        async move {
            let mut builder = http::Request::builder()
                .method(request.method.as_str())
                .uri(request.uri.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let body = match request.body {
                Body::Empty => axum::body::Body::empty(),
                Body::Bytes(bytes) => axum::body::Body::from(bytes),
                Body::Stream(chunks) => axum::body::Body::from_stream(chunks),
            };
            let request = builder.body(body).map_err(ClientError::transport)?;
            let response = router.oneshot(request).await.map_err(ClientError::transport)?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
                .collect();
            let body = response
                .into_body()
                .into_data_stream()
                .map_err(ClientError::transport)
                .boxed();
            Ok(RawResponse { status, headers, body })
        }
        .boxed()
    }
}

pub const ROUTER_BASE: &str = "http://router.test";
