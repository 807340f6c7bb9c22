//! The executor seam and the response handle built on top of it.
//!
//! # Design
//! The executor is the only component that performs I/O. It receives a
//! fully bound and intercepted `Request` and resolves to a `RawResponse`
//! whose body is still an unread chunk stream. The client wraps that into a
//! `ClientResponse`, which knows the shared `CodecConfig` and can decode the
//! body as one value, as a stream of values, or hand it to the error chain.
//!
//! Dropping the future returned by `Executor::execute` must abort the
//! exchange; the client never detaches it.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::FutureExt;
use serde_json::Value;

use crate::codec::{CodecConfig, ValueStream};
use crate::error::ClientError;
use crate::http::{find_header, join_chunks, BodyStream, RawResponse, Request};

/// Sends requests over some transport.
pub trait Executor: Send + Sync {
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<RawResponse, ClientError>>;
}

/// Wraps an async closure as an `Executor`.
pub struct FnExecutor<F>(F);

/// Build an executor from `Fn(Request) -> impl Future<Output = Result<RawResponse, ClientError>>`.
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse, ClientError>> + Send + 'static,
{
    FnExecutor(f)
}

impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawResponse, ClientError>> + Send + 'static,
{
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<RawResponse, ClientError>> {
        (self.0)(request).boxed()
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, request: Request) -> BoxFuture<'static, Result<RawResponse, ClientError>> {
        (**self).execute(request)
    }
}

/// A response handle: status and headers are available, the body is unread.
pub struct ClientResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: BodyStream,
    codecs: Arc<CodecConfig>,
}

impl ClientResponse {
    pub fn new(raw: RawResponse, codecs: Arc<CodecConfig>) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            codecs,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Read the whole body.
    pub async fn into_bytes(self) -> Result<Bytes, ClientError> {
        join_chunks(self.body).await
    }

    /// Wait for the full body, then decode it once as `type_name`.
    pub fn body_to_value(self, type_name: &str) -> BoxFuture<'static, Result<Value, ClientError>> {
        let type_name = type_name.to_string();
        async move {
            let codecs = Arc::clone(&self.codecs);
            let bytes = self.into_bytes().await?;
            codecs.codec().decode(&type_name, &bytes)
        }
        .boxed()
    }

    /// Decode the body element by element as chunks arrive.
    pub fn body_to_stream(self, type_name: &str) -> ValueStream {
        self.codecs.codec().decode_stream(type_name, self.body)
    }

    /// Convert a non-2xx response into the error chosen by the error chain.
    pub fn into_error(self) -> BoxFuture<'static, ClientError> {
        let codecs = Arc::clone(&self.codecs);
        codecs.error_chain().to_single(self)
    }

    /// Same as `into_error`, delivered as a stream that fails without items.
    pub fn into_error_stream<T: Send + 'static>(self) -> BoxStream<'static, Result<T, ClientError>> {
        let codecs = Arc::clone(&self.codecs);
        codecs.error_chain().to_stream(self)
    }
}

impl std::fmt::Debug for ClientResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
