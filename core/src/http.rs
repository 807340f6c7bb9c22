//! HTTP transport types exchanged with the executor.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The core
//! builds `Request` values from method templates and hands them to an
//! external `Executor`; the executor answers with a `RawResponse` whose body
//! is a stream of byte chunks in arrival order. Nothing here touches the
//! network.
//!
//! Headers are kept as an ordered `Vec` of owned pairs so that a bound
//! request is fully deterministic for identical arguments.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::ClientError;

/// Byte chunks of a request or response body, in transport order.
pub type BodyStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body produced by a body inserter.
pub enum Body {
    /// No body is sent.
    Empty,
    /// The whole body, already serialized.
    Bytes(Bytes),
    /// A body streamed chunk by chunk, e.g. from a streaming producer argument.
    Stream(BodyStream),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Join every chunk of the body into one buffer.
    ///
    /// Executors that cannot stream request bodies use this to fall back to
    /// a single write.
    pub async fn collect(self) -> Result<Bytes, ClientError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(stream) => join_chunks(stream).await,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A concrete, call-specific HTTP request.
///
/// Built by binding a `RequestTemplate` to call arguments, then passed
/// through the interceptor chain and handed to the executor, which consumes
/// it.
#[derive(Debug)]
pub struct Request {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Request {
    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Replace every value of `name` with `value`, or append it.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }
}

/// An HTTP response as returned by the executor, before any decoding.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BodyStream,
}

impl RawResponse {
    /// A response whose body arrives as one chunk.
    pub fn from_bytes(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self::from_chunks(status, headers, vec![body.into()])
    }

    /// A response whose body arrives as the given chunks, in order.
    pub fn from_chunks(status: u16, headers: Vec<(String, String)>, chunks: Vec<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: stream::iter(chunks.into_iter().map(Ok)).boxed(),
        }
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub(crate) async fn join_chunks(stream: BodyStream) -> Result<Bytes, ClientError> {
    stream
        .try_fold(BytesMut::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .map(BytesMut::freeze)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request {
            method: HttpMethod::Get,
            uri: "http://localhost:3000/items".to_string(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: Body::Empty,
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request();
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn set_header_replaces_existing_value() {
        let mut req = request();
        req.set_header("ACCEPT", "text/plain");
        assert_eq!(req.headers, vec![("ACCEPT".to_string(), "text/plain".to_string())]);
    }

    #[test]
    fn method_display_is_uppercase() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(HttpMethod::Options.as_str(), "OPTIONS");
    }

    #[tokio::test]
    async fn stream_body_collects_in_order() {
        let chunks = vec![Bytes::from_static(b"[1,"), Bytes::from_static(b"2]")];
        let body = Body::Stream(stream::iter(chunks.into_iter().map(Ok)).boxed());
        assert_eq!(body.collect().await.unwrap(), Bytes::from_static(b"[1,2]"));
    }

    #[tokio::test]
    async fn empty_body_collects_to_nothing() {
        assert!(Body::Empty.collect().await.unwrap().is_empty());
    }
}
