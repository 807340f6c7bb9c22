//! The asynchronous result of invoking a client method.
//!
//! # Design
//! Every method call returns immediately with an `Invocation` whose variant
//! follows the method's declared response type. Success values and errors
//! travel through the same future or stream, so callers handle failures
//! once whether the method yields nothing, one value or many.
//!
//! Values are dynamic `serde_json::Value`s; the `into_*` adapters convert
//! them into caller types and report mismatches as `ClientError::Decoding`.

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::codec::ValueStream;
use crate::error::ClientError;
use crate::types::ResponseType;

/// Pending result of one method call.
pub enum Invocation {
    /// Completes once the exchange is over; no value.
    Empty(BoxFuture<'static, Result<(), ClientError>>),
    /// Completes with one decoded value.
    Single(BoxFuture<'static, Result<Value, ClientError>>),
    /// Yields decoded values in arrival order.
    Multi(ValueStream),
}

impl Invocation {
    /// An invocation of the given shape that fails with `error`.
    pub fn failed(response_type: &ResponseType, error: ClientError) -> Self {
        match response_type {
            ResponseType::Empty => Invocation::Empty(future::ready(Err(error)).boxed()),
            ResponseType::SingleValue(_) => Invocation::Single(future::ready(Err(error)).boxed()),
            ResponseType::MultiValue(_) => {
                Invocation::Multi(stream::once(future::ready(Err(error))).boxed())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Invocation::Empty(_) => "empty",
            Invocation::Single(_) => "single",
            Invocation::Multi(_) => "multi",
        }
    }

    /// Wait for completion, discarding any values.
    pub fn into_empty(self) -> BoxFuture<'static, Result<(), ClientError>> {
        match self {
            Invocation::Empty(fut) => fut,
            Invocation::Single(fut) => fut.map(|r| r.map(drop)).boxed(),
            Invocation::Multi(values) => values.try_for_each(|_| future::ready(Ok(()))).boxed(),
        }
    }

    /// The single value, converted to `T`.
    pub fn into_single<T>(self) -> BoxFuture<'static, Result<T, ClientError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self {
            Invocation::Single(fut) => fut.map(|r| r.and_then(convert)).boxed(),
            other => {
                let actual = other.kind();
                future::ready(Err(ClientError::ShapeMismatch {
                    expected: "single",
                    actual,
                }))
                .boxed()
            }
        }
    }

    /// Every value, converted to `T`, in arrival order. A single-value
    /// method yields at most one element.
    pub fn into_stream<T>(self) -> BoxStream<'static, Result<T, ClientError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self {
            Invocation::Multi(values) => values.map(|r| r.and_then(convert)).boxed(),
            Invocation::Single(fut) => stream::once(fut.map(|r| r.and_then(convert))).boxed(),
            Invocation::Empty(_) => stream::once(future::ready(Err(ClientError::ShapeMismatch {
                expected: "multi",
                actual: "empty",
            })))
            .boxed(),
        }
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invocation::{}(..)", self.kind())
    }
}

fn convert<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::Decoding(e.to_string()))
}
