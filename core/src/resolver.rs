//! Extraction and insertion functions resolved from declared types.
//!
//! # Design
//! Both resolvers run once per method while the client is built. They turn
//! a classified `ResponseType` or `BodyType` into a boxed function that the
//! method handler applies on every call, so no type inspection happens on
//! the call path.
//!
//! Extractors check the status before touching the body: 2xx responses are
//! decoded, anything else is handed to the error chain and surfaces as the
//! failure of the same future or stream.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde_json::Value;

use crate::codec::BodyCodec;
use crate::error::ClientError;
use crate::executor::ClientResponse;
use crate::http::Body;
use crate::invocation::Invocation;
use crate::template::Arg;
use crate::types::{BodyType, Cardinality, ResponseType};

/// Pending response handed from the executor to an extractor.
pub type ResponseFuture = BoxFuture<'static, Result<ClientResponse, ClientError>>;

/// Turns a pending response into the method's declared result shape.
pub type ResponseExtractor = Arc<dyn Fn(ResponseFuture) -> Invocation + Send + Sync>;

/// Turns the body argument into a request body.
pub type BodyInserter = Arc<dyn Fn(Arg, &dyn BodyCodec) -> Result<Body, ClientError> + Send + Sync>;

pub fn resolve_response(response_type: &ResponseType) -> ResponseExtractor {
    match response_type {
        ResponseType::Empty => empty_extractor(),
        ResponseType::SingleValue(type_name) => single_extractor(type_name.clone()),
        ResponseType::MultiValue(type_name) => multi_extractor(type_name.clone()),
    }
}

fn empty_extractor() -> ResponseExtractor {
    Arc::new(|response: ResponseFuture| {
        Invocation::Empty(
            async move {
                let response = response.await?;
                tracing::trace!(status = response.status(), "response received");
                if response.is_success() {
                    Ok(())
                } else {
                    Err(response.into_error().await)
                }
            }
            .boxed(),
        )
    })
}

fn single_extractor(type_name: String) -> ResponseExtractor {
    Arc::new(move |response: ResponseFuture| {
        let type_name = type_name.clone();
        Invocation::Single(
            async move {
                let response = response.await?;
                tracing::trace!(status = response.status(), "response received");
                if !response.is_success() {
                    return Err(response.into_error().await);
                }
                response.body_to_value(&type_name).await
            }
            .boxed(),
        )
    })
}

fn multi_extractor(type_name: String) -> ResponseExtractor {
    Arc::new(move |response: ResponseFuture| {
        let type_name = type_name.clone();
        let values = stream::once(response)
            .map(move |response| match response {
                Ok(response) if response.is_success() => {
                    tracing::trace!(status = response.status(), "streaming response received");
                    response.body_to_stream(&type_name)
                }
                Ok(response) => response.into_error_stream::<Value>(),
                Err(e) => stream::once(future::ready(Err(e))).boxed(),
            })
            .flatten()
            .boxed();
        Invocation::Multi(values)
    })
}

/// Build the body inserter for `body_type`; `param` names the body
/// parameter in argument errors.
pub fn resolve_body(body_type: &BodyType, param: &str) -> BodyInserter {
    match body_type {
        BodyType::Absent => {
            let insert: BodyInserter = Arc::new(|_: Arg, _: &dyn BodyCodec| Ok(Body::Empty));
            insert
        }
        BodyType::PlainObject(type_name) => plain_inserter(type_name.clone(), param.to_string()),
        BodyType::StreamingProducer(cardinality, type_name) => {
            producer_inserter(*cardinality, type_name.clone(), param.to_string())
        }
    }
}

fn plain_inserter(type_name: String, param: String) -> BodyInserter {
    Arc::new(move |arg: Arg, codec: &dyn BodyCodec| match arg {
        Arg::Null | Arg::Value(Value::Null) => Ok(Body::Empty),
        Arg::Value(value) => codec.encode(&type_name, &value).map(Body::Bytes),
        Arg::Stream(_) => Err(ClientError::InvalidArgument {
            name: param.clone(),
            reason: "body is declared as a plain object, not a producer",
        }),
    })
}

fn producer_inserter(cardinality: Cardinality, type_name: String, param: String) -> BodyInserter {
    Arc::new(move |arg: Arg, codec: &dyn BodyCodec| match arg {
        Arg::Null | Arg::Value(Value::Null) => Ok(Body::Empty),
        Arg::Stream(values) => Ok(Body::Stream(match cardinality {
            Cardinality::One => codec.encode_single(&type_name, values),
            Cardinality::Many => codec.encode_stream(&type_name, values),
        })),
        Arg::Value(_) => Err(ClientError::InvalidArgument {
            name: param.clone(),
            reason: "body is declared as a producer, not a plain object",
        }),
    })
}
