//! Declarative, non-blocking HTTP client engine.
//!
//! # Overview
//! An interface is described as data (`InterfaceDescriptor`): each method
//! names an HTTP verb, a path template, header templates, its parameters and
//! its declared return type. `ClientBuilder` validates the description once
//! and produces a `Client` whose methods return immediately with an
//! `Invocation`: a future for zero or one value, or a stream for many.
//!
//! # Design
//! - The network is behind the `Executor` trait; the engine itself never
//!   performs I/O, so any transport (or an in-process router) can back it.
//! - Return and body types are classified while the client is built, and
//!   every method gets pre-resolved extraction and insertion functions.
//!   Nothing is inspected on the call path.
//! - Non-2xx responses go through an ordered `ErrorDecodingChain`; the
//!   first reader that accepts the status produces the error.
//! - Streamed bodies are encoded and decoded incrementally with the JSON
//!   codec, element by element, in both directions.

pub mod client;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod error_decoder;
pub mod executor;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod invocation;
pub mod metadata;
pub mod resolver;
pub mod template;
pub mod types;

pub use client::{Client, ClientBuilder, MethodKey};
pub use codec::{BodyCodec, CodecConfig, JsonCodec, ValueStream};
pub use descriptor::{DeclaredType, InterfaceDescriptor, MethodDescriptor, ParamBinding, ParamSpec, Shape};
pub use error::{BoxError, ClientError, ConfigurationError};
pub use error_decoder::{
    ClientErrorDecoder, DecoderErrorReader, ErrorDecoder, ErrorDecodingChain, ErrorReader,
    ServerErrorDecoder,
};
pub use executor::{executor_fn, ClientResponse, Executor};
pub use handler::ClientMethodHandler;
pub use http::{Body, BodyStream, HttpMethod, RawResponse, Request};
pub use interceptor::{interceptor_fn, NoopInterceptor, RequestInterceptor};
pub use invocation::Invocation;
pub use metadata::{MethodMetadata, MethodMetadataFactory};
pub use template::{Arg, RequestTemplate};
pub use types::{BodyType, Cardinality, ResponseType};
