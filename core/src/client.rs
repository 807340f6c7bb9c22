//! Client construction and the method dispatch table.
//!
//! # Design
//! `ClientBuilder` collects codec, error-decoder and interceptor settings,
//! then `build` validates every interface method and creates one
//! `ClientMethodHandler` per method. Handlers live in a `Vec` indexed by
//! `MethodKey`; a name index resolves keys. Nothing is mutated after
//! `build`, so a `Client` can be shared freely across tasks.
//!
//! Custom error readers are registered before the default 4xx/5xx decoders
//! so that they can special-case individual statuses. Either default may be
//! swapped for another decoder without dropping the other one.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use futures::FutureExt;

use crate::codec::{BodyCodec, CodecConfig, JsonCodec};
use crate::descriptor::InterfaceDescriptor;
use crate::error::{ClientError, ConfigurationError};
use crate::error_decoder::{
    ClientErrorDecoder, DecoderErrorReader, ErrorDecoder, ErrorDecodingChain, ErrorReader,
    ServerErrorDecoder,
};
use crate::executor::Executor;
use crate::handler::ClientMethodHandler;
use crate::interceptor::{compose, RequestInterceptor};
use crate::invocation::Invocation;
use crate::metadata::{MethodMetadata, MethodMetadataFactory};
use crate::template::Arg;

/// Stable index of a method in a `Client`'s dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey(usize);

/// A generated client for one interface.
#[derive(Debug)]
pub struct Client {
    interface: String,
    handlers: Vec<ClientMethodHandler>,
    index: HashMap<String, MethodKey>,
}

impl Client {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Resolve a method name to its dispatch key.
    pub fn method(&self, name: &str) -> Option<MethodKey> {
        self.index.get(name).copied()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodMetadata> {
        self.handlers.iter().map(ClientMethodHandler::metadata)
    }

    /// Invoke the method behind `key`.
    pub fn invoke(&self, key: MethodKey, args: Vec<Arg>) -> Invocation {
        match self.handlers.get(key.0) {
            Some(handler) => handler.invoke(args),
            None => unknown_method(format!("#{}", key.0)),
        }
    }

    /// Invoke a method by name. An unknown name fails the returned
    /// single-value invocation with `ClientError::UnknownMethod`.
    pub fn call(&self, name: &str, args: Vec<Arg>) -> Invocation {
        match self.method(name) {
            Some(key) => self.invoke(key, args),
            None => unknown_method(name.to_string()),
        }
    }
}

fn unknown_method(name: String) -> Invocation {
    tracing::warn!(method = %name, "call to unknown method");
    Invocation::Single(future::ready(Err(ClientError::UnknownMethod(name))).boxed())
}

/// Configures and builds a `Client`.
pub struct ClientBuilder {
    register_defaults: bool,
    client_error_decoder: Arc<dyn ErrorReader>,
    server_error_decoder: Arc<dyn ErrorReader>,
    codec: Arc<dyn BodyCodec>,
    error_readers: Vec<Arc<dyn ErrorReader>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            register_defaults: true,
            client_error_decoder: Arc::new(DecoderErrorReader::new(ClientErrorDecoder)),
            server_error_decoder: Arc::new(DecoderErrorReader::new(ServerErrorDecoder)),
            codec: Arc::new(JsonCodec),
            error_readers: Vec::new(),
            interceptors: Vec::new(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client with default settings.
    pub fn defaults(
        interface: &InterfaceDescriptor,
        base_uri: &str,
        executor: impl Executor + 'static,
    ) -> Result<Client, ConfigurationError> {
        Self::new().build(interface, base_uri, executor)
    }

    /// Whether the 4xx and 5xx decoders are appended to the error chain.
    pub fn register_default_codecs(mut self, register: bool) -> Self {
        self.register_defaults = register;
        self
    }

    /// Replace the default 4xx decoder, keeping its place in the chain.
    pub fn client_error_decoder(mut self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.client_error_decoder = Arc::new(DecoderErrorReader::new(decoder));
        self
    }

    /// Replace the default 5xx decoder, keeping its place in the chain.
    pub fn server_error_decoder(mut self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.server_error_decoder = Arc::new(DecoderErrorReader::new(decoder));
        self
    }

    pub fn codec(mut self, codec: impl BodyCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn error_decoder(self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_reader(DecoderErrorReader::new(decoder))
    }

    pub fn error_reader(mut self, reader: impl ErrorReader + 'static) -> Self {
        self.error_readers.push(Arc::new(reader));
        self
    }

    /// Append an interceptor; interceptors run in the order they are added.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn build(
        self,
        interface: &InterfaceDescriptor,
        base_uri: &str,
        executor: impl Executor + 'static,
    ) -> Result<Client, ConfigurationError> {
        let metadata = MethodMetadataFactory::build(interface, base_uri)?;

        let mut chain = ErrorDecodingChain::new();
        for reader in self.error_readers {
            chain.push(reader);
        }
        if self.register_defaults {
            chain.push(self.client_error_decoder);
            chain.push(self.server_error_decoder);
        }
        let codecs = Arc::new(CodecConfig::new(self.codec, chain));
        let interceptor = compose(self.interceptors);
        let executor: Arc<dyn Executor> = Arc::new(executor);

        let mut handlers = Vec::with_capacity(metadata.len());
        let mut index = HashMap::with_capacity(metadata.len());
        for method in metadata {
            index.insert(method.name().to_string(), MethodKey(handlers.len()));
            handlers.push(ClientMethodHandler::new(
                method,
                Arc::clone(&executor),
                Arc::clone(&interceptor),
                Arc::clone(&codecs),
            ));
        }

        tracing::debug!(
            interface = %interface.name,
            base_uri,
            error_readers = codecs.error_chain().len(),
            "client built"
        );
        Ok(Client {
            interface: interface.name.clone(),
            handlers,
            index,
        })
    }
}
