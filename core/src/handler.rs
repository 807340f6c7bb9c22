//! Per-method call handler.
//!
//! # Design
//! A `ClientMethodHandler` binds one method's immutable metadata to the
//! shared executor, interceptor chain and codec configuration. `invoke`
//! binds the template, runs the interceptors, hands the request to the
//! executor and returns the extractor's result without awaiting anything.
//! Handlers hold no per-call state and are safe to share across tasks.

use std::sync::Arc;

use futures::FutureExt;

use crate::codec::CodecConfig;
use crate::executor::{ClientResponse, Executor};
use crate::interceptor::RequestInterceptor;
use crate::invocation::Invocation;
use crate::metadata::MethodMetadata;
use crate::resolver::{resolve_response, ResponseExtractor};
use crate::template::Arg;

pub struct ClientMethodHandler {
    metadata: MethodMetadata,
    executor: Arc<dyn Executor>,
    interceptor: Arc<dyn RequestInterceptor>,
    codecs: Arc<CodecConfig>,
    extractor: ResponseExtractor,
}

impl ClientMethodHandler {
    pub fn new(
        metadata: MethodMetadata,
        executor: Arc<dyn Executor>,
        interceptor: Arc<dyn RequestInterceptor>,
        codecs: Arc<CodecConfig>,
    ) -> Self {
        let extractor = resolve_response(metadata.response_type());
        Self {
            metadata,
            executor,
            interceptor,
            codecs,
            extractor,
        }
    }

    pub fn metadata(&self) -> &MethodMetadata {
        &self.metadata
    }

    pub fn invoke(&self, args: Vec<Arg>) -> Invocation {
        let mut request = match self.metadata.template().bind(args, self.codecs.codec()) {
            Ok(request) => request,
            Err(e) => return Invocation::failed(self.metadata.response_type(), e),
        };
        self.interceptor.intercept(&mut request);
        tracing::debug!(
            method = self.metadata.name(),
            http_method = %request.method,
            uri = %request.uri,
            "dispatching request"
        );

        let codecs = Arc::clone(&self.codecs);
        let response = self
            .executor
            .execute(request)
            .map(move |raw| raw.map(|raw| ClientResponse::new(raw, codecs)))
            .boxed();
        (self.extractor)(response)
    }
}

impl std::fmt::Debug for ClientMethodHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMethodHandler")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
