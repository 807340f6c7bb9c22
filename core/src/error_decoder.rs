//! Ordered chain of status-matched error decoders.
//!
//! # Design
//! An `ErrorReader` owns a status predicate and turns a whole non-2xx
//! response into a `ClientError`. An `ErrorDecoder` is the simpler form that
//! only sees the joined body bytes; `DecoderErrorReader` adapts one into a
//! reader. The chain is scanned in registration order and the first reader
//! whose predicate matches wins. A status no reader accepts is reported as
//! `ClientError::UnmatchedStatus`; it never falls through to a success
//! decode.
//!
//! The chain is only consulted after a non-2xx status has been observed,
//! and its result is always returned as a future or stream item.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use futures::FutureExt;

use crate::error::ClientError;
use crate::executor::ClientResponse;

/// Converts the joined body of a non-2xx response into an error.
pub trait ErrorDecoder: Send + Sync {
    fn can_decode(&self, status: u16) -> bool;

    fn decode(&self, status: u16, body: &[u8]) -> ClientError;
}

/// Converts a non-2xx response into an error, reading the body itself.
pub trait ErrorReader: Send + Sync {
    fn can_read(&self, status: u16) -> bool;

    fn read(&self, response: ClientResponse) -> BoxFuture<'static, ClientError>;
}

/// Maps any 4xx status to `ClientError::Client` with the body as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientErrorDecoder;

impl ErrorDecoder for ClientErrorDecoder {
    fn can_decode(&self, status: u16) -> bool {
        (400..500).contains(&status)
    }

    fn decode(&self, status: u16, body: &[u8]) -> ClientError {
        ClientError::Client {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Maps any 5xx status to `ClientError::Server` with the body as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerErrorDecoder;

impl ErrorDecoder for ServerErrorDecoder {
    fn can_decode(&self, status: u16) -> bool {
        (500..600).contains(&status)
    }

    fn decode(&self, status: u16, body: &[u8]) -> ClientError {
        ClientError::Server {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// Reads the full body, then hands it to an `ErrorDecoder`.
pub struct DecoderErrorReader<D> {
    decoder: Arc<D>,
}

impl<D: ErrorDecoder> DecoderErrorReader<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }
}

impl<D: ErrorDecoder + 'static> ErrorReader for DecoderErrorReader<D> {
    fn can_read(&self, status: u16) -> bool {
        self.decoder.can_decode(status)
    }

    fn read(&self, response: ClientResponse) -> BoxFuture<'static, ClientError> {
        let decoder = Arc::clone(&self.decoder);
        async move {
            let status = response.status();
            match response.into_bytes().await {
                Ok(body) => decoder.decode(status, &body),
                Err(e) => e,
            }
        }
        .boxed()
    }
}

/// Registration-ordered error readers; first match wins.
#[derive(Clone, Default)]
pub struct ErrorDecodingChain {
    readers: Vec<Arc<dyn ErrorReader>>,
}

impl ErrorDecodingChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, reader: impl ErrorReader + 'static) -> Self {
        self.readers.push(Arc::new(reader));
        self
    }

    pub fn with_decoder(self, decoder: impl ErrorDecoder + 'static) -> Self {
        self.with_reader(DecoderErrorReader::new(decoder))
    }

    pub(crate) fn push(&mut self, reader: Arc<dyn ErrorReader>) {
        self.readers.push(reader);
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// First reader, in registration order, that accepts `status`.
    pub fn select(&self, status: u16) -> Result<&dyn ErrorReader, ClientError> {
        self.readers
            .iter()
            .position(|r| r.can_read(status))
            .map(|index| {
                tracing::trace!(status, index, "selected error reader");
                self.readers[index].as_ref()
            })
            .ok_or_else(|| {
                tracing::warn!(status, "no error reader registered for status");
                ClientError::UnmatchedStatus { status }
            })
    }

    /// Decode `response` into the error for a single-value caller.
    pub fn to_single(&self, response: ClientResponse) -> BoxFuture<'static, ClientError> {
        match self.select(response.status()) {
            Ok(reader) => reader.read(response),
            Err(e) => future::ready(e).boxed(),
        }
    }

    /// Decode `response` into a stream that fails without emitting items.
    pub fn to_stream<T: Send + 'static>(
        &self,
        response: ClientResponse,
    ) -> BoxStream<'static, Result<T, ClientError>> {
        stream::once(self.to_single(response).map(Err)).boxed()
    }
}

impl fmt::Debug for ErrorDecodingChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDecodingChain")
            .field("readers", &self.readers.len())
            .finish()
    }
}
