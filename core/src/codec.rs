//! Body codecs and the codec configuration shared by every method.
//!
//! # Design
//! A `BodyCodec` turns dynamic `serde_json::Value`s into body bytes and
//! back, either whole or as a stream. The declared type name is passed
//! along so a codec may dispatch on it; `JsonCodec` only uses it in error
//! messages.
//!
//! Streaming decode accepts a top-level JSON array or a sequence of
//! whitespace-separated JSON values (NDJSON). `JsonSplitter` finds element
//! boundaries across arbitrary chunk splits so elements are emitted as soon
//! as their last byte arrives.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

use crate::error::ClientError;
use crate::error_decoder::ErrorDecodingChain;
use crate::http::BodyStream;

/// Dynamic values flowing in or out of a streaming body.
pub type ValueStream = BoxStream<'static, Result<Value, ClientError>>;

/// Serializer/deserializer for request and response bodies.
pub trait BodyCodec: Send + Sync {
    /// Value sent as `content-type` when a request carries a body.
    fn content_type(&self) -> &str;

    fn encode(&self, type_name: &str, value: &Value) -> Result<Bytes, ClientError>;

    /// Encode each element as it is produced, preserving order.
    fn encode_stream(&self, type_name: &str, values: ValueStream) -> BodyStream;

    /// Encode the only element of a single-value producer as a lone value.
    /// A second element fails the body with `ClientError::Encoding`.
    fn encode_single(&self, type_name: &str, values: ValueStream) -> BodyStream;

    fn decode(&self, type_name: &str, body: &[u8]) -> Result<Value, ClientError>;

    /// Decode elements incrementally as body chunks arrive.
    fn decode_stream(&self, type_name: &str, body: BodyStream) -> ValueStream;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn encode(&self, type_name: &str, value: &Value) -> Result<Bytes, ClientError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| ClientError::Encoding(format!("`{type_name}`: {e}")))
    }

    fn encode_stream(&self, type_name: &str, values: ValueStream) -> BodyStream {
        let type_name = type_name.to_string();
        let open = stream::once(async { Ok(Bytes::from_static(b"[")) });
        let elements = values.enumerate().map(
            move |(index, value): (usize, Result<Value, ClientError>)| -> Result<Bytes, ClientError> {
                let value = value?;
                let mut buf = if index == 0 { Vec::new() } else { vec![b','] };
                serde_json::to_writer(&mut buf, &value)
                    .map_err(|e| ClientError::Encoding(format!("`{type_name}`: {e}")))?;
                Ok(Bytes::from(buf))
            },
        );
        let close = stream::once(async { Ok(Bytes::from_static(b"]")) });
        open.chain(elements).chain(close).boxed()
    }

    fn encode_single(&self, type_name: &str, values: ValueStream) -> BodyStream {
        let type_name = type_name.to_string();
        values
            .take(2)
            .enumerate()
            .map(move |(index, value): (usize, Result<Value, ClientError>)| -> Result<Bytes, ClientError> {
                if index > 0 {
                    return Err(ClientError::Encoding(format!(
                        "`{type_name}`: single-value producer yielded more than one element"
                    )));
                }
                JsonCodec.encode(&type_name, &value?)
            })
            .boxed()
    }

    fn decode(&self, type_name: &str, body: &[u8]) -> Result<Value, ClientError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        parse_element(type_name, body)
    }

    fn decode_stream(&self, type_name: &str, body: BodyStream) -> ValueStream {
        let state = DecodeState {
            type_name: type_name.to_string(),
            body,
            splitter: JsonSplitter::default(),
            ready: VecDeque::new(),
            finished: false,
        };
        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.ready.pop_front() {
                    if item.is_err() {
                        state.finished = true;
                        state.ready.clear();
                    }
                    return Some((item, state));
                }
                if state.finished {
                    return None;
                }
                match state.body.next().await {
                    Some(Ok(chunk)) => {
                        let result = state.splitter.feed(&chunk);
                        state.accept(result);
                    }
                    Some(Err(e)) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                    None => {
                        state.finished = true;
                        let result = state.splitter.finish();
                        state.accept(result);
                    }
                }
            }
        })
        .boxed()
    }
}

struct DecodeState {
    type_name: String,
    body: BodyStream,
    splitter: JsonSplitter,
    ready: VecDeque<Result<Value, ClientError>>,
    finished: bool,
}

impl DecodeState {
    fn accept(&mut self, result: Result<Vec<Vec<u8>>, String>) {
        match result {
            Ok(elements) => {
                for raw in elements {
                    self.ready.push_back(parse_element(&self.type_name, &raw));
                }
            }
            Err(e) => self
                .ready
                .push_back(Err(ClientError::Decoding(format!("`{}`: {e}", self.type_name)))),
        }
    }
}

fn parse_element(type_name: &str, raw: &[u8]) -> Result<Value, ClientError> {
    serde_json::from_slice(raw).map_err(|e| ClientError::Decoding(format!("`{type_name}`: {e}")))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Framing {
    #[default]
    Undetermined,
    Array,
    Values,
    Closed,
}

/// What an array may accept next at the top level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Right after `[`: an element or `]`.
    #[default]
    First,
    /// After `,`: an element only.
    Element,
    /// After an element: `,` or `]`.
    Separator,
}

/// Incremental splitter of a JSON body into raw top-level elements.
#[derive(Debug, Default)]
struct JsonSplitter {
    framing: Framing,
    slot: Slot,
    buffer: Vec<u8>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonSplitter {
    fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, String> {
        let mut out = Vec::new();
        for &byte in chunk {
            self.push(byte, &mut out)?;
        }
        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, String> {
        if self.in_string || self.depth > 0 {
            return Err("truncated JSON element at end of body".to_string());
        }
        if self.framing == Framing::Array {
            return Err("unterminated JSON array at end of body".to_string());
        }
        let mut out = Vec::new();
        if !self.buffer.is_empty() {
            self.emit(&mut out);
        }
        Ok(out)
    }

    fn push(&mut self, byte: u8, out: &mut Vec<Vec<u8>>) -> Result<(), String> {
        if self.in_string {
            self.buffer.push(byte);
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
                if self.depth == 0 {
                    self.emit(out);
                }
            }
            return Ok(());
        }

        if self.depth > 0 {
            self.buffer.push(byte);
            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        self.emit(out);
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        // bare scalar (number, true, false, null) ends at the next delimiter
        if !self.buffer.is_empty() {
            if !is_delimiter(byte) {
                self.buffer.push(byte);
                return Ok(());
            }
            self.emit(out);
        }

        if byte.is_ascii_whitespace() {
            return Ok(());
        }
        match self.framing {
            Framing::Undetermined if byte == b'[' => {
                self.framing = Framing::Array;
                Ok(())
            }
            Framing::Undetermined => {
                self.framing = Framing::Values;
                self.begin(byte)
            }
            Framing::Array => match (byte, self.slot) {
                (b',', Slot::Separator) => {
                    self.slot = Slot::Element;
                    Ok(())
                }
                (b',', _) => Err("unexpected `,` in JSON array".to_string()),
                (b']', Slot::Element) => Err("trailing `,` before `]`".to_string()),
                (b']', _) => {
                    self.framing = Framing::Closed;
                    Ok(())
                }
                (_, Slot::Separator) => Err(format!("expected `,` or `]`, found `{}`", byte as char)),
                _ => self.begin(byte),
            },
            Framing::Values => self.begin(byte),
            Framing::Closed => Err(format!("unexpected `{}` after the closing `]`", byte as char)),
        }
    }

    fn begin(&mut self, byte: u8) -> Result<(), String> {
        match byte {
            b'{' | b'[' => self.depth = 1,
            b'"' => self.in_string = true,
            b'}' | b']' | b',' => return Err(format!("unexpected `{}`", byte as char)),
            _ => {}
        }
        self.buffer.push(byte);
        Ok(())
    }

    fn emit(&mut self, out: &mut Vec<Vec<u8>>) {
        if self.framing == Framing::Array {
            self.slot = Slot::Separator;
        }
        out.push(std::mem::take(&mut self.buffer));
    }
}

fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b',' | b']' | b'}')
}

/// Codec and error-decoder configuration, immutable once the client is built.
pub struct CodecConfig {
    codec: Arc<dyn BodyCodec>,
    error_chain: ErrorDecodingChain,
}

impl CodecConfig {
    pub fn new(codec: Arc<dyn BodyCodec>, error_chain: ErrorDecodingChain) -> Self {
        Self { codec, error_chain }
    }

    pub fn codec(&self) -> &dyn BodyCodec {
        self.codec.as_ref()
    }

    pub fn error_chain(&self) -> &ErrorDecodingChain {
        &self.error_chain
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("content_type", &self.codec.content_type())
            .field("error_chain", &self.error_chain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;

    fn chunks(parts: &[&'static str]) -> BodyStream {
        let parts: Vec<Result<Bytes, ClientError>> =
            parts.iter().copied().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
        stream::iter(parts).boxed()
    }

    async fn decode_all(parts: &[&'static str]) -> Result<Vec<Value>, ClientError> {
        JsonCodec.decode_stream("Item", chunks(parts)).try_collect().await
    }

    #[test]
    fn splitter_handles_elements_split_across_chunks() {
        let mut splitter = JsonSplitter::default();
        assert!(splitter.feed(b"[{\"id\":").unwrap().is_empty());
        let out = splitter.feed(b"1},{\"id\":2").unwrap();
        assert_eq!(out, vec![b"{\"id\":1}".to_vec()]);
        let out = splitter.feed(b"}]").unwrap();
        assert_eq!(out, vec![b"{\"id\":2}".to_vec()]);
        assert!(splitter.finish().unwrap().is_empty());
    }

    #[test]
    fn splitter_ignores_brackets_inside_strings() {
        let mut splitter = JsonSplitter::default();
        let out = splitter.feed(br#"[{"name":"a]b\"}"},"x,y"]"#).unwrap();
        assert_eq!(
            out,
            vec![br#"{"name":"a]b\"}"}"#.to_vec(), br#""x,y""#.to_vec()]
        );
    }

    #[test]
    fn splitter_emits_scalars_at_delimiters() {
        let mut splitter = JsonSplitter::default();
        assert_eq!(splitter.feed(b"[1, 22").unwrap(), vec![b"1".to_vec()]);
        assert_eq!(splitter.feed(b",true]").unwrap(), vec![b"22".to_vec(), b"true".to_vec()]);
    }

    #[test]
    fn splitter_rejects_data_after_array() {
        let mut splitter = JsonSplitter::default();
        assert!(splitter.feed(b"[1] 2").is_err());
    }

    #[test]
    fn splitter_rejects_missing_or_extra_commas() {
        for body in [
            &b"[{\"id\":1}{\"id\":2}]"[..],
            &b"[1,,2]"[..],
            &b"[,1]"[..],
            &b"[1 2]"[..],
            &b"[\"a\" \"b\"]"[..],
            &b"[1,]"[..],
        ] {
            let mut splitter = JsonSplitter::default();
            assert!(
                splitter.feed(body).is_err(),
                "accepted {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[tokio::test]
    async fn malformed_array_is_a_decoding_error() {
        let mut values = JsonCodec.decode_stream("Item", chunks(&["[{\"id\":1}", "{\"id\":2}]"]));
        assert_eq!(values.next().await.unwrap().unwrap(), json!({"id": 1}));
        assert!(matches!(values.next().await, Some(Err(ClientError::Decoding(_)))));
        assert!(values.next().await.is_none());
    }

    #[test]
    fn splitter_rejects_truncated_array() {
        let mut splitter = JsonSplitter::default();
        splitter.feed(b"[{\"id\":1}").unwrap();
        assert!(splitter.finish().is_err());
    }

    #[tokio::test]
    async fn decodes_chunked_array_in_order() {
        let values = decode_all(&["[{\"id\"", ":1},", "{\"id\":2}", "]"]).await.unwrap();
        assert_eq!(values, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn decodes_newline_delimited_values() {
        let values = decode_all(&["{\"id\":1}\n{\"id\"", ":2}\n"]).await.unwrap();
        assert_eq!(values, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn empty_body_decodes_to_no_elements() {
        assert!(decode_all(&[]).await.unwrap().is_empty());
        assert!(decode_all(&["[]"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_stops_after_first_error() {
        let mut values = JsonCodec.decode_stream("Item", chunks(&["[{\"id\":1},{\"id\":}", ",{\"id\":3}]"]));
        assert_eq!(values.next().await.unwrap().unwrap(), json!({"id": 1}));
        assert!(matches!(values.next().await, Some(Err(ClientError::Decoding(_)))));
        assert!(values.next().await.is_none());
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"[{\"id\":1},")),
            Err(ClientError::transport("reset")),
        ])
        .boxed();
        let mut values = JsonCodec.decode_stream("Item", body);
        assert_eq!(values.next().await.unwrap().unwrap(), json!({"id": 1}));
        assert!(matches!(values.next().await, Some(Err(ClientError::Transport(_)))));
        assert!(values.next().await.is_none());
    }

    #[tokio::test]
    async fn encode_stream_writes_a_json_array() {
        let values = stream::iter(vec![Ok(json!({"n": 1})), Ok(json!({"n": 2}))]).boxed();
        let parts: Vec<Bytes> = JsonCodec.encode_stream("Bar", values).try_collect().await.unwrap();
        assert_eq!(parts.len(), 4);
        let joined: Vec<u8> = parts.concat();
        let parsed: Value = serde_json::from_slice(&joined).unwrap();
        assert_eq!(parsed, json!([{"n": 1}, {"n": 2}]));
    }

    #[test]
    fn whole_body_decode() {
        assert_eq!(JsonCodec.decode("Item", b"{\"id\":42}").unwrap(), json!({"id": 42}));
        assert_eq!(JsonCodec.decode("Item", b"  ").unwrap(), Value::Null);
        assert!(matches!(
            JsonCodec.decode("Item", b"not json"),
            Err(ClientError::Decoding(_))
        ));
    }
}
