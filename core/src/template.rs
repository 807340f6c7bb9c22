//! Request templates and their binding to call arguments.
//!
//! # Design
//! A `RequestTemplate` is built once per method and never changes. Binding
//! it to a call's arguments is a pure function: identical arguments always
//! produce an identical request. Placeholders are checked against the
//! declared parameters when the template is built, so binding can only fail
//! on the arguments themselves (wrong arity, null for a required value, a
//! stream where a value belongs).

use std::collections::HashMap;
use std::fmt;

use futures::stream::{BoxStream, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use serde_json::Value;

use crate::codec::{BodyCodec, ValueStream};
use crate::descriptor::ParamBinding;
use crate::error::ClientError;
use crate::http::{HttpMethod, Request};
use crate::resolver::BodyInserter;

/// Characters escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped inside a query key or value.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'`');

/// One call argument.
pub enum Arg {
    Null,
    Value(Value),
    /// An asynchronous producer, only valid for a streaming body parameter.
    Stream(ValueStream),
}

impl Arg {
    /// Serialize `value` into an argument.
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(Arg::Value)
            .map_err(|e| ClientError::Encoding(e.to_string()))
    }

    pub fn optional<T: Serialize>(value: Option<&T>) -> Result<Self, ClientError> {
        match value {
            Some(value) => Self::new(value),
            None => Ok(Arg::Null),
        }
    }

    /// Wrap a producer whose elements are streamed as the request body.
    pub fn stream<T>(producer: BoxStream<'static, T>) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Arg::Stream(
            producer
                .map(|item| serde_json::to_value(&item).map_err(|e| ClientError::Encoding(e.to_string())))
                .boxed(),
        )
    }

    fn is_null(&self) -> bool {
        matches!(self, Arg::Null | Arg::Value(Value::Null))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Null => f.write_str("Null"),
            Arg::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Arg::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A string with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`; `None` on unbalanced braces or an empty placeholder.
    pub fn parse(source: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find(is_brace) {
            if rest.as_bytes()[open] == b'}' {
                return None;
            }
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find(is_brace)?;
            if after.as_bytes()[close] == b'{' || close == 0 {
                return None;
            }
            segments.push(Segment::Placeholder(after[..close].trim().to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Some(Self { segments })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder; `None` if any lookup yields `None`.
    pub fn expand<F>(&self, mut lookup: F) -> Option<String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => out.push_str(&lookup(name)?),
            }
        }
        Some(out)
    }
}

/// Parameter slot recorded in a template, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParamSlot {
    pub(crate) name: String,
    pub(crate) kind: SlotKind,
    pub(crate) optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    Variable,
    Query,
    Header,
    Body,
}

impl From<&ParamBinding> for SlotKind {
    fn from(binding: &ParamBinding) -> Self {
        match binding {
            ParamBinding::Variable => SlotKind::Variable,
            ParamBinding::Query => SlotKind::Query,
            ParamBinding::Header => SlotKind::Header,
            ParamBinding::Body(_) => SlotKind::Body,
        }
    }
}

/// Immutable, argument-free description of one method's HTTP call.
pub struct RequestTemplate {
    method: HttpMethod,
    base_uri: String,
    path: Template,
    headers: Vec<(String, Template)>,
    params: Vec<ParamSlot>,
    inserter: BodyInserter,
}

impl RequestTemplate {
    pub(crate) fn new(
        method: HttpMethod,
        base_uri: String,
        path: Template,
        headers: Vec<(String, Template)>,
        params: Vec<ParamSlot>,
        inserter: BodyInserter,
    ) -> Self {
        Self {
            method,
            base_uri,
            path,
            headers,
            params,
            inserter,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Build the concrete request for one call.
    pub fn bind(&self, args: Vec<Arg>, codec: &dyn BodyCodec) -> Result<Request, ClientError> {
        if args.len() != self.params.len() {
            return Err(ClientError::ArgumentCount {
                expected: self.params.len(),
                actual: args.len(),
            });
        }

        let mut variables: HashMap<&str, Option<String>> = HashMap::new();
        let mut query: Vec<(&str, String)> = Vec::new();
        let mut direct_headers: Vec<(String, String)> = Vec::new();
        let mut body_arg = Arg::Null;

        for (slot, arg) in self.params.iter().zip(args) {
            if arg.is_null() && !slot.optional {
                return Err(ClientError::MissingArgument {
                    name: slot.name.clone(),
                });
            }
            if slot.kind == SlotKind::Body {
                body_arg = arg;
                continue;
            }
            let value = match arg {
                Arg::Stream(_) => {
                    return Err(ClientError::InvalidArgument {
                        name: slot.name.clone(),
                        reason: "streams are only accepted as a request body",
                    })
                }
                Arg::Null | Arg::Value(Value::Null) => None,
                Arg::Value(value) => Some(value),
            };
            match slot.kind {
                SlotKind::Variable => {
                    variables.insert(slot.name.as_str(), value.as_ref().map(display_value));
                }
                SlotKind::Query => match value {
                    Some(Value::Array(items)) => query.extend(
                        items
                            .iter()
                            .filter(|v| !v.is_null())
                            .map(|v| (slot.name.as_str(), display_value(v))),
                    ),
                    Some(value) => query.push((slot.name.as_str(), display_value(&value))),
                    None => {}
                },
                SlotKind::Header => {
                    if let Some(value) = value {
                        direct_headers.push((slot.name.clone(), display_value(&value)));
                    }
                }
                SlotKind::Body => {}
            }
        }

        let path = self
            .path
            .expand(|name| {
                let value = variables.get(name).cloned().flatten().unwrap_or_default();
                Some(utf8_percent_encode(&value, PATH_SEGMENT).to_string())
            })
            .unwrap_or_default();
        let mut uri = format!("{}{}", self.base_uri, path);
        if !query.is_empty() {
            let encoded: Vec<String> = query
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(k, QUERY_COMPONENT),
                        utf8_percent_encode(v, QUERY_COMPONENT)
                    )
                })
                .collect();
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&encoded.join("&"));
        }

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .expand(|placeholder| variables.get(placeholder).cloned().flatten())
                    .map(|value| (name.clone(), value))
            })
            .collect();
        headers.extend(direct_headers);

        let body = (self.inserter)(body_arg, codec)?;
        let mut request = Request {
            method: self.method,
            uri,
            headers,
            body,
        };
        if !request.body.is_empty() && request.header("content-type").is_none() {
            request
                .headers
                .push(("content-type".to_string(), codec.content_type().to_string()));
        }
        Ok(request)
    }
}

impl fmt::Debug for RequestTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTemplate")
            .field("method", &self.method)
            .field("base_uri", &self.base_uri)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn is_brace(c: char) -> bool {
    c == '{' || c == '}'
}

/// String form of an argument: strings unquoted, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use serde_json::json;

    use super::*;
    use crate::codec::JsonCodec;
    use crate::resolver::resolve_body;
    use crate::types::BodyType;

    fn slot(name: &str, kind: SlotKind, optional: bool) -> ParamSlot {
        ParamSlot {
            name: name.to_string(),
            kind,
            optional,
        }
    }

    fn template(path: &str, headers: &[(&str, &str)], params: Vec<ParamSlot>, body: BodyType) -> RequestTemplate {
        RequestTemplate::new(
            HttpMethod::Get,
            "http://localhost:3000".to_string(),
            Template::parse(path).unwrap(),
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), Template::parse(v).unwrap()))
                .collect(),
            params,
            resolve_body(&body, "body"),
        )
    }

    #[test]
    fn parse_splits_literals_and_placeholders() {
        let t = Template::parse("/items/{id}/tags/{tag}").unwrap();
        assert_eq!(t.placeholders().collect::<Vec<_>>(), vec!["id", "tag"]);
        assert_eq!(Template::parse("/plain").unwrap().placeholders().count(), 0);
    }

    #[test]
    fn parse_rejects_malformed_templates() {
        assert!(Template::parse("/items/{id").is_none());
        assert!(Template::parse("/items/id}").is_none());
        assert!(Template::parse("/items/{}").is_none());
        assert!(Template::parse("/items/{a{b}}").is_none());
    }

    #[test]
    fn binds_path_variable() {
        let t = template("/items/{id}", &[], vec![slot("id", SlotKind::Variable, false)], BodyType::Absent);
        let req = t.bind(vec![Arg::Value(json!(42))], &JsonCodec).unwrap();
        assert_eq!(req.uri, "http://localhost:3000/items/42");
        assert!(req.body.is_empty());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn path_values_are_percent_encoded() {
        let t = template("/items/{id}", &[], vec![slot("id", SlotKind::Variable, false)], BodyType::Absent);
        let req = t.bind(vec![Arg::Value(json!("a b/c"))], &JsonCodec).unwrap();
        assert_eq!(req.uri, "http://localhost:3000/items/a%20b%2Fc");
    }

    #[test]
    fn binding_is_deterministic() {
        let t = template(
            "/items/{id}",
            &[("X-Trace", "{trace}")],
            vec![
                slot("id", SlotKind::Variable, false),
                slot("trace", SlotKind::Variable, false),
                slot("limit", SlotKind::Query, false),
            ],
            BodyType::Absent,
        );
        let bind = || {
            t.bind(
                vec![Arg::Value(json!(7)), Arg::Value(json!("abc")), Arg::Value(json!(10))],
                &JsonCodec,
            )
            .unwrap()
        };
        let (a, b) = (bind(), bind());
        assert_eq!(a.uri, b.uri);
        assert_eq!(a.headers, b.headers);
        assert_eq!(a.uri, "http://localhost:3000/items/7?limit=10");
        assert_eq!(a.headers, vec![("X-Trace".to_string(), "abc".to_string())]);
    }

    #[test]
    fn required_null_is_rejected() {
        let t = template("/items/{id}", &[], vec![slot("id", SlotKind::Variable, false)], BodyType::Absent);
        let err = t.bind(vec![Arg::Null], &JsonCodec).unwrap_err();
        assert!(matches!(err, ClientError::MissingArgument { ref name } if name == "id"));
    }

    #[test]
    fn optional_nulls_are_omitted() {
        let t = template(
            "/search",
            &[("X-Tenant", "{tenant}")],
            vec![
                slot("tenant", SlotKind::Variable, true),
                slot("name", SlotKind::Query, true),
                slot("X-Token", SlotKind::Header, true),
            ],
            BodyType::Absent,
        );
        let req = t.bind(vec![Arg::Null, Arg::Null, Arg::Null], &JsonCodec).unwrap();
        assert_eq!(req.uri, "http://localhost:3000/search");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn query_arrays_repeat_the_key() {
        let t = template("/items?sort=asc", &[], vec![slot("tag", SlotKind::Query, false)], BodyType::Absent);
        let req = t.bind(vec![Arg::Value(json!(["a&b", "c"]))], &JsonCodec).unwrap();
        assert_eq!(req.uri, "http://localhost:3000/items?sort=asc&tag=a%26b&tag=c");
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let t = template("/items/{id}", &[], vec![slot("id", SlotKind::Variable, false)], BodyType::Absent);
        let err = t.bind(Vec::new(), &JsonCodec).unwrap_err();
        assert!(matches!(err, ClientError::ArgumentCount { expected: 1, actual: 0 }));
    }

    #[test]
    fn stream_in_value_slot_is_rejected() {
        let t = template("/items/{id}", &[], vec![slot("id", SlotKind::Variable, false)], BodyType::Absent);
        let producer = Arg::stream(stream::iter(vec![1u32]).boxed());
        let err = t.bind(vec![producer], &JsonCodec).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn plain_body_is_serialized_with_content_type() {
        let t = template(
            "/items",
            &[],
            vec![slot("body", SlotKind::Body, false)],
            BodyType::PlainObject("CreateItem".to_string()),
        );
        let req = t.bind(vec![Arg::Value(json!({"name": "widget"}))], &JsonCodec).unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_slice(&req.body.collect().await.unwrap()).unwrap();
        assert_eq!(body, json!({"name": "widget"}));
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let t = template(
            "/items",
            &[("Content-Type", "application/vnd.items+json")],
            vec![slot("body", SlotKind::Body, false)],
            BodyType::PlainObject("CreateItem".to_string()),
        );
        let req = t.bind(vec![Arg::Value(json!({}))], &JsonCodec).unwrap();
        let content_types: Vec<_> = req
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(req.header("content-type"), Some("application/vnd.items+json"));
    }

    #[test]
    fn arg_helpers() {
        assert!(matches!(Arg::optional::<u32>(None).unwrap(), Arg::Null));
        assert!(matches!(Arg::new(&5u32).unwrap(), Arg::Value(Value::Number(_))));
    }
}
