//! Per-method metadata derived from an interface descriptor.
//!
//! # Design
//! `MethodMetadataFactory` validates every method eagerly: placeholders must
//! name a variable parameter, at most one parameter may claim the body, and
//! return and body types must classify. Any failure aborts building the
//! whole client with a `ConfigurationError`. The resulting `MethodMetadata`
//! is immutable and shared read-only by every call.

use std::collections::HashSet;

use crate::descriptor::{InterfaceDescriptor, MethodDescriptor, ParamBinding};
use crate::error::ConfigurationError;
use crate::resolver::resolve_body;
use crate::template::{ParamSlot, RequestTemplate, SlotKind, Template};
use crate::types::{BodyType, ResponseType};

/// Everything needed to call one interface method.
#[derive(Debug)]
pub struct MethodMetadata {
    name: String,
    template: RequestTemplate,
    body_type: BodyType,
    response_type: ResponseType,
}

impl MethodMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn body_type(&self) -> &BodyType {
        &self.body_type
    }

    pub fn response_type(&self) -> &ResponseType {
        &self.response_type
    }
}

/// Builds `MethodMetadata` from method descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodMetadataFactory;

impl MethodMetadataFactory {
    /// One `MethodMetadata` per declared method, in declaration order.
    pub fn build(
        interface: &InterfaceDescriptor,
        base_uri: &str,
    ) -> Result<Vec<MethodMetadata>, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut metadata = Vec::with_capacity(interface.methods.len());
        for method in &interface.methods {
            if !seen.insert(method.name.as_str()) {
                return Err(ConfigurationError::DuplicateMethod {
                    interface: interface.name.clone(),
                    method: method.name.clone(),
                });
            }
            metadata.push(Self::build_method(method, base_uri)?);
        }
        tracing::debug!(
            interface = %interface.name,
            methods = metadata.len(),
            "built interface metadata"
        );
        Ok(metadata)
    }

    pub fn build_method(
        method: &MethodDescriptor,
        base_uri: &str,
    ) -> Result<MethodMetadata, ConfigurationError> {
        let name = method.name.as_str();

        let mut param_names = HashSet::new();
        for param in &method.params {
            if !param_names.insert(param.name.as_str()) {
                return Err(ConfigurationError::DuplicateParameter {
                    method: name.to_string(),
                    name: param.name.clone(),
                });
            }
        }

        let mut body_params = method.params.iter().filter_map(|p| match &p.binding {
            ParamBinding::Body(declared) => Some((p.name.as_str(), declared)),
            _ => None,
        });
        let body_param = body_params.next();
        if body_params.next().is_some() {
            return Err(ConfigurationError::MultipleBodyParameters {
                method: name.to_string(),
            });
        }

        let variables: HashSet<&str> = method
            .params
            .iter()
            .filter(|p| p.binding == ParamBinding::Variable)
            .map(|p| p.name.as_str())
            .collect();
        let parse = |source: &str| -> Result<Template, ConfigurationError> {
            let template = Template::parse(source).ok_or_else(|| ConfigurationError::MalformedTemplate {
                method: name.to_string(),
                template: source.to_string(),
            })?;
            if let Some(unknown) = template.placeholders().find(|p| !variables.contains(p)) {
                return Err(ConfigurationError::UnknownPlaceholder {
                    method: name.to_string(),
                    placeholder: unknown.to_string(),
                });
            }
            Ok(template)
        };

        let path = if method.path.starts_with('/') || method.path.is_empty() {
            parse(&method.path)?
        } else {
            parse(&format!("/{}", method.path))?
        };
        let headers = method
            .headers
            .iter()
            .map(|(header, value)| parse(value).map(|template| (header.clone(), template)))
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        let referenced: HashSet<&str> = path
            .placeholders()
            .chain(headers.iter().flat_map(|(_, t)| t.placeholders()))
            .collect();
        for unused in variables.difference(&referenced) {
            tracing::warn!(method = name, param = *unused, "variable parameter is never referenced");
        }

        let response_type = ResponseType::classify(name, &method.returns)?;
        let body_type = BodyType::classify(name, body_param.map(|(_, declared)| declared))?;
        let inserter = resolve_body(&body_type, body_param.map_or("", |(param, _)| param));

        let params = method
            .params
            .iter()
            .map(|p| ParamSlot {
                name: p.name.clone(),
                kind: SlotKind::from(&p.binding),
                optional: p.optional,
            })
            .collect();
        let template = RequestTemplate::new(
            method.method,
            base_uri.trim_end_matches('/').to_string(),
            path,
            headers,
            params,
            inserter,
        );

        tracing::debug!(
            method = name,
            http_method = %method.method,
            path = %method.path,
            response = response_type.kind(),
            "built method metadata"
        );
        Ok(MethodMetadata {
            name: name.to_string(),
            template,
            body_type,
            response_type,
        })
    }
}
