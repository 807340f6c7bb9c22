//! Classification of declared response and body types.
//!
//! # Design
//! A method's declared return type decides how its response is consumed:
//! ignored (`Empty`), decoded once (`SingleValue`) or decoded element by
//! element (`MultiValue`). A body parameter's declared type decides how the
//! argument is written: not at all, serialized whole, or streamed from a
//! producer. Classification runs once per method while the client is built;
//! wrappers whose type argument is itself generic are rejected there.

use crate::descriptor::{DeclaredType, Shape};
use crate::error::ConfigurationError;

/// How a method's response is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseType {
    /// No value; completes once the status is known.
    Empty,
    /// Exactly one decoded instance of the named type.
    SingleValue(String),
    /// Zero or more decoded instances, in arrival order.
    MultiValue(String),
}

impl ResponseType {
    pub fn classify(method: &str, declared: &DeclaredType) -> Result<Self, ConfigurationError> {
        let unsupported = || ConfigurationError::UnsupportedReturnType {
            method: method.to_string(),
            declared: declared.to_string(),
        };
        match declared {
            DeclaredType::Void => Ok(ResponseType::Empty),
            DeclaredType::Plain(_) => Err(unsupported()),
            DeclaredType::Parameterized { raw, argument } => {
                reject_embedded_generic(method, declared, argument)?;
                match (raw, argument.as_ref()) {
                    (Shape::Single, DeclaredType::Void) => Ok(ResponseType::Empty),
                    (Shape::Single, DeclaredType::Plain(name)) => {
                        Ok(ResponseType::SingleValue(name.clone()))
                    }
                    (Shape::Multi, DeclaredType::Plain(name)) => {
                        Ok(ResponseType::MultiValue(name.clone()))
                    }
                    _ => Err(unsupported()),
                }
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResponseType::Empty => "empty",
            ResponseType::SingleValue(_) => "single",
            ResponseType::MultiValue(_) => "multi",
        }
    }
}

/// How a method's body argument is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyType {
    /// The method has no body parameter.
    Absent,
    /// The argument is serialized as one body.
    PlainObject(String),
    /// The argument is a producer whose elements are streamed as the body.
    StreamingProducer(Cardinality, String),
}

/// How many elements a producer body argument may yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one element, written as a lone value.
    One,
    /// Any number of elements, written as an array.
    Many,
}

impl BodyType {
    pub fn classify(
        method: &str,
        declared: Option<&DeclaredType>,
    ) -> Result<Self, ConfigurationError> {
        let Some(declared) = declared else {
            return Ok(BodyType::Absent);
        };
        let unsupported = || ConfigurationError::UnsupportedBodyType {
            method: method.to_string(),
            declared: declared.to_string(),
        };
        match declared {
            DeclaredType::Void => Err(unsupported()),
            DeclaredType::Plain(name) => Ok(BodyType::PlainObject(name.clone())),
            DeclaredType::Parameterized { raw, argument } => {
                reject_embedded_generic(method, declared, argument)?;
                match (raw, argument.as_ref()) {
                    (Shape::Single, DeclaredType::Plain(name)) => {
                        Ok(BodyType::StreamingProducer(Cardinality::One, name.clone()))
                    }
                    (Shape::Multi, DeclaredType::Plain(name)) => {
                        Ok(BodyType::StreamingProducer(Cardinality::Many, name.clone()))
                    }
                    _ => Err(unsupported()),
                }
            }
        }
    }
}

fn reject_embedded_generic(
    method: &str,
    declared: &DeclaredType,
    argument: &DeclaredType,
) -> Result<(), ConfigurationError> {
    if argument.is_parameterized() {
        return Err(ConfigurationError::EmbeddedGenericType {
            method: method.to_string(),
            declared: declared.to_string(),
        });
    }
    Ok(())
}
