//! Declarative description of a service interface.
//!
//! # Design
//! Whatever attaches HTTP verbs and paths to interface methods (a macro, a
//! hand-written table, generated code) produces these descriptors; the
//! metadata factory consumes them. They are plain data and perform no
//! validation of their own.
//!
//! Generic return and parameter shapes are written out explicitly as a
//! `DeclaredType` tree instead of being inspected at runtime.

use std::fmt;

use crate::http::HttpMethod;

/// Raw wrapper of a parameterized type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Asynchronous single value (zero or one element).
    Single,
    /// Asynchronous sequence of values.
    Multi,
    /// Any other generic container, e.g. `Vec` or `HashMap`.
    Other(String),
}

/// A declared return or parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Void,
    Plain(String),
    Parameterized { raw: Shape, argument: Box<DeclaredType> },
}

impl DeclaredType {
    pub fn plain(name: impl Into<String>) -> Self {
        DeclaredType::Plain(name.into())
    }

    /// `Single<name>`.
    pub fn single(name: impl Into<String>) -> Self {
        Self::wrap(Shape::Single, Self::plain(name))
    }

    /// `Multi<name>`.
    pub fn multi(name: impl Into<String>) -> Self {
        Self::wrap(Shape::Multi, Self::plain(name))
    }

    pub fn wrap(raw: Shape, argument: DeclaredType) -> Self {
        DeclaredType::Parameterized {
            raw,
            argument: Box::new(argument),
        }
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, DeclaredType::Parameterized { .. })
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Void => f.write_str("()"),
            DeclaredType::Plain(name) => f.write_str(name),
            DeclaredType::Parameterized { raw, argument } => {
                let raw = match raw {
                    Shape::Single => "Single",
                    Shape::Multi => "Multi",
                    Shape::Other(name) => name.as_str(),
                };
                write!(f, "{raw}<{argument}>")
            }
        }
    }
}

/// Where a parameter's value goes in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamBinding {
    /// Fills `{name}` placeholders in the path and header templates.
    Variable,
    /// Appended to the query string as `name=value`.
    Query,
    /// Sent as the header `name: value`.
    Header,
    /// The request body, with its declared type.
    Body(DeclaredType),
}

/// One declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub binding: ParamBinding,
    /// Null is accepted and the value is left out instead of rejected.
    pub optional: bool,
}

impl ParamSpec {
    fn new(name: impl Into<String>, binding: ParamBinding) -> Self {
        Self {
            name: name.into(),
            binding,
            optional: false,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::new(name, ParamBinding::Variable)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamBinding::Query)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ParamBinding::Header)
    }

    pub fn body(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self::new(name, ParamBinding::Body(declared))
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Raw description of one interface method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<ParamSpec>,
    pub returns: DeclaredType,
}

impl MethodDescriptor {
    /// A method with no parameters, no headers and a void return type.
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            headers: Vec::new(),
            params: Vec::new(),
            returns: DeclaredType::Void,
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get, path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Post, path)
    }

    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Put, path)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Delete, path)
    }

    /// Add a header whose value may contain `{name}` placeholders.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, declared: DeclaredType) -> Self {
        self.returns = declared;
        self
    }
}

/// All methods of one service interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}
