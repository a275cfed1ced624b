//! Parameter bindings and the argument binder.
//!
//! A [`ParameterBinding`] says where a handler argument comes from (path,
//! query string, header or body) and what it should be converted to. At
//! request time [`bind`] walks a route's bindings in order and produces the
//! [`Args`] the handler receives. Nothing reaches the handler unless every
//! binding succeeded.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::codec;
use crate::context::RequestContext;
use crate::error::{BindingError, CodecError};
use crate::media::MediaType;

// ── Sources and types ─────────────────────────────────────────────────────────

/// Where a parameter's raw value is read from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Source {
    Path,
    Query,
    Header,
    Body,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path   => "path",
            Self::Query  => "query",
            Self::Header => "header",
            Self::Body   => "body",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target type of a path, query or header parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamType {
    String,
    Int,
    UInt,
    Float,
    Bool,
}

impl ParamType {
    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int    => "integer",
            Self::UInt   => "unsigned integer",
            Self::Float  => "number",
            Self::Bool   => "boolean",
        }
    }

    /// Converts a raw string. `None` when it is not a valid value of this type.
    pub fn convert(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::Str(raw.to_owned())),
            Self::Int    => raw.parse().ok().map(Value::Int),
            Self::UInt   => raw.parse().ok().map(Value::UInt),
            Self::Float  => raw.parse().ok().map(Value::Float),
            Self::Bool   => match raw {
                "true" | "1"  => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _             => None,
            },
        }
    }
}

/// A bound simple parameter.
///
/// `Absent` marks an optional parameter that was not supplied and has no
/// declared default.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Absent,
}

/// Extraction of a concrete Rust type from a bound [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Int(i) => <$ty>::try_from(*i).ok(),
                    Value::UInt(u) => <$ty>::try_from(*u).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

integer_from_value!(i32, i64, u32, u64, usize);

// ── ParameterBinding ──────────────────────────────────────────────────────────

type BodyDecoder = fn(MediaType, &[u8]) -> Result<Box<dyn Any + Send>, CodecError>;

fn decode_boxed<T>(media: MediaType, bytes: &[u8]) -> Result<Box<dyn Any + Send>, CodecError>
where
    T: DeserializeOwned + Send + 'static,
{
    codec::decode::<T>(media, bytes).map(|v| Box::new(v) as Box<dyn Any + Send>)
}

#[derive(Clone, Copy)]
pub(crate) enum Target {
    Scalar(ParamType),
    Body { type_name: &'static str, decode: BodyDecoder },
}

/// How one handler argument is obtained from the request.
///
/// ```rust
/// use linear_web::{ParamType, ParameterBinding};
///
/// # #[derive(serde::Deserialize)] struct NewUser { name: String }
/// ParameterBinding::path("id", ParamType::UInt);
/// ParameterBinding::query("limit", ParamType::UInt).default_value("20");
/// ParameterBinding::header("x-tenant", ParamType::String).optional();
/// ParameterBinding::body::<NewUser>("user");
/// ```
#[derive(Clone)]
pub struct ParameterBinding {
    pub(crate) name: String,
    pub(crate) source: Source,
    pub(crate) target: Target,
    pub(crate) required: bool,
    pub(crate) default: Option<String>,
}

impl ParameterBinding {
    fn scalar(name: &str, source: Source, ty: ParamType) -> Self {
        Self {
            name: name.to_owned(),
            source,
            target: Target::Scalar(ty),
            required: true,
            default: None,
        }
    }

    /// A `{name}` variable of the route's path pattern.
    pub fn path(name: &str, ty: ParamType) -> Self {
        Self::scalar(name, Source::Path, ty)
    }

    /// A query-string parameter. The first occurrence wins.
    pub fn query(name: &str, ty: ParamType) -> Self {
        Self::scalar(name, Source::Query, ty)
    }

    /// A request header, looked up case-insensitively.
    pub fn header(name: &str, ty: ParamType) -> Self {
        Self::scalar(name, Source::Header, ty)
    }

    /// The request body, decoded as `T` in the request's content type.
    pub fn body<T>(name: &str) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self {
            name: name.to_owned(),
            source: Source::Body,
            target: Target::Body {
                type_name: std::any::type_name::<T>(),
                decode: decode_boxed::<T>,
            },
            required: true,
            default: None,
        }
    }

    /// Makes the parameter optional. An absent value binds as [`Value::Absent`].
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Makes the parameter optional with a fallback, converted like a
    /// supplied value. Ignored for body parameters.
    pub fn default_value(mut self, raw: &str) -> Self {
        self.required = false;
        self.default = Some(raw.to_owned());
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn source(&self) -> Source { self.source }
    pub fn is_required(&self) -> bool { self.required }
    pub fn default(&self) -> Option<&str> { self.default.as_deref() }

    /// The simple type, or `None` for a body parameter.
    pub fn param_type(&self) -> Option<ParamType> {
        match self.target {
            Target::Scalar(ty) => Some(ty),
            Target::Body { .. } => None,
        }
    }

    /// Name of the target type, for diagnostics.
    pub fn target_type(&self) -> &'static str {
        match self.target {
            Target::Scalar(ty) => ty.name(),
            Target::Body { type_name, .. } => type_name,
        }
    }
}

impl fmt::Debug for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target_type())
            .field("required", &self.required)
            .field("default", &self.default)
            .finish()
    }
}

// ── Args ──────────────────────────────────────────────────────────────────────

/// The bound arguments handed to a handler.
///
/// Values are kept per `(source, name)` in declaration order, so a path
/// variable and a query parameter may share a name without clobbering each
/// other.
#[derive(Default)]
pub struct Args {
    values: Vec<(Source, String, Value)>,
    body: Option<Box<dyn Any + Send>>,
}

impl Args {
    /// A simple parameter converted to `T`. `None` when it was not supplied
    /// or was bound to a different type. When several sources bind `name`,
    /// the first declared one answers.
    pub fn get<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_value)
    }

    /// A path variable converted to `T`.
    pub fn path<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value_from(Source::Path, name).and_then(T::from_value)
    }

    /// A query parameter converted to `T`.
    pub fn query<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value_from(Source::Query, name).and_then(T::from_value)
    }

    /// A header converted to `T`.
    pub fn header<T: FromValue>(&self, name: &str) -> Option<T> {
        self.value_from(Source::Header, name).and_then(T::from_value)
    }

    /// The raw bound value of the first binding named `name`.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(_, n, _)| n == name).map(|(_, _, v)| v)
    }

    /// The raw bound value for one source.
    pub fn value_from(&self, source: Source, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(s, n, _)| *s == source && n == name)
            .map(|(_, _, v)| v)
    }

    /// The decoded body, if the route binds one of type `T`.
    pub fn body<T: 'static>(&self) -> Option<&T> {
        self.body.as_ref()?.downcast_ref()
    }

    /// Moves the decoded body out.
    pub fn take_body<T: 'static>(&mut self) -> Option<T> {
        let body = self.body.take()?;
        match body.downcast::<T>() {
            Ok(b) => Some(*b),
            Err(other) => {
                self.body = Some(other);
                None
            }
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("values", &self.values)
            .field("body", &self.body.is_some())
            .finish()
    }
}

// ── Binder ────────────────────────────────────────────────────────────────────

/// Binds every parameter of a matched route.
///
/// `path_params` are the variables captured by the route table. Body bytes
/// are decoded in `body_media`, the request's content type.
pub fn bind(
    bindings: &[ParameterBinding],
    ctx: &RequestContext,
    path_params: &HashMap<String, String>,
    body_media: MediaType,
) -> Result<Args, BindingError> {
    let mut args = Args::default();
    let mut query: Option<HashMap<String, String>> = None;

    for binding in bindings {
        let name = &binding.name;
        match binding.target {
            Target::Body { decode, .. } => {
                if ctx.body().is_empty() {
                    if binding.required {
                        return Err(BindingError::Missing { name: name.clone() });
                    }
                    continue;
                }
                let value = decode(body_media, ctx.body())
                    .map_err(|reason| BindingError::Body { name: name.clone(), reason })?;
                args.body = Some(value);
            }
            Target::Scalar(ty) => {
                let raw = match binding.source {
                    Source::Path => path_params.get(name).cloned(),
                    Source::Query => query.get_or_insert_with(|| ctx.query_map()).get(name).cloned(),
                    Source::Header => ctx.header(name).map(str::to_owned),
                    Source::Body => None,
                };
                let value = match raw.or_else(|| binding.default.clone()) {
                    Some(raw) => ty.convert(&raw).ok_or_else(|| BindingError::Conversion {
                        name: name.clone(),
                        expected: ty.name(),
                    })?,
                    None if binding.required => {
                        return Err(BindingError::Missing { name: name.clone() });
                    }
                    None => Value::Absent,
                };
                args.values.push((binding.source, name.clone(), value));
            }
        }
    }

    Ok(args)
}
