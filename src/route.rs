//! Route declarations.
//!
//! [`Route`] is the registration-time builder; [`RouteDescriptor`] is the
//! validated, immutable result the route table stores.
//!
//! ```rust
//! use linear_web::{Args, HandlerError, MediaType, ParamType, ParameterBinding, Route};
//! use http::StatusCode;
//!
//! Route::post("/users/{id}/tags")
//!     .consumes([MediaType::Json, MediaType::Xml])
//!     .produces([MediaType::Json, MediaType::Xml])
//!     .param(ParameterBinding::path("id", ParamType::UInt))
//!     .param(ParameterBinding::body::<Vec<String>>("tags"))
//!     .status(StatusCode::CREATED)
//!     .handler(|args: Args| Ok::<_, HandlerError>(args.get::<u64>("id")));
//! ```

use std::collections::HashSet;
use std::fmt;

use http::StatusCode;

use crate::binding::{ParameterBinding, Source, Target};
use crate::error::RegistrationError;
use crate::handler::{BoxedHandler, Handler};
use crate::media::MediaType;
use crate::method::Method;
use crate::pattern::{self, PathPattern};

/// A route under construction.
pub struct Route {
    method: Method,
    path: String,
    produces: Vec<MediaType>,
    consumes: Option<Vec<MediaType>>,
    params: Vec<ParameterBinding>,
    status: StatusCode,
    handler: Option<BoxedHandler>,
}

impl Route {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_owned(),
            produces: Vec::new(),
            consumes: None,
            params: Vec::new(),
            status: StatusCode::OK,
            handler: None,
        }
    }

    pub fn get(path: &str) -> Self { Self::new(Method::Get, path) }
    pub fn post(path: &str) -> Self { Self::new(Method::Post, path) }
    pub fn put(path: &str) -> Self { Self::new(Method::Put, path) }
    pub fn patch(path: &str) -> Self { Self::new(Method::Patch, path) }
    pub fn delete(path: &str) -> Self { Self::new(Method::Delete, path) }

    /// Response formats, most preferred first. Defaults to JSON.
    pub fn produces(mut self, types: impl IntoIterator<Item = MediaType>) -> Self {
        self.produces = types.into_iter().collect();
        self
    }

    /// Accepted request body formats. Defaults to JSON; an explicitly empty
    /// list means the route takes no body.
    pub fn consumes(mut self, types: impl IntoIterator<Item = MediaType>) -> Self {
        self.consumes = Some(types.into_iter().collect());
        self
    }

    /// Appends a parameter. Order is the order bindings are evaluated in.
    pub fn param(mut self, binding: ParameterBinding) -> Self {
        self.params.push(binding);
        self
    }

    /// Status sent on success. Defaults to `200 OK`; `204 No Content`
    /// suppresses the body.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.handler = Some(handler.into_boxed_handler());
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }

    /// Validates the declaration and freezes it under `prefix`.
    pub(crate) fn build(self, prefix: &str) -> Result<RouteDescriptor, RegistrationError> {
        let method = self.method;
        let pattern = PathPattern::parse(&pattern::join(prefix, &self.path))?;
        let raw = pattern.as_str().to_owned();

        let handler = self.handler.ok_or_else(|| RegistrationError::MissingHandler {
            method,
            pattern: raw.clone(),
        })?;

        let produces = dedup(self.produces);
        let produces = if produces.is_empty() { vec![MediaType::Json] } else { produces };
        let consumes = self.consumes.map_or_else(|| vec![MediaType::Json], dedup);

        let mut seen = HashSet::new();
        let mut bodies = 0;
        for binding in &self.params {
            let name = binding.name().to_owned();
            if !seen.insert((binding.source(), name.clone())) {
                return Err(RegistrationError::DuplicateBinding {
                    method,
                    pattern: raw,
                    name,
                    location: binding.source().as_str(),
                });
            }
            match binding.source() {
                Source::Path if !pattern.has_variable(&name) => {
                    return Err(RegistrationError::UnknownPathVariable { method, pattern: raw, name });
                }
                Source::Path if !binding.is_required() => {
                    return Err(RegistrationError::OptionalPathVariable { method, pattern: raw, name });
                }
                Source::Body => {
                    bodies += 1;
                    if bodies > 1 {
                        return Err(RegistrationError::MultipleBodies { method, pattern: raw });
                    }
                    if !method.permits_body() || consumes.is_empty() {
                        return Err(RegistrationError::BodyWithoutConsumes { method, pattern: raw, name });
                    }
                }
                _ => {}
            }
            if let (Target::Scalar(ty), Some(default)) = (binding.target, binding.default()) {
                if ty.convert(default).is_none() {
                    return Err(RegistrationError::InvalidDefault {
                        method,
                        pattern: raw,
                        name,
                        expected: ty.name(),
                    });
                }
            }
        }

        Ok(RouteDescriptor {
            method,
            pattern,
            produces,
            consumes,
            params: self.params,
            status: self.status,
            handler,
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A validated route. Immutable once built.
pub struct RouteDescriptor {
    method: Method,
    pattern: PathPattern,
    produces: Vec<MediaType>,
    consumes: Vec<MediaType>,
    params: Vec<ParameterBinding>,
    status: StatusCode,
    pub(crate) handler: BoxedHandler,
}

impl RouteDescriptor {
    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &PathPattern { &self.pattern }
    pub fn produces(&self) -> &[MediaType] { &self.produces }
    /// Empty when the route takes no body.
    pub fn consumes(&self) -> &[MediaType] { &self.consumes }
    pub fn params(&self) -> &[ParameterBinding] { &self.params }
    pub fn status(&self) -> StatusCode { self.status }

    pub(crate) fn binds_body(&self) -> bool {
        self.params.iter().any(|p| p.source() == Source::Body)
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .field("params", &self.params)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn dedup(types: Vec<MediaType>) -> Vec<MediaType> {
    let mut out = Vec::with_capacity(types.len());
    for t in types {
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
