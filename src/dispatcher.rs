//! Request dispatch.
//!
//! One call to [`Dispatcher::dispatch`] walks a request through
//! `matched → bound → invoked → serialized`. Any step can fail; every
//! failure becomes a structured [`ErrorBody`] in the negotiated content type
//! (JSON when negotiation never happened or itself failed). Nothing escapes
//! as an error or a panic.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, debug_span, error, warn};

use crate::binding;
use crate::codec;
use crate::context::RequestContext;
use crate::error::{DispatchError, HandlerError};
use crate::media::MediaType;
use crate::method::Method;
use crate::response::{DispatchResult, ErrorBody};
use crate::route::RouteDescriptor;
use crate::table::{Lookup, RouteTable};

/// Routes requests through a shared, immutable [`RouteTable`].
///
/// Cheap to clone; every clone reads the same table.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Produces the response for one request. Runs synchronously on the
    /// calling thread, handler included.
    pub fn dispatch(&self, ctx: &RequestContext) -> DispatchResult {
        let span = debug_span!("dispatch", method = ctx.method(), path = ctx.path());
        let _guard = span.enter();

        let mut media = MediaType::Json;
        match self.run(ctx, &mut media) {
            Ok(result) => {
                debug!(status = result.status().as_u16(), "sent");
                result
            }
            Err(e) => failure(&e, media),
        }
    }

    /// `media` is updated as soon as negotiation succeeds so failures after
    /// that point are reported in the client's format.
    fn run(&self, ctx: &RequestContext, media: &mut MediaType) -> Result<DispatchResult, DispatchError> {
        let not_found = || DispatchError::RouteNotFound {
            method: ctx.method().to_owned(),
            path: ctx.path().to_owned(),
        };

        let method: Method = ctx.method().parse().map_err(|_| not_found())?;
        let matched = match self.table.match_route(method, ctx.path(), ctx.accept()) {
            Lookup::Found(m) => m,
            Lookup::NotFound => return Err(not_found()),
            Lookup::NotAcceptable(_) => return Err(DispatchError::NotAcceptable),
            Lookup::Ambiguous => {
                return Err(DispatchError::RouteAmbiguous {
                    method: ctx.method().to_owned(),
                    path: ctx.path().to_owned(),
                });
            }
        };
        *media = matched.media;
        let route = matched.route;
        debug!(pattern = %route.pattern(), media = %matched.media, "matched");

        let body_media = request_media(ctx, route)?;
        let args = binding::bind(route.params(), ctx, &matched.params, body_media)?;
        debug!(?args, "bound");

        let value = catch_unwind(AssertUnwindSafe(|| route.handler.call(args)))
            .unwrap_or_else(|_| Err(HandlerError::new("handler panicked")))?;
        debug!("invoked");

        if route.status() == StatusCode::NO_CONTENT {
            return Ok(DispatchResult::new(route.status(), matched.media, Bytes::new()));
        }
        let body = value.encode(matched.media).map_err(DispatchError::Serialization)?;
        debug!(bytes = body.len(), "serialized");
        Ok(DispatchResult::new(route.status(), matched.media, body))
    }
}

/// The format of the request body. Only checked when the route binds a body
/// and the request carries one; an absent `content-type` means JSON.
fn request_media(ctx: &RequestContext, route: &RouteDescriptor) -> Result<MediaType, DispatchError> {
    if !route.binds_body() || ctx.body().is_empty() {
        return Ok(MediaType::Json);
    }
    let Some(raw) = ctx.content_type() else {
        return if route.consumes().contains(&MediaType::Json) {
            Ok(MediaType::Json)
        } else {
            Err(DispatchError::UnsupportedMediaType("(none)".to_owned()))
        };
    };
    MediaType::from_content_type(raw)
        .filter(|m| route.consumes().contains(m))
        .ok_or_else(|| DispatchError::UnsupportedMediaType(raw.to_owned()))
}

pub(crate) fn failure(e: &DispatchError, media: MediaType) -> DispatchResult {
    let status = e.status();
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %e, "dispatch failed");
    } else {
        warn!(status = status.as_u16(), error = %e, "request rejected");
    }

    let body = ErrorBody::from(e);
    match codec::encode(media, &body) {
        Ok(bytes) => DispatchResult::new(status, media, bytes),
        Err(codec_err) => {
            error!(error = %codec_err, "error body could not be encoded, falling back to json");
            let bytes = codec::encode(MediaType::Json, &body).unwrap_or_default();
            DispatchResult::new(status, MediaType::Json, bytes)
        }
    }
}
