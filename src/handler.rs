//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! Every route holds a handler of a *different* concrete type, yet the route
//! table keeps them all in one `Vec<RouteDescriptor>`. Each handler is hidden
//! behind a trait object (`dyn ErasedHandler`) so they can be stored
//! uniformly. Its return value gets the same treatment (`dyn Encodable`) so
//! the dispatcher can serialize it without knowing its type.
//!
//! ```text
//! fn get_user(args: Args) -> Result<User, HandlerError>   ← user writes this
//!        ↓ Route::get("/users/{id}").handler(get_user)
//! get_user.into_boxed_handler()                           ← Handler blanket impl
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(args)  at request time                     ← one vtable dispatch
//!        ↓
//! Box::new(Typed(user)) as Box<dyn Encodable>             ← serialized later
//! ```
//!
//! Handlers are plain synchronous functions. The dispatch pipeline never
//! awaits: a handler that blocks holds its worker until it returns.

use std::sync::Arc;

use serde::Serialize;

use crate::binding::Args;
use crate::codec;
use crate::error::{CodecError, HandlerError};
use crate::media::MediaType;

// ── Internal types ────────────────────────────────────────────────────────────

/// A handler's return value with its concrete type erased.
#[doc(hidden)]
pub trait Encodable: Send {
    fn encode(&self, media: MediaType) -> Result<Vec<u8>, CodecError>;
}

struct Typed<R>(R);

impl<R: Serialize + Send> Encodable for Typed<R> {
    fn encode(&self, media: MediaType) -> Result<Vec<u8>, CodecError> {
        codec::encode(media, &self.0)
    }
}

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, args: Args) -> Result<Box<dyn Encodable>, HandlerError>;
}

/// A type-erased handler shared by every worker thread.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape:
///
/// ```text
/// Fn(Args) -> Result<R, HandlerError>   where R: Serialize
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, R> private::Sealed for F
where
    F: Fn(Args) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Serialize + Send + 'static,
{
}

impl<F, R> Handler for F
where
    F: Fn(Args) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Serialize + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Args) -> Result<R, HandlerError> + Send + Sync,
    R: Serialize + Send + 'static,
{
    fn call(&self, args: Args) -> Result<Box<dyn Encodable>, HandlerError> {
        let value = (self.0)(args)?;
        Ok(Box::new(Typed(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greet(_: Args) -> Result<String, HandlerError> {
        Ok("hi".to_owned())
    }

    #[test]
    fn named_functions_are_handlers() {
        let h = greet.into_boxed_handler();
        let out = h.call(Args::default()).unwrap();
        assert_eq!(out.encode(MediaType::Json).unwrap(), br#""hi""#);
    }

    #[test]
    fn closures_are_handlers() {
        let h = (|_: Args| -> Result<u32, HandlerError> { Err(HandlerError::not_found("nope")) })
            .into_boxed_handler();
        let err = h.call(Args::default()).err().unwrap();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }
}
