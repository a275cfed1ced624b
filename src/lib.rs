//! # linear-web
//!
//! Declarative controllers, deterministic routing and JSON/XML marshalling
//! on top of hyper.
//!
//! ## The pipeline
//!
//! Startup, once:
//!
//! - [`Controller`]s and loose [`Route`]s are handed to a [`Scanner`]
//! - the scanner validates them into [`RouteDescriptor`]s
//! - [`RouteTable::build`] indexes them and rejects ambiguous overlaps
//!
//! Per request, synchronously:
//!
//! - the [`Dispatcher`] matches method, path and `Accept` against the table
//! - the binder turns path, query, header and body data into [`Args`]
//! - the handler runs and its return value is serialized in the negotiated
//!   format
//! - failures become an [`ErrorBody`] in that same format
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use linear_web::{
//!     Args, Dispatcher, HandlerError, MediaType, ParamType, ParameterBinding, Route, Scanner, Server,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! #[serde(rename = "user")]
//! struct User { id: u64, name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), linear_web::Error> {
//!     let table = Scanner::new()
//!         .route(
//!             Route::get("/users/{id}")
//!                 .produces([MediaType::Json, MediaType::Xml])
//!                 .param(ParameterBinding::path("id", ParamType::UInt))
//!                 .handler(get_user),
//!         )
//!         .build()?;
//!
//!     Server::bind("0.0.0.0:3000")?
//!         .serve(Dispatcher::new(Arc::new(table)))
//!         .await
//! }
//!
//! fn get_user(args: Args) -> Result<User, HandlerError> {
//!     let id = args.get::<u64>("id").ok_or_else(|| HandlerError::bad_request("id"))?;
//!     Ok(User { id, name: "alice".into() })
//! }
//! ```

mod binding;
mod config;
mod context;
mod dispatcher;
mod error;
mod handler;
mod media;
mod method;
mod pattern;
mod response;
mod route;
mod scanner;
mod server;
mod table;

pub mod codec;
pub mod health;

pub use binding::{Args, FromValue, ParamType, ParameterBinding, Source, Value, bind};
pub use config::Config;
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use error::{BindingError, CodecError, DispatchError, Error, HandlerError, RegistrationError, Result};
pub use handler::Handler;
pub use media::{Accept, MediaType};
pub use method::{Method, UnknownMethod};
pub use pattern::{PathPattern, Segment};
pub use response::{DispatchResult, ErrorBody};
pub use route::{Route, RouteDescriptor};
pub use scanner::{Controller, Scanner};
pub use server::Server;
pub use table::{Lookup, Match, RouteTable};
