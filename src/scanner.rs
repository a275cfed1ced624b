//! Controller registration.
//!
//! There is no runtime reflection: a controller is any type implementing
//! [`Controller`], handed to a [`Scanner`] at startup. The scanner collects
//! every declared [`Route`], validates it, and produces the descriptors the
//! [`RouteTable`] is built from.
//!
//! ```rust
//! use std::sync::Arc;
//! use linear_web::{Args, Controller, HandlerError, ParamType, ParameterBinding, Route, Scanner};
//!
//! struct Users;
//!
//! impl Users {
//!     fn find(&self, args: Args) -> Result<String, HandlerError> {
//!         let id: u64 = args.get("id").unwrap_or_default();
//!         Ok(format!("user {id}"))
//!     }
//! }
//!
//! impl Controller for Users {
//!     fn path(&self) -> &str { "/users" }
//!
//!     fn routes(self: Arc<Self>) -> Vec<Route> {
//!         vec![
//!             Route::get("/{id}")
//!                 .param(ParameterBinding::path("id", ParamType::UInt))
//!                 .handler(move |args: Args| self.find(args)),
//!         ]
//!     }
//! }
//!
//! let table = Scanner::new().base_path("/api").controller(Users).build().unwrap();
//! assert_eq!(table.routes()[0].pattern().as_str(), "/api/users/{id}");
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::RegistrationError;
use crate::pattern;
use crate::route::{Route, RouteDescriptor};
use crate::table::RouteTable;

/// A group of routes sharing a path prefix and, usually, some state.
///
/// `routes` receives the controller behind an `Arc` so handlers can capture
/// it by cloning.
pub trait Controller: Send + Sync + 'static {
    /// Prefix applied to every route this controller declares.
    fn path(&self) -> &str {
        ""
    }

    fn routes(self: Arc<Self>) -> Vec<Route>;
}

struct Unit {
    source: &'static str,
    prefix: String,
    routes: Vec<Route>,
}

/// Collects controllers and loose routes, in registration order.
#[derive(Default)]
pub struct Scanner {
    base_path: String,
    units: Vec<Unit>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scanner that prefixes every route with the configured `base_path`.
    pub fn from_config(config: &Config) -> Self {
        Self::new().base_path(&config.base_path)
    }

    /// Prefix applied to everything registered on this scanner.
    pub fn base_path(mut self, path: &str) -> Self {
        self.base_path = path.to_owned();
        self
    }

    pub fn controller<C: Controller>(mut self, controller: C) -> Self {
        let controller = Arc::new(controller);
        let prefix = controller.path().to_owned();
        let routes = controller.routes();
        self.units.push(Unit { source: std::any::type_name::<C>(), prefix, routes });
        self
    }

    /// Registers a route outside any controller.
    pub fn route(mut self, route: Route) -> Self {
        self.units.push(Unit { source: "route", prefix: String::new(), routes: vec![route] });
        self
    }

    /// Validates every declared route. Stops at the first invalid one.
    pub fn scan(self) -> Result<Vec<RouteDescriptor>, RegistrationError> {
        let mut descriptors = Vec::new();
        for unit in self.units {
            let prefix = pattern::join(&self.base_path, &unit.prefix);
            debug!(source = unit.source, prefix = %prefix, routes = unit.routes.len(), "scanning");
            for route in unit.routes {
                descriptors.push(route.build(&prefix)?);
            }
        }
        Ok(descriptors)
    }

    /// [`scan`](Self::scan) followed by [`RouteTable::build`].
    pub fn build(self) -> Result<RouteTable, RegistrationError> {
        RouteTable::build(self.scan()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::binding::Args;
    use crate::error::HandlerError;
    use crate::media::MediaType;
    use crate::method::Method;
    use crate::table::Lookup;

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    impl Controller for Counter {
        fn path(&self) -> &str {
            "/counter"
        }

        fn routes(self: Arc<Self>) -> Vec<Route> {
            let this = Arc::clone(&self);
            vec![
                Route::post("/").consumes([]).handler(move |_: Args| {
                    Ok::<_, HandlerError>(this.hits.fetch_add(1, Ordering::SeqCst) + 1)
                }),
                Route::get("/").handler(move |_: Args| Ok::<_, HandlerError>(self.hits.load(Ordering::SeqCst))),
            ]
        }
    }

    #[test]
    fn controller_prefix_and_base_path_compose() {
        let routes = Scanner::new().base_path("/api/").controller(Counter::default()).scan().unwrap();
        let patterns: Vec<_> = routes.iter().map(|r| r.pattern().as_str().to_owned()).collect();
        assert_eq!(patterns, ["/api/counter", "/api/counter"]);
        assert_eq!(routes[0].method(), Method::Post);
    }

    #[test]
    fn configured_base_path_prefixes_every_route() {
        let config = Config::from_toml_str(r#"base_path = "/v2""#).unwrap();
        let table = Scanner::from_config(&config)
            .controller(Counter::default())
            .route(Route::get("/ping").handler(|_: Args| Ok::<_, HandlerError>("pong")))
            .build()
            .unwrap();
        let patterns: Vec<_> = table.routes().iter().map(|r| r.pattern().as_str()).collect();
        assert_eq!(patterns, ["/v2/counter", "/v2/counter", "/v2/ping"]);
        assert!(matches!(table.match_route(Method::Get, "/v2/ping", None), Lookup::Found(_)));
        assert!(matches!(table.match_route(Method::Get, "/ping", None), Lookup::NotFound));
    }

    #[test]
    fn handlers_share_controller_state() {
        let table = Scanner::new().controller(Counter::default()).build().unwrap();
        let Lookup::Found(post) = table.match_route(Method::Post, "/counter", None) else {
            panic!("post route missing");
        };
        post.route.handler.call(Args::default()).unwrap();
        post.route.handler.call(Args::default()).unwrap();

        let Lookup::Found(get) = table.match_route(Method::Get, "/counter", None) else {
            panic!("get route missing");
        };
        let out = get.route.handler.call(Args::default()).unwrap();
        assert_eq!(out.encode(MediaType::Json).unwrap(), b"2");
    }

    #[test]
    fn loose_routes_keep_registration_order() {
        let routes = Scanner::new()
            .route(Route::get("/b").handler(|_: Args| Ok::<_, HandlerError>(())))
            .route(Route::get("/a").handler(|_: Args| Ok::<_, HandlerError>(())))
            .scan()
            .unwrap();
        assert_eq!(routes[0].pattern().as_str(), "/b");
        assert_eq!(routes[1].pattern().as_str(), "/a");
    }

    #[test]
    fn first_invalid_route_fails_the_scan() {
        let err = Scanner::new()
            .route(Route::get("/ok").handler(|_: Args| Ok::<_, HandlerError>(())))
            .route(Route::get("no-slash").handler(|_: Args| Ok::<_, HandlerError>(())))
            .scan()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { .. }));
    }

    #[test]
    fn ambiguity_surfaces_from_build() {
        let err = Scanner::new()
            .route(Route::get("/x/{a}").handler(|_: Args| Ok::<_, HandlerError>(())))
            .route(Route::get("/x/{b}").handler(|_: Args| Ok::<_, HandlerError>(())))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Ambiguous { .. }));
    }
}
