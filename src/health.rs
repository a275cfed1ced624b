//! Built-in health-check controller.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! ```rust
//! use linear_web::{Scanner, health::Health};
//!
//! let health = Health::new();
//! let ready = health.readiness();
//! let table = Scanner::new().controller(health).build().unwrap();
//!
//! // Flip to not-ready while draining or warming up.
//! ready.set(false);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::binding::Args;
use crate::error::HandlerError;
use crate::media::MediaType;
use crate::route::Route;
use crate::scanner::Controller;

/// Probe response body: `{"status":"ok"}` / `<health><status>ok</status></health>`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename = "health")]
pub struct Probe {
    pub status: String,
}

/// Shared readiness switch. Starts ready.
#[derive(Clone, Debug)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn set(&self, ready: bool) {
        self.0.store(ready, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Registers `/healthz` and `/readyz`.
#[derive(Debug)]
pub struct Health {
    ready: Readiness,
}

impl Health {
    pub fn new() -> Self {
        Self { ready: Readiness(Arc::new(AtomicBool::new(true))) }
    }

    /// A handle to toggle the readiness probe after registration.
    pub fn readiness(&self) -> Readiness {
        self.ready.clone()
    }
}

impl Default for Health {
    fn default() -> Self { Self::new() }
}

impl Controller for Health {
    fn routes(self: Arc<Self>) -> Vec<Route> {
        let both = [MediaType::Json, MediaType::Xml];
        vec![
            // Alive if it can answer at all.
            Route::get("/healthz")
                .produces(both)
                .handler(|_: Args| Ok::<_, HandlerError>(Probe { status: "ok".into() })),
            Route::get("/readyz").produces(both).handler(move |_: Args| {
                if self.ready.get() {
                    Ok(Probe { status: "ready".into() })
                } else {
                    Err(HandlerError::with_status(StatusCode::SERVICE_UNAVAILABLE, "not ready")
                        .with_code("not_ready"))
                }
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::dispatcher::Dispatcher;
    use crate::method::Method;
    use crate::scanner::Scanner;

    fn setup() -> (Dispatcher, Readiness) {
        let health = Health::new();
        let ready = health.readiness();
        let table = Scanner::new().controller(health).build().unwrap();
        (Dispatcher::new(Arc::new(table)), ready)
    }

    #[test]
    fn liveness_is_always_ok() {
        let (d, ready) = setup();
        ready.set(false);
        let res = d.dispatch(&RequestContext::new(Method::Get, "/healthz"));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), br#"{"status":"ok"}"#);
    }

    #[test]
    fn readiness_follows_switch() {
        let (d, ready) = setup();
        let req = RequestContext::new(Method::Get, "/readyz");
        assert_eq!(d.dispatch(&req).status(), StatusCode::OK);

        ready.set(false);
        assert_eq!(d.dispatch(&req).status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn probes_speak_xml() {
        let (d, _) = setup();
        let req = RequestContext::new(Method::Get, "/healthz").with_header("accept", "text/xml");
        let res = d.dispatch(&req);
        assert_eq!(res.body(), b"<health><status>ok</status></health>");
    }
}
