//! HTTP server and graceful shutdown.
//!
//! The server is a thin transport around [`Dispatcher`]: it reads a request
//! with hyper, collects the body, and runs the synchronous dispatch on
//! tokio's blocking pool. A semaphore caps how many dispatches run at once,
//! so at most `workers` handlers are executing at any moment.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. Stops `listener.accept()` at once, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::context::RequestContext;
use crate::dispatcher::{Dispatcher, failure};
use crate::error::{DispatchError, Error, HandlerError};
use crate::media::MediaType;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    workers: usize,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use linear_web::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Self::from_config(&Config { bind_address: addr.to_owned(), ..Config::default() })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self { addr: config.socket_addr()?, workers: config.workers.max(1) })
    }

    /// Caps concurrently executing dispatches.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Binds, then serves until SIGTERM or Ctrl-C and every in-flight
    /// request has completed.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_with_shutdown(listener, dispatcher, shutdown_signal()).await
    }

    /// Serves on an already-bound listener until `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        dispatcher: Dispatcher,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let permits = Arc::new(Semaphore::new(self.workers));

        info!(addr = %listener.local_addr()?, routes = dispatcher.table().len(), workers = self.workers, "linear-web listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = dispatcher.clone();
                    let permits = Arc::clone(&permits);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            handle(dispatcher.clone(), Arc::clone(&permits), req)
                        });

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("linear-web stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Converts one hyper request, dispatches it on a blocking worker, and
/// converts the result back. Never fails: every problem is a response.
async fn handle(
    dispatcher: Dispatcher,
    permits: Arc<Semaphore>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("request body could not be read: {e}");
            return Ok(reject(HandlerError::bad_request("request body could not be read")));
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();
    let ctx = RequestContext::from_parts(
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().map(str::to_owned),
        headers,
        body,
    );

    let Ok(permit) = permits.acquire_owned().await else {
        return Ok(reject(HandlerError::with_status(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down")));
    };

    let result = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        dispatcher.dispatch(&ctx)
    })
    .await;

    match result {
        Ok(result) => Ok(result.into_http()),
        Err(e) => {
            error!("dispatch task failed: {e}");
            Ok(reject(HandlerError::new("handler panicked")))
        }
    }
}

fn reject(e: HandlerError) -> http::Response<Full<Bytes>> {
    failure(&DispatchError::Handler(e), MediaType::Json).into_http()
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
