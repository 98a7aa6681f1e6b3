//! HTTP server and graceful shutdown.
//!
//! The server owns the transport: accepting connections, reading request
//! bodies, writing responses. Each request is handed to the
//! [`Dispatcher`] either inline on the runtime worker or on tokio's blocking
//! pool, depending on [`DispatchMode`].
//!
//! # Lifecycle
//!
//! 1. [`EventType::ServerStarting`] fires. A failing listener aborts startup.
//! 2. The listener starts accepting and [`EventType::ServerStarted`] fires.
//! 3. On SIGTERM or Ctrl-C the server stops accepting and fires
//!    [`EventType::ServerStopping`].
//! 4. Every connection is asked to shut down gracefully: idle keep-alive
//!    connections close at once, in-flight requests run to completion.
//! 5. [`EventType::ServerStopped`] fires and [`Server::serve`] returns.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONNECTION, CONTENT_TYPE, SERVER};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::app::Application;
use crate::config::{Config, DispatchMode};
use crate::dispatcher::{self, Dispatcher};
use crate::error::Error;
use crate::event::EventType;
use crate::method::Method;
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::{ui, SERVER_NAME};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use skiff::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert_eq!(server.addr().port(), 3000);
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr })
    }

    /// Binds to `server.address`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::bind(&config.server.address)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves `app` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, app: Application) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        app: Application,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        Self::serve_listener(listener, app, shutdown).await
    }

    /// Runs the accept loop on an already bound listener.
    pub async fn serve_listener(
        listener: TcpListener,
        app: Application,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let app = Arc::new(app);
        app.fire(EventType::ServerStarting)?;

        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(&app),
            mode: app.config().server.dispatch,
            context_path: app.config().server.context_path.clone(),
        });

        let addr = listener.local_addr()?;
        info!(%addr, mode = ?shared.mode, "skiff listening");
        app.fire(EventType::ServerStarted)?;

        let mut tasks = tokio::task::JoinSet::new();
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even while
                // connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let shared = Arc::clone(&shared);
                    let io = TokioIo::new(stream);
                    let watcher = graceful.watcher();

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| handle(Arc::clone(&shared), req, peer));

                        let builder = ConnBuilder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(io, svc);
                        if let Err(e) = watcher.watch(conn).await {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connections so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let stopping = app.fire(EventType::ServerStopping);
        // Idle keep-alive connections close now; busy ones finish their
        // current request first.
        graceful.shutdown().await;
        while tasks.join_next().await.is_some() {}
        let stopped = app.fire(EventType::ServerStopped);

        info!("skiff stopped");
        Ok(stopping.and(stopped)?)
    }
}

struct Shared {
    dispatcher: Dispatcher,
    mode: DispatchMode,
    context_path: String,
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Reads one request off the wire and dispatches it.
///
/// Every failure becomes a response, so hyper never sees an error.
async fn handle(
    shared: Arc<Shared>,
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Ok(method) = Method::try_from(req.method()) else {
        debug!(method = %req.method(), %peer, "unsupported method");
        return Ok(finish(dispatcher::failure_response(StatusCode::METHOD_NOT_ALLOWED)));
    };

    // Polling the body is what answers `Expect: 100-continue`.
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(%peer, "request body: {e}");
            return Ok(finish(dispatcher::generic_failure()));
        }
    };

    let request = Request::from_parts(method, &parts, body, &shared.context_path, peer);
    let response = match shared.mode {
        DispatchMode::EventLoop => shared.dispatcher.dispatch(request),
        DispatchMode::WorkerPool => {
            let worker = Arc::clone(&shared);
            tokio::task::spawn_blocking(move || worker.dispatcher.dispatch(request))
                .await
                .unwrap_or_else(|e| {
                    error!(%peer, "dispatch task: {e}");
                    dispatcher::generic_failure()
                })
        }
    };

    Ok(finish(response))
}

fn finish(res: Response) -> http::Response<Full<Bytes>> {
    res.into_inner().unwrap_or_else(|e| {
        error!("invalid response head: {e}");
        fallback_failure()
    })
}

/// The generic 500, assembled from constant header values so it cannot fail.
fn fallback_failure() -> http::Response<Full<Bytes>> {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let mut res = http::Response::new(Full::new(Bytes::from(ui::failure(status))));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Text.as_str()));
    headers.insert(SERVER, HeaderValue::from_static(SERVER_NAME));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    res
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
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
