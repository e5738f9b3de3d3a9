//! The HTTP server.
//!
//! Each connection is served by hyper's HTTP/1.1 implementation on its own
//! tokio task. Every request is handed to the [`Dispatcher`] from that task,
//! so the chain starts on the event loop; the response comes back through
//! a one-shot channel once the engine ends it.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hermes_config::ServerConfig;
use hermes_core::exchange::ChannelResponse;
use hermes_handlers::{Dispatch, Dispatcher};
use http::{Method, Request};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::adapter::{self, HttpResponse};
use crate::lifecycle::{Lifecycle, LifecycleError};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Server failures.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The bind address could not be parsed.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// The listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle hook failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine dropped the response without writing it. Returned to
    /// hyper, which closes the connection.
    #[error("exchange aborted")]
    Aborted,
}

/// Answers requests the engine does not handle.
pub type Fallback = Arc<dyn Fn(&Method, &str) -> HttpResponse + Send + Sync>;

/// Serves a [`Dispatcher`] over HTTP/1.1.
///
/// ```rust,ignore
/// let dispatcher = ApplicationBuilder::new().resource(widgets()).build()?;
/// Server::builder(dispatcher)
///     .http_addr("127.0.0.1:8080")
///     .build()
///     .run()
///     .await?;
/// ```
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    lifecycle: Lifecycle,
    fallback: Fallback,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.http_addr)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Starts configuring a server for `dispatcher`.
    pub fn builder(dispatcher: Dispatcher) -> ServerBuilder {
        ServerBuilder::new(dispatcher)
    }

    /// The dispatcher requests go to.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .http_addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.http_addr.clone()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` fires.
    ///
    /// Startup hooks run first. After the signal, the listener closes,
    /// open connections finish their in-flight requests for up to the
    /// shutdown timeout, then shutdown hooks run and the dispatcher is
    /// closed.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        self.lifecycle.run_startup().await?;

        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "Server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, shutdown).await {
                                tracing::debug!(remote_addr = %remote, error = %e, "Connection closed with error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        tracing::info!(
            active = tracker.active_connections(),
            timeout = ?server.shutdown_timeout,
            "Draining connections"
        );
        if tokio::time::timeout(server.shutdown_timeout, tracker.wait_for_shutdown())
            .await
            .is_err()
        {
            tracing::warn!(
                active = tracker.active_connections(),
                "Shutdown timeout reached with connections still open"
            );
        }

        let hooks = server.lifecycle.run_shutdown().await;
        server.dispatcher.close();
        tracing::info!("Server stopped");
        hooks.map_err(ServerError::from)
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(request).await }
        });

        let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);
        let stop = shutdown.recv();
        tokio::pin!(stop);

        tokio::select! {
            result = connection.as_mut() => return result,
            () = &mut stop => connection.as_mut().graceful_shutdown(),
        }
        connection.await
    }

    async fn handle_request(&self, request: Request<Incoming>) -> Result<HttpResponse, ServerError> {
        let inbound = adapter::to_inbound(request);
        let (sink, completed) = ChannelResponse::new();

        if let Dispatch::NotHandled { request, .. } =
            self.dispatcher.dispatch(Box::new(inbound), Box::new(sink))
        {
            return Ok((self.fallback)(request.method(), request.path()));
        }

        match tokio::time::timeout(self.request_timeout, completed).await {
            Ok(Ok(response)) => Ok(adapter::from_completed(response)),
            Ok(Err(_)) => Err(ServerError::Aborted),
            Err(_) => {
                tracing::warn!(timeout = ?self.request_timeout, "Request timed out");
                Ok(adapter::timed_out())
            }
        }
    }
}

/// Configures a [`Server`].
#[must_use]
pub struct ServerBuilder {
    dispatcher: Dispatcher,
    config: ServerConfig,
    lifecycle: Lifecycle,
    fallback: Option<Fallback>,
}

impl ServerBuilder {
    /// Defaults from [`ServerConfig::default`].
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            config: ServerConfig::default(),
            lifecycle: Lifecycle::new(),
            fallback: None,
        }
    }

    /// Takes address and timeouts from `config`.
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Sets the bind address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Sets how long shutdown waits for open connections.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets how long a request may take before it is answered with 504.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets startup and shutdown hooks.
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Answers requests for unregistered paths. Defaults to a JSON 404.
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&Method, &str) -> HttpResponse + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Builds the server.
    pub fn build(self) -> Server {
        Server {
            dispatcher: Arc::new(self.dispatcher),
            http_addr: self.config.http_addr,
            shutdown_timeout: Duration::from_secs(self.config.shutdown_timeout_secs),
            request_timeout: Duration::from_millis(self.config.request_timeout_ms),
            lifecycle: self.lifecycle,
            fallback: self
                .fallback
                .unwrap_or_else(|| Arc::new(|_: &Method, path: &str| adapter::not_found(path))),
        }
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_handlers::ApplicationBuilder;

    #[tokio::test]
    async fn test_builder_applies_config() {
        let dispatcher = ApplicationBuilder::new().build().unwrap();
        let config = ServerConfig {
            http_addr: "127.0.0.1:9999".to_string(),
            shutdown_timeout_secs: 5,
            request_timeout_ms: 250,
        };
        let server = Server::builder(dispatcher).config(&config).build();
        assert_eq!(server.http_addr, "127.0.0.1:9999");
        assert_eq!(server.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(server.request_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let dispatcher = ApplicationBuilder::new().build().unwrap();
        let server = Server::builder(dispatcher).http_addr("nowhere").build();
        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress(_))));
    }
}
