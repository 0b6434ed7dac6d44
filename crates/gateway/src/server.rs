//! TCP bootstrap: accepts connections and serves them with the dispatcher.

use crate::config::RunMode;
use crate::dispatcher::{Dispatcher, DispatcherBuilder};
use crate::route::RouteError;
use micro_gateway_http::connection::HttpConnection;
use std::future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:9090";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid address: {source}")]
    Address { source: io::Error },

    #[error("bind server error: {source}")]
    Bind { source: io::Error },

    #[error(transparent)]
    Route {
        #[from]
        source: RouteError,
    },
}

#[derive(Debug)]
pub struct ServerBuilder {
    address: io::Result<Vec<SocketAddr>>,
    dispatcher: DispatcherBuilder,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: resolve(DEFAULT_ADDRESS), dispatcher: Dispatcher::builder() }
    }

    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = resolve(address);
        self
    }

    #[must_use]
    pub fn dispatcher(mut self, dispatcher: DispatcherBuilder) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Builds the route table; a duplicate route fails here, before anything is bound.
    pub fn build(self) -> Result<Server, ServerError> {
        let address = self.address.map_err(|source| ServerError::Address { source })?;
        let dispatcher = self.dispatcher.build().inspect_err(|e| error!(cause = %e, "build routes error"))?;
        Ok(Server { address, dispatcher: Arc::new(dispatcher) })
    }
}

fn resolve<A: ToSocketAddrs>(address: A) -> io::Result<Vec<SocketAddr>> {
    Ok(address.to_socket_addrs()?.collect())
}

#[derive(Debug)]
pub struct Server {
    address: Vec<SocketAddr>,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Installs the log subscriber and serves until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        init_tracing(self.dispatcher.config().mode);
        self.start_with_shutdown(shutdown_signal()).await
    }

    /// Binds the configured address and serves until `signal` completes.
    pub async fn start_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("start listening at {:?}", self.address);
        let tcp_listener = TcpListener::bind(self.address.as_slice()).await.map_err(|source| {
            error!(cause = %source, "bind server error");
            ServerError::Bind { source }
        })?;

        self.serve(tcp_listener, signal).await;
        Ok(())
    }

    /// Serves connections from `tcp_listener` until `signal` completes.
    ///
    /// Idle connections are closed as soon as `signal` completes; a connection handling a request
    /// closes after its response. Connections still open once the shutdown timeout elapses are
    /// dropped.
    pub async fn serve<F>(self, tcp_listener: TcpListener, signal: F)
    where
        F: Future<Output = ()>,
    {
        for action in self.dispatcher.routes().actions() {
            info!(action, "register action");
        }

        let max_body_size = self.dispatcher.config().max_body_size;
        let tracker = TaskTracker::new();
        let shutdown = CancellationToken::new();
        let force_close = CancellationToken::new();
        tokio::pin!(signal);

        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                _ = &mut signal => {
                    info!("shutdown signal received, stop accepting");
                    break;
                }
                accepted = tcp_listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let handler = Arc::clone(&self.dispatcher);
            let shutdown = shutdown.clone();
            let force_close = force_close.clone();
            tracker.spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer)
                    .peer_addr(remote_addr)
                    .max_body_size(max_body_size)
                    .shutdown(shutdown);

                tokio::select! {
                    result = connection.process(handler) => match result {
                        Ok(_) => debug!(%remote_addr, "finished process, connection shutdown"),
                        Err(e) => error!(%remote_addr, "service has error, cause {}, connection shutdown", e),
                    },
                    () = force_close.cancelled() => warn!(%remote_addr, "connection dropped by shutdown"),
                }
            });
        }

        shutdown.cancel();
        tracker.close();
        let shutdown_timeout = self.dispatcher.config().shutdown_timeout();
        if tokio::time::timeout(shutdown_timeout, tracker.wait()).await.is_err() {
            warn!(remaining = tracker.len(), "shutdown timeout elapsed, dropping connections");
            force_close.cancel();
            tracker.wait().await;
        }
        info!("server stopped");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(cause = %e, "can't listen for shutdown signal");
        future::pending::<()>().await;
    }
}

fn init_tracing(mode: RunMode) {
    let level = if mode.is_debug() { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        warn!(cause = %e, "tracing subscriber already set");
    }
}
