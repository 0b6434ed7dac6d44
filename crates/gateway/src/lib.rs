//! A lightweight API gateway.
//!
//! Every call carries an envelope naming its endpoint by `(version, service, module, controller,
//! action)`. The [`Dispatcher`] decodes the envelope with the render strategy chosen by
//! `Content-Type`, resolves the handler chain registered for that key, runs it on a pooled
//! [`Context`] and encodes the [`ApiResponse`] with the strategy chosen by `Accept`.
//!
//! ```no_run
//! use micro_gateway::{Context, Dispatcher, Group, Server, access_log};
//!
//! fn ping(ctx: &mut Context) {
//!     ctx.data("pong");
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::builder()
//!         .with(access_log())
//!         .group(Group::new("v1", "Health", "Core").handle("Probe", "Ping", ping));
//!
//!     let server = Server::builder().address("127.0.0.1:9090").dispatcher(dispatcher).build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```

mod config;
mod context;
mod dispatcher;
mod envelope;
mod error;
mod middleware;
mod pool;
mod server;

pub mod render;
pub mod route;

pub use config::{Config, ParseRunModeError, RunMode};
pub use context::{Context, HandlerChain, RequestHandler};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use envelope::{ApiHeader, ApiRequest, ApiResponse, DEFAULT_VERSION, route_key};
pub use error::{
    ApiError, BoxError, CODE_BAD_REQUEST, CODE_NOT_FOUND, CODE_SERVER_ERROR, MSG_NOT_FOUND, MSG_SERVER_ERROR,
};
pub use middleware::{access_log, recovery};
pub use pool::{ContextPool, PooledContext};
pub use render::{Render, RenderError};
pub use route::{Controller, Group, RouteError, RouteTable};
pub use server::{DEFAULT_ADDRESS, Server, ServerBuilder, ServerError};
