//! The per-request lifecycle: decode, resolve, run, encode.

use crate::config::Config;
use crate::context::RequestHandler;
use crate::envelope::ApiResponse;
use crate::error::{CODE_BAD_REQUEST, CODE_NOT_FOUND, CODE_SERVER_ERROR, MSG_NOT_FOUND, MSG_SERVER_ERROR};
use crate::middleware::recovery;
use crate::pool::ContextPool;
use crate::render::{self, Render};
use crate::route::{Group, RouteError, RouteTable};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use micro_gateway_http::handler::Handler;
use micro_gateway_http::protocol::PeerAddr;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

pub struct DispatcherBuilder {
    config: Config,
    global: Vec<Arc<dyn RequestHandler>>,
    groups: Vec<Group>,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self { config: Config::default(), global: vec![], groups: vec![] }
    }

    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Appends global middleware, run by every request including route misses.
    #[must_use]
    pub fn with<H: RequestHandler>(mut self, middleware: H) -> Self {
        self.global.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Builds the route table. Fails if two registrations share a route key.
    pub fn build(self) -> Result<Dispatcher, RouteError> {
        let routes = RouteTable::build(&self.global, self.groups)?;
        let pool = ContextPool::new(self.config.max_idle_contexts);
        Ok(Dispatcher { routes, pool, config: self.config })
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .field("global", &self.global.len())
            .field("groups", &self.groups)
            .finish()
    }
}

/// Resolves each inbound envelope to its handler chain and runs it on a pooled context.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    pool: ContextPool,
    config: Config,
}

impl Dispatcher {
    /// A builder whose global chain starts with [`recovery`].
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new().with(recovery())
    }

    /// A builder with an empty global chain. A panicking handler is not caught.
    pub fn bare() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves one request. The HTTP status is always 200; the outcome travels in the body.
    pub fn dispatch(&self, request: Request<Bytes>) -> Response<Bytes> {
        let render = Render::negotiate(header_str(request.headers(), ACCEPT.as_str()));
        let mut ctx = self.pool.acquire();

        match render::decode_request(request.headers(), request.uri(), request.body()) {
            Ok((mut api_request, payload_render)) => {
                if let Some(client_ip) = client_ip(&request) {
                    api_request.header.client_ip = client_ip;
                }
                ctx.prepare(api_request, payload_render, self.config.mode);

                match self.routes.lookup(&ctx.request().header) {
                    Some(chain) => ctx.set_chain(Arc::clone(chain)),
                    None => {
                        warn!(route = %ctx.request().header, "action not found");
                        ctx.set_chain(Arc::clone(self.routes.global_chain()));
                        ctx.error(CODE_NOT_FOUND, MSG_NOT_FOUND);
                    }
                }

                ctx.next();
            }
            Err(e) => {
                warn!(cause = %e, "decode request error");
                ctx.error(CODE_BAD_REQUEST, e);
            }
        }

        encode_response(render, ctx.response())
    }
}

#[async_trait]
impl Handler for Dispatcher {
    type Error = Infallible;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
        Ok(self.dispatch(req))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim).filter(|value| !value.is_empty())
}

/// `X-Real-Ip`, else the first `X-Forwarded-For` entry, else the peer address.
fn client_ip(request: &Request<Bytes>) -> Option<String> {
    let headers = request.headers();

    header_str(headers, X_REAL_IP)
        .or_else(|| {
            header_str(headers, X_FORWARDED_FOR)
                .and_then(|forwarded| forwarded.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .map(str::to_owned)
        .or_else(|| request.extensions().get::<PeerAddr>().map(|peer| peer.0.ip().to_string()))
}

fn encode_response(render: Render, response: &ApiResponse) -> Response<Bytes> {
    let body = match render.marshal(response) {
        Ok(body) => body,
        Err(e) => {
            error!(cause = %e, "marshal response error");
            let fallback = ApiResponse { err_code: CODE_SERVER_ERROR, err_msg: MSG_SERVER_ERROR.to_owned(), ..Default::default() };
            match render.marshal(&fallback) {
                Ok(body) => body,
                Err(e) => {
                    error!(cause = %e, "marshal fallback response error");
                    let mut response = Response::new(Bytes::new());
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    return response;
                }
            }
        }
    };

    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(render.content_type()));
    response
}
