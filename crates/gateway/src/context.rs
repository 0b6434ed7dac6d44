//! The per-request execution context and the handler chain it runs.
//!
//! A chain is an ordered list of [`RequestHandler`]s: global middleware, group middleware and
//! finally the action itself. [`Context::next`] runs the remaining steps in order; a step may call
//! `next` itself to wrap the rest of the chain, or [`Context::abort`] to stop it. Once aborted, no
//! further step runs, however many `next` calls are still on the stack.

use crate::config::RunMode;
use crate::envelope::{ApiRequest, ApiResponse};
use crate::error::{ApiError, BoxError, CODE_SERVER_ERROR};
use crate::render::{Render, RenderError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A step of a handler chain, either middleware or an action.
///
/// Implemented for every `Fn(&mut Context)`.
pub trait RequestHandler: Send + Sync + 'static {
    fn invoke(&self, ctx: &mut Context);
}

impl<F> RequestHandler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    #[inline]
    fn invoke(&self, ctx: &mut Context) {
        (self)(ctx);
    }
}

/// A resolved chain, shared between the route table and the contexts running it.
pub type HandlerChain = Arc<[Arc<dyn RequestHandler>]>;

#[derive(Default)]
pub struct Context {
    request: ApiRequest,
    response: ApiResponse,
    render: Render,
    mode: RunMode,
    chain: Option<HandlerChain>,
    // position of the next step to run
    cursor: usize,
    aborted: bool,
    user: Option<Box<dyn Any + Send>>,
    err: Option<BoxError>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field, leaving the context indistinguishable from a new one.
    pub(crate) fn reset(&mut self) {
        self.request = ApiRequest::default();
        self.response = ApiResponse::default();
        self.render = Render::default();
        self.mode = RunMode::default();
        self.chain = None;
        self.cursor = 0;
        self.aborted = false;
        self.user = None;
        self.err = None;
    }

    pub(crate) fn prepare(&mut self, request: ApiRequest, render: Render, mode: RunMode) {
        self.request = request;
        self.render = render;
        self.mode = mode;
    }

    /// Installs the chain to run; the cursor starts before its first step.
    pub fn set_chain(&mut self, chain: HandlerChain) {
        self.chain = Some(chain);
        self.cursor = 0;
    }

    /// Runs the remaining steps of the chain in order.
    pub fn next(&mut self) {
        let Some(chain) = self.chain.clone() else {
            return;
        };

        while !self.aborted && self.cursor < chain.len() {
            let step = self.cursor;
            self.cursor += 1;
            chain[step].invoke(self);
        }
    }

    /// Stops the chain: no step that has not started yet will run.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Aborts the chain and reports `err` as in [`Context::server_error`].
    pub fn abort_with_error<E: Into<BoxError>>(&mut self, err: E) {
        self.abort();
        let err = err.into();
        self.report(err.as_ref());
        self.err = Some(err);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Sets the successful result. A value that can't be represented is reported as a server error.
    pub fn data<T: Serialize>(&mut self, value: T) {
        match serde_json::to_value(value) {
            Ok(result) => self.response.result = result,
            Err(e) => self.server_error(e),
        }
    }

    /// Sets an explicit error code and message. The chain keeps running.
    pub fn error<E: fmt::Display>(&mut self, code: i32, err: E) {
        self.response.err_code = code;
        self.response.err_msg = err.to_string();
    }

    /// Reports `err`: an [`ApiError`] keeps its code, anything else becomes code 500.
    pub fn server_error<E: Into<BoxError>>(&mut self, err: E) {
        let err = err.into();
        self.report(err.as_ref());
    }

    fn report(&mut self, err: &(dyn std::error::Error + Send + Sync + 'static)) {
        match err.downcast_ref::<ApiError>() {
            Some(api_error) => self.error(api_error.code, &api_error.message),
            None => self.error(CODE_SERVER_ERROR, err),
        }
    }

    /// Decodes the request payload with the strategy the envelope arrived in.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, RenderError> {
        self.render.unmarshal(&self.request.data)
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn response(&self) -> &ApiResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ApiResponse {
        &mut self.response
    }

    /// Drops any result set so far.
    pub fn clear_result(&mut self) {
        self.response.result = Value::Null;
    }

    /// The strategy used by [`Context::bind`].
    pub fn render(&self) -> Render {
        self.render
    }

    pub fn run_mode(&self) -> RunMode {
        self.mode
    }

    /// The error recorded by [`Context::abort_with_error`], if any.
    pub fn err(&self) -> Option<&BoxError> {
        self.err.as_ref()
    }

    /// Stores a handler defined value for the rest of the chain, replacing any previous one.
    pub fn set_user<T: Any + Send>(&mut self, value: T) {
        self.user = Some(Box::new(value));
    }

    pub fn user<T: Any + Send>(&self) -> Option<&T> {
        self.user.as_ref().and_then(|user| user.downcast_ref::<T>())
    }

    pub fn user_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.user.as_mut().and_then(|user| user.downcast_mut::<T>())
    }

    pub fn take_user<T: Any + Send>(&mut self) -> Option<T> {
        match self.user.take()?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(user) => {
                self.user = Some(user);
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_pristine(&self) -> bool {
        self.request == ApiRequest::default()
            && self.response == ApiResponse::default()
            && self.render == Render::default()
            && self.mode == RunMode::default()
            && self.chain.is_none()
            && self.cursor == 0
            && !self.aborted
            && self.user.is_none()
            && self.err.is_none()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("render", &self.render)
            .field("mode", &self.mode)
            .field("chain_len", &self.chain.as_ref().map_or(0, |chain| chain.len()))
            .field("cursor", &self.cursor)
            .field("aborted", &self.aborted)
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CODE_NOT_FOUND;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn step(trace: &Trace, name: &'static str) -> Arc<dyn RequestHandler> {
        let trace = Arc::clone(trace);
        Arc::new(move |_ctx: &mut Context| trace.lock().push(name))
    }

    fn wrapping(trace: &Trace, before: &'static str, after: &'static str) -> Arc<dyn RequestHandler> {
        let trace = Arc::clone(trace);
        Arc::new(move |ctx: &mut Context| {
            trace.lock().push(before);
            ctx.next();
            trace.lock().push(after);
        })
    }

    fn run(chain: Vec<Arc<dyn RequestHandler>>) -> Context {
        let mut ctx = Context::new();
        ctx.set_chain(chain.into());
        ctx.next();
        ctx
    }

    #[test]
    fn test_next_runs_in_order() {
        let trace = Trace::default();
        run(vec![step(&trace, "a"), step(&trace, "b"), step(&trace, "c")]);

        assert_eq!(*trace.lock(), ["a", "b", "c"]);
    }

    #[test]
    fn test_nested_next_runs_each_step_once() {
        let trace = Trace::default();
        run(vec![wrapping(&trace, "outer>", "<outer"), wrapping(&trace, "inner>", "<inner"), step(&trace, "action")]);

        assert_eq!(*trace.lock(), ["outer>", "inner>", "action", "<inner", "<outer"]);
    }

    #[test]
    fn test_abort_stops_remaining_steps() {
        let trace = Trace::default();
        let abort: Arc<dyn RequestHandler> = Arc::new(|ctx: &mut Context| ctx.abort());
        let ctx = run(vec![
            wrapping(&trace, "outer>", "<outer"),
            step(&trace, "a"),
            abort,
            step(&trace, "b"),
            step(&trace, "c"),
        ]);

        assert!(ctx.is_aborted());
        assert_eq!(*trace.lock(), ["outer>", "a", "<outer"]);
    }

    #[test]
    fn test_abort_after_next_stops_outer_loops() {
        let trace = Trace::default();
        let trace_in_step = Arc::clone(&trace);
        // calls next, then aborts, then calls next again
        let stubborn: Arc<dyn RequestHandler> = Arc::new(move |ctx: &mut Context| {
            trace_in_step.lock().push("stubborn");
            ctx.abort();
            ctx.next();
            ctx.next();
        });

        run(vec![wrapping(&trace, "outer>", "<outer"), stubborn, step(&trace, "never")]);

        assert_eq!(*trace.lock(), ["outer>", "stubborn", "<outer"]);
    }

    #[test]
    fn test_step_without_next_keeps_running_chain() {
        let trace = Trace::default();
        run(vec![step(&trace, "a"), wrapping(&trace, "b>", "<b"), step(&trace, "c")]);

        assert_eq!(*trace.lock(), ["a", "b>", "c", "<b"]);
    }

    #[test]
    fn test_error_does_not_stop_chain() {
        let trace = Trace::default();
        let failing: Arc<dyn RequestHandler> = Arc::new(|ctx: &mut Context| ctx.error(CODE_NOT_FOUND, "missing"));
        let ctx = run(vec![failing, step(&trace, "after")]);

        assert_eq!(ctx.response().err_code, 404);
        assert_eq!(ctx.response().err_msg, "missing");
        assert!(!ctx.is_aborted());
        assert_eq!(*trace.lock(), ["after"]);
    }

    #[test]
    fn test_server_error_uses_api_error_code() {
        let mut ctx = Context::new();
        ctx.server_error(ApiError::new(1001, "balance not enough"));
        assert_eq!(ctx.response().err_code, 1001);
        assert_eq!(ctx.response().err_msg, "balance not enough");

        let mut ctx = Context::new();
        ctx.server_error(std::io::Error::other("disk full"));
        assert_eq!(ctx.response().err_code, 500);
        assert_eq!(ctx.response().err_msg, "disk full");

        let mut ctx = Context::new();
        ctx.server_error("plain message");
        assert_eq!(ctx.response().err_code, 500);
        assert_eq!(ctx.response().err_msg, "plain message");
    }

    #[test]
    fn test_abort_with_error() {
        let mut ctx = Context::new();
        ctx.abort_with_error(ApiError::new(403, "forbidden"));

        assert!(ctx.is_aborted());
        assert_eq!(ctx.response().err_code, 403);
        assert_eq!(ctx.err().map(ToString::to_string), Some("forbidden".to_owned()));
    }

    #[test]
    fn test_data() {
        let mut ctx = Context::new();
        ctx.data(json!({ "id": 1 }));

        assert!(ctx.response().is_ok());
        assert_eq!(ctx.response().result, json!({ "id": 1 }));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        id: i64,
    }

    #[test]
    fn test_bind_uses_request_render() {
        let mut ctx = Context::new();
        ctx.prepare(ApiRequest { data: br#"{"id":1}"#.as_slice().into(), ..Default::default() }, Render::Json, RunMode::Release);
        assert_eq!(ctx.bind::<Query>().unwrap(), Query { id: 1 });

        ctx.prepare(ApiRequest { data: b"<Req><id>2</id></Req>".as_slice().into(), ..Default::default() }, Render::Xml, RunMode::Release);
        assert_eq!(ctx.bind::<Query>().unwrap(), Query { id: 2 });

        ctx.prepare(ApiRequest::default(), Render::Json, RunMode::Release);
        assert!(ctx.bind::<Query>().is_err());
    }

    #[test]
    fn test_user_slot() {
        let mut ctx = Context::new();
        assert!(ctx.user::<String>().is_none());

        ctx.set_user(String::from("uid-1"));
        assert_eq!(ctx.user::<String>().map(String::as_str), Some("uid-1"));
        assert!(ctx.user::<u32>().is_none());

        if let Some(user) = ctx.user_mut::<String>() {
            user.push_str("-x");
        }

        assert!(ctx.take_user::<u32>().is_none());
        assert_eq!(ctx.take_user::<String>().as_deref(), Some("uid-1-x"));
        assert!(ctx.user::<String>().is_none());
    }

    #[test]
    fn test_reset() {
        let trace = Trace::default();
        let mut ctx = run(vec![step(&trace, "a")]);
        ctx.prepare(ApiRequest { data: "x".into(), ..Default::default() }, Render::Xml, RunMode::Release);
        ctx.data(1);
        ctx.set_user(1_u8);
        ctx.abort_with_error("boom");
        assert!(!ctx.is_pristine());

        ctx.reset();
        assert!(ctx.is_pristine());
    }
}
