use crate::context::{Context, RequestHandler};
use crate::error::{CODE_SERVER_ERROR, MSG_SERVER_ERROR};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Catches a panic raised by the rest of the chain and turns it into a 500 response.
///
/// The chain is aborted and any result set before the panic is dropped. Installed first in the
/// global chain by [`Dispatcher::builder`](crate::Dispatcher::builder).
pub fn recovery() -> impl RequestHandler {
    |ctx: &mut Context| {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) {
            error!(route = %ctx.request().header, cause = panic_message(payload.as_ref()), "handler panicked");
            ctx.abort();
            ctx.clear_result();
            ctx.error(CODE_SERVER_ERROR, MSG_SERVER_ERROR);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HandlerChain;
    use std::sync::Arc;

    fn explode(_ctx: &mut Context) {
        panic!("boom");
    }

    fn run(chain: HandlerChain) -> Context {
        let mut ctx = Context::new();
        ctx.set_chain(chain);
        ctx.next();
        ctx
    }

    #[test]
    fn test_panic_becomes_server_error() {
        let chain: HandlerChain = vec![
            Arc::new(recovery()) as Arc<dyn RequestHandler>,
            Arc::new(|ctx: &mut Context| ctx.data("partial")),
            Arc::new(explode),
            Arc::new(|ctx: &mut Context| ctx.data("never")),
        ]
        .into();

        let ctx = run(chain);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.response().err_code, 500);
        assert_eq!(ctx.response().err_msg, "Server Error");
        assert!(ctx.response().result.is_null());
    }

    #[test]
    fn test_no_panic_keeps_response() {
        let chain: HandlerChain =
            vec![Arc::new(recovery()) as Arc<dyn RequestHandler>, Arc::new(|ctx: &mut Context| ctx.data(1))].into();

        let ctx = run(chain);
        assert!(!ctx.is_aborted());
        assert!(ctx.response().is_ok());
        assert_eq!(ctx.response().result, 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
