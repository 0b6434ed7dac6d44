use crate::context::{Context, RequestHandler};
use std::time::Instant;
use tracing::{debug, info};

/// Logs one line per call once the rest of the chain has run.
///
/// In debug mode the request and the response are dumped as well.
pub fn access_log() -> impl RequestHandler {
    |ctx: &mut Context| {
        let start = Instant::now();
        ctx.next();
        let elapsed = start.elapsed();

        let header = &ctx.request().header;
        info!(
            route = %header,
            client_ip = header.client_ip.as_str(),
            err_code = ctx.response().err_code,
            elapsed = ?elapsed,
            "access"
        );

        if ctx.run_mode().is_debug() {
            debug!("{}", ctx.request().dump());
            debug!("{}", ctx.response().dump());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HandlerChain;
    use std::sync::Arc;

    #[test]
    fn test_access_log_runs_rest_of_chain() {
        let chain: HandlerChain =
            vec![Arc::new(access_log()) as Arc<dyn RequestHandler>, Arc::new(|ctx: &mut Context| ctx.data("done"))].into();

        let mut ctx = Context::new();
        ctx.set_chain(chain);
        ctx.next();

        assert_eq!(ctx.response().result, "done");
    }
}
