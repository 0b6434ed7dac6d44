//! Serves a small user service.
//!
//! ```shell
//! curl -H 'Content-Type: application/json' \
//!     -d '{"Service":"User","Module":"Core","Controller":"Account","Action":"Get","request":{"id":1}}' \
//!     http://127.0.0.1:9090/
//!
//! curl -H 'Content-Type: text/xml' -H 'Accept: text/xml' \
//!     -d '<APIRequest><Service>User</Service><Module>Core</Module><Controller>Account</Controller><Action>Get</Action><Request><id>2</id></Request></APIRequest>' \
//!     http://127.0.0.1:9090/
//! ```

use micro_gateway::route::Action;
use micro_gateway::{
    ApiError, CODE_BAD_REQUEST, Config, Context, Controller, Dispatcher, Group, RunMode, Server, ServerError, access_log,
    controller_actions,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
struct GetAccount {
    id: i64,
}

#[derive(Serialize)]
struct Account {
    id: i64,
    name: String,
    from_app: bool,
}

struct AccountController;

impl AccountController {
    fn get(&self, ctx: &mut Context) {
        let query = match ctx.bind::<GetAccount>() {
            Ok(query) => query,
            Err(e) => return ctx.error(CODE_BAD_REQUEST, e),
        };

        if query.id <= 0 {
            return ctx.server_error(ApiError::new(1001, "no such account"));
        }

        let from_app = ctx.request().is_from_app();
        ctx.data(Account { id: query.id, name: format!("account-{}", query.id), from_app });
    }
}

impl Controller for AccountController {
    fn name(&self) -> &str {
        "Account"
    }

    fn actions(self: Arc<Self>) -> Vec<Action> {
        controller_actions!(self; "Get" => get)
    }
}

fn require_token(ctx: &mut Context) {
    if ctx.request().header.token.is_empty() {
        ctx.abort_with_error(ApiError::new(401, "token required"));
    }
}

fn ping(ctx: &mut Context) {
    ctx.data("pong");
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let mode = std::env::var("GATEWAY_MODE").ok().and_then(|mode| mode.parse().ok()).unwrap_or(RunMode::Debug);

    let dispatcher = Dispatcher::builder()
        .config(Config { mode, ..Default::default() })
        .with(access_log())
        .group(Group::new("v1", "User", "Core").register(AccountController))
        .group(Group::new("v1", "User", "Secure").with(require_token).register(AccountController))
        .group(Group::new("", "Health", "Core").handle("Probe", "Ping", ping));

    Server::builder().address("127.0.0.1:9090").dispatcher(dispatcher).build()?.start().await
}
