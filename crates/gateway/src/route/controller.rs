use crate::context::{Context, RequestHandler};
use std::any;
use std::sync::Arc;

/// A named action handler, the unit a [`Controller`] contributes to a route group.
#[derive(Clone)]
pub struct Action {
    name: String,
    handler: Arc<dyn RequestHandler>,
}

impl Action {
    pub fn new<N, H>(name: N, handler: H) -> Self
    where
        N: Into<String>,
        H: RequestHandler,
    {
        Self { name: name.into(), handler: Arc::new(handler) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Arc<dyn RequestHandler>) {
        (self.name, self.handler)
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A value grouping related actions under one controller name.
///
/// Implementations list their actions with [`controller_actions!`](crate::controller_actions),
/// which binds each method to a shared handle on the controller:
///
/// ```
/// use micro_gateway::{Context, Controller, controller_actions};
/// use micro_gateway::route::Action;
/// use std::sync::Arc;
///
/// struct Account;
///
/// impl Account {
///     fn get(&self, ctx: &mut Context) {
///         ctx.data("account");
///     }
///
///     fn close(&self, ctx: &mut Context) {
///         ctx.data("closed");
///     }
/// }
///
/// impl Controller for Account {
///     fn actions(self: Arc<Self>) -> Vec<Action> {
///         controller_actions!(self; get, "CloseAccount" => close)
///     }
/// }
///
/// assert_eq!(Account.name(), "Account");
/// ```
pub trait Controller: Send + Sync + 'static {
    /// The controller segment of the route key, the type name unless overridden.
    fn name(&self) -> &str {
        short_type_name(any::type_name::<Self>())
    }

    fn actions(self: Arc<Self>) -> Vec<Action>;
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

/// Builds the [`Action`] list of a [`Controller`] from its methods.
///
/// Each method takes `&self` and `&mut Context`. An action is named after its method unless a
/// name is given as `"Name" => method`.
#[macro_export]
macro_rules! controller_actions {
    (@push $this:ident, $actions:ident; $name:literal => $method:ident $(, $($rest:tt)*)?) => {
        let handle = ::std::sync::Arc::clone(&$this);
        $actions.push($crate::route::Action::new($name, move |ctx: &mut $crate::Context| handle.$method(ctx)));
        $($crate::controller_actions!(@push $this, $actions; $($rest)*);)?
    };
    (@push $this:ident, $actions:ident; $method:ident $(, $($rest:tt)*)?) => {
        let handle = ::std::sync::Arc::clone(&$this);
        $actions.push($crate::route::Action::new(stringify!($method), move |ctx: &mut $crate::Context| handle.$method(ctx)));
        $($crate::controller_actions!(@push $this, $actions; $($rest)*);)?
    };
    (@push $this:ident, $actions:ident;) => {};
    ($this:expr; $($action:tt)+) => {{
        let this = $this;
        let mut actions = ::std::vec::Vec::new();
        $crate::controller_actions!(@push this, actions; $($action)+);
        actions
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account;

    impl Account {
        fn get(&self, ctx: &mut Context) {
            ctx.data("get");
        }

        fn close(&self, ctx: &mut Context) {
            ctx.data("close");
        }
    }

    impl Controller for Account {
        fn actions(self: Arc<Self>) -> Vec<Action> {
            crate::controller_actions!(self; get, "CloseAccount" => close,)
        }
    }

    struct Renamed;

    impl Controller for Renamed {
        fn name(&self) -> &str {
            "Profile"
        }

        fn actions(self: Arc<Self>) -> Vec<Action> {
            vec![Action::new("Show", |ctx: &mut Context| ctx.data("show"))]
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert_eq!(Account.name(), "Account");
        assert_eq!(Renamed.name(), "Profile");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("crate::a::Account"), "Account");
        assert_eq!(short_type_name("crate::a::Wrapper<crate::b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_controller_actions() {
        let actions = Arc::new(Account).actions();
        let names = actions.iter().map(Action::name).collect::<Vec<_>>();
        assert_eq!(names, ["get", "CloseAccount"]);

        let mut ctx = Context::new();
        let (_, handler) = actions[1].clone().into_parts();
        handler.invoke(&mut ctx);
        assert_eq!(ctx.response().result, "close");
    }
}
