//! Route groups and the table resolving a request header to its handler chain.
//!
//! A [`Group`] fixes the version, service and module segments of the key and contributes its own
//! middleware. [`RouteTable::build`] flattens every group into `key -> global ++ group ++ action`
//! once at startup; the table is read-only afterwards.

mod controller;

pub use controller::{Action, Controller};

use crate::context::{HandlerChain, RequestHandler};
use crate::envelope::{self, ApiHeader, DEFAULT_VERSION};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("duplicate route: {key}")]
    DuplicateRoute { key: String },
}

impl RouteError {
    pub fn duplicate_route<S: ToString>(key: S) -> Self {
        Self::DuplicateRoute { key: key.to_string() }
    }
}

/// Registrations sharing the version, service and module of their route key.
pub struct Group {
    version: String,
    service: String,
    module: String,
    middleware: Vec<Arc<dyn RequestHandler>>,
    actions: Vec<(String, String, Arc<dyn RequestHandler>)>,
}

impl Group {
    /// Creates a group. An empty version means `v1`.
    pub fn new(version: impl Into<String>, service: impl Into<String>, module: impl Into<String>) -> Self {
        let version = version.into();
        let version = if version.is_empty() { DEFAULT_VERSION.to_owned() } else { version };
        Self { version, service: service.into(), module: module.into(), middleware: vec![], actions: vec![] }
    }

    /// Appends middleware running before every action of this group, after the global middleware.
    #[must_use]
    pub fn with<H: RequestHandler>(mut self, middleware: H) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers a single action handler.
    #[must_use]
    pub fn handle<H: RequestHandler>(mut self, controller: impl Into<String>, action: impl Into<String>, handler: H) -> Self {
        self.actions.push((controller.into(), action.into(), Arc::new(handler)));
        self
    }

    /// Registers every action of `controller` under its [`Controller::name`].
    #[must_use]
    pub fn register<C: Controller>(self, controller: C) -> Self {
        self.register_shared(Arc::new(controller))
    }

    /// Same as [`Group::register`] for a controller that is also used elsewhere.
    #[must_use]
    pub fn register_shared<C: Controller>(mut self, controller: Arc<C>) -> Self {
        let name = controller.name().to_owned();
        for action in controller.actions() {
            let (action, handler) = action.into_parts();
            self.actions.push((name.clone(), action, handler));
        }
        self
    }

    fn action_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.actions.iter().map(|(controller, action, _)| (controller.as_str(), action.as_str()))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn module(&self) -> &str {
        &self.module
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("version", &self.version)
            .field("service", &self.service)
            .field("module", &self.module)
            .field("middleware", &self.middleware.len())
            .field("actions", &self.action_names().collect::<Vec<_>>())
            .finish()
    }
}

pub struct RouteTable {
    routes: HashMap<String, HandlerChain>,
    global: HandlerChain,
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable").field("actions", &self.actions()).field("global", &self.global.len()).finish()
    }
}

impl RouteTable {
    /// Flattens `groups` into the table, failing on the first key installed twice.
    pub fn build(global: &[Arc<dyn RequestHandler>], groups: Vec<Group>) -> Result<Self, RouteError> {
        let mut routes = HashMap::new();

        for group in groups {
            for (controller, action, handler) in group.actions {
                let key = envelope::route_key(&group.version, &group.service, &group.module, &controller, &action);

                let chain = global
                    .iter()
                    .chain(group.middleware.iter())
                    .cloned()
                    .chain(std::iter::once(handler))
                    .collect::<HandlerChain>();

                match routes.entry(key) {
                    Entry::Occupied(entry) => return Err(RouteError::duplicate_route(entry.key())),
                    Entry::Vacant(entry) => {
                        debug!(route = entry.key().as_str(), steps = chain.len(), "register route");
                        entry.insert(chain);
                    }
                }
            }
        }

        Ok(Self { routes, global: global.iter().cloned().collect() })
    }

    /// Resolves the chain for `header`, ignoring case.
    pub fn lookup(&self, header: &ApiHeader) -> Option<&HandlerChain> {
        self.routes.get(&header.route_key())
    }

    /// The chain run when no route matches: the global middleware alone.
    pub fn global_chain(&self) -> &HandlerChain {
        &self.global
    }

    /// Every registered key, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut actions = self.routes.keys().map(String::as_str).collect::<Vec<_>>();
        actions.sort_unstable();
        actions
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
