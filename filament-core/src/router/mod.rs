//! SPA Router
//!
//! Maps canonical paths to page callbacks and dispatches navigation to
//! registered handlers. The router owns a [`NavigationBus`]; pushing or
//! replacing a location on the bus drives navigation, and `back` replays
//! the previous entry.
//!
//! # Dispatch
//!
//! A navigation resolves the target to a canonical path, deduplicates
//! against the current path, looks up the page (unknown paths get a
//! no-op page), and invokes every handler with `(path, page)`. Pages are
//! opaque callbacks; bridging a page into the reactive core's
//! zero-argument consumers is up to the handler.

mod bus;
mod path;

pub use bus::NavigationBus;
pub use path::resolve_path;

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::info;

/// A page callback dispatched on navigation.
pub type Route = Arc<dyn Fn() + Send + Sync>;

/// A navigation handler, invoked with the canonical path and its page.
pub type NavigationHandler = Arc<dyn Fn(&str, &Route) + Send + Sync>;

/// Route table plus navigation dispatch.
pub struct Router {
    routes: RwLock<IndexMap<String, Route>>,
    handlers: RwLock<Vec<NavigationHandler>>,
    current: RwLock<Option<String>>,
    bus: Arc<NavigationBus>,
}

impl Router {
    /// Create a router wired to a fresh navigation bus.
    pub fn new() -> Arc<Self> {
        Self::with_bus(Arc::new(NavigationBus::new()))
    }

    /// Create a router listening to an existing bus. The bus may already
    /// carry a location (the initial URL); it renders on the first
    /// `register_routes` call.
    pub fn with_bus(bus: Arc<NavigationBus>) -> Arc<Self> {
        let router = Arc::new(Self {
            routes: RwLock::new(IndexMap::new()),
            handlers: RwLock::new(Vec::new()),
            current: RwLock::new(None),
            bus,
        });

        let weak: Weak<Router> = Arc::downgrade(&router);
        router.bus.subscribe(move |url| {
            if let Some(router) = weak.upgrade() {
                router.navigate(url);
            }
        });

        router
    }

    /// The navigation bus this router listens to.
    pub fn bus(&self) -> &Arc<NavigationBus> {
        &self.bus
    }

    /// Register a single route under its canonical path.
    pub fn register_route<F>(&self, path: &str, page: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.routes
            .write()
            .insert(resolve_path(path), Arc::new(page));
    }

    /// Register a batch of routes, then render the bus's current
    /// location, if any.
    pub fn register_routes<I>(&self, routes: I)
    where
        I: IntoIterator<Item = (String, Route)>,
    {
        {
            let mut table = self.routes.write();
            for (path, page) in routes {
                table.insert(resolve_path(&path), page);
            }
        }

        if let Some(url) = self.bus.location() {
            self.navigate(&url);
        }
    }

    /// Register a handler invoked with `(path, page)` on every
    /// navigation.
    pub fn on_navigate<F>(&self, handler: F)
    where
        F: Fn(&str, &Route) + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Navigate to a target. No-op when the canonical path equals the
    /// current one.
    pub fn navigate(&self, url: &str) {
        let path = resolve_path(url);

        {
            let mut current = self.current.write();
            if current.as_deref() == Some(path.as_str()) {
                return;
            }
            *current = Some(path.clone());
        }

        info!(%path, "navigating");

        let page: Route = self
            .routes
            .read()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| Arc::new(|| {}));

        // Snapshot so handlers can register more handlers reentrantly.
        let handlers: Vec<NavigationHandler> = self.handlers.read().clone();
        for handler in handlers {
            handler(&path, &page);
        }
    }

    /// The canonical path of the last completed navigation.
    pub fn current_path(&self) -> Option<String> {
        self.current.read().clone()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("current", &self.current_path())
            .field("route_count", &self.routes.read().len())
            .finish()
    }
}
