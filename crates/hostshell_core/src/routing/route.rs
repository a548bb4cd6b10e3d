//! Route records and their collection tokens.
//!
//! # Invariants
//! - A route's identity (`id`, `path`, `cluster_frame`, `extension_id`) never
//!   changes after creation; only its `is_enabled` signal may.
//! - Route and component identifiers are derived from `RouteKey` only, so one
//!   (extension, page, installation) triple maps to exactly one pair of ids.

use crate::reactive::{ObserverBoundary, Signal, Subscription};
use crate::registry::InjectionToken;
use crate::routing::render::{RenderOutput, TabEntry};
use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

/// Collects every registered route, for navigation matching.
pub const ROUTE_TOKEN: InjectionToken<Route> = InjectionToken::new("route");

/// Collects every registered route-specific component, for render lookup.
pub const ROUTE_SPECIFIC_COMPONENT_TOKEN: InjectionToken<RouteSpecificComponent> =
    InjectionToken::new("route-specific-component");

/// Path prefix shared by all extension routes.
pub const EXTENSION_ROUTE_PREFIX: &str = "/extension";

/// Returns the navigable path of one extension page.
///
/// An empty page id addresses the extension's default page.
pub fn extension_route_path(extension_id: &str, page_id: &str) -> String {
    if page_id.is_empty() {
        format!("{EXTENSION_ROUTE_PREFIX}/{extension_id}")
    } else {
        format!("{EXTENSION_ROUTE_PREFIX}/{extension_id}/{page_id}")
    }
}

/// Uniqueness key of generated route identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RouteKey {
    pub extension_id: String,
    pub page_id: String,
    pub installation: u32,
}

impl RouteKey {
    pub fn new(extension_id: impl Into<String>, page_id: impl Into<String>, installation: u32) -> Self {
        Self {
            extension_id: extension_id.into(),
            page_id: page_id.into(),
            installation,
        }
    }

    /// `route:<ext>/<page>/<n>`. Neither id grammar admits `/` or `:`, so
    /// distinct keys never share an identifier.
    pub fn route_id(&self) -> String {
        format!("route:{self}")
    }

    /// `route-component:<ext>/<page>/<n>`.
    pub fn component_id(&self) -> String {
        format!("route-component:{self}")
    }
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.extension_id, self.page_id, self.installation)
    }
}

/// Navigable identity bound to one extension page.
#[derive(Debug)]
pub struct Route {
    pub id: String,
    pub key: RouteKey,
    pub path: String,
    pub cluster_frame: bool,
    pub is_enabled: Signal<bool>,
    pub extension_id: String,
}

impl Route {
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            id: self.id.clone(),
            key: self.key.to_string(),
            path: self.path.clone(),
            cluster_frame: self.cluster_frame,
            enabled: self.is_enabled.get(),
            extension_id: self.extension_id.clone(),
        }
    }
}

/// Plain diagnostic view of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSnapshot {
    pub id: String,
    pub key: String,
    pub path: String,
    pub cluster_frame: bool,
    pub enabled: bool,
    pub extension_id: String,
}

/// Layout chosen for a route's component at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentLayout {
    Direct,
    SiblingsInTabs(Vec<TabEntry>),
}

/// Route paired with its bound render output.
pub struct RouteSpecificComponent {
    route: Rc<Route>,
    layout: ComponentLayout,
    page: ObserverBoundary<RenderOutput>,
}

impl RouteSpecificComponent {
    pub fn new(
        route: Rc<Route>,
        layout: ComponentLayout,
        page: ObserverBoundary<RenderOutput>,
    ) -> Self {
        Self { route, layout, page }
    }

    pub fn route(&self) -> &Rc<Route> {
        &self.route
    }

    pub fn route_id(&self) -> &str {
        &self.route.id
    }

    pub fn layout(&self) -> &ComponentLayout {
        &self.layout
    }

    /// Renders the page, inside the sibling tab shell when the layout asks
    /// for one.
    pub fn render(&self) -> RenderOutput {
        let page = self.page.render();
        match &self.layout {
            ComponentLayout::Direct => page,
            ComponentLayout::SiblingsInTabs(tabs) => RenderOutput::SiblingsInTabLayout {
                tabs: tabs.clone(),
                content: Box::new(page),
            },
        }
    }

    /// Notified when state read by the page changes and `render` would
    /// produce fresh output.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.page.subscribe(listener)
    }

    pub fn needs_render(&self) -> bool {
        self.page.is_stale()
    }
}

impl Debug for RouteSpecificComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpecificComponent")
            .field("route_id", &self.route.id)
            .field("layout", &self.layout)
            .field("page", &self.page)
            .finish()
    }
}
