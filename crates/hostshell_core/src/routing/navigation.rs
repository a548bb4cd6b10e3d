//! Navigation state and route matching.
//!
//! # Responsibility
//! - Hold the current location as signals so pages reading query parameters
//!   re-render on navigation.
//! - Match a path to a registered, enabled route through the route token.

use crate::extension::params::LocationSource;
use crate::reactive::Signal;
use crate::registry::{Registry, RegistryError};
use crate::routing::route::{Route, RouteSpecificComponent, ROUTE_SPECIFIC_COMPONENT_TOKEN, ROUTE_TOKEN};
use std::collections::BTreeMap;
use std::rc::Rc;
use url::form_urlencoded;

/// Query parameters; one name may carry several values.
pub type QueryParams = BTreeMap<String, Vec<String>>;

/// Current location of the host shell.
#[derive(Debug, Clone)]
pub struct ObservableLocation {
    pathname: Signal<String>,
    query: Signal<QueryParams>,
}

impl Default for ObservableLocation {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableLocation {
    pub fn new() -> Self {
        Self {
            pathname: Signal::new("/".to_string()),
            query: Signal::new(QueryParams::new()),
        }
    }

    /// Moves to `target`, e.g. `/extension/acme/overview?tab=pods&ns=a&ns=b`.
    /// Query names and values are form-urlencoded.
    pub fn navigate(&self, target: &str) {
        let (path, query) = parse_target(target);
        self.pathname.set(path);
        self.query.set(query);
    }

    pub fn pathname(&self) -> String {
        self.pathname.get()
    }

    pub fn query(&self) -> QueryParams {
        self.query.get()
    }
}

impl LocationSource for ObservableLocation {
    fn query_values(&self, name: &str) -> Vec<String> {
        self.query
            .with(|query| query.get(name).cloned().unwrap_or_default())
    }
}

fn parse_target(target: &str) -> (String, QueryParams) {
    let (path, raw_query) = target.split_once('?').unwrap_or((target, ""));
    let path = if path.is_empty() { "/" } else { path };

    let mut query = QueryParams::new();
    for (name, value) in form_urlencoded::parse(raw_query.as_bytes()) {
        if name.is_empty() {
            continue;
        }
        query
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    (path.to_string(), query)
}

/// Finds the enabled route registered for `path` in the given frame.
///
/// When several installations registered the same path, the most recent
/// registration wins.
pub fn find_route(
    registry: &Registry,
    path: &str,
    cluster_frame: bool,
) -> Result<Option<Rc<Route>>, RegistryError> {
    let routes = registry.inject_all(&ROUTE_TOKEN)?;
    Ok(routes.into_iter().rev().find(|route| {
        route.path == path && route.cluster_frame == cluster_frame && route.is_enabled.get()
    }))
}

/// Finds the component bound to `route_id`.
pub fn component_for_route(
    registry: &Registry,
    route_id: &str,
) -> Result<Option<Rc<RouteSpecificComponent>>, RegistryError> {
    let components = registry.inject_all(&ROUTE_SPECIFIC_COMPONENT_TOKEN)?;
    Ok(components
        .into_iter()
        .find(|component| component.route_id() == route_id))
}
