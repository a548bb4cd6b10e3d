//! Extension route registration.
//!
//! # Responsibility
//! - Turn every page of an activated extension into a `Route` and a bound
//!   `RouteSpecificComponent`, registered under the route tokens.
//! - Number activations per extension id so re-activation never collides
//!   with entries left by an earlier installation.
//!
//! # Invariants
//! - Configuration errors (invalid/duplicate page ids, identifier collisions)
//!   are detected before the first registry write; a rejected activation
//!   leaves the registry untouched.
//! - A registry failure while committing removes the entries already written
//!   by the same activation.
//! - A page whose parameters fail to normalize is skipped; its siblings still
//!   register.
//! - Entries are tagged with the extension id so the lifecycle owner can
//!   purge them on deactivation.

use crate::extension::model::{Extension, ExtensionModelError, PageRegistration};
use crate::extension::params::{NormalizeError, PageParams, PageParamsNormalizer};
use crate::extension::siblings::sibling_entries;
use crate::reactive::{ObserverBoundary, Signal};
use crate::registry::{Injectable, Registry, RegistryError};
use crate::routing::render::TabEntry;
use crate::routing::route::{
    extension_route_path, ComponentLayout, Route, RouteKey, RouteSpecificComponent,
    ROUTE_SPECIFIC_COMPONENT_TOKEN, ROUTE_TOKEN,
};
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Per-extension activation counter.
#[derive(Debug, Default, Clone)]
pub struct InstallationCounter {
    counts: BTreeMap<String, u32>,
}

impl InstallationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the installation number of `extension_id`,
    /// starting at 1.
    pub fn next(&mut self, extension_id: &str) -> u32 {
        let count = self.counts.entry(extension_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn current(&self, extension_id: &str) -> Option<u32> {
        self.counts.get(extension_id).copied()
    }
}

/// Outcome of one successful activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub extension_id: String,
    pub installation: u32,
    /// Keys of the registered routes, in page declaration order.
    pub registered: Vec<RouteKey>,
    /// Pages left unregistered because their parameters failed to normalize.
    pub failures: Vec<PageFailure>,
}

impl RegistrationReport {
    pub fn route_ids(&self) -> Vec<String> {
        self.registered.iter().map(RouteKey::route_id).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One page skipped during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page_id: String,
    pub error: NormalizeError,
}

struct PreparedRoute {
    key: RouteKey,
    path: String,
    cluster_frame: bool,
    layout: ComponentLayout,
    page: PageRegistration,
    params: PageParams,
}

/// Registers extension pages as routes.
pub struct ExtensionRouteRegistrator<N> {
    normalizer: N,
    installations: InstallationCounter,
}

impl<N: PageParamsNormalizer> ExtensionRouteRegistrator<N> {
    pub fn new(normalizer: N) -> Self {
        Self {
            normalizer,
            installations: InstallationCounter::new(),
        }
    }

    pub fn installations(&self) -> &InstallationCounter {
        &self.installations
    }

    /// Handles one activation event: bumps the installation counter of the
    /// extension and registers its routes under the new number.
    pub fn activate(
        &mut self,
        registry: &mut Registry,
        extension: &Extension,
    ) -> Result<RegistrationReport, RegistrationError> {
        let installation = self.installations.next(&extension.id);
        self.register(registry, extension, installation)
    }

    /// Registers every page of `extension` for installation number
    /// `installation`.
    pub fn register(
        &self,
        registry: &mut Registry,
        extension: &Extension,
        installation: u32,
    ) -> Result<RegistrationReport, RegistrationError> {
        if let Err(err) = self.check_configuration(registry, extension, installation) {
            warn!(
                "event=extension_routes_rejected module=routing status=error extension={} installation={} reason={}",
                extension.id, installation, err
            );
            return Err(err);
        }

        let mut prepared = Vec::with_capacity(extension.page_count());
        let mut failures = Vec::new();
        for (page, cluster_frame) in extension.pages() {
            match self.prepare(extension, page, cluster_frame, installation) {
                Ok(route) => prepared.push(route),
                Err(error) => {
                    warn!(
                        "event=extension_page_skipped module=routing status=error extension={} page={} reason={}",
                        extension.id, page.id, error
                    );
                    failures.push(PageFailure {
                        page_id: page.id.clone(),
                        error,
                    });
                }
            }
        }

        let registered = commit(registry, &extension.id, prepared)?;

        info!(
            "event=extension_routes_registered module=routing status=ok extension={} installation={} routes={} skipped={}",
            extension.id,
            installation,
            registered.len(),
            failures.len()
        );

        Ok(RegistrationReport {
            extension_id: extension.id.clone(),
            installation,
            registered,
            failures,
        })
    }

    fn check_configuration(
        &self,
        registry: &Registry,
        extension: &Extension,
        installation: u32,
    ) -> Result<(), RegistrationError> {
        extension
            .validate_pages()
            .map_err(|source| RegistrationError::InvalidExtension {
                extension_id: extension.id.clone(),
                source,
            })?;

        let mut generated = BTreeSet::new();
        for (page, _) in extension.pages() {
            let key = RouteKey::new(extension.id.as_str(), page.id.as_str(), installation);
            for id in [key.route_id(), key.component_id()] {
                if registry.contains(&id) || !generated.insert(id.clone()) {
                    return Err(RegistrationError::IdentifierTaken(id));
                }
            }
        }
        Ok(())
    }

    fn prepare(
        &self,
        extension: &Extension,
        page: &PageRegistration,
        cluster_frame: bool,
        installation: u32,
    ) -> Result<PreparedRoute, NormalizeError> {
        let params = self.normalizer.normalize(extension, page)?;

        let siblings = sibling_entries(&extension.cluster_page_menus, &page.id);
        let layout = if siblings.is_empty() {
            ComponentLayout::Direct
        } else {
            ComponentLayout::SiblingsInTabs(
                siblings
                    .into_iter()
                    .map(|entry| TabEntry {
                        page_id: entry.target_page_id.clone(),
                        title: entry.title.clone(),
                        path: extension_route_path(&extension.id, &entry.target_page_id),
                        active: entry.target_page_id == page.id,
                    })
                    .collect(),
            )
        };

        Ok(PreparedRoute {
            key: RouteKey::new(extension.id.as_str(), page.id.as_str(), installation),
            path: extension_route_path(&extension.id, &page.id),
            cluster_frame,
            layout,
            page: page.clone(),
            params,
        })
    }
}

/// Registers every prepared route. On failure, entries written by this call
/// are removed again before the error is returned.
fn commit(
    registry: &mut Registry,
    extension_id: &str,
    prepared: Vec<PreparedRoute>,
) -> Result<Vec<RouteKey>, RegistrationError> {
    let mut registered = Vec::with_capacity(prepared.len());
    let mut written = Vec::with_capacity(prepared.len() * 2);
    for route in prepared {
        let key = route.key.clone();
        if let Err(err) = register_route(registry, extension_id, route, &mut written) {
            for id in &written {
                registry.unregister(id);
            }
            warn!(
                "event=extension_routes_rolled_back module=routing status=error extension={} removed={} reason={}",
                extension_id,
                written.len(),
                err
            );
            return Err(err.into());
        }
        registered.push(key);
    }
    Ok(registered)
}

fn register_route(
    registry: &mut Registry,
    extension_id: &str,
    route: PreparedRoute,
    written: &mut Vec<String>,
) -> Result<(), RegistryError> {
    let PreparedRoute {
        key,
        path,
        cluster_frame,
        layout,
        page,
        params,
    } = route;
    let route_id = key.route_id();
    let component_id = key.component_id();

    let route_injectable = {
        let route_id = route_id.clone();
        let owner_id = extension_id.to_string();
        Injectable::new(route_id.clone(), move |_: &Registry| {
            Ok(Route {
                id: route_id.clone(),
                key: key.clone(),
                path: path.clone(),
                cluster_frame,
                is_enabled: Signal::new(true),
                extension_id: owner_id.clone(),
            })
        })
        .with_token(ROUTE_TOKEN)
        .owned_by(extension_id)
    };

    let params = Rc::new(params);
    let component_injectable = {
        let route_id = route_id.clone();
        Injectable::new(component_id.clone(), move |registry: &Registry| {
            let route = registry.inject::<Route>(&route_id)?;
            let component = Rc::clone(&page.component);
            let params = Rc::clone(&params);
            let boundary = ObserverBoundary::new(move || component.render(&params));
            Ok(RouteSpecificComponent::new(route, layout.clone(), boundary))
        })
        .with_token(ROUTE_SPECIFIC_COMPONENT_TOKEN)
        .owned_by(extension_id)
    };

    registry.register(route_injectable)?;
    written.push(route_id);
    registry.register(component_injectable)?;
    written.push(component_id);
    Ok(())
}

/// Activation-level registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    InvalidExtension {
        extension_id: String,
        source: ExtensionModelError,
    },
    IdentifierTaken(String),
    Registry(RegistryError),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExtension {
                extension_id,
                source,
            } => write!(f, "extension `{extension_id}` is misconfigured: {source}"),
            Self::IdentifierTaken(value) => {
                write!(f, "route identifier already registered: {value}")
            }
            Self::Registry(err) => write!(f, "registry rejected route: {err}"),
        }
    }
}

impl Error for RegistrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidExtension { source, .. } => Some(source),
            Self::IdentifierTaken(_) => None,
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<RegistryError> for RegistrationError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}
