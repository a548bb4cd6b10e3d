//! Core of the host shell's extension routing.
//! Startup hook ordering and extension route registration over one
//! explicitly owned injection registry.

pub mod extension;
pub mod logging;
pub mod reactive;
pub mod registry;
pub mod routing;
pub mod startup;

pub use extension::model::{
    sanitize_extension_name, Extension, ExtensionModelError, MenuEntry, PageRegistration,
    ParamDeclaration, ParamValue,
};
pub use extension::params::{
    LocationParamsNormalizer, LocationSource, NormalizeError, PageParam, PageParams,
    PageParamsNormalizer,
};
pub use extension::registrator::{
    ExtensionRouteRegistrator, InstallationCounter, PageFailure, RegistrationError,
    RegistrationReport,
};
pub use extension::siblings::{sibling_entries, sibling_page_ids};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingConfig, LoggingError};
pub use reactive::{ObserverBoundary, Signal, Subscription};
pub use registry::{Injectable, InjectionToken, Registry, RegistryError};
pub use routing::navigation::{component_for_route, find_route, ObservableLocation, QueryParams};
pub use routing::render::{PageComponent, RenderOutput, TabEntry};
pub use routing::route::{
    extension_route_path, ComponentLayout, Route, RouteKey, RouteSnapshot,
    RouteSpecificComponent, EXTENSION_ROUTE_PREFIX, ROUTE_SPECIFIC_COMPONENT_TOKEN, ROUTE_TOKEN,
};
pub use startup::hook::{
    HookError, HookResult, StartupHook, StartupPhase, AFTER_APPLICATION_IS_LOADED,
    BEFORE_APPLICATION_IS_LOADING, ON_LOAD_OF_APPLICATION,
};
pub use startup::scheduler::{resolve_order, HookFailure, StartupError, StartupReport, StartupScheduler};
pub use startup::tray::{
    register_tray_hooks, ReactiveTrayMenuIcon, TrayIcon, TrayIconState,
    START_REACTIVE_TRAY_MENU_ICON_HOOK_ID, START_TRAY_HOOK_ID,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
