//! Route records, render contracts and navigation matching.
//!
//! Routes are produced by the extension route registrator and consumed by the
//! host's navigation and rendering subsystems through the registry tokens
//! declared in [`route`].

pub mod navigation;
pub mod render;
pub mod route;
