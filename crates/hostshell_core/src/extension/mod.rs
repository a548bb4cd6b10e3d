//! Extension declarations and route registration.
//!
//! Loading, activation and deactivation of extensions belong to the host;
//! this module reads activated extensions and contributes their pages to the
//! registry.

pub mod model;
pub mod params;
pub mod registrator;
pub mod siblings;
