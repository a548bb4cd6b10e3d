//! Startup hooks.
//!
//! Hooks are registered under phase tokens and executed by
//! [`scheduler::StartupScheduler`] in `run_after` order, each at most once.

pub mod hook;
pub mod scheduler;
pub mod tray;
