//! Startup hook descriptors and phase tokens.

use crate::registry::InjectionToken;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Error returned by a failing hook action.
pub type HookError = Box<dyn Error>;

/// Result of one hook action.
pub type HookResult = Result<(), HookError>;

/// Hooks run before the application starts loading.
pub const BEFORE_APPLICATION_IS_LOADING: InjectionToken<StartupHook> =
    InjectionToken::new("before-application-is-loading");

/// Hooks run while the application loads.
pub const ON_LOAD_OF_APPLICATION: InjectionToken<StartupHook> =
    InjectionToken::new("on-load-of-application");

/// Hooks run once the application has loaded.
pub const AFTER_APPLICATION_IS_LOADED: InjectionToken<StartupHook> =
    InjectionToken::new("after-application-is-loaded");

/// Startup phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartupPhase {
    BeforeApplicationIsLoading,
    OnLoadOfApplication,
    AfterApplicationIsLoaded,
}

impl StartupPhase {
    pub const ALL: [StartupPhase; 3] = [
        Self::BeforeApplicationIsLoading,
        Self::OnLoadOfApplication,
        Self::AfterApplicationIsLoaded,
    ];

    pub fn token(self) -> InjectionToken<StartupHook> {
        match self {
            Self::BeforeApplicationIsLoading => BEFORE_APPLICATION_IS_LOADING,
            Self::OnLoadOfApplication => ON_LOAD_OF_APPLICATION,
            Self::AfterApplicationIsLoaded => AFTER_APPLICATION_IS_LOADED,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.token().id()
    }
}

/// Named start-up action with optional ordering constraints.
#[derive(Clone)]
pub struct StartupHook {
    id: String,
    run: Rc<dyn Fn() -> HookResult>,
    run_after: Vec<String>,
}

impl StartupHook {
    pub fn new(id: impl Into<String>, run: impl Fn() -> HookResult + 'static) -> Self {
        Self {
            id: id.into(),
            run: Rc::new(run),
            run_after: Vec::new(),
        }
    }

    /// Requires hook `id` to have completed before this one runs.
    pub fn run_after(mut self, id: impl Into<String>) -> Self {
        self.run_after.push(id.into());
        self
    }

    /// Same as [`StartupHook::run_after`], taking the predecessor itself.
    pub fn run_after_hook(self, hook: &StartupHook) -> Self {
        let id = hook.id.clone();
        self.run_after(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn predecessors(&self) -> &[String] {
        &self.run_after
    }

    pub fn run(&self) -> HookResult {
        (self.run)()
    }
}

impl Debug for StartupHook {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupHook")
            .field("id", &self.id)
            .field("run_after", &self.run_after)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{StartupHook, StartupPhase};

    #[test]
    fn run_after_hook_records_predecessor_id() {
        let tray = StartupHook::new("start-tray", || Ok(()));
        let icon = StartupHook::new("start-reactive-tray-menu-icon", || Ok(()))
            .run_after_hook(&tray)
            .run_after("start-settings");

        assert_eq!(icon.predecessors(), ["start-tray", "start-settings"]);
        assert!(icon.run().is_ok());
    }

    #[test]
    fn phases_map_to_distinct_tokens() {
        let ids: Vec<&str> = StartupPhase::ALL.iter().map(|phase| phase.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "before-application-is-loading",
                "on-load-of-application",
                "after-application-is-loaded"
            ]
        );
    }
}
