//! Tray startup hooks.
//!
//! The tray itself is owned by the host UI; this module only wires its two
//! startup actions into the `on-load-of-application` phase: start the tray,
//! then start keeping the menu icon in sync with the icon state signal.

use crate::reactive::{Signal, Subscription};
use crate::registry::{Injectable, Registry, RegistryError};
use crate::startup::hook::{HookResult, StartupHook, ON_LOAD_OF_APPLICATION};
use std::cell::RefCell;
use std::rc::Rc;

pub const START_TRAY_HOOK_ID: &str = "start-tray";
pub const START_REACTIVE_TRAY_MENU_ICON_HOOK_ID: &str = "start-reactive-tray-menu-icon";

/// Icon variants shown by the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayIconState {
    Normal,
    UpdateAvailable,
}

/// Host tray facility.
pub trait TrayIcon {
    fn start(&self) -> HookResult;
    fn set_icon(&self, state: TrayIconState);
}

/// Pushes icon state changes to the tray while started.
pub struct ReactiveTrayMenuIcon {
    tray: Rc<dyn TrayIcon>,
    state: Signal<TrayIconState>,
    subscription: RefCell<Option<Subscription>>,
}

impl ReactiveTrayMenuIcon {
    pub fn new(tray: Rc<dyn TrayIcon>, state: Signal<TrayIconState>) -> Self {
        Self {
            tray,
            state,
            subscription: RefCell::new(None),
        }
    }

    /// Applies the current state and follows later changes. Calling it again
    /// while started has no effect.
    pub fn start(&self) {
        if self.is_started() {
            return;
        }
        self.tray.set_icon(self.state.get());

        let tray = Rc::clone(&self.tray);
        let state = self.state.clone();
        let subscription = self.state.subscribe(move || tray.set_icon(state.get()));
        *self.subscription.borrow_mut() = Some(subscription);
    }

    pub fn stop(&self) {
        drop(self.subscription.borrow_mut().take());
    }

    pub fn is_started(&self) -> bool {
        self.subscription.borrow().is_some()
    }
}

pub fn start_tray_hook(tray: Rc<dyn TrayIcon>) -> StartupHook {
    StartupHook::new(START_TRAY_HOOK_ID, move || tray.start())
}

pub fn start_reactive_tray_menu_icon_hook(icon: Rc<ReactiveTrayMenuIcon>) -> StartupHook {
    StartupHook::new(START_REACTIVE_TRAY_MENU_ICON_HOOK_ID, move || {
        icon.start();
        Ok(())
    })
    .run_after(START_TRAY_HOOK_ID)
}

/// Registers both tray hooks and returns the reactive icon handle.
pub fn register_tray_hooks(
    registry: &mut Registry,
    tray: Rc<dyn TrayIcon>,
    state: Signal<TrayIconState>,
) -> Result<Rc<ReactiveTrayMenuIcon>, RegistryError> {
    let icon = Rc::new(ReactiveTrayMenuIcon::new(Rc::clone(&tray), state));
    let hooks = [
        start_tray_hook(tray),
        start_reactive_tray_menu_icon_hook(Rc::clone(&icon)),
    ];
    for hook in hooks {
        let id = hook.id().to_string();
        registry.register(
            Injectable::new(id, move |_: &Registry| Ok(hook.clone()))
                .with_token(ON_LOAD_OF_APPLICATION),
        )?;
    }
    Ok(icon)
}

#[cfg(test)]
mod tests {
    use super::{register_tray_hooks, TrayIcon, TrayIconState};
    use crate::reactive::Signal;
    use crate::registry::Registry;
    use crate::startup::hook::{HookResult, StartupPhase};
    use crate::startup::scheduler::{StartupError, StartupScheduler};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeTray {
        fail_start: bool,
        calls: RefCell<Vec<String>>,
    }

    impl TrayIcon for FakeTray {
        fn start(&self) -> HookResult {
            if self.fail_start {
                return Err("no system tray".into());
            }
            self.calls.borrow_mut().push("start".to_string());
            Ok(())
        }

        fn set_icon(&self, state: TrayIconState) {
            self.calls.borrow_mut().push(format!("icon:{state:?}"));
        }
    }

    #[test]
    fn icon_follows_state_after_tray_starts() {
        let tray = Rc::new(FakeTray::default());
        let state = Signal::new(TrayIconState::Normal);
        let mut registry = Registry::new();
        let icon = register_tray_hooks(&mut registry, tray.clone(), state.clone())
            .expect("register tray hooks");

        StartupScheduler::new()
            .run_phase(&registry, StartupPhase::OnLoadOfApplication)
            .expect("startup");
        assert!(icon.is_started());

        state.set(TrayIconState::UpdateAvailable);
        assert_eq!(
            *tray.calls.borrow(),
            vec!["start", "icon:Normal", "icon:UpdateAvailable"]
        );

        icon.stop();
        state.set(TrayIconState::Normal);
        assert_eq!(tray.calls.borrow().len(), 3);
    }

    #[test]
    fn icon_is_not_started_when_tray_fails() {
        let tray = Rc::new(FakeTray {
            fail_start: true,
            ..FakeTray::default()
        });
        let mut registry = Registry::new();
        let icon = register_tray_hooks(&mut registry, tray, Signal::new(TrayIconState::Normal))
            .expect("register tray hooks");

        let err = StartupScheduler::new()
            .run_phase(&registry, StartupPhase::OnLoadOfApplication)
            .expect_err("tray start fails");
        match err {
            StartupError::HooksFailed(report) => {
                assert_eq!(report.skipped, vec!["start-reactive-tray-menu-icon"]);
            }
            other => panic!("expected HooksFailed, got {other:?}"),
        }
        assert!(!icon.is_started());
    }
}
