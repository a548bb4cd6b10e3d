//! Startup hook scheduling.
//!
//! # Responsibility
//! - Order hooks so every hook runs after all of its `run_after`
//!   predecessors.
//! - Run each hook at most once per scheduler, across phases.
//!
//! # Invariants
//! - Configuration errors (duplicate ids, unknown predecessors, cycles) are
//!   reported before any hook of the batch runs.
//! - A failed hook is never retried; hooks depending on it, directly or
//!   transitively, are skipped. Independent hooks still run.
//! - Hooks without constraints keep their registration order relative to
//!   each other.

use crate::registry::{Registry, RegistryError};
use crate::startup::hook::{StartupHook, StartupPhase};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Returns hook indices in an execution order consistent with every
/// `run_after` edge.
///
/// Predecessors listed in `satisfied` are treated as already handled and do
/// not need to be part of `hooks`.
pub fn resolve_order(
    hooks: &[StartupHook],
    satisfied: &BTreeSet<String>,
) -> Result<Vec<usize>, StartupError> {
    let mut index = BTreeMap::<&str, usize>::new();
    for (position, hook) in hooks.iter().enumerate() {
        if index.insert(hook.id(), position).is_some() {
            return Err(StartupError::DuplicateHookId(hook.id().to_string()));
        }
    }

    let mut edges = Vec::with_capacity(hooks.len());
    for hook in hooks {
        let mut predecessors = Vec::new();
        for predecessor in hook.predecessors() {
            match index.get(predecessor.as_str()) {
                Some(position) => predecessors.push(*position),
                None if satisfied.contains(predecessor) => {}
                None => {
                    return Err(StartupError::UnknownDependency {
                        hook: hook.id().to_string(),
                        run_after: predecessor.clone(),
                    })
                }
            }
        }
        edges.push(predecessors);
    }

    // Kahn's algorithm; the lowest ready index runs first so unconstrained
    // hooks keep registration order.
    let mut unresolved: Vec<usize> = edges.iter().map(Vec::len).collect();
    let mut successors = vec![Vec::new(); hooks.len()];
    for (node, predecessors) in edges.iter().enumerate() {
        for predecessor in predecessors {
            successors[*predecessor].push(node);
        }
    }

    let mut ready: BTreeSet<usize> = (0..hooks.len())
        .filter(|node| unresolved[*node] == 0)
        .collect();
    let mut order = Vec::with_capacity(hooks.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for successor in &successors[node] {
            unresolved[*successor] -= 1;
            if unresolved[*successor] == 0 {
                ready.insert(*successor);
            }
        }
    }

    if order.len() < hooks.len() {
        return Err(StartupError::Cycle(
            find_cycle(&edges, &unresolved)
                .into_iter()
                .map(|position| hooks[position].id().to_string())
                .collect(),
        ));
    }
    Ok(order)
}

/// Walks predecessor edges between unresolved hooks until one repeats.
///
/// Every unresolved hook has an unresolved predecessor, so the walk always
/// closes a cycle. The returned path starts and ends with the same hook.
fn find_cycle(edges: &[Vec<usize>], unresolved: &[usize]) -> Vec<usize> {
    let Some(mut node) = unresolved.iter().position(|count| *count > 0) else {
        return Vec::new();
    };
    let mut path = Vec::new();
    loop {
        if let Some(start) = path.iter().position(|seen| *seen == node) {
            let mut cycle = path[start..].to_vec();
            cycle.push(node);
            return cycle;
        }
        path.push(node);
        match edges[node]
            .iter()
            .find(|predecessor| unresolved[**predecessor] > 0)
        {
            Some(predecessor) => node = *predecessor,
            None => return path,
        }
    }
}

/// One failed hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub hook_id: String,
    pub message: String,
}

/// Outcome of one scheduler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Hooks that ran successfully, in execution order.
    pub completed: Vec<String>,
    pub failed: Vec<HookFailure>,
    /// Hooks not run because a predecessor failed or was skipped.
    pub skipped: Vec<String>,
}

/// Runs startup hooks in dependency order, once each.
#[derive(Debug, Default)]
pub struct StartupScheduler {
    completed: BTreeSet<String>,
    blocked: BTreeSet<String>,
}

impl StartupScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_run(&self, hook_id: &str) -> bool {
        self.completed.contains(hook_id)
    }

    /// Runs every hook of `hooks` not handled by an earlier call.
    ///
    /// Returns `HooksFailed` with the full report when at least one hook
    /// failed.
    pub fn run(&mut self, hooks: &[StartupHook]) -> Result<StartupReport, StartupError> {
        let pending: Vec<StartupHook> = hooks
            .iter()
            .filter(|hook| !self.completed.contains(hook.id()) && !self.blocked.contains(hook.id()))
            .cloned()
            .collect();

        let handled: BTreeSet<String> = self.completed.union(&self.blocked).cloned().collect();
        let order = resolve_order(&pending, &handled)?;

        let mut report = StartupReport::default();
        for position in order {
            let hook = &pending[position];
            if let Some(blocker) = hook
                .predecessors()
                .iter()
                .find(|predecessor| self.blocked.contains(predecessor.as_str()))
            {
                warn!(
                    "event=startup_hook_skipped module=startup status=error hook={} blocked_by={}",
                    hook.id(),
                    blocker
                );
                self.blocked.insert(hook.id().to_string());
                report.skipped.push(hook.id().to_string());
                continue;
            }

            match hook.run() {
                Ok(()) => {
                    info!("event=startup_hook_run module=startup status=ok hook={}", hook.id());
                    self.completed.insert(hook.id().to_string());
                    report.completed.push(hook.id().to_string());
                }
                Err(err) => {
                    error!(
                        "event=startup_hook_failed module=startup status=error hook={} error={}",
                        hook.id(),
                        err
                    );
                    self.blocked.insert(hook.id().to_string());
                    report.failed.push(HookFailure {
                        hook_id: hook.id().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if report.failed.is_empty() {
            Ok(report)
        } else {
            Err(StartupError::HooksFailed(report))
        }
    }

    /// Runs the hooks registered under `phase`.
    pub fn run_phase(
        &mut self,
        registry: &Registry,
        phase: StartupPhase,
    ) -> Result<StartupReport, StartupError> {
        let hooks: Vec<StartupHook> = registry
            .inject_all(&phase.token())?
            .iter()
            .map(|hook| StartupHook::clone(hook))
            .collect();
        let report = self.run(&hooks)?;
        info!(
            "event=startup_phase_done module=startup status=ok phase={} hooks={}",
            phase.as_str(),
            report.completed.len()
        );
        Ok(report)
    }

    /// Runs every phase in order, stopping at the first failing phase.
    ///
    /// Phases are ordering barriers: once a hook fails, no hook of a later
    /// phase runs, even one that does not depend on the failed hook. Within
    /// the failing phase, independent hooks still run.
    pub fn start_application(
        &mut self,
        registry: &Registry,
    ) -> Result<Vec<(StartupPhase, StartupReport)>, StartupError> {
        let mut reports = Vec::with_capacity(StartupPhase::ALL.len());
        for phase in StartupPhase::ALL {
            reports.push((phase, self.run_phase(registry, phase)?));
        }
        Ok(reports)
    }
}

/// Startup configuration and execution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    DuplicateHookId(String),
    UnknownDependency { hook: String, run_after: String },
    Cycle(Vec<String>),
    Registry(RegistryError),
    HooksFailed(StartupReport),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateHookId(value) => write!(f, "startup hook id is duplicated: {value}"),
            Self::UnknownDependency { hook, run_after } => {
                write!(f, "startup hook `{hook}` runs after unknown hook `{run_after}`")
            }
            Self::Cycle(ids) => write!(f, "startup hooks form a cycle: {}", ids.join(" -> ")),
            Self::Registry(err) => write!(f, "failed to resolve startup hooks: {err}"),
            Self::HooksFailed(report) => {
                let ids: Vec<&str> = report
                    .failed
                    .iter()
                    .map(|failure| failure.hook_id.as_str())
                    .collect();
                write!(
                    f,
                    "startup hooks failed: {} (skipped {})",
                    ids.join(", "),
                    report.skipped.len()
                )
            }
        }
    }
}

impl Error for StartupError {}

impl From<RegistryError> for StartupError {
    fn from(err: RegistryError) -> Self {
        Self::Registry(err)
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_order, StartupError, StartupScheduler};
    use crate::registry::{Injectable, Registry};
    use crate::startup::hook::{
        StartupHook, StartupPhase, AFTER_APPLICATION_IS_LOADED, ON_LOAD_OF_APPLICATION,
    };
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    fn recording(id: &str, journal: &Journal) -> StartupHook {
        let journal = Rc::clone(journal);
        let name = id.to_string();
        StartupHook::new(id, move || {
            journal.borrow_mut().push(name.clone());
            Ok(())
        })
    }

    fn failing(id: &str) -> StartupHook {
        let message = format!("{id} exploded");
        StartupHook::new(id, move || Err(message.clone().into()))
    }

    fn ids(hooks: &[StartupHook], order: Vec<usize>) -> Vec<&str> {
        order.into_iter().map(|position| hooks[position].id()).collect()
    }

    #[test]
    fn chain_runs_in_dependency_order_regardless_of_declaration() {
        let journal = Journal::default();
        let hooks = vec![
            recording("c", &journal).run_after("b"),
            recording("a", &journal),
            recording("b", &journal).run_after("a"),
        ];

        let report = StartupScheduler::new().run(&hooks).expect("startup");
        assert_eq!(*journal.borrow(), vec!["a", "b", "c"]);
        assert_eq!(report.completed, vec!["a", "b", "c"]);
    }

    #[test]
    fn unconstrained_hooks_keep_declaration_order() {
        let hooks = vec![
            StartupHook::new("x", || Ok(())),
            StartupHook::new("y", || Ok(())),
            StartupHook::new("z", || Ok(())).run_after("x"),
        ];
        let order = resolve_order(&hooks, &BTreeSet::new()).expect("order");
        assert_eq!(ids(&hooks, order), vec!["x", "y", "z"]);
    }

    #[test]
    fn two_hook_cycle_fails_before_running_anything() {
        let journal = Journal::default();
        let hooks = vec![
            recording("a", &journal).run_after("b"),
            recording("b", &journal).run_after("a"),
        ];

        let err = StartupScheduler::new().run(&hooks).expect_err("cycle");
        assert!(matches!(err, StartupError::Cycle(_)));
        if let StartupError::Cycle(cycle) = err {
            assert_eq!(cycle.first(), cycle.last());
            assert!(cycle.contains(&"a".to_string()) && cycle.contains(&"b".to_string()));
        }
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let hooks = vec![StartupHook::new("solo", || Ok(())).run_after("solo")];
        assert_eq!(
            resolve_order(&hooks, &BTreeSet::new()).expect_err("self cycle"),
            StartupError::Cycle(vec!["solo".to_string(), "solo".to_string()])
        );
    }

    #[test]
    fn rejects_unknown_predecessors_and_duplicate_ids() {
        let unknown = vec![StartupHook::new("a", || Ok(())).run_after("ghost")];
        assert_eq!(
            resolve_order(&unknown, &BTreeSet::new()).expect_err("unknown"),
            StartupError::UnknownDependency {
                hook: "a".to_string(),
                run_after: "ghost".to_string(),
            }
        );

        let duplicate = vec![StartupHook::new("a", || Ok(())), StartupHook::new("a", || Ok(()))];
        assert_eq!(
            resolve_order(&duplicate, &BTreeSet::new()).expect_err("duplicate"),
            StartupError::DuplicateHookId("a".to_string())
        );
    }

    #[test]
    fn failure_skips_dependents_but_not_independent_branches() {
        let journal = Journal::default();
        let hooks = vec![
            failing("tray"),
            recording("tray-icon", &journal).run_after("tray"),
            recording("tray-menu", &journal).run_after("tray-icon"),
            recording("settings", &journal),
        ];

        let err = StartupScheduler::new().run(&hooks).expect_err("hook failure");
        let report = match err {
            StartupError::HooksFailed(report) => report,
            other => panic!("expected HooksFailed, got {other:?}"),
        };
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].hook_id, "tray");
        assert_eq!(report.failed[0].message, "tray exploded");
        assert_eq!(report.skipped, vec!["tray-icon", "tray-menu"]);
        assert_eq!(report.completed, vec!["settings"]);
        assert_eq!(*journal.borrow(), vec!["settings"]);
    }

    #[test]
    fn hooks_run_once_across_calls() {
        let journal = Journal::default();
        let mut scheduler = StartupScheduler::new();
        let first = vec![recording("a", &journal)];
        scheduler.run(&first).expect("first run");

        let second = vec![recording("a", &journal), recording("b", &journal).run_after("a")];
        let report = scheduler.run(&second).expect("second run");
        assert_eq!(report.completed, vec!["b"]);
        assert_eq!(*journal.borrow(), vec!["a", "b"]);
        assert!(scheduler.has_run("a"));
    }

    #[test]
    fn runs_phase_hooks_from_registry() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        for hook in [
            recording("start-reactive-tray-menu-icon", &journal).run_after("start-tray"),
            recording("start-tray", &journal),
        ] {
            let id = hook.id().to_string();
            registry
                .register(Injectable::new(id, move |_: &Registry| Ok(hook.clone())).with_token(ON_LOAD_OF_APPLICATION))
                .expect("register hook");
        }

        let reports = StartupScheduler::new()
            .start_application(&registry)
            .expect("startup");
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[1].0, StartupPhase::OnLoadOfApplication);
        assert_eq!(
            *journal.borrow(),
            vec!["start-tray", "start-reactive-tray-menu-icon"]
        );
    }

    #[test]
    fn long_chain_resolves_without_recursion() {
        let length = 100_000;
        let hooks: Vec<StartupHook> = (0..length)
            .rev()
            .map(|step| {
                let hook = StartupHook::new(format!("step-{step}"), || Ok(()));
                if step == 0 {
                    hook
                } else {
                    hook.run_after(format!("step-{}", step - 1))
                }
            })
            .collect();

        let order = resolve_order(&hooks, &BTreeSet::new()).expect("chain order");
        assert_eq!(order.len(), length);
        assert_eq!(hooks[order[0]].id(), "step-0");
        assert_eq!(hooks[order[length - 1]].id(), format!("step-{}", length - 1));
    }

    #[test]
    fn cycle_behind_a_dependent_is_reported_from_the_cycle() {
        let hooks = vec![
            StartupHook::new("waiting", || Ok(())).run_after("left"),
            StartupHook::new("left", || Ok(())).run_after("right"),
            StartupHook::new("right", || Ok(())).run_after("left"),
        ];
        assert_eq!(
            resolve_order(&hooks, &BTreeSet::new()).expect_err("cycle"),
            StartupError::Cycle(vec![
                "left".to_string(),
                "right".to_string(),
                "left".to_string()
            ])
        );
    }

    #[test]
    fn failing_phase_blocks_later_phases() {
        let journal = Journal::default();
        let mut registry = Registry::new();
        for (hook, token) in [
            (failing("start-tray"), ON_LOAD_OF_APPLICATION),
            (recording("start-settings", &journal), ON_LOAD_OF_APPLICATION),
            (recording("check-updates", &journal), AFTER_APPLICATION_IS_LOADED),
        ] {
            let id = hook.id().to_string();
            registry
                .register(Injectable::new(id, move |_: &Registry| Ok(hook.clone())).with_token(token))
                .expect("register hook");
        }

        let mut scheduler = StartupScheduler::new();
        let err = scheduler
            .start_application(&registry)
            .expect_err("on-load phase fails");
        assert!(matches!(err, StartupError::HooksFailed(_)));
        assert_eq!(*journal.borrow(), vec!["start-settings"]);
        assert!(!scheduler.has_run("check-updates"));
    }
}
