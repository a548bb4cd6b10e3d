//! Push-based reactive primitives.
//!
//! # Responsibility
//! - Provide `Signal<T>` values exposing `get()` and `subscribe()`.
//! - Record which signals a render pass reads so an `ObserverBoundary` can
//!   invalidate itself when one of them changes.
//!
//! # Invariants
//! - Listeners run synchronously inside `set`, in subscription order.
//! - Setting a value equal to the current one does not notify.
//! - Nothing here schedules re-rendering; boundaries only mark themselves
//!   stale and notify their own subscribers.

use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn()>;

thread_local! {
    static TRACKING_FRAMES: RefCell<Vec<Vec<Rc<Listeners>>>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct Listeners {
    entries: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
}

impl Listeners {
    fn add(self: &Rc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push((id, listener));
        Subscription {
            listeners: Rc::downgrade(self),
            id,
        }
    }

    fn notify(&self) {
        // Snapshot first: listeners may subscribe or unsubscribe while running.
        let snapshot: Vec<Listener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// Handle for one registered listener.
///
/// Dropping the handle removes the listener.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Subscription {
    /// Removes the listener now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .entries
                .borrow_mut()
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

fn record_read(listeners: &Rc<Listeners>) {
    TRACKING_FRAMES.with(|frames| {
        if let Some(frame) = frames.borrow_mut().last_mut() {
            if !frame.iter().any(|seen| Rc::ptr_eq(seen, listeners)) {
                frame.push(Rc::clone(listeners));
            }
        }
    });
}

/// Runs `f` and returns its result with every signal read during the call.
fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<Listeners>>) {
    TRACKING_FRAMES.with(|frames| frames.borrow_mut().push(Vec::new()));
    let result = f();
    let reads = TRACKING_FRAMES
        .with(|frames| frames.borrow_mut().pop())
        .unwrap_or_default();
    (result, reads)
}

struct SignalInner<T> {
    value: RefCell<T>,
    listeners: Rc<Listeners>,
}

/// Shared observable value.
///
/// Clones share the same underlying cell.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                listeners: Rc::new(Listeners::default()),
            }),
        }
    }

    /// Reads the value through `f`, registering the read with any active
    /// observer boundary.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        record_read(&self.inner.listeners);
        f(&self.inner.value.borrow())
    }

    /// Registers a listener called after every value change.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.inner.listeners.add(Rc::new(listener))
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Signal<T> {
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Replaces the value and notifies listeners when it changed.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.inner.listeners.notify();
    }
}

struct BoundaryState<T> {
    cached: RefCell<Option<T>>,
    stale: Cell<bool>,
    reads: RefCell<Vec<Subscription>>,
    listeners: Rc<Listeners>,
}

impl<T> BoundaryState<T> {
    fn invalidate(&self) {
        if !self.stale.replace(true) {
            self.listeners.notify();
        }
    }
}

/// Re-render boundary around a render function.
///
/// `render()` evaluates the function once and caches its output. Any signal
/// read during evaluation invalidates the cache when it changes, and the
/// boundary then notifies its own subscribers so the renderer can schedule a
/// redraw.
pub struct ObserverBoundary<T> {
    render: Box<dyn Fn() -> T>,
    state: Rc<BoundaryState<T>>,
}

impl<T: Clone + 'static> ObserverBoundary<T> {
    pub fn new(render: impl Fn() -> T + 'static) -> Self {
        Self {
            render: Box::new(render),
            state: Rc::new(BoundaryState {
                cached: RefCell::new(None),
                stale: Cell::new(true),
                reads: RefCell::new(Vec::new()),
                listeners: Rc::new(Listeners::default()),
            }),
        }
    }

    /// Returns the cached output, re-evaluating when stale.
    pub fn render(&self) -> T {
        if !self.state.stale.get() {
            if let Some(cached) = self.state.cached.borrow().as_ref() {
                return cached.clone();
            }
        }

        let (output, reads) = track(|| (self.render)());
        let subscriptions = reads
            .iter()
            .map(|listeners| {
                let state = Rc::downgrade(&self.state);
                listeners.add(Rc::new(move || {
                    if let Some(state) = state.upgrade() {
                        state.invalidate();
                    }
                }))
            })
            .collect();

        *self.state.reads.borrow_mut() = subscriptions;
        *self.state.cached.borrow_mut() = Some(output.clone());
        self.state.stale.set(false);
        output
    }

    /// Registers a listener called once each time the boundary goes stale.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.state.listeners.add(Rc::new(listener))
    }

    pub fn is_stale(&self) -> bool {
        self.state.stale.get()
    }

    /// Number of distinct signals read by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.state.reads.borrow().len()
    }
}

impl<T> Debug for ObserverBoundary<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBoundary")
            .field("stale", &self.state.stale.get())
            .field("dependencies", &self.state.reads.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ObserverBoundary, Signal};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn set_notifies_only_on_change() {
        let signal = Signal::new(1);
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let _subscription = signal.subscribe(move || counter.set(counter.get() + 1));

        signal.set(1);
        assert_eq!(hits.get(), 0);
        signal.set(2);
        assert_eq!(hits.get(), 1);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let signal = Signal::new("a".to_string());
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let subscription = signal.subscribe(move || counter.set(counter.get() + 1));
        assert_eq!(signal.listener_count(), 1);

        subscription.unsubscribe();
        signal.set("b".to_string());
        assert_eq!(hits.get(), 0);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn boundary_caches_until_a_read_signal_changes() {
        let source = Signal::new(10);
        let evaluations = Rc::new(Cell::new(0));
        let boundary = {
            let source = source.clone();
            let evaluations = Rc::clone(&evaluations);
            ObserverBoundary::new(move || {
                evaluations.set(evaluations.get() + 1);
                source.get() * 2
            })
        };

        assert_eq!(boundary.render(), 20);
        assert_eq!(boundary.render(), 20);
        assert_eq!(evaluations.get(), 1);
        assert_eq!(boundary.dependency_count(), 1);

        source.set(11);
        assert!(boundary.is_stale());
        assert_eq!(boundary.render(), 22);
        assert_eq!(evaluations.get(), 2);
    }

    #[test]
    fn boundary_notifies_subscribers_once_per_invalidation() {
        let source = Signal::new(false);
        let boundary = {
            let source = source.clone();
            ObserverBoundary::new(move || source.get())
        };
        let redraws = Rc::new(Cell::new(0));
        let counter = Rc::clone(&redraws);
        let _subscription = boundary.subscribe(move || counter.set(counter.get() + 1));

        boundary.render();
        source.set(true);
        source.set(false);
        assert_eq!(redraws.get(), 1);

        boundary.render();
        source.set(true);
        assert_eq!(redraws.get(), 2);
    }

    #[test]
    fn boundary_ignores_signals_it_did_not_read() {
        let read = Signal::new(1);
        let unread = Signal::new(1);
        let boundary = {
            let read = read.clone();
            ObserverBoundary::new(move || read.get())
        };

        boundary.render();
        unread.set(2);
        assert!(!boundary.is_stale());
        assert_eq!(unread.listener_count(), 0);
    }
}
