#![forbid(unsafe_code)]

//! Derived-value observation.
//!
//! [`observe`] evaluates an expression inside a tracking frame, subscribes
//! to every observable it read, and re-evaluates whenever one of them
//! changes. The change callback runs only when the derived value differs
//! from the previous evaluation; the initial evaluation never calls it.
//!
//! Dependencies are re-collected on each evaluation, so an expression that
//! branches on one observable before reading another follows the branch.
//!
//! # Ownership
//!
//! The returned [`Disposer`] is the only strong owner of the reaction.
//! Subscriptions on the sources reference it weakly. Disposing (or dropping)
//! the disposer releases all source subscriptions.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::observable::Subscription;
use crate::tracking::track;

struct ReactionState<T> {
    last: Option<T>,
    sources: Vec<Subscription>,
    disposed: bool,
}

struct Reaction<T> {
    expr: Box<dyn Fn() -> T>,
    on_change: Box<dyn Fn(&T)>,
    state: RefCell<ReactionState<T>>,
}

impl<T: Clone + PartialEq + 'static> Reaction<T> {
    /// Evaluate, resubscribe, and report the new value if it changed.
    fn evaluate(self: &Rc<Self>) -> Option<T> {
        if self.state.borrow().disposed {
            return None;
        }
        let (value, sources) = track(|| (self.expr)());

        let weak = Rc::downgrade(self);
        let subscriptions: Vec<Subscription> = sources
            .iter()
            .map(|source| {
                let weak = weak.clone();
                source.watch(Rc::new(move || {
                    if let Some(reaction) = weak.upgrade() {
                        reaction.rerun();
                    }
                }))
            })
            .collect();

        let mut state = self.state.borrow_mut();
        // Disposed from inside the expression.
        if state.disposed {
            return None;
        }
        let previous = std::mem::replace(&mut state.sources, subscriptions);
        let changed = state.last.as_ref() != Some(&value);
        state.last = Some(value.clone());
        drop(state);
        drop(previous);

        changed.then_some(value)
    }

    fn rerun(self: &Rc<Self>) {
        if let Some(value) = self.evaluate() {
            trace!("reaction value changed");
            (self.on_change)(&value);
        }
    }
}

trait Dispose {
    fn dispose(&self);
}

impl<T> Dispose for Reaction<T> {
    fn dispose(&self) {
        let sources = {
            let mut state = self.state.borrow_mut();
            state.disposed = true;
            std::mem::take(&mut state.sources)
        };
        drop(sources);
    }
}

/// Observe the value of `expr`, calling `on_change` with each new value.
///
/// `expr` runs once immediately to establish its dependencies; that first
/// value is remembered but not reported.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use whenbind_reactive::{Observable, observe};
///
/// let count = Observable::new(0);
/// let seen = Rc::new(Cell::new(false));
///
/// let c = count.clone();
/// let s = Rc::clone(&seen);
/// let mut disposer = observe(move || c.get() > 1, move |big| s.set(*big));
///
/// count.set(2);
/// assert!(seen.get());
/// disposer.dispose();
/// ```
pub fn observe<T, E, F>(expr: E, on_change: F) -> Disposer
where
    T: Clone + PartialEq + 'static,
    E: Fn() -> T + 'static,
    F: Fn(&T) + 'static,
{
    let reaction = Rc::new(Reaction {
        expr: Box::new(expr),
        on_change: Box::new(on_change),
        state: RefCell::new(ReactionState {
            last: None,
            sources: Vec::new(),
            disposed: false,
        }),
    });
    let _ = reaction.evaluate();
    trace!(
        sources = reaction.state.borrow().sources.len(),
        "reaction started"
    );
    Disposer {
        target: Some(reaction),
    }
}

/// Cancels an observation.
///
/// [`dispose`](Disposer::dispose) is idempotent. Dropping an undisposed
/// `Disposer` disposes it.
#[must_use = "dropping a Disposer cancels the observation"]
pub struct Disposer {
    target: Option<Rc<dyn Dispose>>,
}

impl Disposer {
    /// Stop observing. Calling this more than once does nothing.
    pub fn dispose(&mut self) {
        if let Some(target) = self.target.take() {
            target.dispose();
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.target.is_none()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Observable;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl Fn(&bool) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |v: &bool| sink.borrow_mut().push(*v))
    }

    #[test]
    fn initial_value_is_not_reported() {
        let flag = Observable::new(true);
        let (log, sink) = recorder();
        let f = flag.clone();
        let _d = observe(move || f.get(), sink);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn reports_only_changes_of_derived_value() {
        let count = Observable::new(0);
        let (log, sink) = recorder();
        let c = count.clone();
        let _d = observe(move || c.get() >= 2, sink);

        count.set(1); // false -> false
        count.set(2); // false -> true
        count.set(3); // true -> true
        count.set(0); // true -> false
        assert_eq!(*log.borrow(), vec![true, false]);
    }

    #[test]
    fn dispose_is_idempotent_and_unsubscribes() {
        let flag = Observable::new(false);
        let (log, sink) = recorder();
        let f = flag.clone();
        let mut d = observe(move || f.get(), sink);
        assert_eq!(flag.subscriber_count(), 1);

        d.dispose();
        d.dispose();
        assert!(d.is_disposed());
        flag.set(true);
        assert!(log.borrow().is_empty());
        assert_eq!(flag.subscriber_count(), 0);
    }

    #[test]
    fn drop_disposes() {
        let flag = Observable::new(false);
        let (log, sink) = recorder();
        let f = flag.clone();
        drop(observe(move || f.get(), sink));
        flag.set(true);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn follows_dynamic_dependencies() {
        let use_b = Observable::new(false);
        let a = Observable::new(false);
        let b = Observable::new(false);
        let (log, sink) = recorder();
        let (u, a2, b2) = (use_b.clone(), a.clone(), b.clone());
        let _d = observe(move || if u.get() { b2.get() } else { a2.get() }, sink);

        b.set(true); // not a dependency yet
        assert!(log.borrow().is_empty());

        use_b.set(true); // now reads b, which is true
        assert_eq!(*log.borrow(), vec![true]);

        a.set(true); // no longer a dependency
        assert_eq!(*log.borrow(), vec![true]);
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn callback_can_dispose_itself() {
        let flag = Observable::new(false);
        let holder: Rc<RefCell<Option<Disposer>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0u32));

        let f = flag.clone();
        let h = Rc::clone(&hits);
        let slot = Rc::clone(&holder);
        let disposer = observe(
            move || f.get(),
            move |_| {
                h.set(h.get() + 1);
                if let Some(mut d) = slot.borrow_mut().take() {
                    d.dispose();
                }
            },
        );
        *holder.borrow_mut() = Some(disposer);

        flag.set(true);
        flag.set(false);
        assert_eq!(hits.get(), 1);
    }
}
