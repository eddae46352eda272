#![forbid(unsafe_code)]

//! Observable cell with change notification and read tracking.
//!
//! # Design
//!
//! [`Observable<T>`] keeps its value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). A write that changes the value (by `PartialEq`)
//! bumps the version and notifies every live subscriber in registration
//! order. Every read made through [`Observable::get`] or
//! [`Observable::with`] is reported to the innermost tracking frame, which is
//! how [`observe`](crate::observe) learns what an expression depends on.
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: keeping [`Subscription`] guards forever keeps
//!   callbacks alive. Dead weak entries are pruned lazily on `notify()`.
//! - **Borrow conflict**: calling `update()` re-entrantly from inside its own
//!   closure panics (RefCell). Subscriber callbacks run with no borrow held,
//!   so they may freely read or write the observable.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::tracking::{self, SourceId, TrackedSource};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Weak callbacks; pruned on notify.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value whose reads are visible to the tracker.
///
/// Cloning an `Observable` yields another handle to the **same** cell.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing write.
/// 2. `set(v)` where `v == current` neither bumps nor notifies.
/// 3. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone out the current value, recording the read.
    #[must_use]
    pub fn get(&self) -> T {
        self.track_read();
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value, recording the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track_read();
        f(&self.inner.borrow().value)
    }

    /// Read the current value without registering a dependency.
    #[must_use]
    pub fn peek(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Replace the value. Notifies subscribers only when it changed.
    pub fn set(&self, value: T) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
    }

    /// Mutate in place; notifies only when the result differs from the
    /// value before the call.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value != old {
                inner.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Register `callback` for every future change.
    ///
    /// The callback stays registered for as long as the returned
    /// [`Subscription`] lives.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, dead ones included until the next notify.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn track_read(&self) {
        if tracking::is_tracking() {
            tracking::record(self.source_id(), || {
                Rc::new(self.clone()) as Rc<dyn TrackedSource>
            });
        }
    }

    fn notify(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner
                .subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .collect()
        };

        let value = self.inner.borrow().value.clone();
        for cb in &callbacks {
            cb(&value);
        }
    }
}

impl<T: Clone + PartialEq + 'static> TrackedSource for Observable<T> {
    fn source_id(&self) -> SourceId {
        SourceId(Rc::as_ptr(&self.inner).cast::<()>() as usize)
    }

    fn watch(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| on_change())
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping it releases the only strong reference to the callback, so the
/// observable's weak entry stops upgrading and is pruned on its next
/// notification.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
