#![forbid(unsafe_code)]

//! Binding descriptors and per-class binding tables.
//!
//! # Invariants
//!
//! 1. A table holds at most one descriptor per method name; the first
//!    insertion wins.
//! 2. A descriptor holds live disposers for an instance iff that instance
//!    has been activated more recently than it has been deactivated.
//! 3. `deactivate` disposes every disposer `activate` created for that
//!    instance, including overlapping ones from repeated activation.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Double activation | init hook called twice without deinit | Second observation stacks; both fire; both disposed on deinit |
//! | Instance dropped while active | deinit never called | Predicate reads `false`, callback is a no-op; entry pruned by the next activation, deactivation, or subscription count |
//! | Method panics | user code | Propagates to the caller of the hook or of `Observable::set` |

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};
use whenbind_reactive::{Disposer, observe, untracked};

use crate::args::Args;
use crate::class::{ClassId, Method};

/// A reactive predicate evaluated against the instance.
pub type Predicate<C> = Rc<dyn Fn(&C) -> bool>;

/// Address-based key of a live instance.
type InstanceKey = usize;

fn instance_key<C>(instance: &Rc<C>) -> InstanceKey {
    Rc::as_ptr(instance).cast::<()>() as usize
}

struct LiveSubscriptions<C> {
    owner: Weak<C>,
    disposers: Vec<Disposer>,
}

/// One bound method: its predicate, parameters, callable, and the live
/// observations of every active instance.
pub struct BindingDescriptor<C> {
    method_name: String,
    predicate: Predicate<C>,
    parameters: Args,
    method: Method<C>,
    live: RefCell<HashMap<InstanceKey, LiveSubscriptions<C>>>,
}

impl<C: 'static> BindingDescriptor<C> {
    pub(crate) fn new(
        method_name: String,
        predicate: Predicate<C>,
        parameters: Args,
        method: Method<C>,
    ) -> Self {
        Self {
            method_name,
            predicate,
            parameters,
            method,
            live: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    #[must_use]
    pub fn parameters(&self) -> &Args {
        &self.parameters
    }

    /// Evaluate the predicate for `instance` without tracking the read.
    #[must_use]
    pub fn is_satisfied(&self, instance: &C) -> bool {
        untracked(|| (self.predicate)(instance))
    }

    /// Live observations held for `instance`.
    #[must_use]
    pub fn active_subscriptions(&self, instance: &Rc<C>) -> usize {
        self.prune_dead();
        self.live
            .borrow()
            .get(&instance_key(instance))
            .map_or(0, |entry| entry.disposers.len())
    }

    /// Drop entries whose instance is gone. A dead entry's address may since
    /// have been reused by a live instance.
    fn prune_dead(&self) {
        let dead: Vec<LiveSubscriptions<C>> = {
            let mut live = self.live.borrow_mut();
            let keys: Vec<InstanceKey> = live
                .iter()
                .filter(|(_, entry)| entry.owner.strong_count() == 0)
                .map(|(key, _)| *key)
                .collect();
            keys.iter().filter_map(|key| live.remove(key)).collect()
        };
        if !dead.is_empty() {
            trace!(method = %self.method_name, pruned = dead.len(), "dropped instances pruned");
        }
    }

    /// Start observing the predicate for `instance`, firing at once if it
    /// already holds.
    pub(crate) fn activate(&self, instance: &Rc<C>) {
        let weak = Rc::downgrade(instance);

        let predicate = Rc::clone(&self.predicate);
        let expr_owner = weak.clone();
        let expr = move || expr_owner.upgrade().is_some_and(|this| predicate(&*this));

        let method = Rc::clone(&self.method);
        let parameters = self.parameters.clone();
        let callback_owner = weak.clone();
        let name = self.method_name.clone();
        let on_change = move |now: &bool| {
            if !*now {
                return;
            }
            if let Some(this) = callback_owner.upgrade() {
                trace!(method = %name, "predicate became true");
                method(&this, &parameters);
            }
        };

        let disposer = observe(expr, on_change);
        self.prune_dead();
        {
            let mut live = self.live.borrow_mut();
            live.entry(instance_key(instance))
                .or_insert_with(|| LiveSubscriptions {
                    owner: weak,
                    disposers: Vec::new(),
                })
                .disposers
                .push(disposer);
        }

        if self.is_satisfied(instance) {
            trace!(method = %self.method_name, "predicate already true on activation");
            (self.method)(instance, &self.parameters);
        }
    }

    /// Dispose every observation held for `instance`. Returns how many were
    /// disposed.
    pub(crate) fn deactivate(&self, instance: &Rc<C>) -> usize {
        self.prune_dead();
        let entry = self.live.borrow_mut().remove(&instance_key(instance));
        let Some(mut entry) = entry else {
            return 0;
        };
        let count = entry.disposers.len();
        for disposer in &mut entry.disposers {
            disposer.dispose();
        }
        count
    }
}

impl<C> fmt::Debug for BindingDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingDescriptor")
            .field("method_name", &self.method_name)
            .field("parameters", &self.parameters)
            .field(
                "live_instances",
                &self
                    .live
                    .borrow()
                    .values()
                    .filter(|entry| entry.owner.strong_count() > 0)
                    .count(),
            )
            .finish_non_exhaustive()
    }
}

/// All bindings declared on one class.
pub struct BindingTable<C> {
    class: ClassId,
    class_name: String,
    bindings: RefCell<HashMap<String, Rc<BindingDescriptor<C>>>>,
}

impl<C: 'static> BindingTable<C> {
    pub(crate) fn new(class: ClassId, class_name: String) -> Self {
        Self {
            class,
            class_name,
            bindings: RefCell::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.bindings.borrow().contains_key(method)
    }

    #[must_use]
    pub fn get(&self, method: &str) -> Option<Rc<BindingDescriptor<C>>> {
        self.bindings.borrow().get(method).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Bound method names, sorted.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Insert unless the name is already bound. Returns whether it was
    /// inserted.
    pub(crate) fn insert(&self, descriptor: BindingDescriptor<C>) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(&descriptor.method_name) {
            return false;
        }
        bindings.insert(descriptor.method_name.clone(), Rc::new(descriptor));
        true
    }

    /// Snapshot so no borrow is held while user code runs.
    fn snapshot(&self) -> Vec<Rc<BindingDescriptor<C>>> {
        self.bindings.borrow().values().cloned().collect()
    }

    pub(crate) fn activate(&self, instance: &Rc<C>) {
        let descriptors = self.snapshot();
        debug!(
            class = %self.class_name,
            bindings = descriptors.len(),
            "activating bindings"
        );
        for descriptor in descriptors {
            descriptor.activate(instance);
        }
    }

    pub(crate) fn deactivate(&self, instance: &Rc<C>) {
        let disposed: usize = self
            .snapshot()
            .iter()
            .map(|descriptor| descriptor.deactivate(instance))
            .sum();
        debug!(class = %self.class_name, disposed, "deactivated bindings");
    }

    /// Live observations across every binding for `instance`.
    #[must_use]
    pub fn active_subscriptions(&self, instance: &Rc<C>) -> usize {
        self.snapshot()
            .iter()
            .map(|descriptor| descriptor.active_subscriptions(instance))
            .sum()
    }
}

impl<C> fmt::Debug for BindingTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTable")
            .field("class", &self.class)
            .field("class_name", &self.class_name)
            .field("bindings", &self.bindings.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use whenbind_reactive::Observable;

    struct Widget {
        ready: Observable<bool>,
        fired: Cell<u32>,
    }

    fn widget(ready: bool) -> Rc<Widget> {
        Rc::new(Widget {
            ready: Observable::new(ready),
            fired: Cell::new(0),
        })
    }

    fn descriptor() -> BindingDescriptor<Widget> {
        BindingDescriptor::new(
            "refresh".into(),
            Rc::new(|w: &Widget| w.ready.get()),
            Args::new(),
            Rc::new(|w: &Rc<Widget>, _: &Args| w.fired.set(w.fired.get() + 1)),
        )
    }

    #[test]
    fn first_insert_wins() {
        let table = BindingTable::<Widget>::new(ClassId(1), "Widget".into());
        assert!(table.insert(descriptor()));
        assert!(!table.insert(BindingDescriptor::new(
            "refresh".into(),
            Rc::new(|_: &Widget| true),
            Args::new().with(9u8),
            Rc::new(|_: &Rc<Widget>, _: &Args| {}),
        )));
        assert_eq!(table.len(), 1);
        assert!(table.get("refresh").unwrap().parameters().is_empty());
    }

    #[test]
    fn instances_are_tracked_separately() {
        let d = descriptor();
        let a = widget(false);
        let b = widget(false);
        d.activate(&a);
        d.activate(&b);
        assert_eq!(d.active_subscriptions(&a), 1);

        assert_eq!(d.deactivate(&a), 1);
        a.ready.set(true);
        b.ready.set(true);
        assert_eq!(a.fired.get(), 0);
        assert_eq!(b.fired.get(), 1);
        assert_eq!(d.active_subscriptions(&a), 0);
        assert_eq!(d.active_subscriptions(&b), 1);
    }

    #[test]
    fn double_activation_stacks_until_deactivated() {
        let d = descriptor();
        let w = widget(false);
        d.activate(&w);
        d.activate(&w);
        w.ready.set(true);
        assert_eq!(w.fired.get(), 2);
        assert_eq!(d.deactivate(&w), 2);
        assert_eq!(d.deactivate(&w), 0);
    }

    #[test]
    fn dropped_instances_are_pruned() {
        let d = descriptor();
        let gone = widget(false);
        d.activate(&gone);
        drop(gone);

        let w = widget(false);
        d.activate(&w);
        assert_eq!(d.live.borrow().len(), 1);
    }

    #[test]
    fn dropped_instances_stop_counting_without_reactivation() {
        let d = descriptor();
        let kept = widget(false);
        let gone = widget(false);
        d.activate(&kept);
        d.activate(&gone);
        drop(gone);

        assert!(format!("{d:?}").contains("live_instances: 1"));
        assert_eq!(d.active_subscriptions(&kept), 1);
        assert_eq!(d.live.borrow().len(), 1);

        let other = widget(false);
        d.activate(&other);
        drop(other);
        assert_eq!(d.deactivate(&kept), 1);
        assert!(d.live.borrow().is_empty());
    }

    #[test]
    fn immediate_fire_when_already_true() {
        let d = descriptor();
        let w = widget(true);
        d.activate(&w);
        assert_eq!(w.fired.get(), 1);
    }
}
