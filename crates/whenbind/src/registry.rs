#![forbid(unsafe_code)]

//! The binding registry: class identity → binding table.
//!
//! # Ownership
//!
//! The registry only holds [`Weak`] references. A class's table is owned by
//! the lifecycle wrappers installed on that class, so it lives exactly as
//! long as the class's method table does. Entries whose table is gone are
//! pruned lazily, the same way observable subscribers are.
//!
//! # Process lifetime
//!
//! [`BindingRegistry::global`] is created on first use and never torn down.
//! The registry is `!Send`, so "global" means global to the UI thread that
//! defines and mounts components. Code with an explicit application context
//! can create its own registry with [`BindingRegistry::new`] and hand it to
//! decorators via [`MethodDecorator::with_registry`](crate::MethodDecorator::with_registry).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::binding::BindingTable;
use crate::class::{ClassId, ComponentClass};

thread_local! {
    static GLOBAL: BindingRegistry = BindingRegistry::new();
}

#[derive(Default)]
struct RegistryInner {
    tables: HashMap<ClassId, Weak<dyn Any>>,
}

/// Shared handle to a set of per-class binding tables.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct BindingRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl BindingRegistry {
    /// An empty registry, independent of the global one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lazily created registry for the current thread.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL.with(Clone::clone)
    }

    /// Whether `class` already has its lifecycle hooks wrapped by this
    /// registry.
    #[must_use]
    pub fn is_intercepted(&self, class: ClassId) -> bool {
        self.inner
            .borrow()
            .tables
            .get(&class)
            .is_some_and(|table| table.strong_count() > 0)
    }

    /// Classes whose tables are still alive. Prunes the rest.
    #[must_use]
    pub fn live_classes(&self) -> Vec<ClassId> {
        let mut inner = self.inner.borrow_mut();
        inner.tables.retain(|_, table| table.strong_count() > 0);
        let mut ids: Vec<ClassId> = inner.tables.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The binding table for `class`, if it has been intercepted.
    #[must_use]
    pub fn table<C: 'static>(&self, class: &ComponentClass<C>) -> Option<Rc<BindingTable<C>>> {
        self.table_by_id(class.id())
    }

    /// Names of the bound methods on `class`, sorted.
    #[must_use]
    pub fn bound_methods<C: 'static>(&self, class: &ComponentClass<C>) -> Vec<String> {
        self.table(class)
            .map(|table| table.method_names())
            .unwrap_or_default()
    }

    /// Live observations `instance` holds across every binding of `class`.
    #[must_use]
    pub fn active_subscriptions<C: 'static>(
        &self,
        class: &ComponentClass<C>,
        instance: &Rc<C>,
    ) -> usize {
        self.table(class)
            .map_or(0, |table| table.active_subscriptions(instance))
    }

    pub(crate) fn table_by_id<C: 'static>(&self, class: ClassId) -> Option<Rc<BindingTable<C>>> {
        let any = self.inner.borrow().tables.get(&class)?.upgrade()?;
        any.downcast::<BindingTable<C>>().ok()
    }

    pub(crate) fn register<C: 'static>(&self, table: &Rc<BindingTable<C>>) {
        let strong: Rc<dyn Any> = Rc::clone(table) as Rc<dyn Any>;
        let mut inner = self.inner.borrow_mut();
        inner.tables.retain(|_, table| table.strong_count() > 0);
        inner.tables.insert(table.class(), Rc::downgrade(&strong));
        trace!(class = %table.class(), tables = inner.tables.len(), "binding table registered");
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("tables", &self.inner.borrow().tables.len())
            .finish()
    }
}
