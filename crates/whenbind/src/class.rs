#![forbid(unsafe_code)]

//! Component classes: named method tables for a component type.
//!
//! A [`ComponentClass<C>`] plays the part of a class prototype. It maps
//! method names to callables taking the instance (`&Rc<C>`) and free-form
//! [`Args`]. Lifecycle hooks are ordinary entries in the table, which is what
//! lets the interceptor wrap them.
//!
//! Each class value gets a fresh [`ClassId`] at construction; two classes
//! never share an identity even when they describe the same Rust type.
//!
//! A class remembers the binding table its lifecycle wrappers feed. That
//! link, not any registry, decides whether the hooks are already wrapped.

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::args::Args;
use crate::binding::BindingTable;
use crate::error::BindError;

/// A method callable: receiver first, then arguments.
pub type Method<C> = Rc<dyn Fn(&Rc<C>, &Args)>;

/// Stable identity of a [`ComponentClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u64);

impl ClassId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct MethodEntry<C> {
    method: Method<C>,
    /// Times this entry has been replaced since it was first defined.
    revision: u32,
}

/// Method table for instances of `C`.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use whenbind::{Args, ComponentClass};
///
/// #[derive(Default)]
/// struct Counter {
///     hits: Cell<u32>,
/// }
///
/// let class = ComponentClass::<Counter>::new("Counter")
///     .method("bump", |this, _args| this.hits.set(this.hits.get() + 1));
///
/// let counter = Rc::new(Counter::default());
/// class.call(&counter, "bump", &Args::new()).unwrap();
/// assert_eq!(counter.hits.get(), 1);
/// ```
pub struct ComponentClass<C> {
    id: ClassId,
    name: String,
    methods: HashMap<String, MethodEntry<C>>,
    /// Owned strongly by the installed lifecycle wrappers.
    bindings: Option<Weak<BindingTable<C>>>,
}

impl<C: 'static> ComponentClass<C> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClassId::next(),
            name: name.into(),
            methods: HashMap::new(),
            bindings: None,
        }
    }

    /// Builder form of [`define`](Self::define).
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, f: impl Fn(&Rc<C>, &Args) + 'static) -> Self {
        self.define(name, f);
        self
    }

    /// Define or redefine a method.
    ///
    /// Redefining counts as a replacement in [`revision`](Self::revision).
    pub fn define(&mut self, name: impl Into<String>, f: impl Fn(&Rc<C>, &Args) + 'static) {
        self.replace_method(name.into(), Rc::new(f));
    }

    #[must_use]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Method names, in no particular order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// The current callable under `name`.
    #[must_use]
    pub fn get_method(&self, name: &str) -> Option<Method<C>> {
        self.methods.get(name).map(|entry| Rc::clone(&entry.method))
    }

    /// How many times the entry under `name` has been replaced.
    #[must_use]
    pub fn revision(&self, name: &str) -> Option<u32> {
        self.methods.get(name).map(|entry| entry.revision)
    }

    /// Invoke `name` on `instance`.
    ///
    /// The method runs with no borrow of the class held.
    pub fn call(&self, instance: &Rc<C>, name: &str, args: &Args) -> Result<(), BindError> {
        let method = self.get_method(name).ok_or_else(|| BindError::UnknownMethod {
            class: self.name.clone(),
            method: name.to_owned(),
        })?;
        method(instance, args);
        Ok(())
    }

    /// Whether the lifecycle hooks of this class have been wrapped.
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        self.binding_table().is_some()
    }

    pub(crate) fn binding_table(&self) -> Option<Rc<BindingTable<C>>> {
        self.bindings.as_ref()?.upgrade()
    }

    pub(crate) fn set_binding_table(&mut self, table: &Rc<BindingTable<C>>) {
        self.bindings = Some(Rc::downgrade(table));
    }

    pub(crate) fn replace_method(&mut self, name: String, method: Method<C>) {
        match self.methods.get_mut(&name) {
            Some(entry) => {
                entry.method = method;
                entry.revision += 1;
            }
            None => {
                self.methods.insert(
                    name,
                    MethodEntry {
                        method,
                        revision: 0,
                    },
                );
            }
        }
    }
}

impl<C> fmt::Debug for ComponentClass<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ComponentClass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &names)
            .finish()
    }
}
