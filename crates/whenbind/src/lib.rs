#![forbid(unsafe_code)]

//! Fire component methods when reactive predicates become true.
//!
//! # Role
//! A method of a [`ComponentClass`] is bound to a predicate over the
//! component instance. While an instance is mounted, the method fires each
//! time the predicate turns true, and once on mount if it already is. The
//! method stays callable by name the whole time.
//!
//! # Primary pieces
//! - **[`when`] / [`when_config`] / [`DecoratorFactory`]**: build
//!   [`MethodDecorator`]s and apply them to class methods.
//! - **[`BindingRegistry`]**: class identity → binding table, weakly held.
//! - **Interceptor**: wraps the class's mount/unmount hooks exactly once so
//!   they start and stop the observations after running their own code.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use whenbind::reactive::Observable;
//! use whenbind::{Args, ComponentClass, args, when};
//!
//! struct Toast {
//!     expired: Observable<bool>,
//!     closed: Cell<bool>,
//! }
//!
//! let mut class = ComponentClass::<Toast>::new("Toast")
//!     .method("component_did_mount", |_, _| {})
//!     .method("component_will_unmount", |_, _| {})
//!     .method("close", |this, _| this.closed.set(true));
//! when(|t: &Toast| t.expired.get(), args![]).apply(&mut class, "close").unwrap();
//!
//! let toast = Rc::new(Toast { expired: Observable::new(false), closed: Cell::new(false) });
//! class.call(&toast, "component_did_mount", &Args::new()).unwrap();
//! toast.expired.set(true);
//! assert!(toast.closed.get());
//! class.call(&toast, "component_will_unmount", &Args::new()).unwrap();
//! ```
//!
//! # Threading
//! Everything here is single-threaded and `!Send`; the global registry is
//! per thread.

pub mod args;
pub mod binding;
pub mod class;
pub mod config;
pub mod decorator;
pub mod error;
mod interceptor;
pub mod registry;

pub use whenbind_reactive as reactive;

pub use args::Args;
pub use binding::{BindingDescriptor, BindingTable, Predicate};
pub use class::{ClassId, ComponentClass, Method};
pub use config::{BindConfig, DEFAULT_DEINIT_HOOK, DEFAULT_INIT_HOOK, LifecycleHooks};
pub use decorator::{DecoratorFactory, MethodDecorator, when, when_config};
pub use error::{BindError, HookRole};
pub use registry::BindingRegistry;
