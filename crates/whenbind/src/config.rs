#![forbid(unsafe_code)]

//! Binding configuration.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::args::Args;
use crate::binding::Predicate;

/// Default name of the activation hook.
pub const DEFAULT_INIT_HOOK: &str = "component_did_mount";
/// Default name of the deactivation hook.
pub const DEFAULT_DEINIT_HOOK: &str = "component_will_unmount";

/// Names of the lifecycle methods a bound class must define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleHooks {
    pub init: Cow<'static, str>,
    pub deinit: Cow<'static, str>,
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self {
            init: Cow::Borrowed(DEFAULT_INIT_HOOK),
            deinit: Cow::Borrowed(DEFAULT_DEINIT_HOOK),
        }
    }
}

/// Everything one binding needs: the predicate, the parameters the method
/// is fired with, and the lifecycle hook names to intercept.
///
/// Hook names only matter for the first binding declared on a class; later
/// bindings reuse the wrappers that binding installed and their own hook
/// names are neither checked nor wrapped.
///
/// # Example
///
/// ```
/// use whenbind::{BindConfig, args};
///
/// struct Feed;
///
/// let config = BindConfig::new(|_: &Feed| true)
///     .with_parameters(args![10usize])
///     .with_init_hook("on_mount")
///     .with_deinit_hook("on_unmount");
/// assert_eq!(config.hooks().init, "on_mount");
/// ```
pub struct BindConfig<C> {
    pub(crate) predicate: Predicate<C>,
    pub(crate) parameters: Args,
    pub(crate) hooks: LifecycleHooks,
}

impl<C> Clone for BindConfig<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Rc::clone(&self.predicate),
            parameters: self.parameters.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<C: 'static> BindConfig<C> {
    /// Config with no parameters and the default hook names.
    #[must_use]
    pub fn new(predicate: impl Fn(&C) -> bool + 'static) -> Self {
        Self::from_predicate(Rc::new(predicate))
    }

    #[must_use]
    pub fn from_predicate(predicate: Predicate<C>) -> Self {
        Self {
            predicate,
            parameters: Args::new(),
            hooks: LifecycleHooks::default(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Args) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn with_init_hook(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.hooks.init = name.into();
        self
    }

    #[must_use]
    pub fn with_deinit_hook(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.hooks.deinit = name.into();
        self
    }

    #[must_use]
    pub fn predicate(&self) -> &Predicate<C> {
        &self.predicate
    }

    #[must_use]
    pub fn parameters(&self) -> &Args {
        &self.parameters
    }

    #[must_use]
    pub fn hooks(&self) -> &LifecycleHooks {
        &self.hooks
    }
}

impl<C> fmt::Debug for BindConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindConfig")
            .field("parameters", &self.parameters)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
