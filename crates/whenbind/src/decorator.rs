#![forbid(unsafe_code)]

//! Method decorators and the decorator factory.
//!
//! [`when`] and [`when_config`] build a [`MethodDecorator`]; applying it to
//! a method of a [`ComponentClass`] binds that method to the predicate.
//! [`DecoratorFactory`] is the extension point: named variants that preset
//! a predicate and delegate to the same machinery.
//!
//! # Decoration steps
//!
//! 1. Intercept the class's lifecycle hooks unless some registry already
//!    has (missing hooks fail here, before anything is recorded). Later
//!    bindings keep the wrappers of the first one, whatever hook names they
//!    configure.
//! 2. If the method name is already bound, stop. First binding wins.
//! 3. Record a descriptor holding the method's callable as it was before
//!    step 1. The class's own entry for the method is left as it was, so the
//!    method can still be called by name.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::args::Args;
use crate::binding::{BindingDescriptor, Predicate};
use crate::class::ComponentClass;
use crate::config::BindConfig;
use crate::error::BindError;
use crate::interceptor::intercept;
use crate::registry::BindingRegistry;

/// Bind a method to `predicate`, firing it with `parameters`.
///
/// Uses the default lifecycle hook names.
#[must_use]
pub fn when<C: 'static>(
    predicate: impl Fn(&C) -> bool + 'static,
    parameters: Args,
) -> MethodDecorator<C> {
    when_config(BindConfig::new(predicate).with_parameters(parameters))
}

/// Bind a method according to a full [`BindConfig`].
#[must_use]
pub fn when_config<C: 'static>(config: BindConfig<C>) -> MethodDecorator<C> {
    MethodDecorator {
        config,
        registry: None,
    }
}

/// A pending binding, applied to a class method with
/// [`apply`](MethodDecorator::apply).
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use whenbind::{Args, ComponentClass, args, when};
/// use whenbind::reactive::Observable;
///
/// struct Loader {
///     online: Observable<bool>,
///     fetched: Cell<u32>,
/// }
///
/// let mut class = ComponentClass::<Loader>::new("Loader")
///     .method("component_did_mount", |_, _| {})
///     .method("component_will_unmount", |_, _| {})
///     .method("fetch", |this, _| this.fetched.set(this.fetched.get() + 1));
///
/// when(|l: &Loader| l.online.get(), args![])
///     .apply(&mut class, "fetch")
///     .unwrap();
///
/// let loader = Rc::new(Loader { online: Observable::new(false), fetched: Cell::new(0) });
/// class.call(&loader, "component_did_mount", &Args::new()).unwrap();
/// loader.online.set(true);
/// assert_eq!(loader.fetched.get(), 1);
/// class.call(&loader, "component_will_unmount", &Args::new()).unwrap();
/// ```
pub struct MethodDecorator<C> {
    config: BindConfig<C>,
    registry: Option<BindingRegistry>,
}

impl<C: 'static> MethodDecorator<C> {
    /// Record the binding in `registry` instead of the thread's global one.
    #[must_use]
    pub fn with_registry(mut self, registry: BindingRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn config(&self) -> &BindConfig<C> {
        &self.config
    }

    /// Bind `method` on `class`.
    ///
    /// # Errors
    ///
    /// - [`BindError::MissingLifecycleHook`] if the class lacks either
    ///   configured hook (only checked on a class's first binding).
    /// - [`BindError::UnknownMethod`] if the class does not define `method`.
    pub fn apply(&self, class: &mut ComponentClass<C>, method: &str) -> Result<(), BindError> {
        let registry = self.registry.clone().unwrap_or_else(BindingRegistry::global);
        // Taken before interception so binding a lifecycle hook captures the
        // original entry rather than its wrapper.
        let original = class.get_method(method);
        let table = intercept(class, &self.config.hooks, &registry)?;

        if table.contains(method) {
            debug!(class = %class.name(), method, "method already bound, ignoring");
            return Ok(());
        }

        let callable = original.ok_or_else(|| BindError::UnknownMethod {
                class: class.name().to_owned(),
            method: method.to_owned(),
        })?;

        table.insert(BindingDescriptor::new(
            method.to_owned(),
            Rc::clone(&self.config.predicate),
            self.config.parameters.clone(),
            callable,
        ));
        debug!(
            class = %class.name(),
            method,
            parameters = self.config.parameters.len(),
            "method bound"
        );
        Ok(())
    }
}

impl<C> fmt::Debug for MethodDecorator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecorator")
            .field("config", &self.config)
            .field("custom_registry", &self.registry.is_some())
            .finish()
    }
}

type Variant<C> = Rc<dyn Fn(Args) -> MethodDecorator<C>>;

/// Extensible set of named decorator constructors.
///
/// Host code attaches variants without touching this crate; each variant
/// produces an ordinary [`MethodDecorator`].
///
/// ```
/// use whenbind::{DecoratorFactory, args};
///
/// struct Dialog {
///     visible: bool,
/// }
///
/// let mut factory = DecoratorFactory::<Dialog>::new();
/// factory.register_predicate("when_visible", |d: &Dialog| d.visible);
///
/// assert!(factory.variant("when_visible", args![]).is_ok());
/// assert!(factory.variant("when_hidden", args![]).is_err());
/// ```
pub struct DecoratorFactory<C> {
    registry: Option<BindingRegistry>,
    variants: HashMap<String, Variant<C>>,
}

impl<C: 'static> Default for DecoratorFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> DecoratorFactory<C> {
    /// Factory recording into the thread's global registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: None,
            variants: HashMap::new(),
        }
    }

    /// Factory whose decorators record into `registry`.
    #[must_use]
    pub fn with_registry(registry: BindingRegistry) -> Self {
        Self {
            registry: Some(registry),
            variants: HashMap::new(),
        }
    }

    /// Same as [`when`], recording into this factory's registry.
    #[must_use]
    pub fn base(
        &self,
        predicate: impl Fn(&C) -> bool + 'static,
        parameters: Args,
    ) -> MethodDecorator<C> {
        self.config(BindConfig::new(predicate).with_parameters(parameters))
    }

    /// Same as [`when_config`], recording into this factory's registry.
    #[must_use]
    pub fn config(&self, config: BindConfig<C>) -> MethodDecorator<C> {
        MethodDecorator {
            config,
            registry: self.registry.clone(),
        }
    }

    /// Attach a named variant. A later registration under the same name
    /// replaces the earlier one.
    pub fn register_variant(
        &mut self,
        name: impl Into<String>,
        variant: impl Fn(Args) -> MethodDecorator<C> + 'static,
    ) {
        self.variants.insert(name.into(), Rc::new(variant));
    }

    /// Attach a named variant with a fixed predicate and default hooks.
    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&C) -> bool + 'static,
    ) {
        let predicate: Predicate<C> = Rc::new(predicate);
        let registry = self.registry.clone();
        self.register_variant(name, move |parameters| MethodDecorator {
            config: BindConfig::from_predicate(Rc::clone(&predicate)).with_parameters(parameters),
            registry: registry.clone(),
        });
    }

    /// Build a decorator from the variant registered under `name`.
    ///
    /// # Errors
    ///
    /// [`BindError::UnknownVariant`] if nothing is registered under `name`.
    pub fn variant(&self, name: &str, parameters: Args) -> Result<MethodDecorator<C>, BindError> {
        let variant = self
            .variants
            .get(name)
            .ok_or_else(|| BindError::UnknownVariant(name.to_owned()))?;
        Ok(variant(parameters))
    }

    #[must_use]
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    /// Registered variant names, sorted.
    #[must_use]
    pub fn variant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C> fmt::Debug for DecoratorFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DecoratorFactory")
            .field("variants", &names)
            .field("custom_registry", &self.registry.is_some())
            .finish()
    }
}
