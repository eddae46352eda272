#![forbid(unsafe_code)]

//! Lifecycle interception.
//!
//! On the first decoration of a class, its init and deinit entries are
//! replaced by wrappers:
//!
//! ```text
//! init(this, args)   = original_init(this, args);   table.activate(this)
//! deinit(this, args) = original_deinit(this, args); table.deactivate(this)
//! ```
//!
//! The wrappers capture the originals and the class's binding table. The
//! class keeps a link to that table once both wrappers are installed, and
//! that link is the sole "already wrapped" marker. A registry that meets an
//! intercepted class for the first time adopts the existing table instead of
//! wrapping again.

use std::rc::Rc;

use tracing::debug;

use crate::args::Args;
use crate::binding::BindingTable;
use crate::class::{ComponentClass, Method};
use crate::config::LifecycleHooks;
use crate::error::{BindError, HookRole};
use crate::registry::BindingRegistry;

/// Return the binding table for `class`, wrapping its lifecycle hooks first
/// if no registry has done so yet.
///
/// Fails without touching the class when either hook is missing.
pub(crate) fn intercept<C: 'static>(
    class: &mut ComponentClass<C>,
    hooks: &LifecycleHooks,
    registry: &BindingRegistry,
) -> Result<Rc<BindingTable<C>>, BindError> {
    if let Some(table) = class.binding_table() {
        if !registry.is_intercepted(class.id()) {
            registry.register(&table);
            debug!(class = %class.name(), id = %class.id(), "binding table adopted");
        }
        return Ok(table);
    }

    let original_init = lookup_hook(class, &hooks.init, HookRole::Init)?;
    let original_deinit = lookup_hook(class, &hooks.deinit, HookRole::Deinit)?;

    let table = Rc::new(BindingTable::new(class.id(), class.name().to_owned()));

    let activating = Rc::clone(&table);
    let init: Method<C> = Rc::new(move |this: &Rc<C>, args: &Args| {
        original_init(this, args);
        activating.activate(this);
    });

    let deactivating = Rc::clone(&table);
    let deinit: Method<C> = Rc::new(move |this: &Rc<C>, args: &Args| {
        original_deinit(this, args);
        deactivating.deactivate(this);
    });

    class.replace_method(hooks.init.to_string(), init);
    class.replace_method(hooks.deinit.to_string(), deinit);
    class.set_binding_table(&table);
    registry.register(&table);

    debug!(
        class = %class.name(),
        id = %class.id(),
        init = %hooks.init,
        deinit = %hooks.deinit,
        "lifecycle hooks intercepted"
    );
    Ok(table)
}

fn lookup_hook<C: 'static>(
    class: &ComponentClass<C>,
    hook: &str,
    role: HookRole,
) -> Result<Method<C>, BindError> {
    class
        .get_method(hook)
        .ok_or_else(|| BindError::MissingLifecycleHook {
            class: class.name().to_owned(),
            hook: hook.to_owned(),
            role,
        })
}
