#![forbid(unsafe_code)]

//! Binding errors.

use std::fmt;

/// Which lifecycle hook a [`BindError::MissingLifecycleHook`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRole {
    /// The activation (mount) hook.
    Init,
    /// The deactivation (unmount) hook.
    Deinit,
}

impl fmt::Display for HookRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Deinit => f.write_str("deinit"),
        }
    }
}

/// Errors from decorating or calling component methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The class does not define the configured lifecycle hook.
    MissingLifecycleHook {
        class: String,
        hook: String,
        role: HookRole,
    },
    /// The class does not define the named method.
    UnknownMethod { class: String, method: String },
    /// No decorator variant is registered under this name.
    UnknownVariant(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLifecycleHook { class, hook, role } => write!(
                f,
                "class '{class}' has no {role} hook named '{hook}'; \
                 define it before binding methods"
            ),
            Self::UnknownMethod { class, method } => {
                write!(f, "class '{class}' has no method named '{method}'")
            }
            Self::UnknownVariant(name) => write!(f, "no binding variant named '{name}'"),
        }
    }
}

impl std::error::Error for BindError {}
