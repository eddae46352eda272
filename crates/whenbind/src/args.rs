#![forbid(unsafe_code)]

//! Free-form method arguments.
//!
//! Bound parameters and manual call arguments share one representation:
//! an ordered, cheaply clonable sequence of type-erased values. Methods read
//! them back with [`Args::get`].

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Ordered sequence of arbitrary values passed to a component method.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Rc<dyn Any>>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value.
    #[must_use]
    pub fn with<T: Any>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any>(&mut self, value: T) {
        self.values.push(Rc::new(value));
    }

    /// The value at `index`, if present and of type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.downcast_ref::<T>()
    }

    /// Collect every value of type `T`, in order, skipping the rest.
    pub fn of_type<T: Any>(&self) -> impl Iterator<Item = &T> {
        self.values.iter().filter_map(|v| v.downcast_ref::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.len()).finish()
    }
}

/// Build [`Args`] from a list of expressions.
///
/// ```
/// use whenbind::args;
///
/// let a = args![1i32, "two"];
/// assert_eq!(a.get::<i32>(0), Some(&1));
/// assert_eq!(a.get::<&str>(1), Some(&"two"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Args::new()$(.with($value))+
    };
}
