#![forbid(unsafe_code)]

//! Reactive primitives for whenbind.
//!
//! - [`Observable`]: a shared, version-tracked value with change callbacks.
//! - [`observe`]: watch a derived expression; returns a [`Disposer`].
//! - [`track`] / [`untracked`]: the read-tracking frames `observe` is
//!   built on.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc<RefCell<..>>`). Notifications are
//! delivered synchronously from the write that caused them. Observations
//! hold their sources strongly and are themselves held only by their
//! `Disposer`; sources refer back to observations weakly.
//!
//! # Invariants
//!
//! 1. An observation's callback fires only when the derived value changes.
//! 2. After `Disposer::dispose` no further callback fires.
//! 3. Each evaluation re-collects dependencies; stale sources are
//!    unsubscribed.

pub mod observable;
pub mod reaction;
pub mod tracking;

pub use observable::{Observable, Subscription};
pub use reaction::{Disposer, observe};
pub use tracking::{SourceId, TrackedSource, track, untracked};
