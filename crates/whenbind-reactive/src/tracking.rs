#![forbid(unsafe_code)]

//! Read tracking for derived expressions.
//!
//! A tracking frame is pushed for the duration of [`track`]; every
//! [`Observable`](crate::Observable) read inside it is recorded once (by
//! [`SourceId`]). Frames nest: only the innermost frame sees a read.
//! [`untracked`] pushes a sentinel frame that swallows reads.

use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::Subscription;

/// Identity of a tracked source. Two handles to the same cell compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub(crate) usize);

/// Something an expression can depend on.
pub trait TrackedSource {
    fn source_id(&self) -> SourceId;

    /// Invoke `on_change` on each change until the subscription drops.
    fn watch(&self, on_change: Rc<dyn Fn()>) -> Subscription;
}

enum Frame {
    Collect(Vec<(SourceId, Rc<dyn TrackedSource>)>),
    Ignore,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Pops the frame on drop so a panicking expression cannot leave a stale
/// frame on the stack.
struct FrameGuard;

impl FrameGuard {
    fn push(frame: Frame) -> Self {
        FRAMES.with(|frames| frames.borrow_mut().push(frame));
        Self
    }

    fn take(self) -> Option<Frame> {
        let frame = FRAMES.with(|frames| frames.borrow_mut().pop());
        std::mem::forget(self);
        frame
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Run `f`, returning its result and the distinct sources it read.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn TrackedSource>>) {
    let guard = FrameGuard::push(Frame::Collect(Vec::new()));
    let result = f();
    let sources = match guard.take() {
        Some(Frame::Collect(sources)) => sources.into_iter().map(|(_, s)| s).collect(),
        _ => Vec::new(),
    };
    (result, sources)
}

/// Run `f` without recording any of its reads in the enclosing frame.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = FrameGuard::push(Frame::Ignore);
    f()
}

pub(crate) fn is_tracking() -> bool {
    FRAMES.with(|frames| matches!(frames.borrow().last(), Some(Frame::Collect(_))))
}

/// Record a read. `make` is only called the first time `id` is seen in the
/// current frame.
pub(crate) fn record(id: SourceId, make: impl FnOnce() -> Rc<dyn TrackedSource>) {
    FRAMES.with(|frames| {
        if let Some(Frame::Collect(sources)) = frames.borrow_mut().last_mut()
            && !sources.iter().any(|(seen, _)| *seen == id)
        {
            sources.push((id, make()));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Observable;

    #[test]
    fn collects_distinct_reads() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (sum, sources) = track(|| a.get() + a.get() + b.get());
        assert_eq!(sum, 4);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn peek_is_invisible() {
        let a = Observable::new(1);
        let (_, sources) = track(|| a.peek());
        assert!(sources.is_empty());
    }

    #[test]
    fn untracked_hides_reads_from_outer_frame() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (_, sources) = track(|| {
            let _ = untracked(|| a.get());
            b.get()
        });
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_id(), b.source_id());
    }

    #[test]
    fn nested_frames_are_independent() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (inner, outer) = track(|| {
            let (_, inner) = track(|| a.get());
            let _ = b.get();
            inner
        });
        assert_eq!(inner.len(), 1);
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].source_id(), b.source_id());
        assert!(!is_tracking());
    }

    #[test]
    fn panic_inside_frame_unwinds_stack() {
        let a = Observable::new(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            track(|| {
                let _ = a.get();
                panic!("boom");
            })
        }));
        assert!(result.is_err());
        assert!(!is_tracking());
    }
}
