//! Property-based invariant tests for `observe`.
//!
//! 1. The callback sees exactly the changes of the derived value.
//! 2. Nothing fires after dispose, whatever the write sequence.
//! 3. Source subscriber lists drain once the observation is gone.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use whenbind_reactive::{Observable, observe};

fn writes_strategy(max_len: usize) -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(-5i32..=5, 0..=max_len)
}

proptest! {
    #[test]
    fn callback_matches_derived_changes(initial in -5i32..=5, writes in writes_strategy(64)) {
        let source = Observable::new(initial);
        let log = Rc::new(RefCell::new(Vec::new()));

        let s = source.clone();
        let sink = Rc::clone(&log);
        let _d = observe(move || s.get() > 0, move |v| sink.borrow_mut().push(*v));

        let mut expected = Vec::new();
        let mut last = initial > 0;
        for w in &writes {
            source.set(*w);
            let now = *w > 0;
            if now != last {
                expected.push(now);
                last = now;
            }
        }
        prop_assert_eq!(&*log.borrow(), &expected);
    }

    #[test]
    fn silent_after_dispose(split in 0usize..32, writes in writes_strategy(32)) {
        let source = Observable::new(0);
        let hits = Rc::new(RefCell::new(0usize));

        let s = source.clone();
        let h = Rc::clone(&hits);
        let mut d = observe(move || s.get(), move |_| *h.borrow_mut() += 1);

        let split = split.min(writes.len());
        for w in &writes[..split] {
            source.set(*w);
        }
        d.dispose();
        let before = *hits.borrow();
        for w in &writes[split..] {
            source.set(*w);
        }
        prop_assert_eq!(*hits.borrow(), before);
    }

    #[test]
    fn subscribers_drain_after_drop(writes in writes_strategy(16)) {
        let source = Observable::new(0);
        let s = source.clone();
        let d = observe(move || s.get(), |_| {});
        prop_assert_eq!(source.subscriber_count(), 1);
        drop(d);
        source.set(i32::MAX);
        for w in &writes {
            source.set(*w);
        }
        prop_assert_eq!(source.subscriber_count(), 0);
    }
}
