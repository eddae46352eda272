//! Property-based invariant tests for bound methods.
//!
//! Random interleavings of mount, unmount, and predicate writes are replayed
//! against a small model:
//!
//! 1. While mounted, the method fires once per false→true transition.
//! 2. Mounting while the predicate holds fires exactly once.
//! 3. While unmounted, nothing fires.
//! 4. Live subscriptions are non-zero exactly while mounted.
//! 5. The lifecycle hooks are wrapped once no matter how many methods bind.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use whenbind::reactive::Observable;
use whenbind::{Args, BindingRegistry, ComponentClass, args, when};

struct Lamp {
    power: Observable<i32>,
    lit: Cell<u32>,
}

#[derive(Debug, Clone)]
enum Step {
    Mount,
    Unmount,
    Set(i32),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => Just(Step::Mount),
        1 => Just(Step::Unmount),
        4 => (-3i32..=3).prop_map(Step::Set),
    ]
}

fn lamp_class(registry: &BindingRegistry) -> ComponentClass<Lamp> {
    let mut class = ComponentClass::new("Lamp")
        .method("component_did_mount", |_: &Rc<Lamp>, _: &Args| {})
        .method("component_will_unmount", |_: &Rc<Lamp>, _: &Args| {})
        .method("light", |this: &Rc<Lamp>, _: &Args| {
            this.lit.set(this.lit.get() + 1);
        });
    when(|l: &Lamp| l.power.get() > 0, args![])
        .with_registry(registry.clone())
        .apply(&mut class, "light")
        .expect("lamp class defines its hooks");
    class
}

proptest! {
    #[test]
    fn fires_match_model(initial in -3i32..=3, steps in proptest::collection::vec(step_strategy(), 0..48)) {
        let registry = BindingRegistry::new();
        let class = lamp_class(&registry);
        let lamp = Rc::new(Lamp { power: Observable::new(initial), lit: Cell::new(0) });

        let mut mounted = false;
        let mut on = initial > 0;
        let mut expected = 0u32;

        for step in &steps {
            match step {
                Step::Mount => {
                    // Only pair mounts with unmounts; double mounting is
                    // covered by the integration tests.
                    if !mounted {
                        class.call(&lamp, "component_did_mount", &Args::new()).unwrap();
                        mounted = true;
                        if on {
                            expected += 1;
                        }
                    }
                }
                Step::Unmount => {
                    if mounted {
                        class.call(&lamp, "component_will_unmount", &Args::new()).unwrap();
                        mounted = false;
                    }
                }
                Step::Set(value) => {
                    lamp.power.set(*value);
                    let now = *value > 0;
                    if mounted && now && !on {
                        expected += 1;
                    }
                    on = now;
                }
            }
            prop_assert_eq!(lamp.lit.get(), expected);
            prop_assert_eq!(registry.active_subscriptions(&class, &lamp) > 0, mounted);
        }
    }

    #[test]
    fn wrapping_happens_once(method_count in 1usize..8) {
        let registry = BindingRegistry::new();
        let mut class = ComponentClass::<Lamp>::new("Many")
            .method("component_did_mount", |_: &Rc<Lamp>, _: &Args| {})
            .method("component_will_unmount", |_: &Rc<Lamp>, _: &Args| {});
        for i in 0..method_count {
            class.define(format!("m{i}"), |_: &Rc<Lamp>, _: &Args| {});
        }
        for i in (0..method_count).rev() {
            when(|l: &Lamp| l.power.get() > 0, args![])
                .with_registry(registry.clone())
                .apply(&mut class, &format!("m{i}"))
                .unwrap();
        }
        prop_assert_eq!(class.revision("component_did_mount"), Some(1));
        prop_assert_eq!(class.revision("component_will_unmount"), Some(1));
        prop_assert_eq!(registry.bound_methods(&class).len(), method_count);
    }
}
