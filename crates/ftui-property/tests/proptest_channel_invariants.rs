//! Property-based invariant tests for reentrant delivery.
//!
//! A script is a list of top-level signals. The first delivery of each one
//! raises a burst of nested signals from inside a subscriber. For any script:
//!
//! 1. Changes are delivered in signal order and none is lost.
//! 2. Deliveries never interleave (enter/exit strictly alternate).
//! 3. After a burst, every change of the group except the last is outdated.
//! 4. Without nesting no change is ever outdated.
//! 5. The value adapter only sees active, non-outdated changes.
//! 6. The channel is idle with an empty queue after every top-level signal.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ftui_property::{DirectProperty, PropertyChange, PropertyChannel, PropertyOwner, PropertyValue};
use proptest::prelude::*;

struct Knob {
    value: Cell<u32>,
}

impl PropertyOwner for Knob {}

/// (active, nested activity flags) per top-level signal.
type Script = Vec<(bool, Vec<bool>)>;

fn script_strategy() -> impl Strategy<Value = Script> {
    proptest::collection::vec(
        (any::<bool>(), proptest::collection::vec(any::<bool>(), 0..6)),
        0..12,
    )
}

struct Harness {
    owner: Rc<Knob>,
    channel: PropertyChannel<u32>,
    next: Cell<u32>,
}

impl Harness {
    fn new() -> Rc<Self> {
        let prop = DirectProperty::<Knob, u32>::new("Value", |k| k.value.get());
        let owner = Rc::new(Knob {
            value: Cell::new(0),
        });
        let channel = PropertyChannel::direct(&owner, &prop);
        Rc::new(Self {
            owner,
            channel,
            next: Cell::new(1),
        })
    }

    fn fire(&self, active: bool) -> u32 {
        let value = self.next.get();
        self.next.set(value + 1);
        let old = self.owner.value.replace(value);
        self.channel.signal(
            self.channel
                .new_change(Some(old), PropertyValue::Value(value))
                .with_active_value_change(active),
        );
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Enter(u32),
    Exit(u32),
}

proptest! {
    #[test]
    fn reentrant_scripts_hold_invariants(script in script_strategy()) {
        let harness = Harness::new();

        let adapter_log = Rc::new(RefCell::new(Vec::new()));
        let adapter_log_c = Rc::clone(&adapter_log);
        let _adapter = harness
            .channel
            .value_adapter()
            .subscribe(move |v: &u32| adapter_log_c.borrow_mut().push(*v));
        // Replay of the initial 0.
        adapter_log.borrow_mut().clear();

        let delivered: Rc<RefCell<Vec<Rc<PropertyChange<u32>>>>> = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::new(RefCell::new(Vec::new()));
        let armed: Rc<RefCell<Option<Vec<bool>>>> = Rc::new(RefCell::new(None));

        let weak_harness = Rc::downgrade(&harness);
        let (delivered_c, events_c, armed_c) =
            (Rc::clone(&delivered), Rc::clone(&events), Rc::clone(&armed));
        let _trigger = harness.channel.subscribe(move |change| {
            let v = change.new_value().value().copied().unwrap_or_default();
            events_c.borrow_mut().push(Event::Enter(v));
            delivered_c.borrow_mut().push(Rc::clone(change));
            let nested = armed_c.borrow_mut().take();
            if let (Some(nested), Some(h)) = (nested, weak_harness.upgrade()) {
                for active in nested {
                    h.fire(active);
                }
            }
            events_c.borrow_mut().push(Event::Exit(v));
        });

        let mut expected_order = Vec::new();
        let mut expected_outdated = Vec::new();
        let mut expected_adapter = Vec::new();
        let mut next = 1u32;

        for (active, nested) in &script {
            *armed.borrow_mut() = Some(nested.clone());

            let top = next;
            next += 1;
            expected_order.push(top);
            expected_outdated.push(!nested.is_empty());
            // The adapter subscribed before the trigger, so it sees the
            // top-level change before the burst outdates it.
            if *active {
                expected_adapter.push(top);
            }
            for (i, nested_active) in nested.iter().enumerate() {
                let value = next;
                next += 1;
                let last = i + 1 == nested.len();
                expected_order.push(value);
                expected_outdated.push(!last);
                if last && *nested_active {
                    expected_adapter.push(value);
                }
            }

            let fired = harness.fire(*active);
            prop_assert_eq!(fired, top);
            prop_assert!(!harness.channel.is_publishing());
            prop_assert_eq!(harness.channel.pending_len(), 0);
        }

        let delivered = delivered.borrow();
        let order: Vec<u32> = delivered
            .iter()
            .map(|c| c.new_value().value().copied().unwrap_or_default())
            .collect();
        prop_assert_eq!(order, expected_order);

        let outdated: Vec<bool> = delivered.iter().map(|c| c.is_outdated()).collect();
        prop_assert_eq!(outdated, expected_outdated);

        prop_assert_eq!(adapter_log.borrow().clone(), expected_adapter);

        let events = events.borrow();
        for pair in events.chunks(2) {
            match pair {
                [Event::Enter(a), Event::Exit(b)] => prop_assert_eq!(a, b),
                other => prop_assert!(false, "interleaved delivery: {:?}", other),
            }
        }
    }

    #[test]
    fn sequential_signals_never_outdate(actives in proptest::collection::vec(any::<bool>(), 0..32)) {
        let harness = Harness::new();
        let delivered: Rc<RefCell<Vec<Rc<PropertyChange<u32>>>>> = Rc::new(RefCell::new(Vec::new()));
        let delivered_c = Rc::clone(&delivered);
        let _sub = harness
            .channel
            .subscribe(move |change| delivered_c.borrow_mut().push(Rc::clone(change)));

        for active in &actives {
            harness.fire(*active);
        }

        let delivered = delivered.borrow();
        prop_assert_eq!(delivered.len(), actives.len());
        prop_assert!(delivered.iter().all(|c| !c.is_outdated()));
        for (change, active) in delivered.iter().zip(&actives) {
            prop_assert_eq!(change.is_active_value_change(), *active);
        }
    }
}
