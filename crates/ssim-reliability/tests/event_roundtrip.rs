//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Property tests for the reliability event wire format."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use proptest::prelude::*;
use serde_json::Value;
use ssim_reliability::{Event, EventData, EventType, Mode};

fn event_type() -> impl Strategy<Value = EventType> {
    prop_oneof![Just(EventType::Fail), Just(EventType::Restore)]
}

fn mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Open), Just(Mode::Closed), Just(Mode::Current)]
}

fn element() -> impl Strategy<Value = String> {
    ("(line|switch|generator)", "[a-z][a-z0-9_]{0,12}")
        .prop_map(|(kind, name)| format!("{kind}.{name}"))
}

fn data_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::from),
    ]
}

fn data() -> impl Strategy<Value = EventData> {
    prop::collection::btree_map("[a-z_]{1,8}", data_value(), 0..4)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn decode_inverts_encode(
        kind in event_type(),
        mode in mode(),
        element in element(),
        data in data(),
    ) {
        let event = Event::new(kind, mode, element).with_data(data);
        let encoded = event.to_json().unwrap();
        prop_assert_eq!(Event::from_json(&encoded).unwrap(), event);
    }
}
