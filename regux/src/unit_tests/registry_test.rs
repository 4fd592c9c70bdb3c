use super::{count_of, counter_store};
use crate::mock::assert::assert_data;
use crate::mock::MockComponent;
use crate::{
    connect, mapped_state, ActionCreator, ActionCreators, ConnectOptions, Payload, RegistryError,
    Scope, Store, Value,
};

fn creators() -> ActionCreators {
    ActionCreators::from_creators([
        ActionCreator::constant("INCREMENT", Payload::Empty),
        ActionCreator::new("SET_NAME", |args| args.first().cloned().map(Payload::Value)),
    ])
    .expect("valid types")
}

#[test]
fn test_registry_creates_by_type() {
    let mut registry = creators();
    assert_eq!(registry.len(), 2);

    let action = registry.create("SET_NAME", &[Value::from("ada")]).expect("created");
    assert_eq!(action.kind, "SET_NAME");
    assert_eq!(action.value(), Some(&Value::from("ada")));
    assert!(registry.create("SET_NAME", &[]).is_none());
    assert!(registry.create("MISSING", &[]).is_none());

    registry
        .add(ActionCreator::constant("RESET", Payload::Empty))
        .expect("added");
    assert_eq!(registry.get("RESET").map(ActionCreator::kind), Some("RESET"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_add_is_reserved() {
    let mut registry = ActionCreators::new();
    let err = registry
        .add(ActionCreator::constant("add", Payload::Empty))
        .unwrap_err();
    assert_eq!(err, RegistryError::ReservedType("add".to_string()));
    assert!(registry.is_empty());

    let rejected = ActionCreators::from_creators([ActionCreator::constant("add", 1)]);
    assert!(rejected.is_err());
}

#[tokio::test]
async fn test_registry_binds_through_connect() {
    let store = counter_store();
    let component = MockComponent::new();

    let options = ConnectOptions::new()
        .map_state(|state, _| mapped_state! { "value" => count_of(state) })
        .map_dispatch(creators().creators());
    let _subscription = connect(options)
        .mount(&Scope::with_store(store.store_ref()), component.clone())
        .expect("mounted");

    component.call("INCREMENT", &[]);
    component.call("SET_NAME", &[Value::from("grace")]);
    assert_data(&component, "value", 1);
    assert_eq!(store.get_state().get("name"), Some(&Value::from("grace")));
}
