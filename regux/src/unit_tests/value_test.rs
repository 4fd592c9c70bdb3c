use crate::{Immutable, Value};

#[test]
fn test_set_keeps_untouched_children() {
    let items = Immutable::list([1, 2, 3]);
    let root = Immutable::map([("items", Value::from(items)), ("count", Value::from(0))]);

    let next = root.set("count", 1);

    assert!(!next.ptr_eq(&root));
    let (Some(before), Some(after)) = (root.get("items"), next.get("items")) else {
        panic!("items missing");
    };
    assert!(before.same(after));
    assert_eq!(root.get("count"), Some(&Value::Int(0)));
    assert_eq!(next.get("count"), Some(&Value::Int(1)));
}

#[test]
fn test_set_in_creates_intermediate_maps() {
    let root = Immutable::empty_map();
    let next = root.set_in(&["user", "profile", "name"], "ada");

    assert!(root.is_empty());
    assert_eq!(
        next.get_in(&["user", "profile", "name"]),
        Some(&Value::from("ada"))
    );
    assert!(next.get("user").and_then(Value::as_immutable).is_some());
}

#[test]
fn test_set_in_through_plain_map_keeps_siblings() {
    let root = Immutable::map([(
        "user",
        Value::map([("name", "ada"), ("age", "36")]),
    )]);
    let next = root.set_in(&["user", "age"], "37");

    assert_eq!(next.get_in(&["user", "age"]), Some(&Value::from("37")));
    assert_eq!(next.get_in(&["user", "name"]), Some(&Value::from("ada")));
    assert_eq!(root.get_in(&["user", "age"]), Some(&Value::from("36")));

    let tags = Immutable::map([("tags", Value::List(vec!["a".into(), "b".into()]))]);
    let next = tags.set_in(&["tags", "1"], "z");
    assert_eq!(next.get_in(&["tags", "0"]), Some(&Value::from("a")));
    assert_eq!(next.get_in(&["tags", "1"]), Some(&Value::from("z")));
}

#[test]
fn test_debug_prints_collection() {
    let value: Value = Immutable::map([("id", 1)]).into();
    assert_eq!(format!("{value:?}"), r#"Immutable({"id": Int(1)})"#);
    assert_eq!(format!("{:?}", Immutable::list([true])), "[Bool(true)]");
}

#[test]
fn test_list_access_and_push() {
    let list = Immutable::list(["a", "b"]);
    assert!(list.is_list());
    assert_eq!(list.get("1"), Some(&Value::from("b")));
    assert_eq!(list.get("x"), None);

    let pushed = list.push("c");
    assert_eq!(pushed.len(), 3);
    assert_eq!(list.len(), 2);
    assert_eq!(pushed.keys(), vec!["0", "1", "2"]);

    let replaced = pushed.set("0", "z");
    assert_eq!(replaced.get("0"), Some(&Value::from("z")));
    assert_eq!(replaced.len(), 3);
}

#[test]
fn test_same_uses_identity_for_immutables() {
    let a = Immutable::map([("k", 1)]);
    let b = Immutable::map([("k", 1)]);

    assert_eq!(a, b);
    assert!(!Value::from(a.clone()).same(&Value::from(b)));
    assert!(Value::from(a.clone()).same(&Value::from(a)));

    assert!(Value::from(1).same(&Value::from(1)));
    assert!(Value::map([("k", 1)]).same(&Value::map([("k", 1)])));
    assert!(!Value::from(1).same(&Value::from("1")));
}

#[test]
fn test_plain_conversion_is_deep() {
    let nested = Value::map([
        ("tags", Value::List(vec![Value::from("x")])),
        ("owner", Value::map([("id", 7)])),
    ]);

    let immutable = nested.clone().into_immutable();
    assert!(immutable.as_immutable().is_some());
    assert!(immutable
        .get("owner")
        .and_then(Value::as_immutable)
        .is_some());

    assert_eq!(immutable.to_plain(), nested);
}

#[test]
fn test_truthiness_and_accessors() {
    assert!(!Value::Null.is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(!Value::from(0).is_truthy());
    assert!(Value::from(true).is_truthy());
    assert!(Value::Map(Default::default()).is_truthy());

    assert_eq!(Value::from(2.0).as_i64(), Some(2));
    assert_eq!(Value::from(2.5).as_i64(), None);
    assert_eq!(Value::from(1e19).as_i64(), None);
    assert_eq!(Value::from(-1e19).as_i64(), None);
    assert_eq!(Value::from(f64::INFINITY).as_i64(), None);
    assert_eq!(Value::from(-9_007_199_254_740_992.0).as_i64(), Some(-9_007_199_254_740_992));
    assert_eq!(Value::from(3).as_f64(), Some(3.0));
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::from("x"));
}
