use jmespath_engine as jp;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn search(expression: &str, data: Value) -> Value {
    jp::search(expression, &data, &jp::SearchOptions::default()).unwrap()
}

#[test]
fn test_literals_round_trip() {
    assert_eq!(search("`\"abc\"`", Value::Null), json!("abc"));
    assert_eq!(search("`123`", Value::Null), json!(123));
    assert_eq!(search("'raw \\'quoted\\''", Value::Null), json!("raw 'quoted'"));
    assert_eq!(search("`[1, {\"a\": true}]`", Value::Null), json!([1, {"a": true}]));
}

#[test]
fn test_field_access() {
    assert_eq!(search("foo", json!(5)), Value::Null);
    assert_eq!(search("foo", json!({})), Value::Null);
    assert_eq!(search("foo", json!({"foo": 1})), json!(1));
    assert_eq!(search("\"with space\"", json!({"with space": 2})), json!(2));
    assert_eq!(search("a.b.c", json!({"a": {"b": {"c": "deep"}}})), json!("deep"));
    assert_eq!(search("a.b.c", json!({"a": {"b": 1}})), Value::Null);
}

#[test]
fn test_projection_drops_nulls() {
    let data = json!({"items": [{"v": 1}, {}, {"v": 3}]});
    assert_eq!(search("items[].v", data.clone()), json!([1, 3]));
    assert_eq!(search("items[*].v", data), json!([1, 3]));
}

#[test]
fn test_flatten_is_one_level() {
    assert_eq!(search("[]", json!([[1, [2]], [3]])), json!([1, [2], 3]));
    assert_eq!(search("[][]", json!([[1, [2]], [3]])), json!([1, 2, 3]));
    assert_eq!(search("a[]", json!({"a": "x"})), Value::Null);
}

#[test]
fn test_index_wraparound() {
    assert_eq!(search("[-1]", json!([1, 2, 3])), json!(3));
    assert_eq!(search("[-1]", json!([])), Value::Null);
    assert_eq!(search("[0]", json!({"0": 1})), Value::Null);
    assert_eq!(search("a[1][0]", json!({"a": [[0], [9, 8]]})), json!(9));
}

#[test]
fn test_slices() {
    let data = json!({"a": [0, 1, 2, 3, 4]});
    assert_eq!(search("a[1:4:2]", data.clone()), json!([1, 3]));
    assert_eq!(search("a[::-2]", data.clone()), json!([4, 2, 0]));
    assert_eq!(search("a[:2].to_string(@)", data), json!(["0", "1"]));
    let nested = json!({"a": [[{"b": 1}, {"b": 2}, {"b": 3}]]});
    assert_eq!(search("a[0][0:2].b", nested), json!([1, 2]));
}

#[test]
fn test_comparator_type_gating() {
    assert_eq!(search("a<b", json!({"a": "x", "b": "y"})), Value::Null);
    assert_eq!(search("a<b", json!({"a": 1, "b": 2})), json!(true));
    assert_eq!(search("a>=b", json!({"a": 2, "b": 2.0})), json!(true));
    assert_eq!(search("a==b", json!({"a": {"x": [1]}, "b": {"x": [1.0]}})), json!(true));
    assert_eq!(search("a!=b", json!({"a": "1", "b": 1})), json!(true));
}

#[test]
fn test_projection_stop() {
    assert_eq!(search("a[*].b", json!({"a": [{"b": 1}, {"b": 2}]})), json!([1, 2]));
    assert_eq!(search("a[*] | b", json!({"a": [{"b": 1}], "b": 9})), Value::Null);
    assert_eq!(search("a[*].b | [0]", json!({"a": [{"b": 1}, {"b": 2}]})), json!(1));
    assert_eq!(search("a[*].b[0]", json!({"a": [{"b": [1]}, {"b": [2]}]})), json!([1, 2]));
}

#[test]
fn test_filters() {
    let data = json!({
        "people": [
            {"name": "a", "age": 30, "tags": ["x"]},
            {"name": "b", "age": 20, "tags": []},
            {"name": "c", "age": 40}
        ]
    });
    assert_eq!(search("people[?age > `25`].name", data.clone()), json!(["a", "c"]));
    assert_eq!(search("people[?tags].name", data.clone()), json!(["a"]));
    assert_eq!(search("people[?!tags].name", data.clone()), json!(["b", "c"]));
    assert_eq!(search("people[?age > `25` && name != 'c'].name", data.clone()), json!(["a"]));
    assert_eq!(search("people[?name == 'b'] | [0].age", data.clone()), json!(20));
    assert_eq!(search("[?@ > `1`]", json!([1, 2, 3])), json!([2, 3]));
    assert_eq!(search("people[?age == `0`]", json!({"people": {"age": 0}})), Value::Null);
}

#[test]
fn test_value_projection_keeps_key_order() {
    let data = json!({"z": {"v": 1}, "a": {"v": 2}, "m": {}});
    assert_eq!(search("*.v", data.clone()), json!([1, 2]));
    assert_eq!(search("keys(@)", data), json!(["z", "a", "m"]));
    assert_eq!(search("*.v", json!([1])), Value::Null);
}

#[test]
fn test_boolean_operators() {
    assert_eq!(search("a || b", json!({"a": [], "b": "fallback"})), json!("fallback"));
    assert_eq!(search("a || b", json!({"a": 0, "b": 1})), json!(0));
    assert_eq!(search("a && b", json!({"a": "", "b": 1})), json!(""));
    assert_eq!(search("a && b", json!({"a": true, "b": 1})), json!(1));
    assert_eq!(search("!a", json!({"a": 0})), json!(false));
    assert_eq!(search("!a", json!({})), json!(true));
}

#[test]
fn test_multi_select() {
    let data = json!({"a": 1, "b": {"c": 2}});
    assert_eq!(search("[a, b.c]", data.clone()), json!([1, 2]));
    assert_eq!(search("{x: a, y: b.c, z: missing}", data.clone()), json!({"x": 1, "y": 2, "z": null}));
    assert_eq!(search("missing.[a, b]", data.clone()), Value::Null);
    assert_eq!(search("missing.{a: a}", data), Value::Null);
    assert_eq!(
        search("people[*].{n: name}", json!({"people": [{"name": "a"}, {"name": "b"}]})),
        json!([{"n": "a"}, {"n": "b"}])
    );
}

#[test]
fn test_current_node_and_parentheses() {
    assert_eq!(search("@", json!([1])), json!([1]));
    assert_eq!(search("(a || b).c", json!({"b": {"c": 3}})), json!(3));
    assert_eq!(search("length(@)", json!("héllo")), json!(5));
}

#[test]
fn test_sort_by_is_stable() {
    let data = json!([{"k": 1, "i": "a"}, {"k": 0, "i": "z"}, {"k": 1, "i": "b"}]);
    assert_eq!(search("sort_by(@, &k)[*].i", data), json!(["z", "a", "b"]));
}

#[test]
fn test_search_is_idempotent() {
    let data = json!({"a": [{"b": 1}, {"b": 2}]});
    let first = search("a[?b > `1`].b", data.clone());
    let second = search("a[?b > `1`].b", data);
    assert_eq!(first, second);
    let compiled = jp::compile("a[?b > `1`].b").unwrap();
    jp::purge_cache();
    assert_eq!(compiled.ast, jp::compile("a[?b > `1`].b").unwrap().ast);
}

#[test]
fn test_example_service_name() {
    let json = r#"{"otel":{"resourceSpans":[{"resource":{"attributes":[{"key":"service.name","value":"nexa-agent-server"}]}}]}}"#;
    let out = jp::search_json(
        json,
        "otel.resourceSpans[].resource.attributes[?key=='service.name'].value[] | [0]",
    )
    .unwrap();
    assert_eq!(out, json!("nexa-agent-server"));
}

#[test]
fn test_render_dot_file() {
    let dot = jp::compile("a[0]").unwrap().render_dot_file();
    assert!(dot.starts_with("digraph AST {\n"));
    assert!(dot.contains("[label=\"index_expression\"]"));
    assert!(dot.contains("[label=\"index(0)\"]"));
    assert!(dot.ends_with("}\n"));
}
