//! Integration Tests for the Reactive Store
//!
//! These tests verify that stores, reactions, batching and selector
//! bindings work together correctly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hodux_core::graph::Key;
use hodux_core::{
    batch, connect, create_store, deep_equal, is_observable, unwrap, Component, Config,
    ConfigScope, Consumer, DebugEvent, Error, Operation, Reaction, SelectorBinding, Value,
};
use serde_json::json;

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    (count, move || {
        count_clone.fetch_add(1, Ordering::SeqCst);
    })
}

/// Test that wrapping the same raw object twice yields the same store.
#[test]
fn create_store_is_idempotent_and_unwraps_to_the_model() {
    let model = Value::from(json!({ "n": 0, "nested": { "a": 1 } }));

    let first = create_store(model.clone()).unwrap();
    let second = create_store(model.clone()).unwrap();
    assert!(first.ptr_eq(&second));

    let raw = unwrap(&Value::Observable(first.clone())).unwrap();
    assert!(raw.ptr_eq(model.node().unwrap()));

    // Nested containers are wrapped on read, always to the same wrapper.
    assert!(is_observable(&first.get("nested")));
    assert_eq!(first.get("nested"), second.get("nested"));
}

/// Test that only plain objects can become stores.
#[test]
fn create_store_rejects_non_object_roots() {
    for model in [
        Value::Null,
        Value::Undefined,
        Value::from(json!([1, 2])),
        Value::set([1]),
        Value::map([("k", 1)]),
    ] {
        assert!(matches!(
            create_store(model),
            Err(Error::InvalidModel { .. })
        ));
    }

    // ...but any of them may live inside one.
    let store = create_store(Value::object([
        ("list", Value::from(json!([1, 2]))),
        ("set", Value::set([1])),
        ("nothing", Value::Null),
    ]))
    .unwrap();
    assert_eq!(store.len(), 3);
}

/// Test that a reaction reading `a` ignores writes to `b`.
#[test]
fn tracking_is_precise_per_key() {
    let store = create_store(json!({ "a": 1, "b": 1 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        s.get("a");
        Ok(())
    })
    .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.set("b", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.set("a", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test that dependencies follow the branch taken on the latest run.
#[test]
fn dependencies_follow_the_latest_branch() {
    let store = create_store(json!({ "cond": true, "a": 1, "b": 1 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        if s.get("cond").as_bool().unwrap_or(false) {
            s.get("a");
        } else {
            s.get("b");
        }
        Ok(())
    })
    .unwrap();

    store.set("cond", false).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    store.set("a", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    store.set("b", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Test that writing an identical value triggers nothing.
#[test]
fn no_op_writes_are_suppressed() {
    let store = create_store(json!({ "n": 0, "s": "x", "nan": null })).unwrap();
    store.set("nan", f64::NAN).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        s.get("n");
        s.get("s");
        s.get("nan");
        Ok(())
    })
    .unwrap();

    store.set("n", 0).unwrap();
    store.set("s", "x").unwrap();
    store.set("nan", f64::NAN).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store.set("n", -0.0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test that N writes inside one batch run the reaction once, afterwards.
#[test]
fn batch_coalesces_repeated_writes() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = store.clone();
    let seen_clone = seen.clone();
    let _reaction = Reaction::new(move || {
        seen_clone.lock().unwrap().push(s.get("n"));
        Ok(())
    })
    .unwrap();

    batch(|| {
        for n in 1..=5 {
            store.set("n", n)?;
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Value::from(0), Value::from(5)]);
}

/// Test that a failing batch still flushes and leaves batching.
#[test]
fn failed_batch_flushes_what_it_queued() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        s.get("n");
        Ok(())
    })
    .unwrap();

    let result: hodux_core::Result<()> = batch(|| {
        store.set("n", 1)?;
        store.push(1)?;
        Ok(())
    });

    assert!(matches!(result, Err(Error::Unsupported { op: "push", .. })));
    assert!(!hodux_core::is_batching());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test the equality gate with structural equality.
#[test]
fn deep_equality_gates_fresh_objects() {
    let store = create_store(json!({ "a": 1, "unrelated": 0 })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let selector = move || -> hodux_core::Result<Value> {
        s.get("unrelated");
        Ok(Value::from(json!({ "a": s.get("a").as_f64() })))
    };

    let gated_config = Config::new().equals(deep_equal);
    let _gated = SelectorBinding::bind(selector.clone(), refresh, &gated_config).unwrap();
    store.set("unrelated", 1).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    // Reference equality would have refreshed.
    let (ungated_refreshes, ungated_refresh) = counter();
    let _ungated = SelectorBinding::bind(selector, ungated_refresh, &Config::new()).unwrap();
    store.set("unrelated", 2).unwrap();
    assert_eq!(ungated_refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    store.set("a", 2).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

/// `{ n: 0 }`; `n = 0` → no refresh; `n = 1` → one refresh, selection 1.
#[test]
fn end_to_end_single_writes() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let binding = SelectorBinding::bind(move || Ok(s.get("n")), refresh, &Config::new()).unwrap();

    store.set("n", 0).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 0);

    store.set("n", 1).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(binding.value(), Value::from(1));
}

/// `batch(n = 1; n = 2)` → exactly one refresh, selection 2.
#[test]
fn end_to_end_batched_writes() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let binding = SelectorBinding::bind(move || Ok(s.get("n")), refresh, &Config::new()).unwrap();

    batch(|| {
        store.set("n", 1)?;
        store.set("n", 2)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(binding.value(), Value::from(2));
}

/// A selector on `items.size` refreshes on a new member only.
#[test]
fn end_to_end_set_size() {
    let store = create_store(Value::object([("items", Value::set(Vec::<Value>::new()))])).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let binding = SelectorBinding::bind(
        move || {
            let items = s.get("items");
            Ok(items.as_observable().map_or(0, |items| items.size()))
        },
        refresh,
        &Config::new(),
    )
    .unwrap();

    let items = store.get("items");
    let items = items.as_observable().unwrap();

    items.add("x").unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(binding.value(), Value::from(1));

    items.add("x").unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

/// Test that selecting the whole store reacts to nested writes.
#[test]
fn selecting_a_whole_object_tracks_nested_keys() {
    let store = create_store(json!({ "user": { "name": "a", "tags": ["x"] } })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let binding = SelectorBinding::bind(
        move || Ok(Value::Observable(s.clone())),
        refresh,
        &Config::new().equals(deep_equal),
    )
    .unwrap();

    let user = store.get("user");
    let tags = user.as_observable().unwrap().get("tags");
    tags.as_observable().unwrap().push("y").unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    let snapshot = serde_json::to_value(binding.value()).unwrap();
    assert_eq!(snapshot, json!({ "user": { "name": "a", "tags": ["x", "y"] } }));
}

/// Test debugger events for reads and writes.
#[test]
fn debugger_receives_reads_and_writes() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let events: Arc<Mutex<Vec<(Operation, Option<Key>)>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = events.clone();
    let config = Config::new().debugger(move |event: &DebugEvent| {
        sink.lock().unwrap().push((event.op, event.key.clone()));
    });

    let s = store.clone();
    let _binding = SelectorBinding::bind(move || Ok(s.get("n")), || {}, &config).unwrap();
    store.set("n", 1).unwrap();

    let events = events.lock().unwrap().clone();
    assert_eq!(events[0], (Operation::Get, Some(Key::prop("n"))));
    assert!(events.contains(&(Operation::Set, Some(Key::prop("n")))));
}

/// Test that structural writes and membership reads reach the debugger
/// with their payloads.
#[test]
fn debugger_receives_structural_events() {
    let store = create_store(Value::object([
        ("n", Value::from(0)),
        ("tags", Value::set(["a"])),
    ]))
    .unwrap();
    let tags_node = unwrap(&store.get("tags")).unwrap();
    let events: Arc<Mutex<Vec<DebugEvent>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = events.clone();
    let config = Config::new().debugger(move |event: &DebugEvent| {
        sink.lock().unwrap().push(event.clone());
    });

    let s = store.clone();
    let _binding = SelectorBinding::bind(
        move || {
            s.has("extra");
            let tags = s.get("tags");
            let tags = tags.as_observable().unwrap();
            tags.contains("a");
            Ok(tags.size() as f64)
        },
        || {},
        &config,
    )
    .unwrap();

    let reads = events.lock().unwrap().clone();
    assert!(reads
        .iter()
        .any(|e| e.op == Operation::Has && e.key == Some(Key::prop("extra"))));
    assert!(reads
        .iter()
        .any(|e| e.op == Operation::Has && e.key == Some(Key::Entry(Value::from("a")))));
    assert!(reads
        .iter()
        .any(|e| e.op == Operation::Iterate && e.key.is_none() && e.target.ptr_eq(&tags_node)));

    let writes = |op: Operation| -> Vec<DebugEvent> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.op == op)
            .cloned()
            .collect()
    };

    store.set("extra", 1).unwrap();
    let added = writes(Operation::Add);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].key, Some(Key::prop("extra")));
    assert_eq!(added[0].value, Some(Value::from(1)));
    assert_eq!(added[0].old_value, None);

    store.delete("extra").unwrap();
    let deleted = writes(Operation::Delete);
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].key, Some(Key::prop("extra")));
    assert_eq!(deleted[0].old_value, Some(Value::from(1)));

    store.get("tags").as_observable().unwrap().clear().unwrap();
    let cleared = writes(Operation::Clear);
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].target.ptr_eq(&tags_node));
    assert_eq!(cleared[0].key, None);
    let old_target = cleared[0].old_target.clone().unwrap();
    assert!(!old_target.ptr_eq(&tags_node));
    assert_eq!(serde_json::to_value(Value::Node(old_target)).unwrap(), json!(["a"]));
    assert!(tags_node.is_empty());
}

/// Test that a non-callable `equals` fails when building the config.
#[test]
fn non_callable_equals_is_a_config_error() {
    let err = Config::from_parts(Some(Value::from("deep")), None).unwrap_err();
    assert!(matches!(err, Error::Config { field: "equals", .. }));
}

/// Test that per-binding config beats the ambient scope.
#[test]
fn binding_config_beats_ambient_config() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (refreshes, refresh) = counter();
    let consumer = Consumer::new(refresh);

    ConfigScope::provide(Config::new().equals(|_: &Value, _: &Value| true), || {
        let s = store.clone();
        consumer.render(|hooks| {
            hooks.use_selector_with(
                move || Ok(s.get("n")),
                &Config::new().equals(hodux_core::ref_equal),
            )
        })
    })
    .unwrap();

    store.set("n", 1).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

struct Label;

impl Component for Label {
    type Output = String;

    fn render(&self, props: &Value) -> String {
        let node = props.node().unwrap();
        format!("{}: {:?}", node.get("title").as_str().unwrap_or(""), node.get("count"))
    }
}

/// Test `connect` end to end.
#[test]
fn connected_component_renders_merged_props() {
    let store = create_store(json!({ "count": 1 })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let connected = connect(
        move |_props: &Value| Ok(Value::object([("count", s.get("count"))])),
        None,
    )
    .wrap(Label, refresh);
    assert_eq!(connected.display_name(), "Connected(Label)");

    let own = Value::object([("title", "clicks")]);
    assert_eq!(connected.render(&own).unwrap(), "clicks: 1");

    store.set("count", 2).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(connected.render(&own).unwrap(), "clicks: 2");

    connected.unmount();
    store.set("count", 3).unwrap();
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
}

/// Test that disposal silences a reaction immediately.
#[test]
fn disposed_reaction_is_silent() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let reaction = Reaction::new(move || {
        bump();
        s.get("n");
        Ok(())
    })
    .unwrap();

    reaction.dispose();
    assert_eq!(reaction.dependency_count(), 0);

    store.set("n", 1).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

/// Test that a reaction writing what it reads does not recurse.
#[test]
fn self_writing_reaction_does_not_recurse() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        let n = s.get("n").as_f64().unwrap_or(0.0);
        s.set("n", n + 1.0)
    })
    .unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("n"), Value::from(1));
}

/// Test that a reaction writing what it reads does not recurse when the
/// triggering write happens inside a batch.
#[test]
fn self_writing_reaction_does_not_recurse_inside_a_batch() {
    let store = create_store(json!({ "n": 0 })).unwrap();
    let (runs, bump) = counter();

    let s = store.clone();
    let _reaction = Reaction::new(move || {
        bump();
        let n = s.get("n").as_f64().unwrap_or(0.0);
        if n < 50.0 {
            s.set("n", n + 1.0)?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(store.get("n"), Value::from(1));

    batch(|| store.set("n", 10)).unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(store.get("n"), Value::from(11));
}

/// Test that writes made after an await point propagate normally.
#[tokio::test]
async fn writes_after_an_await_point_propagate() {
    let store = create_store(json!({ "status": "loading" })).unwrap();
    let (refreshes, refresh) = counter();

    let s = store.clone();
    let binding =
        SelectorBinding::bind(move || Ok(s.get("status")), refresh, &Config::new()).unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    store.set("status", "done").unwrap();

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(binding.value(), Value::from("done"));
}
