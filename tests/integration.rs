//! Integration tests for panekit.
//!
//! These tests exercise the public API from outside the crate, verifying that
//! reactivity, lifecycle, rendering and the diff engine work together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use panekit::component::LifecycleRegistry;
use panekit::render::{diff_lines, AsyncDriver, Driver, PatchOp};
use panekit::testing::{lines_to_string, patch_to_string, render_to_string, MemorySink};
use panekit::{App, AppConfig, DestinationId, Hooks, InboundEvent, Phase, Runtime, VNode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const PANE: DestinationId = DestinationId(1);

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// Diff contract
// ---------------------------------------------------------------------------

#[test]
fn test_diff_insert_and_replace() {
    let patch = diff_lines(
        &["line1", "line2", "line3", "line4"],
        &["line1", "updated", "line3", "newline", "line4"],
    );
    assert_eq!(
        patch.into_ops(),
        vec![
            PatchOp::Keep,
            PatchOp::Set("updated".into()),
            PatchOp::Keep,
            PatchOp::Set("newline".into()),
            PatchOp::Set("line4".into()),
        ]
    );
}

#[test]
fn test_diff_same_length_replacement() {
    let patch = diff_lines(&["line1", "line2", "line3"], &["updated1", "line2", "updated3"]);
    assert_eq!(
        patch.into_ops(),
        vec![
            PatchOp::Set("updated1".into()),
            PatchOp::Keep,
            PatchOp::Set("updated3".into()),
        ]
    );
}

#[test]
fn test_render_then_apply_on_empty_cache_has_no_keeps_or_deletes() {
    let tree = VNode::element("div")
        .with_child(VNode::element("bold").with_child("Files"))
        .with_child("src/lib.rs")
        .with_child("");
    let mut driver = Driver::new(MemorySink::new());
    let patch = driver.apply_diff(PANE, panekit::render(&tree)).expect("apply");
    assert!(patch
        .ops()
        .iter()
        .all(|op| matches!(op, PatchOp::Set(_))));
    assert_eq!(patch.len(), 3);
}

#[test]
fn test_apply_twice_is_all_keep() {
    let mut driver = Driver::new(MemorySink::new());
    driver.apply_diff(PANE, lines(&["a", "b", "c"])).expect("first");
    let patch = driver.apply_diff(PANE, lines(&["a", "b", "c"])).expect("second");
    assert!(patch.is_unchanged());
    assert_eq!(patch.len(), 3);
}

// ---------------------------------------------------------------------------
// Lifecycle contract
// ---------------------------------------------------------------------------

#[test]
fn test_mount_update_unmount_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let mut registry = LifecycleRegistry::new();
    registry.register_lifecycle(
        "x",
        Hooks::new()
            .on_mount(move || {
                l1.borrow_mut().push("f1");
                Ok(())
            })
            .on_update(move |_, _| {
                l2.borrow_mut().push("f2");
                Ok(())
            })
            .on_unmount(move || {
                l3.borrow_mut().push("f3");
                Ok(())
            }),
    );
    registry.trigger_lifecycle(Phase::Mount, "x", None);
    registry.trigger_lifecycle(Phase::Update, "x", Some(VNode::text("v")));
    registry.trigger_lifecycle(Phase::Unmount, "x", None);
    assert_eq!(*log.borrow(), vec!["f1", "f2", "f3"]);
}

#[test]
fn test_failing_click_does_not_block_hover() {
    let hovered = Rc::new(Cell::new(false));
    let hovered_c = hovered.clone();
    let mut registry = LifecycleRegistry::new();
    registry.register_lifecycle(
        "x",
        Hooks::new()
            .on_event("click", |_| Err("click handler failed".into()))
            .on_event("hover", move |_| {
                hovered_c.set(true);
                Ok(())
            }),
    );
    registry.trigger_event("x", "click", &Value::Null);
    registry.trigger_event("x", "hover", &Value::Null);
    assert!(hovered.get());
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn test_signal_write_patches_only_changed_line() {
    let sink = MemorySink::new();
    let mut app = App::new(sink.clone());
    let status = app.runtime().signal("clean".to_owned());
    let reader = status.clone();
    app.mount("status", PANE, Hooks::new(), move || {
        VNode::fragment([
            VNode::element("bold").with_child("Repository"),
            VNode::element("line").with_child("status: ").with_child(reader.get()),
            VNode::text("branch: main"),
        ])
    })
    .expect("mount");

    status.set("dirty".to_owned());
    app.tick();
    insta::assert_snapshot!(lines_to_string(&sink.lines(PANE)), @r"
    **Repository**
    status: dirty
    branch: main
    ");
    insta::assert_snapshot!(patch_to_string(&sink.last_patch(PANE).expect("patch")), @r"
    =
    + status: dirty
    =
    ");
}

#[test]
fn test_observable_record_drives_rerender() {
    let sink = MemorySink::new();
    let mut app = App::new(sink.clone());
    let state = app.runtime().observe(
        json!({ "title": "Todo", "items": { "count": 2 } })
            .as_object()
            .cloned()
            .expect("object"),
    );
    let reader = state.clone();
    app.mount("todo", PANE, Hooks::new(), move || {
        let title = reader
            .get_value("title")
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let count = reader
            .record("items")
            .and_then(|items| items.get_value("count"))
            .unwrap_or(Value::Null);
        VNode::fragment([VNode::text(title), VNode::text(format!("{count} items"))])
    })
    .expect("mount");
    assert_eq!(sink.lines(PANE), lines(&["Todo", "2 items"]));

    let items = state.record("items").expect("nested record");
    items.set("count", 3);
    app.tick();
    assert_eq!(sink.lines(PANE), lines(&["Todo", "3 items"]));

    // Writing an equal value does not re-render.
    let calls = sink.call_count();
    state.set("title", "Todo");
    app.tick();
    assert_eq!(sink.call_count(), calls);
}

#[test]
fn test_two_components_share_a_signal() {
    let sink = MemorySink::new();
    let mut app = App::new(sink.clone());
    let theme = app.runtime().signal("light");
    for (i, id) in ["left", "right"].into_iter().enumerate() {
        let theme = theme.clone();
        app.mount(id, DestinationId(i as u64 + 1), Hooks::new(), move || {
            VNode::text(format!("{id}: {}", theme.get()))
        })
        .expect("mount");
    }

    theme.set("dark");
    app.tick();
    assert_eq!(sink.lines(DestinationId(1)), lines(&["left: dark"]));
    assert_eq!(sink.lines(DestinationId(2)), lines(&["right: dark"]));
}

#[test]
fn test_batched_writes_render_once() {
    let sink = MemorySink::new();
    let mut app = App::new(sink.clone());
    let a = app.runtime().signal(1);
    let b = app.runtime().signal(2);
    let (ra, rb) = (a.clone(), b.clone());
    app.mount("sum", PANE, Hooks::new(), move || {
        VNode::text(format!("{}", ra.get() + rb.get()))
    })
    .expect("mount");

    let calls = sink.call_count();
    app.runtime().batch(|| {
        a.set(10);
        b.set(20);
    });
    assert_eq!(sink.call_count(), calls + 1);
    assert_eq!(sink.lines(PANE), lines(&["30"]));
}

#[test]
fn test_writes_between_ticks_coalesce() {
    let sink = MemorySink::new();
    let mut app = App::new(sink.clone());
    let a = app.runtime().signal(1);
    let b = app.runtime().signal(2);
    let (ra, rb) = (a.clone(), b.clone());
    app.mount("sum", PANE, Hooks::new(), move || {
        VNode::text(format!("{}", ra.get() + rb.get()))
    })
    .expect("mount");

    let calls = sink.call_count();
    a.set(10);
    b.set(20);
    a.set(30);
    assert_eq!(sink.lines(PANE), lines(&["3"]));
    assert_eq!(app.tick(), 1);
    assert_eq!(sink.call_count(), calls + 1);
    assert_eq!(sink.lines(PANE), lines(&["50"]));
}

#[test]
fn test_event_round_trip_through_app() {
    let sink = MemorySink::new();
    let mut app = App::with_config(sink.clone(), AppConfig::new().with_clear_on_unmount(true));
    let selected = app.runtime().signal(0usize);
    let (reader, writer) = (selected.clone(), selected.clone());
    let items = ["alpha", "beta", "gamma"];
    app.mount(
        "list",
        PANE,
        Hooks::new().on_event("select", move |payload| {
            let row = payload.get("row").and_then(Value::as_u64).unwrap_or(0) as usize;
            writer.set(row);
            Ok(())
        }),
        move || {
            VNode::element("column").with_children(items.iter().enumerate().map(|(i, item)| {
                let marker = if i == reader.get() { "> " } else { "  " };
                VNode::element("line").with_child(marker).with_child(*item)
            }))
        },
    )
    .expect("mount");

    app.push_event(InboundEvent::new("list", "select", json!({ "row": 2 })));
    assert_eq!(app.dispatch_events(), 1);
    assert_eq!(
        render_to_string(&VNode::fragment(
            sink.lines(PANE).into_iter().map(VNode::text)
        )),
        "  alpha\n  beta\n> gamma"
    );

    app.unmount("list").expect("unmount");
    assert!(sink.lines(PANE).is_empty());
}

#[test]
fn test_watch_reports_changes_only() {
    let rt = Runtime::new();
    let count = rt.signal(1);
    let reader = count.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_c = seen.clone();
    let handle = rt.watch(
        move || reader.get() % 2 == 0,
        move |new, old| seen_c.borrow_mut().push((*new, *old)),
    );
    for value in [3, 4, 6] {
        count.set(value);
        rt.tick();
    }
    handle.stop();
    count.set(7);
    rt.tick();
    assert_eq!(*seen.borrow(), vec![(true, false)]);
}

#[tokio::test]
async fn test_async_driver_serializes_destination() {
    let sink = MemorySink::new();
    let driver = AsyncDriver::new(sink.clone());
    let (a, b, c) = tokio::join!(
        driver.apply_diff(PANE, lines(&["one"])),
        driver.apply_diff(PANE, lines(&["one", "two"])),
        driver.apply_diff(PANE, lines(&["two"])),
    );
    assert_eq!(a.expect("a").change_count(), 1);
    assert_eq!(b.expect("b").into_ops(), vec![PatchOp::Keep, PatchOp::Set("two".into())]);
    assert_eq!(c.expect("c").into_ops(), vec![PatchOp::Delete, PatchOp::Keep]);
    assert_eq!(sink.lines(PANE), lines(&["two"]));
}
