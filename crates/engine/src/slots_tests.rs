// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

struct Fixture {
    _dir: tempfile::TempDir,
    slots: Slots,
    source: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let source = root.join("build");
    std::fs::create_dir_all(source.join("static")).unwrap();
    std::fs::write(source.join("index.html"), "<html>v1</html>").unwrap();
    std::fs::write(source.join("static/app.js"), "console.log(1)").unwrap();
    let slots = Slots::new(
        root.join("slots/green"),
        root.join("slots/blue"),
        root.join("slots/current"),
    );
    Fixture {
        _dir: dir,
        slots,
        source,
    }
}

#[test]
fn active_slot_is_unknown_without_symlink() {
    let fx = fixture();
    assert_eq!(fx.slots.read_active(), Slot::Unknown);
    assert_eq!(fx.slots.next_target(), Slot::Green);
    assert!(fx.slots.last_cutover_at().is_none());
}

#[test]
fn first_cutover_populates_green() {
    let fx = fixture();
    let record = fx.slots.cutover(&fx.source, false).unwrap();
    assert_eq!(record.previous_target, "unknown (none)");
    assert_eq!(record.next_target, "green");
    assert!(record.copied);
    assert!(record.switched);
    assert!(!record.dry_run);

    assert_eq!(fx.slots.read_active(), Slot::Green);
    let copied = fx.slots.slot_path(Slot::Green).unwrap().join("index.html");
    assert_eq!(std::fs::read_to_string(copied).unwrap(), "<html>v1</html>");
    // Nested directories travel too.
    assert!(fx
        .slots
        .slot_path(Slot::Green)
        .unwrap()
        .join("static/app.js")
        .exists());
    assert!(fx.slots.last_cutover_at().is_some());
}

#[test]
fn consecutive_cutovers_toggle_between_slots() {
    let fx = fixture();
    fx.slots.cutover(&fx.source, false).unwrap();
    assert_eq!(fx.slots.read_active(), Slot::Green);

    std::fs::write(fx.source.join("index.html"), "<html>v2</html>").unwrap();
    let second = fx.slots.cutover(&fx.source, false).unwrap();
    assert_eq!(second.previous_target, "green");
    assert_eq!(second.next_target, "blue");
    assert_eq!(fx.slots.read_active(), Slot::Blue);

    let third = fx.slots.cutover(&fx.source, false).unwrap();
    assert_eq!(third.previous_target, "blue");
    assert_eq!(third.next_target, "green");
    assert_eq!(fx.slots.read_active(), Slot::Green);
}

#[test]
fn cutover_replaces_stale_slot_contents() {
    let fx = fixture();
    fx.slots.cutover(&fx.source, false).unwrap();
    fx.slots.cutover(&fx.source, false).unwrap();

    // Third cutover rewrites green; stale files must not survive.
    let green = fx.slots.slot_path(Slot::Green).unwrap().to_path_buf();
    std::fs::write(green.join("stale.txt"), "old").unwrap();
    fx.slots.cutover(&fx.source, false).unwrap();
    assert!(!green.join("stale.txt").exists());
    assert!(green.join("index.html").exists());
}

#[test]
fn dry_run_records_plan_without_touching_the_filesystem() {
    let fx = fixture();
    let record = fx.slots.cutover(&fx.source, true).unwrap();
    assert!(record.dry_run);
    assert!(!record.copied);
    assert!(!record.switched);
    assert_eq!(record.next_target, "green");
    assert_eq!(fx.slots.read_active(), Slot::Unknown);
    assert!(!fx.slots.slot_path(Slot::Green).unwrap().exists());
}

#[test]
fn missing_source_is_fatal() {
    let fx = fixture();
    let err = fx
        .slots
        .cutover(Path::new("/definitely/not/built"), false)
        .unwrap_err();
    assert!(matches!(err, SlotError::MissingSource(_)));
}

#[test]
fn dangling_symlink_is_replaced() {
    let fx = fixture();
    let live = fx.slots.live_symlink().to_path_buf();
    std::fs::create_dir_all(live.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink("/nowhere/at/all", &live).unwrap();
    assert_eq!(fx.slots.read_active(), Slot::Unknown);

    let record = fx.slots.cutover(&fx.source, false).unwrap();
    assert!(record.switched);
    assert_eq!(fx.slots.read_active(), Slot::Green);
}

#[test]
fn slot_serde_uses_lowercase() {
    assert_eq!(serde_json::to_string(&Slot::Green).unwrap(), "\"green\"");
    assert_eq!(
        serde_json::from_str::<Slot>("\"unknown\"").unwrap(),
        Slot::Unknown
    );
}
