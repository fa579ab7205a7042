// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_is_frozen() {
    let clock = FakeClock::new();
    assert_eq!(clock.now_utc(), clock.now_utc());
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let before = clock.now_utc();
    clock.advance(Duration::seconds(90));
    assert_eq!(clock.now_utc() - before, Duration::seconds(90));
}

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let a = clock.now_utc();
    let b = clock.now_utc();
    assert!(b >= a);
}
