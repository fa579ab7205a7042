// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

#[tokio::test]
async fn uncontended_acquire_and_release() {
    let lock = PipelineLock::new();
    assert!(!lock.is_locked());
    {
        let _guard = lock.acquire().await;
        assert!(lock.is_locked());
        assert_eq!(lock.depth(), 1);
    }
    assert!(!lock.is_locked());
    assert_eq!(lock.depth(), 0);
}

#[tokio::test]
async fn reentrant_acquire_tracks_depth() {
    let lock = PipelineLock::new();
    let guard = lock.acquire().await;
    assert_eq!(lock.depth(), 1);
    {
        let nested = lock.reenter(&guard);
        assert_eq!(lock.depth(), 2);
        {
            let _deeper = lock.reenter(&nested);
            assert_eq!(lock.depth(), 3);
        }
        assert_eq!(lock.depth(), 2);
    }
    assert_eq!(lock.depth(), 1);
    assert!(lock.is_locked());
    drop(guard);
    assert!(!lock.is_locked());
}

#[tokio::test]
async fn release_by_non_owner_is_an_error() {
    let lock = PipelineLock::new();
    let _guard = lock.acquire().await;
    let err = lock.release(9999).unwrap_err();
    assert!(matches!(err, EngineError::LockMisuse));
    // The real owner is unaffected.
    assert!(lock.is_locked());
}

#[tokio::test]
async fn pipelines_hold_the_lock_in_disjoint_intervals() {
    let lock = Arc::new(PipelineLock::new());
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for name in ["p1", "p2", "p3"] {
        let lock = Arc::clone(&lock);
        let events = Arc::clone(&events);
        handles.push(tokio::spawn(async move {
            let _guard = lock.acquire().await;
            events.lock().push(format!("{name}_start"));
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            events.lock().push(format!("{name}_end"));
        }));
        // Give each task a chance to enqueue before the next.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let events = events.lock();
    assert_eq!(events.len(), 6);
    // Every start is immediately followed by the matching end: intervals
    // never interleave.
    for pair in events.chunks(2) {
        let start = &pair[0];
        let end = &pair[1];
        assert!(start.ends_with("_start"), "unexpected order: {events:?}");
        assert_eq!(
            start.trim_end_matches("_start"),
            end.trim_end_matches("_end"),
            "interleaved intervals: {events:?}"
        );
    }
}

#[tokio::test]
async fn waiters_are_served_fifo() {
    let lock = Arc::new(PipelineLock::new());
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = lock.acquire().await;
    let mut handles = Vec::new();
    for i in 0..4u32 {
        let lock = Arc::clone(&lock);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _guard = lock.acquire().await;
            order.lock().push(i);
        }));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    drop(first);
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
}
