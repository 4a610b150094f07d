use std::sync::Arc;
use std::time::Duration;

use rados_io::{AioKind, AioValue, IoCtx, Rados};
use rados_runtime::errno::{EIO, ENOENT, ENOMEM};
use rados_runtime_mocked::{MockConfig, MockEvent, MockOp, MockRados, WANT_ERROR};

fn session(mock: MockRados) -> (Arc<MockRados>, IoCtx) {
    let mock = Arc::new(mock);
    mock.create_pool("data");
    let cluster = Rados::new(mock.clone()).create(None).unwrap();
    cluster.connect().unwrap();
    let io = cluster.open_ioctx("data").unwrap();
    (mock, io)
}

fn setup() -> (Arc<MockRados>, IoCtx) {
    session(MockRados::new().unwrap())
}

fn released_events(mock: &MockRados) -> usize {
    mock.events()
        .iter()
        .filter(|e| matches!(e, MockEvent::CompletionReleased(_)))
        .count()
}

#[test]
fn aio_read_matches_sync_read() {
    let (_mock, io) = setup();
    io.write_full(None, "obj", b"asynchronous bytes").unwrap();

    for (length, offset) in [(18, 0), (100, 0), (5, 13), (10, 50)] {
        let sync = io.read(None, "obj", length, offset).unwrap();

        let completion = io.aio_read(None, "obj", length, offset).unwrap();
        assert_eq!(completion.kind(), AioKind::Read);
        completion.wait_for_complete().unwrap();
        assert!(completion.is_complete().unwrap());

        assert_eq!(completion.get_return_value().unwrap(), AioValue::Read(sync));
    }
}

#[test]
fn aio_read_uses_the_locator_key() {
    let (mock, io) = setup();
    mock.put_object("data", Some("shelf"), "obj", b"located").unwrap();

    let completion = io.aio_read(Some("shelf"), "obj", 64, 0).unwrap();
    completion.wait_for_complete().unwrap();
    let bytes = completion.get_return_value().unwrap().into_bytes();
    assert_eq!(bytes.as_deref(), Some(&b"located"[..]));

    assert_eq!(io.read(None, "obj", 64, 0).unwrap_err().native_code(), Some(-ENOENT));
}

#[test]
fn aio_stat_matches_sync_stat() {
    let (_mock, io) = setup();
    io.write_full(None, "obj", b"0123456789").unwrap();

    let completion = io.aio_stat(None, "obj").unwrap();
    assert_eq!(completion.kind(), AioKind::Stat);
    completion.wait_for_complete().unwrap();

    let value = completion.get_return_value().unwrap();
    assert_eq!(value.kind(), AioKind::Stat);
    assert_eq!(value.clone().into_bytes(), None);
    assert_eq!(value.into_stat(), Some(io.stat(None, "obj").unwrap()));
}

#[test]
fn held_completion_stays_pending() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"later").unwrap();

    mock.hold_completions();
    let completion = io.aio_read(None, "obj", 5, 0).unwrap();
    assert!(!completion.is_complete().unwrap());

    mock.release_completions();
    completion.wait_for_complete().unwrap();
    assert!(completion.is_complete().unwrap());
    assert_eq!(
        completion.get_return_value().unwrap().into_bytes(),
        Some(b"later".to_vec())
    );
}

#[test]
fn delayed_completion_is_waited_for() {
    let mock = MockRados::with_config(
        MockConfig::default().with_completion_delay(Duration::from_millis(20)),
    )
    .unwrap();
    let (_mock, io) = session(mock);
    io.write_full(None, "obj", b"slow").unwrap();

    let completion = io.aio_stat(None, "obj").unwrap();
    completion.wait_for_complete().unwrap();
    assert_eq!(completion.get_return_value().unwrap().into_stat().map(|s| s.size), Some(4));
}

#[test]
fn operation_failure_is_reported_by_get_return_value() {
    let (_mock, io) = setup();

    let completion = io.aio_read(None, "missing", 10, 0).unwrap();
    completion.wait_for_complete().unwrap();
    let err = completion.get_return_value().unwrap_err();
    assert!(!err.is_usage());
    assert_eq!(err.native_code(), Some(-ENOENT));

    let completion = io.aio_stat(None, &format!("obj{WANT_ERROR}")).unwrap();
    completion.wait_for_complete().unwrap();
    assert_eq!(completion.get_return_value().unwrap_err().native_code(), Some(-EIO));
}

#[test]
fn zero_length_aio_read_returns_nothing() {
    let (_mock, io) = setup();
    io.write_full(None, "obj", b"data").unwrap();

    let completion = io.aio_read(None, "obj", 0, 0).unwrap();
    completion.wait_for_complete().unwrap();
    assert_eq!(completion.get_return_value().unwrap(), AioValue::Read(Vec::new()));
}

#[test]
fn release_while_pending_is_safe() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"abandoned").unwrap();

    mock.hold_completions();
    let completion = io.aio_read(None, "obj", 9, 0).unwrap();
    completion.release();
    assert!(completion.is_released());
    assert_eq!(mock.live_completions(), 0);

    mock.release_completions();
    let next = io.aio_read(None, "obj", 9, 0).unwrap();
    next.wait_for_complete().unwrap();
    assert_eq!(next.get_return_value().unwrap().into_bytes(), Some(b"abandoned".to_vec()));
}

#[test]
fn released_completion_rejects_use() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"x").unwrap();
    let completion = io.aio_read(None, "obj", 1, 0).unwrap();
    completion.wait_for_complete().unwrap();

    completion.release();
    completion.release();

    let expected = "bad argument #1 (cannot reuse released completion)";
    assert_eq!(completion.is_complete().unwrap_err().to_string(), expected);
    assert_eq!(completion.wait_for_complete().unwrap_err().to_string(), expected);
    assert_eq!(completion.get_return_value().unwrap_err().to_string(), expected);

    drop(completion);
    assert_eq!(released_events(&mock), 1);
}

#[test]
fn last_clone_dropped_releases() {
    let (mock, io) = setup();
    let completion = io.aio_stat(None, "obj").unwrap();
    let clone = completion.clone();

    drop(completion);
    assert_eq!(released_events(&mock), 0);
    clone.wait_for_complete().unwrap();

    drop(clone);
    assert_eq!(released_events(&mock), 1);
    assert_eq!(mock.live_completions(), 0);
}

#[test]
fn completion_outlives_its_session() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"kept").unwrap();
    let completion = io.aio_read(None, "obj", 4, 0).unwrap();

    drop(io);
    completion.wait_for_complete().unwrap();
    assert_eq!(completion.get_return_value().unwrap().into_bytes(), Some(b"kept".to_vec()));

    drop(completion);
    assert_eq!(mock.live_clusters(), 0);
}

#[test]
fn token_creation_failure_is_a_native_error() {
    let (mock, io) = setup();
    mock.fail_next(MockOp::AioCreateCompletion, -ENOMEM);

    let err = io.aio_read(None, "obj", 4, 0).unwrap_err();
    assert_eq!(err.native_code(), Some(-ENOMEM));
    assert!(!mock
        .events()
        .iter()
        .any(|e| matches!(e, MockEvent::CompletionCreated(_))));
}

#[test]
fn issue_failure_releases_the_token() {
    let (mock, io) = setup();
    mock.fail_next(MockOp::AioIssue, -EIO);

    let err = io.aio_stat(None, "obj").unwrap_err();
    assert_eq!(err.native_code(), Some(-EIO));
    assert_eq!(released_events(&mock), 1);
    assert_eq!(mock.live_completions(), 0);
}

#[test]
fn concurrent_completions_are_all_released() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"shared object").unwrap();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let io = io.clone();
            std::thread::spawn(move || {
                for offset in 0..20 {
                    let completion = io.aio_read(None, "obj", 4, offset).unwrap();
                    let sync = io.read(None, "obj", 4, offset).unwrap();
                    completion.wait_for_complete().unwrap();
                    assert_eq!(completion.get_return_value().unwrap(), AioValue::Read(sync));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(mock.live_completions(), 0);
    assert_eq!(released_events(&mock), 8 * 20);
}

#[test]
fn release_and_poll_do_not_block_behind_a_waiter() {
    let (mock, io) = setup();
    io.write_full(None, "obj", b"waited").unwrap();

    mock.hold_completions();
    let completion = io.aio_read(None, "obj", 6, 0).unwrap();

    let waiter = {
        let completion = completion.clone();
        std::thread::spawn(move || completion.wait_for_complete())
    };
    std::thread::sleep(Duration::from_millis(50));

    let opener = {
        let mock = Arc::clone(&mock);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(500));
            mock.release_completions();
        })
    };

    let started = std::time::Instant::now();
    completion.release();
    let err = completion.is_complete().unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_usage());
    assert!(elapsed < Duration::from_millis(250), "blocked for {elapsed:?}");

    // The waiter still holds the native token, so nothing is released yet.
    assert_eq!(released_events(&mock), 0);

    let waited = waiter.join().unwrap();
    assert!(waited.is_ok() || waited.unwrap_err().is_usage());
    opener.join().unwrap();

    assert_eq!(released_events(&mock), 1);
    assert_eq!(mock.live_completions(), 0);
}
