use std::sync::Arc;

use rados_io::{ClusterStatus, Rados};
use rados_runtime::errno::{EINVAL, ENOENT, ENOMEM, ETIMEDOUT};
use rados_runtime_mocked::{MockEvent, MockOp, MockRados};

fn setup() -> (Arc<MockRados>, Rados) {
    let mock = Arc::new(MockRados::new().unwrap());
    mock.create_pool("data");
    let rados = Rados::new(mock.clone());
    (mock, rados)
}

fn count_events(mock: &MockRados, pred: impl Fn(&MockEvent) -> bool) -> usize {
    mock.events().iter().filter(|e| pred(e)).count()
}

fn temp_conf(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("rados_io_{}_{name}.conf", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn second_connect_is_a_usage_error() {
    let (_mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    cluster.connect().unwrap();

    let err = cluster.connect().unwrap_err();
    assert!(err.is_usage());
    assert_eq!(err.to_string(), "bad argument #1 (already connected to cluster)");
    assert!(cluster.is_connected());
    assert_eq!(cluster.status(), ClusterStatus::Connected);
}

#[test]
fn every_operation_after_shutdown_is_a_usage_error() {
    let (_mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    cluster.connect().unwrap();
    cluster.shutdown().unwrap();

    let expected = "bad argument #1 (cannot reuse shutdown rados handle)";
    let errors = [
        cluster.conf_read_file(None).unwrap_err(),
        cluster.connect().unwrap_err(),
        cluster.open_ioctx("data").unwrap_err(),
        cluster.register_service("svc", "daemon").unwrap_err(),
        cluster.shutdown().unwrap_err(),
    ];
    for err in errors {
        assert!(err.is_usage(), "{err}");
        assert_eq!(err.native_code(), None);
        assert_eq!(err.to_string(), expected);
    }

    assert!(!cluster.is_connected());
    assert_eq!(cluster.status(), ClusterStatus::Shutdown);
}

#[test]
fn open_ioctx_requires_a_connected_cluster() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();

    let err = cluster.open_ioctx("data").unwrap_err();
    assert_eq!(err.to_string(), "bad argument #1 (not connected to cluster)");
    assert_eq!(mock.live_ioctxs(), 0);

    cluster.connect().unwrap();
    let io = cluster.open_ioctx("data").unwrap();
    assert!(io.is_open());
}

#[test]
fn failed_connect_can_be_retried() {
    let (mock, rados) = setup();
    let cluster = rados.create(Some("admin")).unwrap();

    mock.fail_next(MockOp::Connect, -ETIMEDOUT);
    let err = cluster.connect().unwrap_err();
    assert!(!err.is_usage());
    assert_eq!(err.native_code(), Some(-ETIMEDOUT));
    assert_eq!(cluster.status(), ClusterStatus::Configuring);

    cluster.connect().unwrap();
    assert!(cluster.is_connected());
}

#[test]
fn create_failure_is_a_native_error() {
    let (mock, rados) = setup();
    mock.fail_next(MockOp::Create, -ENOMEM);

    let err = rados.create(None).unwrap_err();
    assert_eq!(err.native_code(), Some(-ENOMEM));
    assert_eq!(mock.live_clusters(), 0);
}

#[test]
fn dropping_a_connected_cluster_shuts_it_down() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    cluster.connect().unwrap();
    let clone = cluster.clone();

    drop(cluster);
    assert_eq!(mock.live_clusters(), 1);
    drop(clone);

    assert_eq!(mock.live_clusters(), 0);
    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Shutdown(_))), 1);
    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Discarded(_))), 0);
}

#[test]
fn dropping_a_never_connected_cluster_discards_it() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    mock.fail_next(MockOp::Connect, -ETIMEDOUT);
    assert!(cluster.connect().is_err());

    drop(cluster);

    assert_eq!(mock.live_clusters(), 0);
    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Shutdown(_))), 0);
    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Discarded(_))), 1);
}

#[test]
fn explicit_shutdown_releases_exactly_once() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    cluster.connect().unwrap();

    cluster.shutdown().unwrap();
    assert!(cluster.shutdown().is_err());
    drop(cluster);

    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Shutdown(_))), 1);
}

#[test]
fn shutdown_before_connect_discards() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();

    cluster.shutdown().unwrap();
    assert_eq!(cluster.status(), ClusterStatus::Shutdown);
    drop(cluster);

    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Discarded(_))), 1);
    assert_eq!(count_events(&mock, |e| matches!(e, MockEvent::Shutdown(_))), 0);
}

#[test]
fn register_service_requires_connection() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();

    let err = cluster.register_service("rgw", "gw1").unwrap_err();
    assert!(err.is_usage());

    cluster.connect().unwrap();
    cluster.register_service("rgw", "gw1").unwrap();
    assert_eq!(mock.services(), vec![("rgw".to_string(), "gw1".to_string())]);
}

#[test]
fn register_service_native_failure() {
    let (mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    cluster.connect().unwrap();

    mock.fail_next(MockOp::ServiceRegister, -EINVAL);
    let err = cluster.register_service("rgw", "gw1").unwrap_err();
    assert_eq!(err.native_code(), Some(-EINVAL));
    assert!(mock.services().is_empty());
}

#[test]
fn conf_read_file_loads_options() {
    let (mock, rados) = setup();
    let path = temp_conf("ok", "[global]\n# comment\nmon host = 10.0.0.1\n");
    let cluster = rados.create(None).unwrap();

    cluster.conf_read_file(path.to_str()).unwrap();
    assert_eq!(mock.conf_value("mon_host").as_deref(), Some("10.0.0.1"));

    // Also valid once connected.
    cluster.connect().unwrap();
    cluster.conf_read_file(None).unwrap();

    std::fs::remove_file(path).unwrap();
}

#[test]
fn conf_read_file_returns_native_errors_verbatim() {
    let (_mock, rados) = setup();
    let cluster = rados.create(None).unwrap();

    let missing = std::env::temp_dir().join("rados_io_no_such_file.conf");
    let err = cluster.conf_read_file(missing.to_str()).unwrap_err();
    assert_eq!(err.native_code(), Some(-ENOENT));

    let path = temp_conf("bad", "this line is not an option\n");
    let err = cluster.conf_read_file(path.to_str()).unwrap_err();
    assert_eq!(err.native_code(), Some(-EINVAL));
    std::fs::remove_file(path).unwrap();

    assert_eq!(cluster.status(), ClusterStatus::Configuring);
}

#[test]
fn clones_share_the_connection() {
    let (_mock, rados) = setup();
    let cluster = rados.create(None).unwrap();
    let clone = cluster.clone();

    clone.connect().unwrap();
    assert!(cluster.is_connected());

    cluster.shutdown().unwrap();
    assert!(clone.connect().unwrap_err().is_usage());
}

#[test]
fn version_comes_from_the_backend() {
    let (_mock, rados) = setup();
    assert_eq!(rados.version(), (3, 0, 0));
}
