use std::sync::Arc;

use rados_io::{active_completions, linked_sessions, Rados};
use rados_runtime_mocked::MockRados;
use tracing::info;

const POOL: &str = "demo";

/// Session against the in-memory backend: write, read back synchronously and
/// asynchronously, then drop the cluster before the session.
fn run(config: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mock = Arc::new(MockRados::new()?);
    mock.create_pool(POOL);

    let rados = Rados::new(mock.clone());
    let (major, minor, extra) = rados.version();
    info!("librados version {major}.{minor}.{extra}");

    let cluster = rados.create(Some("admin"))?;
    cluster.conf_read_file(config)?;
    cluster.connect()?;
    info!("cluster: {cluster:?}");

    let io = cluster.open_ioctx(POOL)?;
    io.write_full(None, "greeting", b"Hello, World!\n")?;
    io.write_full(Some("shelf"), "greeting", b"Hello from a locator\n")?;

    let bytes = io.read(None, "greeting", 1024, 0)?;
    info!("read {} bytes: {:?}", bytes.len(), String::from_utf8_lossy(&bytes));

    let stat = io.stat(Some("shelf"), "greeting")?;
    info!("stat with locator: size={} mtime={}", stat.size, stat.mtime);

    let completion = io.aio_read(None, "greeting", 5, 7)?;
    info!("active completions: {}", active_completions());
    completion.wait_for_complete()?;
    let value = completion.get_return_value()?;
    info!("aio read: {value:?}");
    completion.release();
    info!("active completions: {}", active_completions());

    // The session keeps the cluster alive.
    drop(cluster);
    info!("linked sessions: {}", linked_sessions());
    let again = io.read(None, "greeting", 5, 0)?;
    info!("read after dropping cluster: {:?}", String::from_utf8_lossy(&again));

    drop(io);
    info!("linked sessions: {}", linked_sessions());
    info!("events: {:?}", mock.events());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = std::env::args().nth(1);
    if let Err(e) = run(config.as_deref()) {
        tracing::error!("demo failed: {e}");
        std::process::exit(1);
    }

    info!("Program completed");
}
