use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use miso::run_lock::{RunLock, acquire_with_retry_observed};
use tempfile::tempdir;

const CHILD_LOCK_ENV: &str = "MISO_LOCK_CHILD_PATH";
const CHILD_READY_ENV: &str = "MISO_LOCK_CHILD_READY";
const CHILD_HOLD_ENV: &str = "MISO_LOCK_CHILD_HOLD_MS";

/// Runs only when spawned by `second_process_waits_for_first`.
#[test]
fn hold_lock_child() {
    let (Some(lock_path), Some(ready_path)) = (
        std::env::var_os(CHILD_LOCK_ENV),
        std::env::var_os(CHILD_READY_ENV),
    ) else {
        return;
    };
    let hold_ms = std::env::var(CHILD_HOLD_ENV)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(500);
    let lock = RunLock::try_acquire(PathBuf::from(lock_path)).unwrap();
    std::fs::write(ready_path, b"ready").unwrap();
    std::thread::sleep(Duration::from_millis(hold_ms));
    drop(lock);
}

#[test]
fn second_process_waits_for_first() {
    let dir = tempdir().unwrap();
    let lock_path = dir.path().join("miso.lock");
    let ready_path = dir.path().join("child.ready");

    let mut child = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "hold_lock_child", "--nocapture", "--test-threads=1"])
        .env(CHILD_LOCK_ENV, &lock_path)
        .env(CHILD_READY_ENV, &ready_path)
        .env(CHILD_HOLD_ENV, "600")
        .stdout(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(30);
    while !ready_path.exists() {
        assert!(Instant::now() < deadline, "child never took the lock");
        std::thread::sleep(Duration::from_millis(10));
    }

    let err = RunLock::try_acquire(&lock_path).unwrap_err();
    assert!(err.is_held());

    let mut waits = 0usize;
    let lock =
        acquire_with_retry_observed(&lock_path, Duration::from_millis(50), |_| waits += 1)
            .unwrap();
    assert!(waits > 0);
    assert!(child.wait().unwrap().success());
    drop(lock);
}
