//! Process-exit shutdown for the shared embedded PostgreSQL cluster.
//!
//! `pg-embed-setup-unpriv` leaks the shared cluster guard for the lifetime of
//! the test binary, so the postmaster would outlive it and block the next run
//! from starting on the same data directory. A `libc::atexit` hook reads
//! `postmaster.pid` and stops the server when the binary exits.

#[cfg(unix)]
use std::path::{Path, PathBuf};
use std::sync::Once;
#[cfg(unix)]
use std::sync::OnceLock;
#[cfg(unix)]
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);
const EMBEDDED_PASSWORD: &str = "users_service_embedded_test";

#[cfg(unix)]
static PG_POSTMASTER_PID: AtomicI32 = AtomicI32::new(0);
#[cfg(unix)]
static PG_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();
static STABLE_PASSWORD: Once = Once::new();

/// The shared cluster, started on first use and stopped at process exit.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    ensure_stable_password();
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                register_process_exit_cleanup(handle);
                return Ok(handle);
            }
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => return Err(error),
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Pin `PG_PASSWORD` so a data directory initialised by an earlier run still
/// accepts the password this run connects with.
fn ensure_stable_password() {
    STABLE_PASSWORD.call_once(|| {
        if std::env::var_os("PG_PASSWORD").is_none() {
            // SAFETY: runs once, before the cluster library spawns threads that
            // read the environment.
            unsafe {
                std::env::set_var("PG_PASSWORD", EMBEDDED_PASSWORD);
            }
        }
    });
}

#[cfg(unix)]
fn read_postmaster_pid(data_dir: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(data_dir.join("postmaster.pid")).ok()?;
    content.lines().next()?.trim().parse().ok()
}

/// Stop the postmaster recorded at registration, if it is still the one
/// named in `postmaster.pid`.
#[cfg(unix)]
extern "C" fn stop_postgres_on_exit() {
    let stored_pid = PG_POSTMASTER_PID.load(Ordering::Relaxed);
    if stored_pid <= 0 {
        return;
    }
    let pid = match PG_DATA_DIR.get().and_then(|dir| read_postmaster_pid(dir)) {
        Some(current) if current == stored_pid => current,
        _ => return,
    };

    // SAFETY: `pid` matches the on-disk postmaster.pid; SIGTERM requests a
    // smart shutdown.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        return;
    }
    for _ in 0..50 {
        std::thread::sleep(Duration::from_millis(100));
        // SAFETY: signal 0 only checks that the process exists.
        if unsafe { libc::kill(pid, 0) } != 0 {
            return;
        }
    }
    // SAFETY: same pid; the graceful budget is spent.
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
}

#[cfg(unix)]
fn register_process_exit_cleanup(handle: &ClusterHandle) {
    let data_dir = &handle.settings().data_dir;
    let Some(pid) = read_postmaster_pid(data_dir) else {
        return;
    };
    if PG_POSTMASTER_PID
        .compare_exchange(0, pid, Ordering::Relaxed, Ordering::Relaxed)
        .is_err()
    {
        return;
    }
    let _ = PG_DATA_DIR.set(data_dir.clone());

    // SAFETY: `stop_postgres_on_exit` is an `extern "C"` fn with no
    // preconditions beyond the pid recorded above.
    let rc = unsafe { libc::atexit(stop_postgres_on_exit) };
    if rc != 0 {
        eprintln!("pg-embed: failed to register atexit handler (rc={rc}); PID {pid} may outlive the tests");
    }
}
