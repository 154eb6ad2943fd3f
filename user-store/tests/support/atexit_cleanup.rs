//! Shared embedded cluster, stopped when the test binary exits.
//!
//! The shared handle from `pg-embed-setup-unpriv` is never dropped, so the
//! postmaster is stopped from a `libc::atexit` hook instead.

#[cfg(unix)]
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::OnceLock;
use std::time::Duration;

use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle};

const START_ATTEMPTS: usize = 5;
const START_RETRY_DELAY: Duration = Duration::from_millis(500);
const TEST_PASSWORD: &str = "user_store_embedded_test";

#[cfg(unix)]
const STOP_GRACE_POLLS: u32 = 50;
#[cfg(unix)]
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Postmaster started by this binary and the data directory it runs from.
#[cfg(unix)]
#[derive(Debug)]
struct Postmaster {
    pid: i32,
    data_dir: PathBuf,
}

#[cfg(unix)]
static POSTMASTER: OnceLock<Postmaster> = OnceLock::new();

/// Cluster shared by every test case in this binary.
pub fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    pin_password();
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => {
                #[cfg(unix)]
                stop_at_exit(handle);
                return Ok(handle);
            }
            Err(error) if attempt >= START_ATTEMPTS => return Err(error),
            Err(_) => {
                std::thread::sleep(START_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// A data directory left by an earlier run only accepts the password it was
/// initialised with.
fn pin_password() {
    if std::env::var_os("PG_PASSWORD").is_some() {
        return;
    }
    // SAFETY: called before the cluster library starts any threads.
    unsafe { std::env::set_var("PG_PASSWORD", TEST_PASSWORD) };
}

/// First line of `postmaster.pid`.
#[cfg(unix)]
pub fn read_postmaster_pid(data_dir: &Path) -> Option<i32> {
    let dir = cap_std::fs::Dir::open_ambient_dir(data_dir, cap_std::ambient_authority()).ok()?;
    let content = dir.read_to_string("postmaster.pid").ok()?;
    content.lines().next()?.trim().parse().ok()
}

#[cfg(unix)]
fn signal(pid: i32, sig: libc::c_int) -> bool {
    // SAFETY: `kill` has no memory-safety preconditions.
    unsafe { libc::kill(pid, sig) == 0 }
}

#[cfg(unix)]
extern "C" fn stop_postmaster() {
    let Some(postmaster) = POSTMASTER.get() else {
        return;
    };
    // A different pid on disk means our server is already gone.
    if read_postmaster_pid(&postmaster.data_dir) != Some(postmaster.pid) {
        return;
    }
    if !signal(postmaster.pid, libc::SIGTERM) {
        return;
    }
    for _ in 0..STOP_GRACE_POLLS {
        std::thread::sleep(STOP_POLL_INTERVAL);
        if !signal(postmaster.pid, 0) {
            return;
        }
    }
    signal(postmaster.pid, libc::SIGKILL);
}

#[cfg(unix)]
fn stop_at_exit(handle: &ClusterHandle) {
    let data_dir = handle.settings().data_dir.clone();
    let Some(pid) = read_postmaster_pid(&data_dir) else {
        return;
    };
    if POSTMASTER.set(Postmaster { pid, data_dir }).is_err() {
        return;
    }
    // SAFETY: `stop_postmaster` is a plain `extern "C"` function.
    if unsafe { libc::atexit(stop_postmaster) } != 0 {
        eprintln!("pg-embed: could not register exit hook; postmaster {pid} may outlive the tests");
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    #[cfg(unix)]
    fn data_dir_with_pid_file(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        cap_std::fs::Dir::open_ambient_dir(dir.path(), cap_std::ambient_authority())
            .expect("open dir")
            .write("postmaster.pid", content)
            .expect("write pid file");
        dir
    }

    #[cfg(unix)]
    #[rstest]
    #[case("4242\n/var/lib/postgres\n5432\n", Some(4242))]
    #[case(" 17 \n", Some(17))]
    #[case("postmaster\n", None)]
    #[case("", None)]
    fn pid_comes_from_the_first_line(#[case] content: &str, #[case] expected: Option<i32>) {
        let dir = data_dir_with_pid_file(content);
        assert_eq!(super::read_postmaster_pid(dir.path()), expected);
    }

    #[cfg(unix)]
    #[rstest]
    fn missing_pid_file_yields_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(super::read_postmaster_pid(dir.path()), None);
    }

    #[rstest]
    fn preset_password_is_kept() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", Some("custom_value"))]);
        super::pin_password();
        assert_eq!(
            std::env::var("PG_PASSWORD").expect("PG_PASSWORD should be set"),
            "custom_value"
        );
    }

    #[rstest]
    fn missing_password_is_pinned() {
        let _guard = env_lock::lock_env([("PG_PASSWORD", None::<String>)]);
        super::pin_password();
        assert_eq!(
            std::env::var("PG_PASSWORD").expect("PG_PASSWORD should be set"),
            super::TEST_PASSWORD
        );
    }
}
