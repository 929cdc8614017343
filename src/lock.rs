//! Per-pool advisory lock.
//!
//! A run assumes exclusive logical access to the pool for the duration of
//! the plan. The lock is a sidecar file under the system lock directory
//! holding an exclusive flock; acquisition is non-blocking so a concurrent
//! capacity operation is detected and reported instead of raced.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;

use std::fs::File;
use tracing::trace;

/// RAII guard held while the pool lock is active. Released on drop.
pub struct PoolLock {
    file: File,
    path: PathBuf,
}

impl Drop for PoolLock {
    fn drop(&mut self) {
        // flock releases on fd close; unlock explicitly anyway and make a
        // best-effort attempt to remove the sidecar file.
        let _ = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_UN) };
        let _ = std::fs::remove_file(&self.path);
    }
}

fn dir_writable(path: &Path) -> bool {
    let Ok(cpath) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(cpath.as_ptr(), libc::W_OK) == 0 }
}

fn lock_dir() -> PathBuf {
    // /run/lock is not writable for unprivileged users on every distro.
    let run_lock = Path::new("/run/lock");
    if run_lock.is_dir() && dir_writable(run_lock) {
        run_lock.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

fn lock_file_path(pool: &str) -> PathBuf {
    // Pool names are plain VG names; '/' cannot appear in them.
    lock_dir().join(format!("lvshift.{pool}.lock"))
}

/// Try to take the pool lock without blocking.
/// Returns `Ok(None)` if another process already holds it.
pub fn try_lock_pool(pool: &str) -> io::Result<Option<PoolLock>> {
    let path = lock_file_path(pool);

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .custom_flags(libc::O_CLOEXEC)
        .mode(0o600)
        .open(&path)?;

    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        trace!(path = %path.display(), "pool lock acquired");
        return Ok(Some(PoolLock { file, path }));
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        trace!(path = %path.display(), "pool lock held elsewhere");
        return Ok(None);
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquisition_fails_fast_while_held() {
        // flock is per open-file-description, so a second open in the same
        // process behaves like another process.
        let guard = try_lock_pool("lvshift-test-vg").unwrap();
        assert!(guard.is_some());
        let second = try_lock_pool("lvshift-test-vg").unwrap();
        assert!(second.is_none());
        drop(guard);
        let third = try_lock_pool("lvshift-test-vg").unwrap();
        assert!(third.is_some());
    }
}
