// File: ./src/storage.rs
// Low-level file helpers shared by every on-disk store: advisory locking and
// atomic replacement.
use fs2::FileExt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct LocalStorage;

impl LocalStorage {
    /// Helper to get a sidecar lock file path.
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive advisory lock on `file_path`'s sidecar.
    ///
    /// The lock guards against other processes (the editor, another `daylog`
    /// invocation) writing the same file concurrently.
    pub fn with_lock<F, T, E>(file_path: &Path, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<io::Error>,
    {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}
