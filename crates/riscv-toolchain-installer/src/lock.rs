use anyhow::{anyhow, Context, Result};
use fs4::FileExt;
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive claim on an install root, held from before the old tree is removed
/// until the new one is complete.
///
/// The lock lives next to the install root rather than inside it, since the root
/// itself is deleted and recreated. The lock file is left behind on release; only
/// the OS lock on it matters.
#[derive(Debug)]
pub struct InstallLock {
    file: File,
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(install_root: &Path) -> Result<Self> {
        let path = lock_path(install_root)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open install lock: {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.raw_os_error() == fs4::lock_contended_error().raw_os_error() => {
                return Err(anyhow!(
                    "another install into {} is in progress (lock held on {})",
                    install_root.display(),
                    path.display()
                ));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to lock {}", path.display()));
            }
        }

        debug!("acquired install lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub(crate) fn lock_path(install_root: &Path) -> Result<PathBuf> {
    let parent = install_root
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "install root has no parent directory: {}",
                install_root.display()
            )
        })?;
    let name = install_root
        .file_name()
        .ok_or_else(|| anyhow!("install root has no name: {}", install_root.display()))?;

    let mut lock_name = std::ffi::OsString::from(".");
    lock_name.push(name);
    lock_name.push(".lock");
    Ok(parent.join(lock_name))
}
