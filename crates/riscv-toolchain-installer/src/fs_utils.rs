use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Deletes `dst` when present, then mirrors `src` into it. Returns the number of
/// files copied.
///
/// There is no rollback: a failure partway leaves `dst` as far as the copy got.
pub fn replace_dir_with_copy(
    src: &Path,
    dst: &Path,
    on_file: &mut dyn FnMut(&Path),
) -> Result<u64> {
    if dst.exists() {
        fs::remove_dir_all(dst)
            .with_context(|| format!("failed to remove existing install: {}", dst.display()))?;
    }

    let mut copied = 0;
    copy_dir_recursive(src, dst, on_file, &mut copied)?;
    Ok(copied)
}

pub(crate) fn copy_dir_recursive(
    src: &Path,
    dst: &Path,
    on_file: &mut dyn FnMut(&Path),
    copied: &mut u64,
) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let metadata = fs::symlink_metadata(&src_path)
            .with_context(|| format!("failed to stat {}", src_path.display()))?;
        if metadata.is_dir() {
            copy_dir_recursive(&src_path, &dst_path, on_file, copied)?;
            continue;
        }

        #[cfg(unix)]
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&src_path)
                .with_context(|| format!("failed to read symlink {}", src_path.display()))?;
            remove_file_if_exists(&dst_path)
                .with_context(|| format!("failed to replace {}", dst_path.display()))?;
            std::os::unix::fs::symlink(&target, &dst_path).with_context(|| {
                format!(
                    "failed to create symlink {} -> {}",
                    dst_path.display(),
                    target.display()
                )
            })?;
            *copied += 1;
            on_file(&dst_path);
            continue;
        }

        fs::copy(&src_path, &dst_path).with_context(|| {
            format!(
                "failed to copy {} to {}",
                src_path.display(),
                dst_path.display()
            )
        })?;
        *copied += 1;
        on_file(&dst_path);
    }
    Ok(())
}
