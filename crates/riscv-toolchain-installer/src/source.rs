use anyhow::{anyhow, Context, Result};
use riscv_toolchain_core::ToolchainProfile;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub fn resolve_source(
    explicit: Option<&Path>,
    exe_dir: &Path,
    profile: &ToolchainProfile,
) -> Result<PathBuf> {
    if let Some(source) = explicit {
        return absolute_path(source);
    }

    let local_dir = exe_dir.join(&profile.root_dir_name);
    if local_dir.is_dir() {
        return Ok(local_dir);
    }

    let local_archive = exe_dir.join(&profile.archive_name);
    if local_archive.is_file() {
        return Ok(local_archive);
    }

    Err(anyhow!(
        "no source specified and no default source found next to installer (looked for {} and {})",
        local_dir.display(),
        local_archive.display()
    ))
}

pub fn resolve_target(explicit: Option<&Path>, profile: &ToolchainProfile) -> Result<PathBuf> {
    match explicit {
        Some(target) => absolute_path(target),
        None => default_install_root(profile),
    }
}

pub fn default_install_root(profile: &ToolchainProfile) -> Result<PathBuf> {
    project_default_install_root(profile, cfg!(windows), |name| std::env::var_os(name))
}

pub(crate) fn project_default_install_root<Lookup>(
    profile: &ToolchainProfile,
    windows: bool,
    lookup: Lookup,
) -> Result<PathBuf>
where
    Lookup: Fn(&str) -> Option<OsString>,
{
    if windows {
        let local_app_data = non_empty_var(&lookup, "LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve default install root")?;
        return Ok(PathBuf::from(local_app_data)
            .join("Programs")
            .join(&profile.install_dir_name));
    }

    let home = non_empty_var(&lookup, "HOME")
        .context("HOME is not set; cannot resolve default install root")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join(&profile.install_dir_name))
}

/// Directory holding the running installer; default sources are looked up here.
pub fn installer_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the running installer")?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("installer path has no parent: {}", exe.display()))
}

pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("failed to resolve absolute path: {}", path.display()))
}

/// Fails when the install root and the staged source root are the same directory or
/// one lies inside the other. Replacing the target would otherwise delete the source
/// or copy it into itself.
pub(crate) fn ensure_disjoint_roots(source_root: &Path, target: &Path) -> Result<()> {
    let source = resolve_existing_prefix(source_root)?;
    let resolved_target = resolve_existing_prefix(target)?;

    if resolved_target == source {
        return Err(anyhow!(
            "install target {} is the source directory",
            target.display()
        ));
    }
    if resolved_target.starts_with(&source) {
        return Err(anyhow!(
            "install target {} is inside the source directory {}",
            target.display(),
            source_root.display()
        ));
    }
    if source.starts_with(&resolved_target) {
        return Err(anyhow!(
            "install target {} contains the source directory {}",
            target.display(),
            source_root.display()
        ));
    }
    Ok(())
}

/// Absolute form of `path` with its longest existing ancestor canonicalized, so paths
/// that do not exist yet still compare against resolved ones.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf> {
    let absolute = absolute_path(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();

    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            return Ok(missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, part| acc.join(part)));
        }
        let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
            return Ok(absolute.clone());
        };
        missing.push(name);
        existing = parent;
    }
}

fn non_empty_var<Lookup>(lookup: &Lookup, name: &str) -> Option<OsString>
where
    Lookup: Fn(&str) -> Option<OsString>,
{
    lookup(name).filter(|value| !value.is_empty())
}
