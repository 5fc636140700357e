use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use riscv_toolchain_core::{ArchiveType, ToolchainProfile};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::layout::ToolchainLayout;
use crate::process::{error_chain_has_not_found, run_command};
use crate::source::absolute_path;

/// Toolchain root ready to be copied, plus the extraction directory backing it
/// when the source was an archive.
#[derive(Debug)]
pub struct StagedSource {
    root: PathBuf,
    extraction_dir: Option<TempDir>,
}

impl StagedSource {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn from_archive(&self) -> bool {
        self.extraction_dir.is_some()
    }

    pub fn extraction_dir(&self) -> Option<&Path> {
        self.extraction_dir.as_ref().map(TempDir::path)
    }

    /// Releases the extraction directory, if any. Never fails.
    pub fn cleanup(self) {
        if let Some(dir) = self.extraction_dir {
            advisory_cleanup(dir);
        }
    }
}

/// Best-effort removal of a temporary directory; failures are logged only.
pub fn advisory_cleanup(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => debug!("removed temporary directory {}", path.display()),
        Err(err) => warn!(
            "failed to remove temporary directory {}: {err}",
            path.display()
        ),
    }
}

pub fn stage_source(source: &Path, profile: &ToolchainProfile) -> Result<StagedSource> {
    stage_source_with_runner(source, profile, run_command)
}

pub(crate) fn stage_source_with_runner<RunCommand>(
    source: &Path,
    profile: &ToolchainProfile,
    run: RunCommand,
) -> Result<StagedSource>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<()>,
{
    if source.is_file() {
        return stage_archive(source, profile, run);
    }

    if source.is_dir() {
        return Ok(StagedSource {
            root: normalize_source_dir(source, profile)?,
            extraction_dir: None,
        });
    }

    Err(anyhow!("source not found: {}", source.display()))
}

fn stage_archive<RunCommand>(
    archive_path: &Path,
    profile: &ToolchainProfile,
    mut run: RunCommand,
) -> Result<StagedSource>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<()>,
{
    let archive_type = ArchiveType::infer_from_path(archive_path);
    if !archive_type.is_some_and(ArchiveType::is_supported) {
        return Err(anyhow!(
            "only .tar archives are supported when source is a file (got {}): {}",
            archive_type.map_or("unknown type", ArchiveType::as_str),
            archive_path.display()
        ));
    }

    let extraction_dir = tempfile::Builder::new()
        .prefix(&format!("{}-installer-", profile.root_dir_name))
        .tempdir()
        .context("failed to create temporary extraction directory")?;
    debug!(
        "extracting {} into {}",
        archive_path.display(),
        extraction_dir.path().display()
    );

    let mut command = build_tar_extract_command(archive_path, extraction_dir.path());
    if let Err(err) = run(&mut command, "failed to extract tar archive") {
        advisory_cleanup(extraction_dir);
        if error_chain_has_not_found(&err) {
            return Err(anyhow!(
                "failed to extract tar archive: required extraction tool 'tar' was not found on PATH; install tar and ensure it is available, then retry. archive={}",
                archive_path.display()
            ));
        }
        return Err(err);
    }

    match select_extracted_root(extraction_dir.path(), profile) {
        Ok(root) => Ok(StagedSource {
            root,
            extraction_dir: Some(extraction_dir),
        }),
        Err(err) => {
            advisory_cleanup(extraction_dir);
            Err(err)
        }
    }
}

pub(crate) fn build_tar_extract_command(archive_path: &Path, dst: &Path) -> Command {
    let mut command = Command::new("tar");
    command.arg("-xf").arg(archive_path).arg("-C").arg(dst);
    command
}

/// Conventional root directory first, then a lone top-level directory, then the
/// extraction directory itself.
pub(crate) fn select_extracted_root(
    extraction_dir: &Path,
    profile: &ToolchainProfile,
) -> Result<PathBuf> {
    let conventional = extraction_dir.join(&profile.root_dir_name);
    if conventional.is_dir() {
        return Ok(conventional);
    }

    let mut top_level_dirs = Vec::new();
    for entry in fs::read_dir(extraction_dir).with_context(|| {
        format!(
            "failed to inspect extracted archive: {}",
            extraction_dir.display()
        )
    })? {
        let entry = entry.with_context(|| {
            format!(
                "failed reading extracted archive entry: {}",
                extraction_dir.display()
            )
        })?;
        if entry.file_type()?.is_dir() {
            top_level_dirs.push(entry.path());
        }
    }

    if top_level_dirs.len() == 1 {
        return Ok(top_level_dirs.remove(0));
    }

    Ok(extraction_dir.to_path_buf())
}

pub(crate) fn normalize_source_dir(source: &Path, profile: &ToolchainProfile) -> Result<PathBuf> {
    let candidate = absolute_path(source)?;
    if ToolchainLayout::new(&candidate, profile).has_toolchain_shape() {
        return Ok(candidate);
    }

    let nested = candidate.join(&profile.root_dir_name);
    if ToolchainLayout::new(&nested, profile).has_toolchain_shape() {
        return Ok(nested);
    }

    Ok(candidate)
}
