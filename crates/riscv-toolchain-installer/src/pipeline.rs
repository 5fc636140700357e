use anyhow::Result;
use log::info;
use riscv_toolchain_core::ToolchainProfile;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::compat::ensure_target_binutils_compat;
use crate::environment::{
    register_install_environment, EnvironmentChanges, EnvironmentStore, SearchPathConvention,
};
use crate::fs_utils::replace_dir_with_copy;
use crate::install_info::{read_install_info, write_install_info};
use crate::layout::{validate_installed, validate_toolchain_root, ToolchainLayout};
use crate::lock::InstallLock;
use crate::process::run_command;
use crate::source::ensure_disjoint_roots;
use crate::stage::{stage_source_with_runner, StagedSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Resolved source: a toolchain directory or a `.tar` archive.
    pub source: PathBuf,
    /// Absolute install root; replaced wholesale.
    pub target: PathBuf,
    pub register_environment: bool,
    pub search_path: SearchPathConvention,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub install_root: PathBuf,
    pub staged_from_archive: bool,
    pub files_copied: u64,
    pub compat_shims: Vec<String>,
    pub environment: Option<EnvironmentChanges>,
    pub info_path: PathBuf,
}

pub fn install_toolchain(
    profile: &ToolchainProfile,
    request: &InstallRequest,
    environment: &mut dyn EnvironmentStore,
    on_file: &mut dyn FnMut(&Path),
) -> Result<InstallOutcome> {
    install_toolchain_with_runner(profile, request, environment, on_file, run_command)
}

pub(crate) fn install_toolchain_with_runner<RunCommand>(
    profile: &ToolchainProfile,
    request: &InstallRequest,
    environment: &mut dyn EnvironmentStore,
    on_file: &mut dyn FnMut(&Path),
    run: RunCommand,
) -> Result<InstallOutcome>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<()>,
{
    info!("Source: {}", request.source.display());
    info!("Target: {}", request.target.display());

    let staged = stage_source_with_runner(&request.source, profile, run)?;
    let result = install_staged(profile, request, &staged, environment, on_file);
    staged.cleanup();
    result
}

fn install_staged(
    profile: &ToolchainProfile,
    request: &InstallRequest,
    staged: &StagedSource,
    environment: &mut dyn EnvironmentStore,
    on_file: &mut dyn FnMut(&Path),
) -> Result<InstallOutcome> {
    validate_toolchain_root(&ToolchainLayout::new(staged.root(), profile))?;
    ensure_disjoint_roots(staged.root(), &request.target)?;

    let layout = ToolchainLayout::new(&request.target, profile);
    let _lock = InstallLock::acquire(layout.root())?;

    if let Ok(Some(previous)) = read_install_info(&layout) {
        info!(
            "Replacing install from {}",
            previous.installed_at.to_rfc3339()
        );
    }

    let files_copied = replace_dir_with_copy(staged.root(), layout.root(), on_file)?;
    let compat_shims = ensure_target_binutils_compat(&layout)?;
    validate_installed(&layout)?;

    let environment = if request.register_environment {
        let changes = register_install_environment(environment, request.search_path, &layout)?;
        info!(
            "Added user {} and {}.",
            request.search_path.variable, changes.root_var
        );
        Some(changes)
    } else {
        None
    };

    let info_path = write_install_info(&layout)?;
    info!("Install completed.");

    Ok(InstallOutcome {
        install_root: layout.root().to_path_buf(),
        staged_from_archive: staged.from_archive(),
        files_copied,
        compat_shims,
        environment,
        info_path,
    })
}
