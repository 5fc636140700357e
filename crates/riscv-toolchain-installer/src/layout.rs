use anyhow::{anyhow, Result};
use riscv_toolchain_core::ToolchainProfile;
use std::path::{Path, PathBuf};

pub const INSTALL_INFO_FILE_NAME: &str = "INSTALL_INFO.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainLayout {
    root: PathBuf,
    profile: ToolchainProfile,
}

impl ToolchainLayout {
    pub fn new(root: impl Into<PathBuf>, profile: &ToolchainProfile) -> Self {
        Self {
            root: root.into(),
            profile: profile.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profile(&self) -> &ToolchainProfile {
        &self.profile
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn sysroot_dir(&self) -> PathBuf {
        self.root.join(&self.profile.triple)
    }

    pub fn target_bin_dir(&self) -> PathBuf {
        self.sysroot_dir().join("bin")
    }

    pub fn libexec_dir(&self) -> PathBuf {
        self.root
            .join("libexec")
            .join("gcc")
            .join(&self.profile.triple)
            .join(self.profile.gcc_version.to_string())
    }

    pub fn install_info_path(&self) -> PathBuf {
        self.root.join(INSTALL_INFO_FILE_NAME)
    }

    pub fn prefixed_tool_path(&self, tool: &str) -> PathBuf {
        self.bin_dir()
            .join(self.profile.prefixed_tool_file_name(tool))
    }

    pub fn target_tool_path(&self, tool: &str) -> PathBuf {
        self.target_bin_dir()
            .join(self.profile.plain_tool_file_name(tool))
    }

    pub fn required_dirs(&self) -> [PathBuf; 2] {
        [self.bin_dir(), self.sysroot_dir()]
    }

    /// Files that must exist after copy: compiler front ends and debugger, runtime
    /// DLLs next to them, and the versioned `cc1` compiler proper.
    pub fn required_installed_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .profile
            .required_tools
            .iter()
            .map(|tool| self.prefixed_tool_path(tool))
            .collect();
        files.extend(
            self.profile
                .runtime_libraries
                .iter()
                .map(|library| self.bin_dir().join(library)),
        );
        files.push(
            self.libexec_dir()
                .join(self.profile.plain_tool_file_name("cc1")),
        );
        files
    }

    /// Both required subdirectories present, without erroring.
    pub fn has_toolchain_shape(&self) -> bool {
        self.required_dirs().iter().all(|dir| dir.is_dir())
    }
}

pub fn validate_toolchain_root(layout: &ToolchainLayout) -> Result<()> {
    if !layout.root().is_dir() {
        return Err(anyhow!(
            "toolchain root does not exist: {}",
            layout.root().display()
        ));
    }

    for dir in layout.required_dirs() {
        if !dir.is_dir() {
            return Err(anyhow!(
                "invalid toolchain layout, missing directory: {}",
                dir.display()
            ));
        }
    }

    Ok(())
}

pub fn validate_installed(layout: &ToolchainLayout) -> Result<()> {
    validate_toolchain_root(layout)?;

    for file in layout.required_installed_files() {
        if !file.is_file() {
            return Err(anyhow!("installed output missing: {}", file.display()));
        }
    }

    Ok(())
}
