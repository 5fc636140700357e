use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use semver::Version;
use serde::Deserialize;

pub const PROFILE_FILE_NAME: &str = "toolchain-profile.toml";
pub const PROFILE_ENV_VAR: &str = "RISCV_INSTALLER_PROFILE";

/// Conventional names and required files of the bundled toolchain.
///
/// Every field has a default matching the shipped RV32 Windows bundle, so a profile
/// file only needs to name what differs (typically `gcc-version` after a toolchain
/// bump).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ToolchainProfile {
    pub triple: String,
    pub gcc_version: Version,
    pub root_dir_name: String,
    pub archive_name: String,
    pub install_dir_name: String,
    pub root_env_var: String,
    pub executable_suffix: String,
    pub required_tools: Vec<String>,
    pub runtime_libraries: Vec<String>,
    pub compat_tools: Vec<String>,
}

impl Default for ToolchainProfile {
    fn default() -> Self {
        Self {
            triple: "riscv32-unknown-elf".to_string(),
            gcc_version: Version::new(15, 2, 0),
            root_dir_name: "riscv".to_string(),
            archive_name: "riscv-rv32-win.tar".to_string(),
            install_dir_name: "riscv-toolchain".to_string(),
            root_env_var: "RISCV_TOOLCHAIN_ROOT".to_string(),
            executable_suffix: ".exe".to_string(),
            required_tools: to_strings(&["gcc", "g++", "gdb", "readelf"]),
            runtime_libraries: to_strings(&["libstdc++-6.dll", "libgcc_s_seh-1.dll"]),
            compat_tools: to_strings(&[
                "as", "ld", "ar", "nm", "ranlib", "objcopy", "objdump", "strip", "size",
                "readelf",
            ]),
        }
    }
}

impl ToolchainProfile {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let profile: Self = toml::from_str(input).context("failed to parse toolchain profile")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read toolchain profile: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid toolchain profile: {}", path.display()))
    }

    /// Picks the profile for this run: an explicit override path wins, then a profile
    /// file next to the installer, then the built-in defaults.
    pub fn discover(override_path: Option<&Path>, exe_dir: &Path) -> Result<Self> {
        if let Some(path) = override_path {
            return Self::load(path);
        }

        let local = exe_dir.join(PROFILE_FILE_NAME);
        if local.is_file() {
            return Self::load(&local);
        }

        Ok(Self::default())
    }

    /// File name of a host tool carrying the target prefix, e.g. `riscv32-unknown-elf-gcc.exe`.
    pub fn prefixed_tool_file_name(&self, tool: &str) -> String {
        format!("{}-{}{}", self.triple, tool, self.executable_suffix)
    }

    pub fn plain_tool_file_name(&self, tool: &str) -> String {
        format!("{}{}", tool, self.executable_suffix)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("triple", &self.triple),
            ("root-dir-name", &self.root_dir_name),
            ("archive-name", &self.archive_name),
            ("install-dir-name", &self.install_dir_name),
            ("root-env-var", &self.root_env_var),
        ] {
            validate_plain_name(field, value)?;
        }

        if self.root_env_var.contains('=') {
            return Err(anyhow!("root-env-var must not contain '='"));
        }

        for tool in self
            .required_tools
            .iter()
            .chain(&self.runtime_libraries)
            .chain(&self.compat_tools)
        {
            validate_plain_name("tool", tool)?;
        }

        Ok(())
    }
}

fn validate_plain_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{field} must not be empty"));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(anyhow!("{field} '{value}' must be a plain name, not a path"));
    }
    Ok(())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}
