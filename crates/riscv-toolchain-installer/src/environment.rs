use anyhow::{anyhow, Context, Result};
use log::debug;
use riscv_toolchain_core::ToolchainProfile;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::layout::ToolchainLayout;
use crate::process::{escape_ps_single_quote, run_command, run_command_capture};

/// Persistent, user-scoped environment variables.
///
/// Implementations write through to whatever survives the current process (the
/// Windows user registry hive, a shell profile script, ...).
pub trait EnvironmentStore {
    fn read(&self, name: &str) -> Result<Option<String>>;

    fn write(&mut self, name: &str, value: &str) -> Result<()>;

    /// What the user has to do before new shells see the changes, if anything.
    fn activation_hint(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPathConvention {
    pub variable: &'static str,
    pub separator: char,
}

impl SearchPathConvention {
    pub const WINDOWS: Self = Self {
        variable: "Path",
        separator: ';',
    };

    pub const UNIX: Self = Self {
        variable: "PATH",
        separator: ':',
    };

    pub fn host() -> Self {
        if cfg!(windows) {
            Self::WINDOWS
        } else {
            Self::UNIX
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentChanges {
    pub bin_dir: PathBuf,
    pub search_path_updated: bool,
    pub root_var: String,
}

/// Appends `dir` to the search path unless an equivalent entry is already there.
///
/// Entries compare after trimming, absolutizing and dropping trailing separators,
/// ignoring case. Returns whether the variable was written.
pub fn add_to_search_path(
    store: &mut dyn EnvironmentStore,
    convention: SearchPathConvention,
    dir: &Path,
) -> Result<bool> {
    let dir_text = path_to_str(dir)?;
    let current = store.read(convention.variable)?.unwrap_or_default();
    let wanted = normalize_path_for_compare(dir_text);

    let already_present = current
        .split(convention.separator)
        .filter(|entry| !entry.is_empty())
        .any(|entry| normalize_path_for_compare(entry) == wanted);
    if already_present {
        debug!(
            "{} already contains {}",
            convention.variable,
            dir.display()
        );
        return Ok(false);
    }

    let mut updated = current;
    if !updated.is_empty() && !updated.ends_with(convention.separator) {
        updated.push(convention.separator);
    }
    updated.push_str(dir_text);

    store.write(convention.variable, &updated)?;
    Ok(true)
}

pub fn register_install_environment(
    store: &mut dyn EnvironmentStore,
    convention: SearchPathConvention,
    layout: &ToolchainLayout,
) -> Result<EnvironmentChanges> {
    let bin_dir = layout.bin_dir();
    let search_path_updated = add_to_search_path(store, convention, &bin_dir)?;

    let root_var = layout.profile().root_env_var.clone();
    store.write(&root_var, path_to_str(layout.root())?)?;

    Ok(EnvironmentChanges {
        bin_dir,
        search_path_updated,
        root_var,
    })
}

pub(crate) fn normalize_path_for_compare(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let full = std::path::absolute(trimmed).unwrap_or_else(|_| PathBuf::from(trimmed));
    let text = full.to_string_lossy();
    let stripped = text.trim_end_matches(['\\', '/']);
    if stripped.is_empty() {
        // Filesystem root; keep the separator so it still compares as a path.
        return text.to_lowercase();
    }
    stripped.to_lowercase()
}

fn path_to_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("path is not valid UTF-8: {}", path.display()))
}

pub fn host_environment(profile: &ToolchainProfile) -> Result<Box<dyn EnvironmentStore>> {
    if cfg!(windows) {
        return Ok(Box::new(WindowsUserEnvironment));
    }
    Ok(Box::new(ShellProfileEnvironment::for_profile(profile)?))
}

/// Windows user-scope variables, through .NET's `Environment` API so the change is
/// broadcast to running Explorer instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsUserEnvironment;

impl EnvironmentStore for WindowsUserEnvironment {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let mut command = build_read_user_variable_command(name);
        let value = run_command_capture(
            &mut command,
            &format!("failed to read user environment variable {name}"),
        )?;
        decode_user_variable(name, &value)
    }

    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        let mut command = build_write_user_variable_command(name, value);
        run_command(
            &mut command,
            &format!("failed to set user environment variable {name}"),
        )
    }
}

/// Output of the read command; an undecodable value is an error so it is never
/// written back.
pub(crate) fn decode_user_variable(name: &str, raw: &str) -> Result<Option<String>> {
    let value = raw.trim_start_matches('\u{feff}');
    if value.contains(char::REPLACEMENT_CHARACTER) {
        return Err(anyhow!(
            "user environment variable {name} could not be decoded as UTF-8; leaving it unchanged"
        ));
    }
    Ok(Some(value.to_string()).filter(|value| !value.is_empty()))
}

/// Stdout is switched to BOM-less UTF-8 first; the console default is the OEM code
/// page, which mangles non-ASCII entries.
pub(crate) fn build_read_user_variable_command(name: &str) -> Command {
    powershell_command(format!(
        "[Console]::OutputEncoding = New-Object System.Text.UTF8Encoding $false; [Environment]::GetEnvironmentVariable('{}', 'User')",
        escape_ps_single_quote(name)
    ))
}

pub(crate) fn build_write_user_variable_command(name: &str, value: &str) -> Command {
    powershell_command(format!(
        "[Environment]::SetEnvironmentVariable('{}', '{}', 'User')",
        escape_ps_single_quote(name),
        escape_ps_single_quote(value)
    ))
}

fn powershell_command(script: String) -> Command {
    let mut command = Command::new("powershell");
    command
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script);
    command
}

const SHELL_PROFILE_HEADER: &str =
    "# Managed by riscv-toolchain-installer. Source this file from your shell profile.";

/// A POSIX `sh` script of `export` lines standing in for user-scope variables on
/// hosts without a persistent user environment.
///
/// The search-path variable only holds the managed entries; it is rendered as a
/// prefix of the inherited value (`export PATH="<entries>:$PATH"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellProfileEnvironment {
    path: PathBuf,
    search_path_var: String,
}

impl ShellProfileEnvironment {
    pub fn new(path: impl Into<PathBuf>, search_path_var: &str) -> Self {
        Self {
            path: path.into(),
            search_path_var: search_path_var.to_string(),
        }
    }

    pub fn for_profile(profile: &ToolchainProfile) -> Result<Self> {
        let config_home = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var_os("HOME")
                    .filter(|v| !v.is_empty())
                    .context("HOME is not set; cannot resolve shell profile location")?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(Self::new(
            config_home.join(&profile.install_dir_name).join("env.sh"),
            SearchPathConvention::UNIX.variable,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<(String, String)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read shell profile: {}", self.path.display()))?;
        parse_shell_profile(&raw, &self.search_path_var)
            .with_context(|| format!("failed to parse shell profile: {}", self.path.display()))
    }

    fn save(&self, entries: &[(String, String)]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut payload = String::new();
        payload.push_str(SHELL_PROFILE_HEADER);
        payload.push('\n');
        for (name, value) in entries {
            let escaped = escape_sh_double_quoted(value);
            if *name == self.search_path_var {
                if escaped.is_empty() {
                    payload.push_str(&format!("export {name}=\"${name}\"\n"));
                } else {
                    payload.push_str(&format!("export {name}=\"{escaped}:${name}\"\n"));
                }
            } else {
                payload.push_str(&format!("export {name}=\"{escaped}\"\n"));
            }
        }

        fs::write(&self.path, payload.as_bytes())
            .with_context(|| format!("failed to write shell profile: {}", self.path.display()))
    }
}

impl EnvironmentStore for ShellProfileEnvironment {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value))
    }

    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(anyhow!("invalid shell variable name: '{name}'"));
        }

        let mut entries = self.load()?;
        match entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
        self.save(&entries)
    }

    fn activation_hint(&self) -> Option<String> {
        Some(format!(
            "add `. \"{}\"` to your shell profile to use the toolchain in new shells",
            self.path.display()
        ))
    }
}

pub(crate) fn parse_shell_profile(raw: &str, search_path_var: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(assignment) = line.strip_prefix("export ") else {
            return Err(anyhow!("unexpected shell profile line: {line}"));
        };
        let Some((name, quoted)) = assignment.split_once('=') else {
            return Err(anyhow!("invalid export line: {line}"));
        };
        let Some(inner) = quoted
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
        else {
            return Err(anyhow!("export value must be double quoted: {line}"));
        };

        let inner = if name == search_path_var {
            let inherited = format!("${name}");
            match inner.strip_suffix(&format!(":{inherited}")) {
                Some(managed) => managed,
                None if inner == inherited => "",
                None => inner,
            }
        } else {
            inner
        };

        entries.push((name.to_string(), unescape_sh_double_quoted(inner)));
    }
    Ok(entries)
}

fn escape_sh_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn unescape_sh_double_quoted(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
                continue;
            }
        }
        unescaped.push(c);
    }
    unescaped
}

/// In-memory store recording every write, for exercising registration without
/// touching the real user environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnvironment {
    vars: BTreeMap<String, String>,
    writes: Vec<(String, String)>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn writes(&self) -> &[(String, String)] {
        &self.writes
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.vars.get(name).cloned())
    }

    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        self.vars.insert(name.to_string(), value.to_string());
        self.writes.push((name.to_string(), value.to_string()));
        Ok(())
    }
}
