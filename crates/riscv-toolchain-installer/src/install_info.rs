use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::PathBuf;

use crate::layout::ToolchainLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallInfo {
    pub installed_at: DateTime<Utc>,
    pub install_root: PathBuf,
}

pub fn write_install_info(layout: &ToolchainLayout) -> Result<PathBuf> {
    write_install_info_at(layout, Utc::now())
}

pub(crate) fn write_install_info_at(
    layout: &ToolchainLayout,
    installed_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!(
        "InstalledAt={}\n",
        installed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    ));
    payload.push_str(&format!("InstallRoot={}\n", layout.root().display()));

    let path = layout.install_info_path();
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write install info: {}", path.display()))?;
    Ok(path)
}

/// Reads the marker of a previous install, if one is there.
pub fn read_install_info(layout: &ToolchainLayout) -> Result<Option<InstallInfo>> {
    let path = layout.install_info_path();
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read install info: {}", path.display()))?;
    parse_install_info(&raw)
        .map(Some)
        .with_context(|| format!("failed to parse install info: {}", path.display()))
}

pub(crate) fn parse_install_info(raw: &str) -> Result<InstallInfo> {
    let mut installed_at = None;
    let mut install_root = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((key, value)) = line.split_once('=') else {
            return Err(anyhow!("invalid install info line: {line}"));
        };
        match key {
            "InstalledAt" => {
                let parsed = DateTime::parse_from_rfc3339(value)
                    .with_context(|| format!("invalid InstalledAt timestamp: {value}"))?;
                installed_at = Some(parsed.with_timezone(&Utc));
            }
            "InstallRoot" => install_root = Some(PathBuf::from(value)),
            _ => {}
        }
    }

    Ok(InstallInfo {
        installed_at: installed_at.context("install info is missing InstalledAt")?,
        install_root: install_root.context("install info is missing InstallRoot")?,
    })
}
