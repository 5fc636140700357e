use anyhow::{Context, Result};
use log::debug;
use std::fs;

use crate::layout::ToolchainLayout;

/// Makes target-prefixed binutils reachable under plain names in `<triple>/bin`.
///
/// Existing plain tools are left untouched, even when the prefixed host copy
/// differs. Tools missing on both sides are skipped. Returns the tools whose shim
/// was created by this call.
pub fn ensure_target_binutils_compat(layout: &ToolchainLayout) -> Result<Vec<String>> {
    let target_bin = layout.target_bin_dir();
    fs::create_dir_all(&target_bin)
        .with_context(|| format!("failed to create {}", target_bin.display()))?;

    let mut created = Vec::new();
    for tool in &layout.profile().compat_tools {
        let target_tool = layout.target_tool_path(tool);
        if target_tool.exists() {
            debug!("compat tool already present: {}", target_tool.display());
            continue;
        }

        let prefixed_tool = layout.prefixed_tool_path(tool);
        if !prefixed_tool.is_file() {
            debug!("no prefixed host tool for '{tool}': {}", prefixed_tool.display());
            continue;
        }

        fs::copy(&prefixed_tool, &target_tool).with_context(|| {
            format!(
                "failed to create compat tool {} from {}",
                target_tool.display(),
                prefixed_tool.display()
            )
        })?;
        created.push(tool.clone());
    }

    Ok(created)
}
