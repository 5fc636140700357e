use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

const BINARY_NAME: &str = "riscv-toolchain-installer";

const AFTER_HELP: &str = "\
Flags are case-insensitive; a leading '-', '--' or '/' marker is optional (e.g. /Silent, -no-path).

Without --source, a 'riscv' directory or 'riscv-rv32-win.tar' next to the installer is used.
Without --target, the toolchain goes to %LOCALAPPDATA%\\Programs\\riscv-toolchain on Windows
and $HOME/.local/riscv-toolchain elsewhere. Existing contents of the target are replaced.";

#[derive(Parser, Debug)]
#[command(name = BINARY_NAME)]
#[command(about = "Install a prebuilt RISC-V GCC toolchain", long_about = None)]
#[command(disable_help_flag = true, args_override_self = true, after_help = AFTER_HELP)]
struct Cli {
    /// Print this help and exit
    #[arg(short = 'h', long)]
    help: bool,
    /// Only report warnings and errors
    #[arg(long)]
    silent: bool,
    /// Register the toolchain in the user environment (default)
    #[arg(long, overrides_with = "no_path")]
    add_path: bool,
    /// Leave the user environment untouched
    #[arg(long, overrides_with = "add_path")]
    no_path: bool,
    /// Toolchain directory or .tar archive to install from
    #[arg(long, value_name = "PATH")]
    source: Option<OsString>,
    /// Install root
    #[arg(long, value_name = "PATH")]
    target: Option<OsString>,
}

impl Cli {
    fn into_options(self) -> Options {
        Options {
            show_help: self.help,
            silent: self.silent,
            add_path: !self.no_path,
            source: non_empty_path(self.source),
            target: non_empty_path(self.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Options {
    pub(crate) show_help: bool,
    pub(crate) silent: bool,
    pub(crate) add_path: bool,
    pub(crate) source: Option<PathBuf>,
    pub(crate) target: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_help: false,
            silent: false,
            add_path: true,
            source: None,
            target: None,
        }
    }
}

pub(crate) fn parse_options<I>(raw_args: I) -> Result<Options>
where
    I: IntoIterator<Item = OsString>,
{
    let canonical = canonicalize_args(raw_args)?;
    let cli = Cli::try_parse_from(canonical)?;
    Ok(cli.into_options())
}

pub(crate) fn help_text() -> String {
    Cli::command().render_help().to_string()
}

/// Rewrites installer-style tokens into the `--flag` / `--flag=value` form clap
/// expects, with the program name in front.
///
/// Values after `source`/`target` are passed through untouched, so they may start
/// with a marker themselves.
pub(crate) fn canonicalize_args<I>(raw_args: I) -> Result<Vec<OsString>>
where
    I: IntoIterator<Item = OsString>,
{
    let mut canonical = vec![OsString::from(BINARY_NAME)];
    let mut tokens = raw_args.into_iter();

    while let Some(token) = tokens.next() {
        let Some(flag) = flag_name(&token) else {
            return Err(unknown_argument(&token));
        };

        match flag.as_str() {
            "help" | "h" | "?" => canonical.push(OsString::from("--help")),
            "silent" => canonical.push(OsString::from("--silent")),
            "add-path" => canonical.push(OsString::from("--add-path")),
            "no-path" => canonical.push(OsString::from("--no-path")),
            "source" | "target" => {
                let value = tokens.next().ok_or_else(|| {
                    anyhow!("missing value for {}", token.to_string_lossy())
                })?;
                let mut pair = OsString::from(format!("--{flag}="));
                pair.push(value);
                canonical.push(pair);
            }
            _ => return Err(unknown_argument(&token)),
        }
    }

    Ok(canonical)
}

/// Lowercased flag name: surrounding whitespace and any run of leading `-`/`/`
/// markers removed. A marker is optional. `None` when nothing is left.
fn flag_name(token: &OsString) -> Option<String> {
    let name = token.to_str()?.trim().trim_start_matches(['-', '/']);
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

fn unknown_argument(token: &OsString) -> anyhow::Error {
    anyhow!("unknown argument: {}", token.to_string_lossy())
}

fn non_empty_path(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|value| !value.is_empty()).map(PathBuf::from)
}
