use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, LevelFilter};
use riscv_toolchain_core::{ToolchainProfile, PROFILE_ENV_VAR};
use riscv_toolchain_installer::{
    host_environment, install_toolchain, installer_dir, resolve_source, resolve_target,
    EnvironmentStore, InstallOutcome, InstallRequest, MemoryEnvironment, SearchPathConvention,
};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

mod args;
mod render;

use args::{help_text, parse_options, Options};
use render::{
    current_output_style, render_error_line, render_status_line, CopyProgress, OutputStyle,
};

const LOG_ENV_VAR: &str = "RISCV_INSTALLER_LOG";

#[derive(Debug)]
enum RunOutcome {
    Help,
    Installed(InstallOutcome),
}

fn main() -> ExitCode {
    let style = current_output_style();
    let result = run(std::env::args_os().skip(1), style);
    match &result {
        Ok(RunOutcome::Installed(outcome)) => {
            debug!("install info written to {}", outcome.info_path.display())
        }
        Ok(RunOutcome::Help) => {}
        Err(err) => eprintln!("{}", render_error_line(style, err)),
    }
    ExitCode::from(exit_status(&result))
}

fn run<I>(raw_args: I, style: OutputStyle) -> Result<RunOutcome>
where
    I: IntoIterator<Item = OsString>,
{
    let options = parse_options(raw_args)?;
    if options.show_help {
        print!("{}", help_text());
        return Ok(RunOutcome::Help);
    }

    let requested_level = std::env::var(LOG_ENV_VAR).ok();
    init_logging(resolve_log_level(options.silent, requested_level.as_deref())?)?;

    let exe_dir = installer_dir()?;
    let profile_override = std::env::var_os(PROFILE_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let profile = ToolchainProfile::discover(profile_override.as_deref(), &exe_dir)?;

    // With --no-path nothing is registered, so the host store is never touched.
    let mut environment: Box<dyn EnvironmentStore> = if options.add_path {
        host_environment(&profile)?
    } else {
        Box::new(MemoryEnvironment::new())
    };

    install(&options, &profile, &exe_dir, environment.as_mut(), style).map(RunOutcome::Installed)
}

fn install(
    options: &Options,
    profile: &ToolchainProfile,
    exe_dir: &Path,
    environment: &mut dyn EnvironmentStore,
    style: OutputStyle,
) -> Result<InstallOutcome> {
    let request = InstallRequest {
        source: resolve_source(options.source.as_deref(), exe_dir, profile)?,
        target: resolve_target(options.target.as_deref(), profile)?,
        register_environment: options.add_path,
        search_path: SearchPathConvention::host(),
    };

    let mut progress = CopyProgress::start(style, !options.silent);
    let result = install_toolchain(profile, &request, environment, &mut |_: &Path| {
        progress.record_file()
    });
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            progress.finish_abandon();
            return Err(err);
        }
    };
    let summary = progress.finish_success();

    if outcome.environment.is_some() {
        if let Some(hint) = environment.activation_hint() {
            info!("To finish setup, {hint}");
        }
    }

    if !options.silent {
        if let Some(line) = summary {
            println!("{line}");
        }
        println!(
            "{}",
            render_status_line(
                style,
                "ok",
                &format!(
                    "installed {} toolchain into {}",
                    profile.triple,
                    outcome.install_root.display()
                )
            )
        );
    }

    Ok(outcome)
}

fn exit_status<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// `--silent` caps the level at warn; otherwise `RISCV_INSTALLER_LOG` picks it.
fn resolve_log_level(silent: bool, requested: Option<&str>) -> Result<LevelFilter> {
    let level = match requested.map(str::trim).filter(|value| !value.is_empty()) {
        None => LevelFilter::Info,
        Some(value) => value.parse::<LevelFilter>().map_err(|_| {
            anyhow!(
                "invalid {LOG_ENV_VAR} value '{value}' (expected off, error, warn, info, debug or trace)"
            )
        })?,
    };

    if silent {
        return Ok(level.min(LevelFilter::Warn));
    }
    Ok(level)
}

fn init_logging(level: LevelFilter) -> Result<()> {
    let mut log_config = ConfigBuilder::new();
    log_config.set_location_level(LevelFilter::Off);
    log_config.set_target_level(LevelFilter::Off);
    log_config.set_thread_level(LevelFilter::Off);
    TermLogger::init(
        level,
        log_config.build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialize logging")
}
