use anstyle::{AnsiColor, Effects, Style};
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::{Duration, Instant};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(std::io::stderr().is_terminal(), no_color)
}

pub(crate) fn resolve_output_style(stderr_is_terminal: bool, no_color: bool) -> OutputStyle {
    if stderr_is_terminal && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

/// Single-line rendering of an error and its context chain.
pub(crate) fn render_error_line(style: OutputStyle, err: &anyhow::Error) -> String {
    let badge = match style {
        OutputStyle::Plain => "ERROR:".to_string(),
        OutputStyle::Rich => colorize(error_style(), "ERROR:"),
    };
    format!("{badge} {err:#}")
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

/// Spinner counting copied files; only drawn in rich mode.
pub(crate) struct CopyProgress {
    style: OutputStyle,
    copied: u64,
    spinner: Option<ProgressBar>,
    started_at: Instant,
}

impl CopyProgress {
    pub(crate) fn start(style: OutputStyle, enabled: bool) -> Self {
        let spinner = if enabled && style == OutputStyle::Rich {
            let spinner = ProgressBar::new_spinner();
            if let Ok(template) =
                ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {pos} files {elapsed_precise}")
            {
                spinner.set_style(template.tick_chars("|/-\\ "));
            }
            spinner.set_message("copying");
            spinner.enable_steady_tick(Duration::from_millis(80));
            Some(spinner)
        } else {
            None
        };

        Self {
            style,
            copied: 0,
            spinner,
            started_at: Instant::now(),
        }
    }

    pub(crate) fn record_file(&mut self) {
        self.copied += 1;
        if let Some(spinner) = &self.spinner {
            spinner.set_position(self.copied);
        }
    }

    /// Clears the spinner and returns the summary line, if one should be shown.
    pub(crate) fn finish_success(mut self) -> Option<String> {
        let spinner = self.spinner.take()?;
        spinner.finish_and_clear();
        render_copy_summary(self.style, self.copied, self.started_at.elapsed())
    }

    pub(crate) fn finish_abandon(mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

pub(crate) fn render_copy_summary(
    style: OutputStyle,
    files: u64,
    elapsed: Duration,
) -> Option<String> {
    if style == OutputStyle::Plain {
        return None;
    }

    Some(format!(
        "{} {} files in {}",
        colorize(progress_label_style(), "copied"),
        HumanCount(files),
        format_elapsed(elapsed)
    ))
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn error_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightRed.into()))
        .effects(Effects::BOLD)
}

fn progress_label_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
