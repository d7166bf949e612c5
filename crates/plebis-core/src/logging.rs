//! Logging utilities with indicatif integration

use indicatif::MultiProgress;

/// Dependencies that log every statement or connection at info level.
const QUIET_TARGETS: &[&str] = &["sqlx::query", "hyper", "reqwest", "html5ever", "selectors"];

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Default filter string: base level plus `warn` for chatty dependencies.
fn default_filter(quiet: bool, debug: bool) -> String {
    let level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let mut filter = level.to_string();
    for target in QUIET_TARGETS {
        filter.push_str(&format!(",{target}=warn"));
    }
    filter
}

/// Module path without the `plebis_` crate prefix (`erowid::worker`).
fn short_target(target: &str) -> &str {
    target.strip_prefix("plebis_").unwrap_or(target)
}

/// One rendered log line. The module path is only shown with `--debug`,
/// where several workers and the batcher interleave.
fn format_line(record: &log::Record, color: bool, show_target: bool) -> String {
    let (pre, label, post) = level_style(record.level(), color);
    if show_target {
        format!(
            "[{pre}{label}{post}] {}: {}",
            short_target(record.target()),
            record.args()
        )
    } else {
        format!("[{pre}{label}{post}] {}", record.args())
    }
}

/// Prints above the harvest progress bars instead of through them.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
    show_target: bool,
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let line = format_line(record, true, self.show_target);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the global logger.
///
/// With `multi` set (TTY), lines are colored and routed around the bars.
/// Otherwise they are plain and timestamped for log files. `RUST_LOG`
/// takes precedence over the computed default filter.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_filter(quiet, debug));
    let mut builder = env_logger::Builder::from_env(env);

    match multi {
        Some(multi) => {
            let inner = builder.build();
            let max_level = inner.filter();
            log::set_boxed_logger(Box::new(IndicatifLogger {
                inner,
                multi: multi.clone(),
                show_target: debug,
            }))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => builder
            .format(move |buf, record| {
                writeln!(
                    buf,
                    "{} {}",
                    buf.timestamp_millis(),
                    format_line(record, false, debug)
                )
            })
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_levels() {
        assert!(default_filter(false, true).starts_with("debug,"));
        assert!(default_filter(true, false).starts_with("warn,"));
        assert!(default_filter(false, false).starts_with("info,"));
    }

    #[test]
    fn filter_silences_dependencies() {
        let filter = default_filter(false, true);
        assert!(filter.contains("sqlx::query=warn"));
        assert!(filter.contains("hyper=warn"));
    }

    #[test]
    fn target_drops_crate_prefix() {
        assert_eq!(short_target("plebis_erowid::worker"), "erowid::worker");
        assert_eq!(short_target("sqlx::query"), "sqlx::query");
    }

    #[test]
    fn line_shows_module_only_when_asked() {
        let record = log::Record::builder()
            .args(format_args!("Report 6 stored"))
            .level(log::Level::Debug)
            .target("plebis_erowid::worker")
            .build();
        assert_eq!(format_line(&record, false, false), "[DEBUG] Report 6 stored");
        assert_eq!(
            format_line(&record, false, true),
            "[DEBUG] erowid::worker: Report 6 stored"
        );
    }

    #[test]
    fn plain_style_has_no_ansi() {
        assert_eq!(level_style(log::Level::Warn, false), ("", "WARN ", ""));
        let (pre, _, post) = level_style(log::Level::Error, true);
        assert!(pre.starts_with("\x1b["));
        assert_eq!(post, "\x1b[0m");
    }
}
