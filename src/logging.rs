use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

fn filter(debug: bool) -> EnvFilter {
    // Without debug logging `RUST_LOG` is ignored so a stray variable in the
    // host environment cannot turn on verbose output.
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level(debug)))
    } else {
        EnvFilter::new(level(debug))
    }
}

/// Splits a log file path into the directory and file name the appender
/// wants. A bare file name lives in the working directory.
fn log_target(path: &Path) -> Option<(PathBuf, OsString)> {
    let file_name = path.file_name()?.to_os_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    Some((dir, file_name))
}

/// Initialise logging to stderr, or to `log_file` when one is given.
///
/// Calling this more than once keeps the first subscriber.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(debug));

    let Some(path) = log_file else {
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    let Some((dir, file_name)) = log_target(&path) else {
        eprintln!("microweb: log path {} has no file name; logging to stderr", path.display());
        let _ = builder.with_writer(std::io::stderr).try_init();
        return;
    };

    let appender = tracing_appender::rolling::never(dir, file_name);
    let _ = builder.with_ansi(false).with_writer(appender).try_init();
}

#[cfg(test)]
mod tests {
    use super::{level, log_target};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn debug_flag_selects_level() {
        assert_eq!(level(true), "debug");
        assert_eq!(level(false), "info");
    }

    #[test]
    fn bare_file_name_logs_to_working_directory() {
        assert_eq!(
            log_target(Path::new("microweb.log")),
            Some((PathBuf::from("."), OsString::from("microweb.log")))
        );
    }

    #[test]
    fn nested_path_keeps_its_directory() {
        assert_eq!(
            log_target(Path::new("logs/engine/microweb.log")),
            Some((PathBuf::from("logs/engine"), OsString::from("microweb.log")))
        );
    }

    #[test]
    fn path_without_file_name_has_no_target() {
        assert_eq!(log_target(Path::new("..")), None);
        assert_eq!(log_target(Path::new("/")), None);
    }
}
