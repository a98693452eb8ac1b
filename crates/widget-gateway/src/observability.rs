//! Process-wide `tracing` setup for binaries and examples.
//!
//! Both crates only emit through `tracing` macros. Whoever owns `main` either
//! calls [`init_observability`] or installs a subscriber of their own.
//!
//! | Variable | Effect |
//! | --- | --- |
//! | `WIDGET_OBSERVABILITY_ENABLED` | `off`/`false`/`0`/`no`/`disabled` skips setup |
//! | `WIDGET_LOG_LEVEL` | filter directives, e.g. `widget_gateway=debug` |
//! | `RUST_LOG` | used when `WIDGET_LOG_LEVEL` is unset |
//! | `WIDGET_JSON_LOG_PATH` | write JSON lines to this file instead of stdout |

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const ENABLED_VAR: &str = "WIDGET_OBSERVABILITY_ENABLED";
pub const LEVEL_VAR: &str = "WIDGET_LOG_LEVEL";
pub const JSON_PATH_VAR: &str = "WIDGET_JSON_LOG_PATH";

const DEFAULT_DIRECTIVES: &str = "info";
const DEFAULT_JSON_FILE: &str = "widget.logs.jsonl";

static INSTALLED: OnceCell<bool> = OnceCell::new();

/// Where formatted events go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact single-line records on stdout.
    Console,
    /// One JSON object per line, appended to the file.
    JsonFile(PathBuf),
}

/// Logging choices read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    /// Raw filter directives; `None` means `info`.
    pub directives: Option<String>,
    pub output: LogOutput,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directives: None,
            output: LogOutput::Console,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            enabled: present(ENABLED_VAR)
                .and_then(|value| switch_value(&value))
                .unwrap_or(true),
            directives: present(LEVEL_VAR).or_else(|| present("RUST_LOG")),
            output: present(JSON_PATH_VAR)
                .map(|path| LogOutput::JsonFile(PathBuf::from(path)))
                .unwrap_or(LogOutput::Console),
        }
    }

    /// Directives that fail to parse fall back to `info`.
    pub fn filter(&self) -> EnvFilter {
        self.directives
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
    }

    /// Registers the global subscriber. Returns `false` when logging is
    /// disabled, the log file cannot be opened or a subscriber already exists.
    pub fn install(&self) -> bool {
        if !self.enabled {
            return false;
        }
        let registry = tracing_subscriber::registry().with(self.filter());
        let result = match &self.output {
            LogOutput::Console => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stdout),
                )
                .try_init(),
            LogOutput::JsonFile(path) => {
                let Some(appender) = json_appender(path) else {
                    return false;
                };
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_target(false)
                            .with_writer(appender),
                    )
                    .try_init()
            }
        };
        result.is_ok()
    }
}

fn switch_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Splits a log path into the appender's directory and file name.
fn json_location(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_JSON_FILE.to_string());
    (dir.to_path_buf(), file)
}

fn json_appender(path: &Path) -> Option<RollingFileAppender> {
    let (dir, file) = json_location(path);
    match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file)
        .build(&dir)
    {
        Ok(appender) => Some(appender),
        Err(err) => {
            eprintln!("widget logging disabled: cannot open {}: {err}", path.display());
            None
        }
    }
}

/// Installs the subscriber described by [`LogSettings::from_env`], once per
/// process. Later calls return the first outcome.
pub fn init_observability() -> bool {
    *INSTALLED.get_or_init(|| LogSettings::from_env().install())
}
