//! Structured Logger - Tab-Separated Severity Files
//!
//! Every entry is one line: `timestamp \t identity \t payload \n`, appended
//! to `debug.log`, `info.log` or `warn.log`. Debug entries are dropped in
//! production. Files are append-only; rotation is somebody else's job.
//!
//! `warn.log` is meant to be watched: write there when a developer needs to
//! know about a problem right away.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dump::dump;

pub const DEFAULT_MODE_VAR: &str = "APP_ENV";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to append to {}: {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Severity::Debug => "debug.log",
            Severity::Info => "info.log",
            Severity::Warn => "warn.log",
        }
    }

    /// Whether entries of this severity are written in `mode`.
    pub fn is_active(&self, mode: RuntimeMode) -> bool {
        !matches!((self, mode), (Severity::Debug, RuntimeMode::Production))
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

impl RuntimeMode {
    /// `production` or `prod` (any case) is production; everything else is not.
    pub fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }
}

/// Where the production flag comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeFlag {
    Fixed(RuntimeMode),
    /// Read from this environment variable on every check.
    Env(String),
}

impl ModeFlag {
    pub fn current(&self) -> RuntimeMode {
        match self {
            ModeFlag::Fixed(mode) => *mode,
            ModeFlag::Env(var) => std::env::var(var)
                .map(|v| RuntimeMode::from_env_value(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for ModeFlag {
    fn default() -> Self {
        ModeFlag::Env(DEFAULT_MODE_VAR.to_string())
    }
}

/// Who is acting, as written in the second column.
#[derive(Clone, Default)]
pub enum Identity {
    #[default]
    Unset,
    Literal(String),
    /// Called on every write; never cached.
    Resolver(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Identity {
    pub fn literal(value: impl fmt::Display) -> Self {
        Identity::Literal(value.to_string())
    }

    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Identity::Resolver(Arc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            Identity::Unset => String::new(),
            Identity::Literal(value) => value.clone(),
            Identity::Resolver(f) => f(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Unset => f.write_str("Unset"),
            Identity::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Identity::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// What gets logged. Text goes in verbatim, tabs and newlines included.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Value(Value),
}

impl Payload {
    /// Strings come back as `Text`; anything else as `Value`.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Payload::from(serde_json::to_value(value)?))
    }

    pub fn render(&self) -> String {
        match self {
            Payload::Text(text) | Payload::Value(Value::String(text)) => text.clone(),
            Payload::Value(value) => dump(value),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Payload::Text(text),
            other => Payload::Value(other),
        }
    }
}

/// `2026-10-16T09:15:02.004211+09:00`
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    // leap seconds report up to 1_999_999 micros
    let micros = at.timestamp_subsec_micros().min(999_999);
    format!(
        "{}.{:06}{}",
        at.format("%Y-%m-%dT%H:%M:%S"),
        micros,
        at.format("%:z")
    )
}

pub fn format_line(timestamp: &str, identity: &str, payload: &str) -> String {
    format!("{}\t{}\t{}\n", timestamp, identity, payload)
}

pub struct Log {
    dir: PathBuf,
    identity: Identity,
    mode: ModeFlag,
    locks: [Mutex<()>; 3],
}

impl Log {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            identity: Identity::Unset,
            mode: ModeFlag::default(),
            locks: Default::default(),
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_mode(mut self, mode: ModeFlag) -> Self {
        self.mode = mode;
        self
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, severity: Severity) -> PathBuf {
        self.dir.join(severity.file_name())
    }

    /// Development-only; a no-op in production.
    pub fn debug(&self, msg: impl Into<Payload>) -> Result<(), LogError> {
        self.log(Severity::Debug, msg.into())
    }

    pub fn info(&self, msg: impl Into<Payload>) -> Result<(), LogError> {
        self.log(Severity::Info, msg.into())
    }

    pub fn warn(&self, msg: impl Into<Payload>) -> Result<(), LogError> {
        self.log(Severity::Warn, msg.into())
    }

    pub fn log(&self, severity: Severity, payload: Payload) -> Result<(), LogError> {
        // Only debug depends on the mode; don't touch the environment otherwise.
        if severity == Severity::Debug && !severity.is_active(self.mode.current()) {
            return Ok(());
        }
        self.write(severity, &payload)
    }

    fn write(&self, severity: Severity, payload: &Payload) -> Result<(), LogError> {
        let identity = self.identity.resolve();
        let line = format_line(&format_timestamp(&Local::now()), &identity, &payload.render());
        let path = self.path(severity);

        let _guard = self.locks[severity.index()].lock();
        append_line(&path, line.as_bytes()).map_err(|source| LogError::Append {
            path: path.clone(),
            source,
        })?;

        tracing::trace!(%severity, path = %path.display(), bytes = line.len(), "log line appended");
        Ok(())
    }
}

/// Append `line` in one write while holding an exclusive advisory lock on
/// the file. The lock is released when the file is closed.
#[cfg(unix)]
fn append_line(path: &Path, line: &[u8]) -> io::Result<()> {
    use nix::fcntl::{Flock, FlockArg};

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut locked = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| io::Error::from(errno))?;
    locked.write_all(line)?;
    locked.flush()
}

#[cfg(not(unix))]
fn append_line(path: &Path, line: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_timestamp_format() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2026, 10, 16, 9, 15, 2).unwrap() + chrono::Duration::microseconds(4211);
        assert_eq!(format_timestamp(&at), "2026-10-16T09:15:02.004211+09:00");

        let west = FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap();
        let at = west.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(&at), "2026-01-02T03:04:05.000000-05:30");
    }

    #[test]
    fn test_timestamp_truncates_sub_micro() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let at = tz.with_ymd_and_hms(2026, 1, 1, 0, 0, 59).unwrap() + chrono::Duration::nanoseconds(999_999_999);
        assert_eq!(format_timestamp(&at), "2026-01-01T00:00:59.999999+00:00");
    }

    #[test]
    fn test_line_layout() {
        assert_eq!(format_line("T", "42", "hello"), "T\t42\thello\n");
        assert_eq!(format_line("T", "", "a\tb"), "T\t\ta\tb\n");
    }

    #[test]
    fn test_severity_policy() {
        assert!(Severity::Debug.is_active(RuntimeMode::Development));
        assert!(!Severity::Debug.is_active(RuntimeMode::Production));
        for severity in [Severity::Info, Severity::Warn] {
            assert!(severity.is_active(RuntimeMode::Production));
            assert!(severity.is_active(RuntimeMode::Development));
        }
    }

    #[test]
    fn test_mode_from_env_value() {
        assert_eq!(RuntimeMode::from_env_value("Production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::from_env_value(" prod "), RuntimeMode::Production);
        assert_eq!(RuntimeMode::from_env_value("staging"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::from_env_value(""), RuntimeMode::Development);
    }

    #[test]
    fn test_payload_conversions() {
        assert_eq!(Payload::from("x").render(), "x");
        assert_eq!(Payload::from(json!("y")), Payload::Text("y".into()));
        assert_eq!(Payload::from(json!(3)).render(), "int(3)\n");
        assert_eq!(Payload::structured(&vec![1, 2]).unwrap(), Payload::Value(json!([1, 2])));
        assert_eq!(Payload::structured(&"hello").unwrap(), Payload::Text("hello".into()));
        assert_eq!(Payload::Value(json!("a\tb")).render(), "a\tb");
    }

    #[test]
    fn test_identity_resolution() {
        assert_eq!(Identity::Unset.resolve(), "");
        assert_eq!(Identity::literal(1001).resolve(), "1001");
        assert_eq!(Identity::resolver(|| "u-7".to_string()).resolve(), "u-7");
        assert_eq!(format!("{:?}", Identity::resolver(String::new)), "Resolver(..)");
    }
}
