//! Script logger
//!
//! Leveled logging with positional `{}` placeholders. Logging never fails the
//! invocation: formatting is total and sinks swallow their own errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::values::Val;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Logging side channel available to scripts
pub trait ScriptLogger {
    fn log(&self, level: LogLevel, format: &str, args: &[Val]);

    fn debug(&self, format: &str, args: &[Val]) {
        self.log(LogLevel::Debug, format, args);
    }

    fn info(&self, format: &str, args: &[Val]) {
        self.log(LogLevel::Info, format, args);
    }

    fn warn(&self, format: &str, args: &[Val]) {
        self.log(LogLevel::Warn, format, args);
    }

    fn error(&self, format: &str, args: &[Val]) {
        self.log(LogLevel::Error, format, args);
    }
}

/// Substitute `{}` placeholders left to right
///
/// Placeholders without a matching argument stay as `{}`; surplus arguments
/// are ignored.
pub fn format_message(format: &str, args: &[Val]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut rest = format;

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(&arg.to_string()),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn emit(instance_id: Uuid, level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: "script", %instance_id, "{}", message),
        LogLevel::Info => tracing::info!(target: "script", %instance_id, "{}", message),
        LogLevel::Warn => tracing::warn!(target: "script", %instance_id, "{}", message),
        LogLevel::Error => tracing::error!(target: "script", %instance_id, "{}", message),
    }
}

/* ===================== Tracing Logger ===================== */

/// Forwards script log lines to `tracing` under the `script` target
#[derive(Debug, Clone)]
pub struct TracingLogger {
    instance_id: Uuid,
}

impl TracingLogger {
    pub fn new(instance_id: Uuid) -> Self {
        Self { instance_id }
    }
}

impl ScriptLogger for TracingLogger {
    fn log(&self, level: LogLevel, format: &str, args: &[Val]) {
        emit(self.instance_id, level, &format_message(format, args));
    }
}

/* ===================== Capturing Logger ===================== */

/// A formatted log line kept by `CapturingLogger`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Keeps every line in memory and also forwards it to `tracing`
#[derive(Debug)]
pub struct CapturingLogger {
    instance_id: Uuid,
    records: Mutex<Vec<LogRecord>>,
}

impl CapturingLogger {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            instance_id,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Messages only, in emission order
    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl ScriptLogger for CapturingLogger {
    fn log(&self, level: LogLevel, format: &str, args: &[Val]) {
        let message = format_message(format, args);
        emit(self.instance_id, level, &message);

        // A poisoned lock still holds usable records
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push(LogRecord {
            level,
            message,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_positional() {
        let msg = format_message("{} has {} items", &[Val::from("cart"), Val::Int(3)]);
        assert_eq!(msg, "cart has 3 items");
    }

    #[test]
    fn test_format_missing_and_extra_args() {
        assert_eq!(format_message("a={} b={}", &[Val::Int(1)]), "a=1 b={}");
        assert_eq!(format_message("plain", &[Val::Int(1)]), "plain");
        assert_eq!(format_message("", &[]), "");
    }

    /// Shared buffer the fmt subscriber writes into
    #[derive(Clone, Default)]
    struct Buffer(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tracing_logger_emits_events() {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let instance_id = Uuid::new_v4();
        tracing::subscriber::with_default(subscriber, || {
            let logger = TracingLogger::new(instance_id);
            logger.info("hello {}", &[Val::from("world")]);
            logger.warn("{} left", &[Val::Int(2)]);
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("script"));
        assert!(lines[0].contains("hello world"));
        assert!(lines[0].contains(&instance_id.to_string()));
        assert!(lines[1].contains("WARN"));
        assert!(lines[1].contains("2 left"));
    }

    #[test]
    fn test_capturing_logger_levels() {
        let logger = CapturingLogger::new(Uuid::new_v4());
        logger.info("hello {}", &[Val::from("world")]);
        logger.warn("careful", &[]);
        logger.error("{}", &[Val::Bool(false)]);
        logger.debug("dbg", &[]);

        let records = logger.records();
        let levels: Vec<LogLevel> = records.iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Info, LogLevel::Warn, LogLevel::Error, LogLevel::Debug]
        );
        assert_eq!(logger.messages(), vec!["hello world", "careful", "false", "dbg"]);
    }
}
