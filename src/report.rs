//! User-facing failure reporting.
//!
//! A [`Reporter`] is handed to the bootstrap sequence and installed before
//! any fallible step runs. The console implementation owns the process panic
//! hook and keeps the last panic report so the top-level guard can show it.

use std::backtrace::Backtrace;
use std::sync::{Arc, Mutex, Once};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A message for the user: a title, a human-readable summary and, for fatal
/// failures, the full detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: title.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn critical(
        title: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Critical,
            title: title.into(),
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

pub trait Reporter {
    /// Install process-wide interception of uncaught failures. Calling this
    /// more than once has no further effect.
    fn install(&self);

    fn warning(&self, notice: &Notice);

    fn critical(&self, notice: &Notice);

    /// Take the report captured for the most recent panic, if any.
    fn take_panic_report(&self) -> Option<String>;
}

/// Logs warnings and writes fatal reports to stderr.
#[derive(Debug)]
pub struct ConsoleReporter {
    installed: Once,
    panic_report: Arc<Mutex<Option<String>>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            installed: Once::new(),
            panic_report: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn install(&self) {
        let slot = Arc::clone(&self.panic_report);
        self.installed.call_once(move || {
            std::panic::set_hook(Box::new(move |info| {
                let backtrace = Backtrace::force_capture();
                tracing::error!("uncaught panic: {info}");
                if let Ok(mut report) = slot.lock() {
                    *report = Some(format!("{info}\n\nbacktrace:\n{backtrace}"));
                }
            }));
            tracing::debug!("panic reporter installed");
        });
    }

    fn warning(&self, notice: &Notice) {
        tracing::warn!(title = %notice.title, "{}", notice.message);
    }

    fn critical(&self, notice: &Notice) {
        tracing::error!(title = %notice.title, "{}", notice.message);
        eprintln!("{}", notice.message);
        if let Some(detail) = &notice.detail {
            eprintln!("{detail}");
        }
    }

    fn take_panic_report(&self) -> Option<String> {
        self.panic_report.lock().ok().and_then(|mut report| report.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_notices_carry_detail() {
        let notice = Notice::critical("Application Error", "boom", "trace");

        assert_eq!(notice.severity, Severity::Critical);
        assert_eq!(notice.detail.as_deref(), Some("trace"));
        assert!(Notice::warning("Directory Warning", "x").detail.is_none());
    }

    #[test]
    fn panic_report_is_taken_once() {
        let reporter = ConsoleReporter::new();
        *reporter.panic_report.lock().unwrap() = Some("panicked at main.rs".to_string());

        assert_eq!(
            reporter.take_panic_report().as_deref(),
            Some("panicked at main.rs")
        );
        assert!(reporter.take_panic_report().is_none());
    }
}
