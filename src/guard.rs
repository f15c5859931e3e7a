//! Last line of defence around the process.
//!
//! Everything that escapes the orchestrated run, whether an error or a panic,
//! ends up here. It is reported on the console, shown in a critical dialog
//! when a terminal can still be entered, and turned into exit status 1.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use crate::report::{Notice, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Required collaborators could not be brought up.
    Import,
    /// The orchestrated run failed.
    Runtime,
}

impl Failure {
    pub fn title(self) -> &'static str {
        match self {
            Self::Import => "Module Import Error",
            Self::Runtime => "Application Error",
        }
    }

    fn summary(self, message: &str) -> String {
        match self {
            Self::Import => format!("Failed to load required components: {message}"),
            Self::Runtime => format!("An unhandled error occurred: {message}"),
        }
    }
}

/// Blocking, modal presentation of a fatal failure.
pub trait CriticalDialog {
    fn show_critical(&mut self, notice: &Notice) -> anyhow::Result<()>;
}

/// Run `body`, converting any escaping error or panic into a reported
/// failure and exit status 1.
pub fn run_guarded<F>(reporter: &dyn Reporter, dialog: &mut dyn CriticalDialog, body: F) -> ExitCode
where
    F: FnOnce() -> anyhow::Result<ExitCode>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => report_fatal(
            reporter,
            Some(dialog),
            Failure::Runtime,
            &format!("{err:#}"),
            format!("{err:?}"),
        ),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let detail = reporter
                .take_panic_report()
                .unwrap_or_else(|| message.clone());
            report_fatal(reporter, Some(dialog), Failure::Runtime, &message, detail)
        }
    }
}

/// Report a fatal failure on the console and, if possible, in a dialog.
/// A dialog that cannot be shown is ignored.
pub fn report_fatal(
    reporter: &dyn Reporter,
    dialog: Option<&mut dyn CriticalDialog>,
    failure: Failure,
    message: &str,
    detail: String,
) -> ExitCode {
    let notice = Notice::critical(failure.title(), failure.summary(message), detail);
    reporter.critical(&notice);

    if let Some(dialog) = dialog {
        if let Err(err) = dialog.show_critical(&notice) {
            tracing::debug!("critical dialog unavailable: {err:#}");
        }
    }

    ExitCode::FAILURE
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic with non-string payload".to_string()
}
