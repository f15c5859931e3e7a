use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::model::config::project_dirs;

const LOG_FILE: &str = "mk-processor.log";
const DEFAULT_FILTER: &str = "mk_processor=info";

/// Initialize logging to a daily file under the data dir (never stdout, the
/// terminal belongs to the shell). `RUST_LOG` overrides the default filter.
///
/// Returns `None` when no log location is usable; the application runs
/// without logs in that case.
pub fn init() -> Option<WorkerGuard> {
    let log_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init()
        .ok()?;

    tracing::info!(dir = %log_dir.display(), "mk-processor starting");
    Some(guard)
}
