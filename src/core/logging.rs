//! Console + daily-rolling file logging.
//!
//! Each binary logs to its own file under `<data_dir>/logs`, so the seeding
//! tool never interleaves with the server's log.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::AppPaths;

const DEFAULT_FILTER: &str = "info,tower_http=info,sqlx=warn";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(paths: &AppPaths, file_name: &str) {
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &paths.log_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    if FILE_GUARD.set(guard).is_err() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialised: {}", err);
    }
}
