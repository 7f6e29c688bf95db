use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

const LOG_FILE_PREFIX: &str = "atypica.log";

/// Initialize tracing with a daily-rolling file logger under `log_dir`.
/// Without a directory, logs go to stderr. Filtering follows RUST_LOG and
/// defaults to `info`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub fn init_tracing(log_dir: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_dir) = log_dir else {
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::default()
                    .with_writer(io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(filter);
        tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;
        tracing::debug!(target: "atypica::utils::tracing", "Tracing initialized with stderr output");
        return Ok(None);
    };

    std::fs::create_dir_all(log_dir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber).map_err(io::Error::other)?;

    tracing::debug!(
        target: "atypica::utils::tracing",
        path = %log_dir.display(),
        "Tracing initialized with file output"
    );

    Ok(Some(guard))
}
