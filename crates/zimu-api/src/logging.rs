//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

use crate::config::ApiConfig;

const LOG_FILE_PREFIX: &str = "zimu";
const MAX_LOG_FILES: usize = 5;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

/// Install the global subscriber: console (ANSI or JSON) plus a daily file.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_tracing(config: &ApiConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::from_default_env().add_directive("zimu=info".parse().expect("valid directive"));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.log_json {
        layers.push(fmt::layer().json().boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_ansi(true)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .boxed(),
        );
    }

    let guard = match file_appender(&config.log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
            Some(guard)
        }
        Err(e) => {
            eprintln!("File logging disabled, cannot open {}: {}", config.log_dir.display(), e);
            None
        }
    };

    tracing_subscriber::registry().with(layers).with(env_filter).init();
    guard
}
