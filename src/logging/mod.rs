use crate::config::LogsConfig;
use crate::logging::format::Formatter;
pub use log_writer::LogWriter;
use std::path::PathBuf;
use tracing::Metadata;
use tracing_subscriber::Layer;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

mod format;
mod log_writer;

const CRATE_PATH: &str = "owr_sources";

fn is_library_event(metadata: &Metadata<'_>) -> bool {
    metadata
        .module_path()
        .map(|it| it.starts_with("owr_sources::"))
        .unwrap_or(false)
}

/// Installs the global subscriber. Library events are filtered by the
/// configured level and go to the log file when file logging is enabled,
/// to stdout otherwise. Events from the binary itself always go to stdout.
pub fn registry_logs(writer: &mut LogWriter, cfg: &LogsConfig) -> anyhow::Result<()> {
    let mut layers = Vec::new();
    let level = cfg.level;
    if cfg.enable_file_logging {
        let dir = cfg
            .parse_dir()?
            .unwrap_or_else(|| PathBuf::from("/var/log/owr-sources"));
        let file_writer = writer.create_file_writer(dir.join("owr-sources.log"))?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(Formatter::new(false))
            .with_writer(file_writer)
            .with_filter(filter::filter_fn(move |metadata| {
                is_library_event(metadata) && metadata.level() <= &level
            }));
        layers.push(file_layer.boxed());
    } else {
        let stdio_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(Formatter::new(true))
            .with_filter(filter::filter_fn(move |metadata| {
                is_library_event(metadata) && metadata.level() <= &level
            }));
        layers.push(stdio_layer.boxed());
    }
    // general_layer
    {
        let general_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(Formatter::new(true))
            .with_filter(filter::filter_fn(move |metadata| {
                metadata.module_path() == Some(CRATE_PATH)
            }));
        layers.push(general_layer.boxed());
    }
    tracing_subscriber::registry()
        .with(layers)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
