use owr_sources::utils::Pidfile;
use owr_sources::{config, logging, monitor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = config::parse_config_path(std::env::args())?;
    let config = config::load(&config_path)?;
    let (mut logs, logs_task) = logging::LogWriter::new();
    logging::registry_logs(&mut logs, &config.logs)?;
    let _pidfile = Pidfile::new()
        .inspect_err(|err| tracing::warn!("Pidfile disabled: {err}"))
        .ok();
    tracing::info!("Loaded configuration from {:?}", config_path);

    let logs = Arc::new(logs);
    let args = monitor::MonitorArgs {
        logs: logs.clone(),
        config_path,
        config,
    };
    let result = monitor::run_until_done(args, CancellationToken::new()).await;
    logs.shutdown().await;
    logs_task.await??;
    result
}
