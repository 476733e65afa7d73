use crate::config::{self, CameraConfig, Config};
use crate::logging::LogWriter;
use crate::models::CurrentSource;
use crate::sources::{CameraSource, MediaSourceProvider, MicrophoneSource, StaticDevices};
use crate::utils::Observer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{signal, task::JoinSet};
use tokio_util::sync::CancellationToken;

pub struct MonitorArgs {
    pub logs: Arc<LogWriter>,
    pub config_path: PathBuf,
    pub config: Config,
}

pub struct MediaSources {
    pub microphone: MicrophoneSource,
    pub camera: CameraSource,
}

impl MediaSources {
    pub fn from_config(config: &Config) -> Self {
        let devices = StaticDevices::new(config.devices.clone());
        let sources = Self {
            microphone: MicrophoneSource::new(&devices),
            camera: CameraSource::new(&devices),
        };
        sources.select_default_camera(&config.camera);
        sources
    }

    fn select_default_camera(&self, cfg: &CameraConfig) {
        let Some(index) = cfg.default_index else {
            return;
        };
        if let Err(err) = self.camera.select_source(index) {
            tracing::warn!("Ignoring camera.default_index: {}", err);
        }
    }

    /// Publishes the device list of `config` as if the devices were hot-plugged.
    /// Returns which of (microphone, camera) changed.
    pub fn apply(&self, config: &Config) -> (bool, bool) {
        let devices = StaticDevices::new(config.devices.clone());
        (
            self.microphone.refresh(&devices),
            self.camera.refresh(&devices),
        )
    }

    pub fn reload(&self, path: &Path) -> anyhow::Result<(bool, bool)> {
        let config = config::load(path)?;
        Ok(self.apply(&config))
    }
}

/// Logs every value published by a media source.
pub struct SourceLogger {
    kind: &'static str,
}

impl SourceLogger {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

impl Observer<CurrentSource> for SourceLogger {
    fn notify(&self, value: CurrentSource) {
        match value {
            Some(source) => tracing::info!(
                kind = self.kind,
                source_type = ?source.source_type(),
                "{} source: {}",
                self.kind,
                source
            ),
            None => tracing::warn!(kind = self.kind, "{} source unavailable", self.kind),
        }
    }
}

fn on_reload(sources: &MediaSources, path: &Path) {
    match sources.reload(path) {
        Ok((microphone, camera)) => {
            tracing::info!(microphone, camera, "Devices reloaded from {:?}", path)
        }
        Err(err) => {
            tracing::error!("Failed to reload devices: {}", err);
            err.chain()
                .skip(1)
                .for_each(|cause| tracing::error!("Because: {}", cause));
        }
    }
}

/// Cancels `shutdown_signal` once `interrupt` fires. A failure to listen for
/// the interrupt is logged and leaves the monitor running.
async fn cancel_on_interrupt(
    interrupt: impl Future<Output = std::io::Result<()>>,
    shutdown_signal: CancellationToken,
) {
    tokio::select! {
        result = interrupt => match result {
            Ok(()) => shutdown_signal.cancel(),
            Err(err) => tracing::error!("Failed to listen for ctrl+c: {err}"),
        },
        _ = shutdown_signal.cancelled() => {}
    }
}

/// Runs until ctrl+c, SIGTERM or `shutdown_signal` is cancelled.
///
/// On unix, SIGHUP reloads the device list from the configuration file and
/// SIGUSR1 reopens the log files.
pub async fn run_until_done(
    args: MonitorArgs,
    shutdown_signal: CancellationToken,
) -> anyhow::Result<()> {
    let sources = Arc::new(MediaSources::from_config(&args.config));
    let microphone_logger = Arc::new(SourceLogger::new("microphone"));
    let camera_logger = Arc::new(SourceLogger::new("camera"));
    sources.microphone.subscribe(&microphone_logger)?;
    sources.camera.subscribe(&camera_logger)?;
    tracing::info!(
        cameras = ?sources.camera.names(),
        microphone = %sources.microphone.name(),
        "Monitoring media sources"
    );

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();
    // register ctrl+c signal
    {
        let shutdown_signal = shutdown_signal.clone();
        join_set.spawn(async move {
            cancel_on_interrupt(signal::ctrl_c(), shutdown_signal).await;
            Ok::<(), anyhow::Error>(())
        });
    }
    // register sighup signal to reload devices, usr1 to reopen log files
    #[cfg(unix)]
    {
        let shutdown_signal = shutdown_signal.clone();
        let logs = args.logs.clone();
        let sources = sources.clone();
        let config_path = args.config_path.clone();
        join_set.spawn(async move {
            use signal::unix::SignalKind;
            let mut hup = signal::unix::signal(SignalKind::hangup())?;
            let mut usr1 = signal::unix::signal(SignalKind::user_defined1())?;
            let mut sigterm = signal::unix::signal(SignalKind::terminate())?;
            loop {
                tokio::select! {
                    _ = shutdown_signal.cancelled() => break,
                    _ = sigterm.recv() => {
                        tracing::debug!("Received SIGTERM signal, start terminating");
                        shutdown_signal.cancel();
                    }
                    _ = hup.recv() => {
                        tracing::debug!("Received SIGHUP signal, start reloading devices");
                        on_reload(&sources, &config_path);
                    }
                    _ = usr1.recv() => {
                        tracing::debug!("Received USR1 signal, start reopening log files");
                        match logs.reopen() {
                            Ok(_) => tracing::info!("Log files reopen successful."),
                            Err(err) => eprintln!("Failed to reopen log files: {err:?}"),
                        }
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        });
    }
    while let Some(r) = join_set.join_next().await {
        if shutdown_signal.is_cancelled() {
            join_set.shutdown().await;
            break;
        }
        match r {
            Ok(Ok(_)) => (),
            Ok(Err(e)) => return Err(e),
            Err(e) => anyhow::bail!("Internal error in spawn: {e}"),
        }
    }
    tracing::info!("Shutdown...");
    drop((microphone_logger, camera_logger));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSource, MediaType, SourceType};
    use std::io::Write;

    fn config(cameras: &[&str], default_index: Option<usize>) -> Config {
        let mut devices = vec![MediaSource::new(
            crate::sources::DEFAULT_AUDIO_INPUT,
            [MediaType::Audio],
            SourceType::Capture,
        )];
        devices.extend(
            cameras
                .iter()
                .map(|name| MediaSource::new(*name, [MediaType::Video], SourceType::Capture)),
        );
        Config {
            camera: CameraConfig { default_index },
            devices,
            ..Config::default()
        }
    }

    #[test]
    fn test_from_config_selects_default_camera() {
        let sources = MediaSources::from_config(&config(
            &["Front facing Camera", "Back facing Camera"],
            Some(1),
        ));
        assert_eq!(sources.camera.selected_index(), Some(1));
        assert!(sources.microphone.current_source().is_some());

        let sources = MediaSources::from_config(&config(&["Front facing Camera"], Some(5)));
        assert_eq!(sources.camera.selected_index(), Some(0));
    }

    #[test]
    fn test_apply_and_reload() {
        let sources = MediaSources::from_config(&config(
            &["Front facing Camera", "Back facing Camera"],
            None,
        ));
        assert_eq!(
            sources.apply(&config(&["Front facing Camera", "Back facing Camera"], None)),
            (false, false)
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[devices]]
name = "Back facing Camera"
media_types = ["video"]
source_type = "capture"
"#
        )
        .unwrap();
        assert_eq!(sources.reload(file.path()).unwrap(), (true, true));
        assert_eq!(sources.camera.names(), vec!["Back facing Camera"]);
        assert!(sources.microphone.current_source().is_none());

        let dir = tempfile::tempdir().unwrap();
        assert!(sources.reload(&dir.path().join("missing.toml")).is_err());
        assert_eq!(sources.camera.count(), 1);
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let (logs, logs_task) = LogWriter::new();
        let logs = Arc::new(logs);
        let shutdown_signal = CancellationToken::new();
        let args = MonitorArgs {
            logs: logs.clone(),
            config_path: PathBuf::from("owr-sources.toml"),
            config: config(&["Front facing Camera"], None),
        };
        let task = tokio::spawn(run_until_done(args, shutdown_signal.clone()));
        shutdown_signal.cancel();
        task.await.unwrap().unwrap();
        logs.shutdown().await;
        logs_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_failure_keeps_running() {
        let shutdown_signal = CancellationToken::new();
        cancel_on_interrupt(
            async { Err::<(), _>(std::io::Error::other("no signal handler")) },
            shutdown_signal.clone(),
        )
        .await;
        assert!(!shutdown_signal.is_cancelled());

        cancel_on_interrupt(async { Ok::<(), std::io::Error>(()) }, shutdown_signal.clone()).await;
        assert!(shutdown_signal.is_cancelled());
    }
}
