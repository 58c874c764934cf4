pub mod login;
pub mod status;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::Context;
use cv_updater_core::{io, paths, Config, GuardSettings, Tracker};
use tokio_util::sync::CancellationToken;

use crate::browser::BrowserFactory;

/// Command-line values that take precedence over `config.yaml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub timeout: Option<f64>,
    pub browser: Option<String>,
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `--data-dir` flag / `CV_UPDATER_DATA_DIR` env var (passed in as `explicit`)
/// 2. `~/.config/workua-cv-updater`
pub fn resolve_data_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => paths::default_data_dir().context("cannot locate the data directory"),
    }
}

/// Validated configuration bound to one data directory.
#[derive(Debug, Clone)]
pub struct App {
    pub data_dir: PathBuf,
    pub config: Config,
}

impl App {
    pub fn load(overrides: &Overrides) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(overrides.data_dir.as_deref())?;
        let mut config = Config::load(&data_dir).with_context(|| {
            format!(
                "failed to load {}",
                paths::config_path(&data_dir).display()
            )
        })?;
        if let Some(timeout) = overrides.timeout {
            config.wait_timeout_secs = timeout;
        }
        if let Some(browser) = &overrides.browser {
            config.browser = browser.clone();
        }
        config.validate().context("invalid configuration")?;
        Ok(Self { data_dir, config })
    }

    pub fn open_tracker(&self) -> anyhow::Result<Tracker> {
        let path = paths::db_path(&self.data_dir);
        Tracker::open(&path).with_context(|| format!("cannot open tracker at {}", path.display()))
    }

    /// Create the screenshot and profile directories and the browser factory.
    pub fn browser_factory(&self, headless: bool) -> anyhow::Result<BrowserFactory> {
        io::ensure_private_dir(&paths::screenshots_dir(&self.data_dir))
            .context("cannot create screenshots directory")?;
        let profile = paths::profile_dir(&self.data_dir);
        io::ensure_dir(&profile).context("cannot create profile directory")?;
        BrowserFactory::new(self.config.browser_descriptor()?, &profile, headless)
    }

    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            capture_dir: paths::screenshots_dir(&self.data_dir),
            action_budget: self.config.action_budget(),
            wait_timeout: self.config.wait_timeout(),
        }
    }
}

/// Single-threaded runtime for one command.
pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Cancel `token` on Ctrl-C or, on unix, SIGTERM.
pub(crate) fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("stop requested");
        token.cancel();
    })
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Close the tracker after `result` is known; the command's error wins.
pub(crate) fn finish(tracker: Tracker, result: anyhow::Result<()>) -> anyhow::Result<()> {
    let closed = tracker.close().context("failed to close tracker");
    result?;
    closed
}
