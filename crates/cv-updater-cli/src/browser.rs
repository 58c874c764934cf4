//! Chrome/Chromium behind a WebDriver server, as the scheduler's actor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cv_updater_core::config::BrowserDescriptor;
use cv_updater_core::{Actor, ActorError, ActorFactory};
use webdriver::{ChromeOptions, DriverProcess, Session, WebDriverError};

const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn actor_error(e: WebDriverError) -> ActorError {
    ActorError::new(e.to_string())
}

/// Browser switches for one session.
pub fn chrome_options(
    descriptor: &BrowserDescriptor,
    binary: Option<String>,
    profile_dir: &Path,
    headless: bool,
) -> ChromeOptions {
    let mut options = ChromeOptions {
        binary,
        args: Vec::new(),
    }
    .arg("--disable-dev-shm-usage")
    .arg("--disable-gpu")
    .arg(format!("user-data-dir={}", profile_dir.display()))
    .arg("window-size=1920,1055");
    for arg in &descriptor.args {
        options = options.arg(arg.clone());
    }
    if headless {
        options = options.arg("--headless");
    }
    options
}

// ─── BrowserFactory ───────────────────────────────────────────────────────

/// Starts a fresh driver and browser session for every acquisition.
#[derive(Debug, Clone)]
pub struct BrowserFactory {
    driver: PathBuf,
    options: ChromeOptions,
}

impl BrowserFactory {
    /// Resolve the driver executable and fix the session options.
    pub fn new(
        descriptor: &BrowserDescriptor,
        profile_dir: &Path,
        headless: bool,
    ) -> anyhow::Result<Self> {
        let driver = which::which(&descriptor.driver).with_context(|| {
            format!(
                "cannot find WebDriver executable '{}'; install it or set `driver` in config.yaml",
                descriptor.driver
            )
        })?;
        // Chromedriver wants a path; fall back to the configured name.
        let binary = descriptor.binary.as_ref().map(|b| {
            which::which(b)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| b.clone())
        });
        tracing::debug!(driver = %driver.display(), ?binary, headless, "browser factory ready");
        Ok(Self {
            driver,
            options: chrome_options(descriptor, binary, profile_dir, headless),
        })
    }

    pub fn options(&self) -> &ChromeOptions {
        &self.options
    }
}

#[async_trait]
impl ActorFactory for BrowserFactory {
    type Actor = BrowserActor;

    async fn acquire(&self) -> Result<BrowserActor, ActorError> {
        let process = DriverProcess::spawn(&self.driver, DRIVER_STARTUP_TIMEOUT)
            .await
            .map_err(actor_error)?;
        let session = match process.client() {
            Ok(client) => client.new_session(&self.options).await,
            Err(e) => Err(e),
        };
        match session {
            Ok(session) => Ok(BrowserActor { process, session }),
            Err(e) => {
                if let Err(stop) = process.shutdown().await {
                    tracing::warn!(error = %stop, "driver shutdown failed");
                }
                Err(actor_error(e))
            }
        }
    }
}

// ─── BrowserActor ─────────────────────────────────────────────────────────

/// One browser session and the driver process serving it.
#[derive(Debug)]
pub struct BrowserActor {
    process: DriverProcess,
    session: Session,
}

impl BrowserActor {
    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl Actor for BrowserActor {
    async fn location(&mut self) -> Result<String, ActorError> {
        self.session.current_url().await.map_err(actor_error)
    }

    async fn session_state(&mut self) -> Result<serde_json::Value, ActorError> {
        self.session.cookies().await.map_err(actor_error)
    }

    async fn capture(&mut self) -> Result<Vec<u8>, ActorError> {
        self.session.screenshot().await.map_err(actor_error)
    }

    /// Close the browser, then stop the driver even if closing failed.
    async fn release(self) -> Result<(), ActorError> {
        let BrowserActor { process, session } = self;
        let deleted = session.delete().await.map_err(actor_error);
        process.shutdown().await.map_err(actor_error)?;
        deleted
    }

    fn abandon(&mut self) {
        self.process.kill();
    }
}
