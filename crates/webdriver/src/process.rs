use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::session::Client;
use crate::{Result, WebDriverError};

const READY_POLL: Duration = Duration::from_millis(100);

// ─── DriverProcess ────────────────────────────────────────────────────────

/// A running WebDriver server (e.g. `chromedriver`) bound to a local port.
///
/// The child is spawned with `kill_on_drop`, so dropping this value without
/// calling [`shutdown`](Self::shutdown) still stops the server. Stderr is
/// drained by a background task and surfaced if the server dies early.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    port: u16,
    stderr_buf: Arc<Mutex<String>>,
}

impl DriverProcess {
    /// Start `program --port=<free port>` and wait until it reports ready.
    pub async fn spawn(program: &Path, startup_timeout: Duration) -> Result<Self> {
        let port = free_port()?;
        let mut cmd = Command::new(program);
        cmd.arg(format!("--port={port}"));
        let mut process = Self::from_command(cmd, port)?;
        process.wait_ready(startup_timeout).await?;
        tracing::debug!(program = %program.display(), port, "driver ready");
        Ok(process)
    }

    fn from_command(mut cmd: Command, port: u16) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(WebDriverError::Io)?;

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        Ok(Self {
            child,
            port,
            stderr_buf,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn client(&self) -> Result<Client> {
        Client::new(self.base_url())
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<()> {
        let client = self.client()?;
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(WebDriverError::Process(self.with_stderr(format!(
                    "driver exited during startup with {status}"
                ))));
            }
            // Connection refused until the server binds its port.
            if client.is_ready().await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                self.kill();
                return Err(WebDriverError::Process(self.with_stderr(format!(
                    "driver not ready after {}s",
                    timeout.as_secs()
                ))));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    fn with_stderr(&self, msg: String) -> String {
        let stderr = self
            .stderr_buf
            .lock()
            .ok()
            .map(|b| b.clone())
            .unwrap_or_default();
        if stderr.is_empty() {
            msg
        } else {
            format!("{msg}\nstderr: {stderr}")
        }
    }

    /// Ask the OS to kill the server without waiting for it.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "driver kill failed");
        }
    }

    /// Kill the server and reap it.
    pub async fn shutdown(mut self) -> Result<()> {
        self.kill();
        self.child.wait().await?;
        Ok(())
    }
}

/// A port that was free a moment ago. The listener is closed before the
/// driver binds it, so another process could still take it in between.
fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}
