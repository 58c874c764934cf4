use crate::error::{Result, UpdaterError};
use crate::paths;
use crate::types::{ActionKind, IntervalSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    #[serde(default = "IntervalSpec::default_refresh")]
    pub refresh: IntervalSpec,
    #[serde(default = "IntervalSpec::default_update")]
    pub update: IntervalSpec,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            refresh: IntervalSpec::default_refresh(),
            update: IntervalSpec::default_update(),
        }
    }
}

impl Intervals {
    pub fn for_kind(&self, kind: ActionKind) -> IntervalSpec {
        match kind {
            ActionKind::Refresh => self.refresh,
            ActionKind::Update => self.update,
        }
    }
}

// ---------------------------------------------------------------------------
// BrowserDescriptor
// ---------------------------------------------------------------------------

/// What the actor factory needs to start one browser flavour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserDescriptor {
    /// WebDriver server executable, a path or a name looked up on `PATH`.
    pub driver: String,
    /// Browser executable passed to the driver; `None` lets it pick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    /// Extra browser command-line switches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

fn default_browsers() -> BTreeMap<String, BrowserDescriptor> {
    let mut m = BTreeMap::new();
    m.insert(
        "chrome".to_string(),
        BrowserDescriptor {
            driver: "chromedriver".to_string(),
            binary: None,
            args: Vec::new(),
        },
    );
    m.insert(
        "chromium".to_string(),
        BrowserDescriptor {
            driver: "chromedriver".to_string(),
            binary: Some("chromium".to_string()),
            args: Vec::new(),
        },
    );
    m
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub intervals: Intervals,
    /// Wall-clock re-check period while waiting for the next due time.
    #[serde(default = "default_poll_quantum_ms")]
    pub poll_quantum_ms: u64,
    /// Bound on each single wait inside an action's steps.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: f64,
    /// Bound on one whole dispatched action.
    #[serde(default = "default_action_budget_secs")]
    pub action_budget_secs: u64,
    #[serde(default = "default_manual_login_timeout_secs")]
    pub manual_login_timeout_secs: u64,
    /// Pause after a page transition before the session is considered settled.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_browser")]
    pub browser: String,
    #[serde(default = "default_browsers")]
    pub browsers: BTreeMap<String, BrowserDescriptor>,
}

fn default_poll_quantum_ms() -> u64 {
    1000
}

fn default_wait_timeout_secs() -> f64 {
    10.0
}

fn default_action_budget_secs() -> u64 {
    600
}

fn default_manual_login_timeout_secs() -> u64 {
    3600
}

fn default_settle_secs() -> u64 {
    10
}

fn default_browser() -> String {
    "chromium".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intervals: Intervals::default(),
            poll_quantum_ms: default_poll_quantum_ms(),
            wait_timeout_secs: default_wait_timeout_secs(),
            action_budget_secs: default_action_budget_secs(),
            manual_login_timeout_secs: default_manual_login_timeout_secs(),
            settle_secs: default_settle_secs(),
            browser: default_browser(),
            browsers: default_browsers(),
        }
    }
}

impl Config {
    /// Load `config.yaml` from `data_dir`, or defaults if there is none.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = paths::config_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = paths::config_path(data_dir);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn poll_quantum(&self) -> Duration {
        Duration::from_millis(self.poll_quantum_ms)
    }

    /// Saturates at `Duration::MAX` for values [`Config::validate`] rejects.
    pub fn wait_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_timeout_secs).unwrap_or(Duration::MAX)
    }

    pub fn action_budget(&self) -> Duration {
        Duration::from_secs(self.action_budget_secs)
    }

    pub fn manual_login_timeout(&self) -> Duration {
        Duration::from_secs(self.manual_login_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// Descriptor for the selected browser.
    pub fn browser_descriptor(&self) -> Result<&BrowserDescriptor> {
        self.browsers.get(&self.browser).ok_or_else(|| {
            UpdaterError::Config(format!(
                "unknown browser '{}' (known: {})",
                self.browser,
                self.browsers.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Result<()> {
        for &kind in ActionKind::all() {
            self.intervals.for_kind(kind).validate(kind)?;
        }
        if self.poll_quantum_ms == 0 {
            return Err(UpdaterError::Config(
                "poll_quantum_ms must be positive".into(),
            ));
        }
        if self.wait_timeout_secs <= 0.0
            || Duration::try_from_secs_f64(self.wait_timeout_secs).is_err()
        {
            return Err(UpdaterError::Config(
                "wait_timeout_secs must be a positive number of seconds".into(),
            ));
        }
        if self.action_budget_secs == 0 || self.manual_login_timeout_secs == 0 {
            return Err(UpdaterError::Config(
                "action_budget_secs and manual_login_timeout_secs must be positive".into(),
            ));
        }
        self.browser_descriptor()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.intervals, Intervals::default());
        assert_eq!(cfg.poll_quantum(), Duration::from_secs(1));
        assert_eq!(cfg.wait_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.browser, "chromium");
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            paths::config_path(dir.path()),
            "intervals:\n  refresh:\n    base_secs: 1800\n    min_drift_secs: 0\n    max_drift_secs: 5\nbrowser: chrome\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.intervals.refresh, IntervalSpec::from_secs(1800, 0, 5));
        assert_eq!(cfg.intervals.update, IntervalSpec::default_update());
        assert_eq!(cfg.browser_descriptor().unwrap().driver, "chromedriver");
        assert_eq!(cfg.action_budget_secs, 600);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.settle_secs = 3;
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.settle_secs, 3);
        assert_eq!(loaded.browsers, cfg.browsers);
    }

    #[test]
    fn invalid_interval_fails_validation() {
        let mut cfg = Config::default();
        cfg.intervals.update = IntervalSpec::from_secs(60, 30, 30);
        assert!(matches!(
            cfg.validate(),
            Err(UpdaterError::InvalidInterval {
                kind: ActionKind::Update,
                ..
            })
        ));
    }

    #[test]
    fn unknown_browser_fails_validation() {
        let cfg = Config {
            browser: "netscape".into(),
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("netscape"), "{err}");
    }

    #[test]
    fn non_positive_wait_timeout_fails_validation() {
        let cfg = Config {
            wait_timeout_secs: 0.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unrepresentable_wait_timeout_fails_validation() {
        for secs in [1e300, f64::INFINITY, f64::NAN] {
            let cfg = Config {
                wait_timeout_secs: secs,
                ..Config::default()
            };
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("wait_timeout_secs"), "{err}");
            // The accessor stays total even on an unvalidated config.
            assert_eq!(cfg.wait_timeout(), Duration::MAX);
        }
    }
}
