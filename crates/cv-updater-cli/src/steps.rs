//! What each action does on work.ua, one browser session at a time.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use cv_updater_core::{ActionError, ActionExecutor, ActionKind, ActorError};
use rand::Rng;
use tracing::Instrument;
use webdriver::{ElementRef, Session, WebDriverError};

use crate::browser::BrowserActor;
use crate::site::{self, UrlPatterns};

/// Attach the step name to a driver error and sort it into the right class.
///
/// Session faults mean the browser is unusable and become actor failures;
/// everything else (missing element, wait timeout) is an ordinary failure.
trait StepResultExt<T> {
    fn step(self, what: &str) -> Result<T, ActionError>;
}

impl<T> StepResultExt<T> for Result<T, WebDriverError> {
    fn step(self, what: &str) -> Result<T, ActionError> {
        self.map_err(|e| classify(what, e))
    }
}

fn classify(what: &str, e: WebDriverError) -> ActionError {
    if e.is_session_fault() {
        ActionError::Actor(ActorError::new(format!("{what}: {e}")))
    } else {
        ActionError::failed(format!("{what}: {e}"))
    }
}

/// Random pause between 1 and 3 seconds before a click.
fn human_pause() -> Duration {
    Duration::from_secs_f64(1.0 + 2.0 * rand::thread_rng().gen::<f64>())
}

// ─── Scheduled actions ────────────────────────────────────────────────────

/// Executor for the scheduled REFRESH and UPDATE actions.
#[derive(Debug, Clone)]
pub struct WorkUaSteps {
    patterns: UrlPatterns,
    settle: Duration,
}

impl WorkUaSteps {
    pub fn new(settle: Duration) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: UrlPatterns::compile()?,
            settle,
        })
    }

    /// Touch the account by opening the "create resume" page.
    async fn refresh(&self, session: &Session, timeout: Duration) -> Result<(), ActionError> {
        session
            .goto(site::RESUME_LIST_URL)
            .await
            .step("open resume list")?;
        let create = session
            .wait_for_visible(site::CREATE_BUTTON_XPATH, timeout)
            .await
            .step("find create button")?;
        session.click(&create).await.step("click create button")?;
        session
            .wait_for_url(&self.patterns.create, timeout)
            .await
            .step("open create page")?;
        tokio::time::sleep(self.settle).await;
        tracing::info!("session refreshed");
        Ok(())
    }

    /// Press every resume's "update" link once.
    async fn update(&self, session: &Session, timeout: Duration) -> Result<(), ActionError> {
        session
            .goto(site::RESUME_LIST_URL)
            .await
            .step("open resume list")?;
        let mut visited = HashSet::new();
        while let Some((link, href)) = next_unvisited(session, &visited).await? {
            tokio::time::sleep(human_pause()).await;
            session.click(&link).await.step("click update link")?;
            tracing::debug!(%href, "clicked");
            visited.insert(href);
            // The click reloads the list; wait for the old page to go away first.
            session
                .wait_for_stale(&link, timeout)
                .await
                .step("wait for reload")?;
            session
                .wait_for_url(&self.patterns.resume_list, timeout)
                .await
                .step("return to resume list")?;
        }
        tracing::info!(updated = visited.len(), "updated");
        Ok(())
    }
}

/// First update link on the page whose href has not been clicked yet.
async fn next_unvisited(
    session: &Session,
    visited: &HashSet<String>,
) -> Result<Option<(ElementRef, String)>, ActionError> {
    let links = session
        .find_elements(site::UPDATE_BUTTON_XPATH)
        .await
        .step("find update links")?;
    for link in links {
        let href = session
            .attribute(&link, "href")
            .await
            .step("read update link")?
            .unwrap_or_default();
        tracing::debug!(%href, "update link");
        if !visited.contains(&href) {
            return Ok(Some((link, href)));
        }
    }
    Ok(None)
}

#[async_trait]
impl ActionExecutor<BrowserActor> for WorkUaSteps {
    async fn execute(
        &self,
        kind: ActionKind,
        actor: &mut BrowserActor,
        wait_timeout: Duration,
    ) -> Result<(), ActionError> {
        let session = actor.session();
        match kind {
            ActionKind::Refresh => {
                self.refresh(session, wait_timeout)
                    .instrument(tracing::info_span!("refresh"))
                    .await
            }
            ActionKind::Update => {
                self.update(session, wait_timeout)
                    .instrument(tracing::info_span!("update"))
                    .await
            }
        }
    }
}

// ─── Manual login ─────────────────────────────────────────────────────────

/// Opens the login page and waits for a person to sign in.
#[derive(Debug, Clone)]
pub struct ManualLogin {
    patterns: UrlPatterns,
    timeout: Duration,
    settle: Duration,
}

impl ManualLogin {
    pub fn new(timeout: Duration, settle: Duration) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: UrlPatterns::compile()?,
            timeout,
            settle,
        })
    }

    /// Upper bound on one login attempt, for the guard's budget.
    pub fn budget(&self) -> Duration {
        self.timeout
            .saturating_add(self.settle)
            .saturating_add(Duration::from_secs(60))
    }
}

#[async_trait]
impl ActionExecutor<BrowserActor> for ManualLogin {
    /// The scheduled wait timeout is ignored; a person is typing.
    async fn execute(
        &self,
        _kind: ActionKind,
        actor: &mut BrowserActor,
        _wait_timeout: Duration,
    ) -> Result<(), ActionError> {
        let session = actor.session();
        async {
            session.goto(site::LOGIN_URL).await.step("open login page")?;
            session
                .wait_for_url(&self.patterns.post_login, self.timeout)
                .await
                .step("wait for login")?;
            tokio::time::sleep(self.settle).await;
            tracing::info!("successfully logged in");
            Ok::<(), ActionError>(())
        }
        .instrument(tracing::info_span!("login"))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_faults_become_actor_errors() {
        let err = Err::<(), _>(WebDriverError::Protocol {
            error: "invalid session id".into(),
            message: "browser gone".into(),
        })
        .step("open resume list")
        .unwrap_err();
        let ActionError::Actor(e) = err else {
            panic!("expected actor error")
        };
        assert!(e.message().starts_with("open resume list: "), "{e}");
    }

    #[test]
    fn page_problems_are_plain_failures() {
        let err = Err::<(), _>(WebDriverError::Timeout("timed out".into()))
            .step("find create button")
            .unwrap_err();
        let ActionError::Failed(reason) = err else {
            panic!("expected failure")
        };
        assert_eq!(reason, "find create button: timed out");

        let err = Err::<(), _>(WebDriverError::Protocol {
            error: "no such element".into(),
            message: String::new(),
        })
        .step("click")
        .unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
    }

    #[test]
    fn pauses_stay_in_range() {
        for _ in 0..100 {
            let d = human_pause();
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(3), "{d:?}");
        }
    }

    #[test]
    fn login_budget_covers_the_wait() {
        let login = ManualLogin::new(Duration::from_secs(3600), Duration::from_secs(10)).unwrap();
        assert!(login.budget() > Duration::from_secs(3610));
    }

    #[test]
    fn login_budget_saturates_on_huge_timeouts() {
        let login = ManualLogin::new(Duration::from_secs(u64::MAX), Duration::from_secs(10)).unwrap();
        assert_eq!(login.budget(), Duration::MAX);
    }
}
