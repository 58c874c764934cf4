//! Polling waits on page state, in the style of explicit WebDriver waits.

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::session::Session;
use crate::types::ElementRef;
use crate::{Result, WebDriverError};

/// Call `check` every `poll` until it yields a value or `timeout` passes.
///
/// Errors from `check` end the wait immediately.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    poll: Duration,
    what: &str,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    // `None` means the deadline lies past what `Instant` can represent.
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(WebDriverError::Timeout(format!(
                "timed out after {:.1}s waiting for {what}",
                timeout.as_secs_f64()
            )));
        }
        tokio::time::sleep(poll).await;
    }
}

impl Session {
    /// Wait until the current URL matches `pattern`; returns that URL.
    pub async fn wait_for_url(&self, pattern: &Regex, timeout: Duration) -> Result<String> {
        let what = format!("url matching {}", pattern.as_str());
        poll_until(timeout, self.poll_interval, &what, || async move {
            let url = self.current_url().await?;
            Ok(pattern.is_match(&url).then_some(url))
        })
        .await
    }

    /// Wait until the first element matching `xpath` is displayed.
    pub async fn wait_for_visible(&self, xpath: &str, timeout: Duration) -> Result<ElementRef> {
        let what = format!("visible {xpath}");
        poll_until(timeout, self.poll_interval, &what, || async move {
            let Some(element) = self.find_elements(xpath).await?.into_iter().next() else {
                return Ok(None);
            };
            match self.is_displayed(&element).await {
                Ok(true) => Ok(Some(element)),
                Ok(false) => Ok(None),
                Err(e) if e.is_stale() => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
    }

    /// Wait until `element` is detached, e.g. after a click navigated away.
    pub async fn wait_for_stale(&self, element: &ElementRef, timeout: Duration) -> Result<()> {
        poll_until(timeout, self.poll_interval, "element to go stale", || async move {
            Ok(self.is_stale(element).await?.then_some(()))
        })
        .await
    }
}
