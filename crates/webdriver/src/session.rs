use std::time::Duration;

use base64::Engine as _;
use reqwest::Method;
use serde_json::{json, Value};

use crate::types::{unwrap_response, ChromeOptions, ElementRef};
use crate::{Result, WebDriverError};

/// Poll period used by the `wait_for_*` helpers unless overridden.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Limit on a single HTTP round trip to the driver.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ─── Client ───────────────────────────────────────────────────────────────

/// Connection to a WebDriver server, before any session exists.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_request_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// A client whose requests fail with [`WebDriverError::Http`] once
    /// `timeout` passes without a complete response.
    pub fn with_request_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `true` once the server reports it can create sessions.
    pub async fn is_ready(&self) -> Result<bool> {
        let value = send(&self.http, Method::GET, &format!("{}/status", self.base_url), None).await?;
        Ok(value.get("ready").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn new_session(&self, options: &ChromeOptions) -> Result<Session> {
        let value = send(
            &self.http,
            Method::POST,
            &format!("{}/session", self.base_url),
            Some(options.to_new_session_body()),
        )
        .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Decode(format!("no sessionId in {value}")))?;
        tracing::debug!(session_id = id, "webdriver session created");
        Ok(Session {
            http: self.http.clone(),
            url: format!("{}/session/{id}", self.base_url),
            id: id.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }
}

// ─── Session ──────────────────────────────────────────────────────────────

/// One browser session on a WebDriver server.
#[derive(Debug)]
pub struct Session {
    http: reqwest::Client,
    /// `<base>/session/<id>`
    url: String,
    id: String,
    pub(crate) poll_interval: Duration,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        send(&self.http, method, &format!("{}{path}", self.url), body).await
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.call(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let value = self.call(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WebDriverError::Decode(format!("url is not a string: {value}")))
    }

    pub async fn find_elements(&self, xpath: &str) -> Result<Vec<ElementRef>> {
        let value = self
            .call(
                Method::POST,
                "/elements",
                Some(json!({ "using": "xpath", "value": xpath })),
            )
            .await?;
        value
            .as_array()
            .ok_or_else(|| WebDriverError::Decode(format!("elements is not an array: {value}")))?
            .iter()
            .map(ElementRef::from_value)
            .collect()
    }

    /// Attribute value, or `None` when the element lacks it.
    pub async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .call(
                Method::GET,
                &format!("/element/{}/attribute/{name}", element.id()),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    pub async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        let value = self
            .call(
                Method::GET,
                &format!("/element/{}/displayed", element.id()),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        self.call(
            Method::POST,
            &format!("/element/{}/click", element.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    /// `true` once `element` is detached from the document.
    pub async fn is_stale(&self, element: &ElementRef) -> Result<bool> {
        match self
            .call(
                Method::GET,
                &format!("/element/{}/enabled", element.id()),
                None,
            )
            .await
        {
            Ok(_) => Ok(false),
            Err(e) if e.is_stale() => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// All cookies visible to the current page, as returned by the driver.
    pub async fn cookies(&self) -> Result<Value> {
        self.call(Method::GET, "/cookie", None).await
    }

    /// PNG screenshot of the current viewport.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.call(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| WebDriverError::Decode("screenshot is not a string".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| WebDriverError::Decode(format!("screenshot: {e}")))
    }

    /// End the session, closing the browser.
    pub async fn delete(self) -> Result<()> {
        self.call(Method::DELETE, "", None).await?;
        tracing::debug!(session_id = %self.id, "webdriver session deleted");
        Ok(())
    }
}

// ─── Transport ────────────────────────────────────────────────────────────

async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value> {
    let mut req = http.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await?;
    let ok = resp.status().is_success();
    let body: Value = resp.json().await?;
    unwrap_response(ok, body)
}
