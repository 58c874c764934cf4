//! `webdriver`: minimal async client for a W3C WebDriver server.
//!
//! Covers exactly what a scripted browser session needs: spawning the driver
//! binary, creating a Chrome session, navigating, locating elements by XPath,
//! clicking, reading cookies and screenshots, and polling waits.
//!
//! # Architecture
//!
//! ```text
//! DriverProcess   ← spawns `chromedriver --port=N`, drains stderr
//!     │              polls GET /status until ready
//!     ▼
//! Client          ← POST /session with goog:chromeOptions
//!     │
//!     ▼
//! Session         ← /url, /elements, /click, /cookie, /screenshot
//!     │
//!     ▼
//! wait_for_*      ← poll a check every 500ms until it holds or times out
//! ```

pub mod error;
pub mod process;
pub mod session;
pub mod types;
pub mod wait;


pub use error::WebDriverError;
pub use process::DriverProcess;
pub use session::{Client, Session, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
pub use types::{ChromeOptions, ElementRef, ELEMENT_KEY};

pub type Result<T> = std::result::Result<T, WebDriverError>;
