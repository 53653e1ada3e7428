//! Minimal W3C WebDriver client.
//!
//! Speaks the WebDriver wire protocol over HTTP to a running driver
//! (chromedriver, geckodriver, or a Selenium standalone server). Covers only
//! the verbs a portal search flow needs: session lifecycle, navigation,
//! element lookup, click, keystrokes, text, enabled-state, page source.
//!
//! No waiting or retry logic lives here — callers own their own polling
//! policies.

pub mod error;
pub mod types;

pub use error::{Result, WebDriverError};
pub use types::{keys, Capabilities, Element, Locator, ELEMENT_KEY};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use types::{NewSessionBody, SendKeysBody, SessionData, UrlBody, WireError, Wrapped};

/// Portal page loads can be slow and navigation blocks until the document
/// finishes loading, so this is deliberately generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /status — whether the driver is up and willing to create sessions.
    pub async fn ready(&self) -> Result<bool> {
        let resp = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;

        #[derive(serde::Deserialize)]
        struct Status {
            ready: bool,
        }

        let status: Status = decode(resp).await?;
        Ok(status.ready)
    }

    /// POST /session — start a browser session with the given capabilities.
    pub async fn new_session(&self, capabilities: &Capabilities) -> Result<Session> {
        let resp = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&NewSessionBody { capabilities })
            .send()
            .await?;

        let data: SessionData = decode(resp).await?;
        debug!(session_id = data.session_id.as_str(), "WebDriver session created");

        Ok(Session {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session_id: data.session_id,
        })
    }
}

/// One browser session. All verbs address `/session/{id}/...`.
///
/// The session is not closed on drop — call [`Session::delete`] so the
/// browser is torn down deterministically even after failures.
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// POST /url — navigate. Blocks until the document load completes.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.post_unit("url", &UrlBody { url }).await
    }

    /// POST /element — find the first element matching the locator.
    /// Absence surfaces as [`WebDriverError::NoSuchElement`].
    pub async fn find_element(&self, locator: &Locator) -> Result<Element> {
        self.post("element", locator).await
    }

    /// POST /elements — all elements matching the locator (empty when none).
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        self.post("elements", locator).await
    }

    /// POST /element/{id}/click.
    pub async fn click(&self, element: &Element) -> Result<()> {
        self.post_unit(&format!("element/{}/click", element.id), &serde_json::json!({}))
            .await
    }

    /// POST /element/{id}/value — type text into the element. Include
    /// [`keys`] constants in `text` for control keys.
    pub async fn send_keys(&self, element: &Element, text: &str) -> Result<()> {
        self.post_unit(&format!("element/{}/value", element.id), &SendKeysBody { text })
            .await
    }

    /// POST /element/{id}/clear — reset an input to empty.
    pub async fn clear(&self, element: &Element) -> Result<()> {
        self.post_unit(&format!("element/{}/clear", element.id), &serde_json::json!({}))
            .await
    }

    /// GET /element/{id}/text — rendered text of the element.
    pub async fn text(&self, element: &Element) -> Result<String> {
        self.get(&format!("element/{}/text", element.id)).await
    }

    /// GET /element/{id}/enabled.
    pub async fn is_enabled(&self, element: &Element) -> Result<bool> {
        self.get(&format!("element/{}/enabled", element.id)).await
    }

    /// GET /source — full serialized DOM of the current page.
    pub async fn page_source(&self) -> Result<String> {
        self.get("source").await
    }

    /// DELETE /session/{id} — close the browser.
    pub async fn delete(&self) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(""))
            .send()
            .await?;

        let _: serde_json::Value = decode(resp).await?;
        debug!(session_id = self.session_id.as_str(), "WebDriver session deleted");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.base_url, self.session_id, path)
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.endpoint(path)).send().await?;
        decode(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let resp = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn post_unit(&self, path: &str, body: &impl Serialize) -> Result<()> {
        let _: serde_json::Value = self.post(path, body).await?;
        Ok(())
    }
}

/// Unwrap the `{"value": ...}` envelope on success; decode the W3C error
/// payload on failure so element-missing cases stay distinguishable.
async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;

    if status.is_success() {
        let wrapped: Wrapped<T> = serde_json::from_str(&body)?;
        return Ok(wrapped.value);
    }

    Err(decode_error(status.as_u16(), &body))
}

fn decode_error(status: u16, body: &str) -> WebDriverError {
    if let Ok(wire) = serde_json::from_str::<WireError>(body) {
        return match wire.value.error.as_str() {
            "no such element" => WebDriverError::NoSuchElement,
            "stale element reference" => WebDriverError::StaleElement,
            _ => WebDriverError::Api {
                status,
                message: format!("{}: {}", wire.value.error, wire.value.message),
            },
        };
    }

    WebDriverError::Api {
        status,
        message: body.to_string(),
    }
}
