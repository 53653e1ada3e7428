use serde::{Deserialize, Serialize};

/// W3C web element identifier key (WebDriver spec §11).
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Synthesized keystrokes (WebDriver spec §17.4.2 normalized key values).
/// Appending `ENTER` to typed text submits a search the same way a human
/// pressing Enter in the input field would.
pub mod keys {
    pub const ENTER: char = '\u{E007}';
    pub const ARROW_DOWN: char = '\u{E015}';
    pub const ESCAPE: char = '\u{E00C}';
}

/// Element lookup strategy. Serializes to the wire form
/// `{"using": "...", "value": "..."}` directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum Locator {
    #[serde(rename = "css selector")]
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={s}"),
            Locator::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Handle to an element inside a session. Valid until the page it came from
/// navigates or re-renders; after that the driver reports it stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}

/// Capabilities sent with a new-session request. The inner value is passed
/// through verbatim as `alwaysMatch`.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    #[serde(rename = "alwaysMatch")]
    pub always_match: serde_json::Value,
}

impl Capabilities {
    /// Headless Chrome with the flags that keep it stable in containers.
    pub fn headless_chrome() -> Self {
        Self {
            always_match: serde_json::json!({
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": ["--headless=new", "--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"]
                }
            }),
        }
    }

    /// A visible (non-headless) browser, useful when watching a portal flow.
    pub fn chrome() -> Self {
        Self {
            always_match: serde_json::json!({ "browserName": "chrome" }),
        }
    }
}

// --- Wire payloads ---

#[derive(Debug, Serialize)]
pub(crate) struct NewSessionBody<'a> {
    pub capabilities: &'a Capabilities,
}

#[derive(Debug, Serialize)]
pub(crate) struct UrlBody<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendKeysBody<'a> {
    pub text: &'a str,
}

/// Every successful WebDriver response wraps its payload in `{"value": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Wrapped<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionData {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Error payload shape: `{"value": {"error": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub value: ErrorValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_serializes_to_wire_form() {
        let css = serde_json::to_value(Locator::css("#RsltsGrid")).unwrap();
        assert_eq!(
            css,
            serde_json::json!({"using": "css selector", "value": "#RsltsGrid"})
        );

        let xpath = serde_json::to_value(Locator::xpath("//button[text()='Reset']")).unwrap();
        assert_eq!(
            xpath,
            serde_json::json!({"using": "xpath", "value": "//button[text()='Reset']"})
        );
    }

    #[test]
    fn element_deserializes_w3c_identifier() {
        let raw = format!(r#"{{"{ELEMENT_KEY}": "abc-123"}}"#);
        let el: Element = serde_json::from_str(&raw).unwrap();
        assert_eq!(el.id, "abc-123");
    }

    #[test]
    fn locator_round_trips_through_json() {
        let original = Locator::css("table.results tr");
        let json = serde_json::to_string(&original).unwrap();
        let back: Locator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
