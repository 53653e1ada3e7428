use std::env;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // WebDriver endpoint (chromedriver / Selenium standalone)
    pub webdriver_url: String,

    // Result-render polling
    pub poll_interval: Duration,
    pub results_wait: Duration,

    // Per-target guardrails
    pub max_pages: u32,
    pub target_budget: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            webdriver_url: required_env("WEBDRIVER_URL"),
            poll_interval: Duration::from_millis(
                env::var("POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .expect("POLL_INTERVAL_MS must be a number"),
            ),
            results_wait: Duration::from_secs(
                env::var("RESULTS_WAIT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("RESULTS_WAIT_SECS must be a number"),
            ),
            max_pages: env::var("MAX_PAGES")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("MAX_PAGES must be a number"),
            target_budget: Duration::from_secs(
                env::var("TARGET_BUDGET_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("TARGET_BUDGET_SECS must be a number"),
            ),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
