//! The portal adapter: `SiteAdapter` over a WebDriver session and a profile.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use recordsweep_common::{Config, PageSnapshot, RowSchema, SearchTarget, SweepError};
use recordsweep_engine::{poll_until, SiteAdapter};
use webdriver_client::{keys, Capabilities, Element, Locator, Session, WebDriverClient, WebDriverError};

use crate::extract;
use crate::profiles::{PreconditionStep, SiteProfile, StepAction};

/// How long each precondition element (and the search input) may take to
/// appear before the target is abandoned.
const PRECONDITION_WAIT: Duration = Duration::from_secs(10);

/// Dropdown popups animate; give them a beat between opening and confirming.
const DROPDOWN_SETTLE: Duration = Duration::from_millis(300);

/// Max attempts when creating a browser session for a target.
const SESSION_MAX_ATTEMPTS: u32 = 3;
/// Base backoff for session retries. Actual delay is base * 3^attempt + jitter.
const SESSION_RETRY_BASE: Duration = Duration::from_secs(3);

/// Polling cadence for render waits.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub results_wait: Duration,
}

impl WaitPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            results_wait: config.results_wait,
        }
    }
}

pub struct PortalAdapter {
    session: Session,
    profile: SiteProfile,
    schema: RowSchema,
    waits: WaitPolicy,
    /// The page most recently handed to the engine. Extraction after an
    /// advance waits until the rendered rows differ from this.
    last_page: Option<PageSnapshot>,
}

impl PortalAdapter {
    pub fn new(session: Session, profile: SiteProfile, waits: WaitPolicy) -> Self {
        let schema = profile.schema();
        Self {
            session,
            profile,
            schema,
            waits,
            last_page: None,
        }
    }

    async fn parse_current(&self) -> Result<PageSnapshot, SweepError> {
        let html = self.session.page_source().await.map_err(map_driver_err)?;
        extract::rows_from_html(&html, &self.profile, &self.schema)
    }

    /// Poll for an element until `budget` runs out. `Ok(None)` means it
    /// never appeared; transport failures surface immediately.
    async fn wait_for(
        &self,
        locator: &Locator,
        budget: Duration,
    ) -> Result<Option<Element>, SweepError> {
        let session = &self.session;
        let found = poll_until(self.waits.poll_interval, budget, || async move {
            match session.find_element(locator).await {
                Ok(element) => Some(Ok(element)),
                Err(err) if err.is_element_missing() => None,
                Err(err) => Some(Err(err)),
            }
        })
        .await;

        match found {
            Some(Ok(element)) => Ok(Some(element)),
            Some(Err(err)) => Err(map_driver_err(err)),
            None => Ok(None),
        }
    }

    async fn run_precondition(&self, step: &PreconditionStep) -> Result<(), SweepError> {
        let locator = step.locator.to_locator();
        let element = match self.wait_for(&locator, PRECONDITION_WAIT).await? {
            Some(element) => element,
            None if step.required => {
                return Err(SweepError::Navigation(format!(
                    "required precondition element never appeared: {locator}"
                )));
            }
            None => {
                warn!(site = self.profile.id.as_str(), %locator, "Optional precondition element missing, skipping");
                return Ok(());
            }
        };

        let applied = self.apply_action(&element, step.action).await;
        match applied {
            Ok(()) => Ok(()),
            Err(err) if step.required => Err(err),
            Err(err) => {
                warn!(site = self.profile.id.as_str(), %locator, error = %err, "Optional precondition failed, skipping");
                Ok(())
            }
        }
    }

    async fn apply_action(&self, element: &Element, action: StepAction) -> Result<(), SweepError> {
        match action {
            StepAction::Click => self.session.click(element).await.map_err(map_driver_err),
            StepAction::PressEnter => self
                .session
                .send_keys(element, &keys::ENTER.to_string())
                .await
                .map_err(map_driver_err),
            StepAction::ArrowDownEnter => {
                self.session.click(element).await.map_err(map_driver_err)?;
                tokio::time::sleep(DROPDOWN_SETTLE).await;
                self.session
                    .send_keys(element, &keys::ARROW_DOWN.to_string())
                    .await
                    .map_err(map_driver_err)?;
                tokio::time::sleep(DROPDOWN_SETTLE).await;
                self.session
                    .send_keys(element, &keys::ENTER.to_string())
                    .await
                    .map_err(map_driver_err)
            }
        }
    }
}

#[async_trait]
impl SiteAdapter for PortalAdapter {
    fn name(&self) -> &str {
        &self.profile.id
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, target: &SearchTarget) -> Result<(), SweepError> {
        self.last_page = None;
        self.session
            .goto(&self.profile.search_url)
            .await
            .map_err(map_driver_err)?;

        for step in &self.profile.preconditions {
            self.run_precondition(step).await?;
        }

        let input_locator = self.profile.search_input.to_locator();
        let input = self
            .wait_for(&input_locator, PRECONDITION_WAIT)
            .await?
            .ok_or_else(|| {
                SweepError::Navigation(format!("search input never appeared: {input_locator}"))
            })?;

        self.session.click(&input).await.map_err(map_driver_err)?;
        self.session.clear(&input).await.map_err(map_driver_err)?;
        self.session
            .send_keys(&input, &format!("{}{}", target.as_str(), keys::ENTER))
            .await
            .map_err(map_driver_err)?;

        debug!(site = self.profile.id.as_str(), target = %target, "Search submitted");
        Ok(())
    }

    /// Probe the no-results marker and the results container each tick;
    /// whichever renders first decides. Budget expiry reads as no results.
    async fn has_results(&self) -> Result<bool, SweepError> {
        let session = &self.session;
        let no_results_loc = self.profile.no_results.as_ref().map(|l| l.to_locator());
        let results_loc = self.profile.results_container.to_locator();
        let no_results = no_results_loc.as_ref();
        let results = &results_loc;

        let committed = poll_until(
            self.waits.poll_interval,
            self.waits.results_wait,
            || async move {
                if let Some(locator) = no_results {
                    match session.find_element(locator).await {
                        Ok(_) => return Some(Ok(false)),
                        Err(err) if err.is_element_missing() => {}
                        Err(err) => return Some(Err(err)),
                    }
                }
                match session.find_element(results).await {
                    Ok(_) => Some(Ok(true)),
                    Err(err) if err.is_element_missing() => None,
                    Err(err) => Some(Err(err)),
                }
            },
        )
        .await;

        match committed {
            Some(Ok(present)) => Ok(present),
            Some(Err(err)) => Err(map_driver_err(err)),
            None => {
                debug!(site = self.profile.id.as_str(), "Results wait budget expired; treating as no results");
                Ok(false)
            }
        }
    }

    /// The first page parses straight away — `has_results` already saw the
    /// grid render. Every later page follows a pager click, which resolves
    /// before the new grid paints, so parsing straight away would hand back
    /// the rows just collected and read as an exhausted pager. Poll until
    /// the parsed rows change instead; an unchanged grid at the deadline is
    /// returned as-is so a pager that genuinely did nothing still terminates
    /// on the duplicate.
    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        let snapshot = match self.last_page.take() {
            None => self.parse_current().await?,
            Some(previous) => {
                let session = &self.session;
                next_snapshot(
                    self.waits,
                    &self.profile,
                    &self.schema,
                    &previous,
                    || async move { session.page_source().await },
                )
                .await?
            }
        };
        self.last_page = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        let locator = self.profile.next_control.to_locator();
        let control = match self.session.find_element(&locator).await {
            Ok(element) => element,
            Err(err) if err.is_element_missing() => return Ok(false),
            Err(err) => return Err(map_driver_err(err)),
        };

        match self.session.is_enabled(&control).await {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(err) if err.is_element_missing() => return Ok(false),
            Err(err) => return Err(map_driver_err(err)),
        }

        match self.session.click(&control).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_element_missing() => Ok(false),
            // A present but unclickable pager is a terminal pager state, not
            // a failure.
            Err(WebDriverError::Api { message, .. })
                if message.contains("not interactable") || message.contains("intercepted") =>
            {
                Ok(false)
            }
            Err(err) => Err(map_driver_err(err)),
        }
    }

    async fn teardown(&mut self) {
        if let Err(err) = self.session.delete().await {
            warn!(site = self.profile.id.as_str(), error = %err, "Failed to delete browser session");
        }
    }
}

/// Poll the fetched page source until it parses into rows different from
/// `previous`, within the results-wait budget. Driver and parse failures
/// surface immediately; budget expiry re-parses once and hands the unchanged
/// page back for the caller's duplicate handling to finish on.
async fn next_snapshot<F, Fut>(
    waits: WaitPolicy,
    profile: &SiteProfile,
    schema: &RowSchema,
    previous: &PageSnapshot,
    fetch: F,
) -> Result<PageSnapshot, SweepError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<String, WebDriverError>>,
{
    let fetch = &fetch;
    let changed = poll_until(waits.poll_interval, waits.results_wait, || async move {
        match fetch().await {
            Ok(html) => match extract::rows_from_html(&html, profile, schema) {
                Ok(snapshot) if snapshot != *previous => Some(Ok(snapshot)),
                // Still showing the rows we already collected.
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            },
            Err(err) => Some(Err(map_driver_err(err))),
        }
    })
    .await;

    match changed {
        Some(result) => result,
        None => {
            debug!(
                site = profile.id.as_str(),
                "Rows unchanged within the render wait; handing back the repeat page"
            );
            let html = fetch().await.map_err(map_driver_err)?;
            extract::rows_from_html(&html, profile, schema)
        }
    }
}

/// Transport problems are session failures; everything the driver itself
/// rejects is a navigation failure on the page we were driving.
fn map_driver_err(err: WebDriverError) -> SweepError {
    match err {
        WebDriverError::Network(msg) => SweepError::Session(msg),
        other => SweepError::Navigation(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Session provisioning
// ---------------------------------------------------------------------------

/// Builds the per-target unit: a fresh browser session wrapped in a
/// [`PortalAdapter`]. The batch driver stays ignorant of WebDriver.
#[async_trait]
pub trait AdapterProvider: Send + Sync {
    async fn provision(&self) -> Result<Box<dyn SiteAdapter>, SweepError>;
}

pub struct PortalProvider {
    client: WebDriverClient,
    profile: SiteProfile,
    waits: WaitPolicy,
}

impl PortalProvider {
    pub fn new(client: WebDriverClient, profile: SiteProfile, waits: WaitPolicy) -> Self {
        Self {
            client,
            profile,
            waits,
        }
    }

    /// Create a session, retrying transient driver failures with exponential
    /// backoff (3s, 9s) plus random jitter (0-1s).
    async fn new_session_with_retry(&self) -> Result<Session, WebDriverError> {
        let capabilities = Capabilities::headless_chrome();

        for attempt in 0..SESSION_MAX_ATTEMPTS {
            match self.client.new_session(&capabilities).await {
                Ok(session) => return Ok(session),
                Err(err) => {
                    if attempt + 1 < SESSION_MAX_ATTEMPTS {
                        let backoff = SESSION_RETRY_BASE * 3u32.pow(attempt);
                        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
                        warn!(
                            attempt = attempt + 1,
                            backoff_secs = backoff.as_secs(),
                            error = %err,
                            "Session creation failed, retrying after backoff"
                        );
                        tokio::time::sleep(backoff + jitter).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(WebDriverError::Network(
            "session retry attempts exhausted".to_string(),
        ))
    }
}

#[async_trait]
impl AdapterProvider for PortalProvider {
    async fn provision(&self) -> Result<Box<dyn SiteAdapter>, SweepError> {
        let session = self
            .new_session_with_retry()
            .await
            .map_err(|err| SweepError::Session(err.to_string()))?;
        Ok(Box::new(PortalAdapter::new(
            session,
            self.profile.clone(),
            self.waits,
        )))
    }
}
