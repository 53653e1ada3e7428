//! Site profiles: everything portal-specific expressed as data.
//!
//! A profile names the search surface, the precondition steps that stand
//! between page load and the search box, the selectors that locate results
//! and the pager, and the column layout. Column differences between portals
//! (dropped or renamed columns) live here, never in the engine. Custom
//! portals load from a JSON file; a few known county portals ship built in.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use recordsweep_common::{RowSchema, SweepError};
use webdriver_client::Locator;

/// Element address in profile form. Serializes as `{"css": "..."}` or
/// `{"xpath": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileLocator {
    #[serde(rename = "css")]
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl ProfileLocator {
    pub fn css(selector: &str) -> Self {
        ProfileLocator::Css(selector.to_string())
    }

    pub fn xpath(expression: &str) -> Self {
        ProfileLocator::XPath(expression.to_string())
    }

    pub fn to_locator(&self) -> Locator {
        match self {
            ProfileLocator::Css(s) => Locator::css(s),
            ProfileLocator::XPath(x) => Locator::xpath(x),
        }
    }
}

/// What to do with a precondition element once it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Click it (disclaimer accept buttons, reset buttons).
    Click,
    /// Send ENTER to it (forms that submit on the keypress).
    PressEnter,
    /// Open a dropdown and confirm its first option (search-mode presets).
    ArrowDownEnter,
}

/// One step between page load and the search box. Optional steps that fail
/// are logged and skipped; required steps abort the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionStep {
    pub locator: ProfileLocator,
    pub action: StepAction,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Stable identifier used in logs and stats.
    pub id: String,
    /// Entry point for the search surface.
    pub search_url: String,
    #[serde(default)]
    pub preconditions: Vec<PreconditionStep>,
    /// The name input. The search is triggered by typing the target plus
    /// ENTER into it.
    pub search_input: ProfileLocator,
    /// Signals "results rendered".
    pub results_container: ProfileLocator,
    /// Signals "no matches". Portals without an explicit marker leave this
    /// unset and rely on the results wait budget expiring.
    #[serde(default)]
    pub no_results: Option<ProfileLocator>,
    /// CSS selector for result rows in the page source.
    pub row_selector: String,
    /// CSS selector for cells within one row.
    pub cell_selector: String,
    /// Zero-based raw cell indices to discard before normalization (cart
    /// checkboxes, site-internal columns).
    #[serde(default)]
    pub drop_cells: Vec<usize>,
    /// Column names, one per kept cell.
    pub columns: Vec<String>,
    /// The pager control. Absent/disabled means the last page.
    pub next_control: ProfileLocator,
}

impl SiteProfile {
    pub fn schema(&self) -> RowSchema {
        RowSchema::new(self.columns.iter().cloned())
    }

    /// Reject profiles that could not possibly drive a search. Selector and
    /// URL problems surface here, at startup, not per target.
    pub fn validate(&self) -> Result<(), SweepError> {
        url::Url::parse(&self.search_url).map_err(|e| {
            SweepError::Config(format!("invalid search_url {:?}: {e}", self.search_url))
        })?;
        if self.columns.is_empty() {
            return Err(SweepError::Config(format!(
                "profile {:?} declares no columns",
                self.id
            )));
        }
        scraper::Selector::parse(&self.row_selector).map_err(|e| {
            SweepError::Config(format!(
                "invalid row_selector {:?}: {e}",
                self.row_selector
            ))
        })?;
        scraper::Selector::parse(&self.cell_selector).map_err(|e| {
            SweepError::Config(format!(
                "invalid cell_selector {:?}: {e}",
                self.cell_selector
            ))
        })?;
        Ok(())
    }
}

/// Load a custom profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<SiteProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file {}", path.display()))?;
    let profile: SiteProfile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse profile file {}", path.display()))?;
    Ok(profile)
}

/// Look up a built-in profile by id.
pub fn builtin_profile(id: &str) -> Option<SiteProfile> {
    match id {
        "broward-recorder" => Some(broward_recorder_profile()),
        "collier-recorder" => Some(collier_recorder_profile()),
        _ => None,
    }
}

pub fn builtin_ids() -> Vec<&'static str> {
    vec!["broward-recorder", "collier-recorder"]
}

// ---------------------------------------------------------------------------
// Broward County official records (AcclaimWeb)
// ---------------------------------------------------------------------------

fn broward_recorder_profile() -> SiteProfile {
    SiteProfile {
        id: "broward-recorder".to_string(),
        search_url:
            "https://officialrecords.broward.org/AcclaimWeb/search/Disclaimer?st=/AcclaimWeb/search/SearchTypeName"
                .to_string(),
        // The disclaimer interstitial must be accepted before the search
        // form exists.
        preconditions: vec![PreconditionStep {
            locator: ProfileLocator::css(".t-button"),
            action: StepAction::Click,
            required: true,
        }],
        search_input: ProfileLocator::css("#SearchOnName"),
        results_container: ProfileLocator::xpath("//*[@id='RsltsGrid']//table"),
        // AcclaimWeb renders nothing when a name has no records; the wait
        // budget expiring is the no-results signal.
        no_results: None,
        row_selector: "#RsltsGrid table tbody tr".to_string(),
        cell_selector: "td".to_string(),
        // Cell 0 is the cart checkbox, cell 5 the book type; neither carries
        // record data.
        drop_cells: vec![0, 5],
        columns: vec![
            "Matched Name".to_string(),
            "Party Type".to_string(),
            "Related Name".to_string(),
            "Record Date".to_string(),
            "Book/Page".to_string(),
            "Instrument #".to_string(),
            "Comments2".to_string(),
            "Case #".to_string(),
            "Consideration".to_string(),
            "Legal".to_string(),
            "Doc Type".to_string(),
        ],
        next_control: ProfileLocator::xpath("//*[@id='RsltsGrid']/div[2]/div[2]/a[3]/span"),
    }
}

// ---------------------------------------------------------------------------
// Collier County official records (cor.collierclerk.com)
// ---------------------------------------------------------------------------

fn collier_recorder_profile() -> SiteProfile {
    SiteProfile {
        id: "collier-recorder".to_string(),
        search_url: "https://cor.collierclerk.com/coraccess/search/document".to_string(),
        preconditions: vec![
            // Clear any state left by a previous search.
            PreconditionStep {
                locator: ProfileLocator::xpath("//button[text()='Reset']"),
                action: StepAction::Click,
                required: true,
            },
            // Document-preset dropdown. Search still works without it, so
            // a redesign of this surface should not break the target.
            PreconditionStep {
                locator: ProfileLocator::xpath(
                    "//span[contains(@class,'e-ddl') and contains(@class,'e-input-group')]",
                ),
                action: StepAction::ArrowDownEnter,
                required: false,
            },
        ],
        search_input: ProfileLocator::xpath(
            "//input[@id='BusinessCORPubBlazor.ViewModels.PartyGroup0']",
        ),
        results_container: ProfileLocator::css(".e-gridcontent"),
        no_results: Some(ProfileLocator::css(".e-emptyrow")),
        row_selector: ".e-gridcontent tr.e-row".to_string(),
        cell_selector: "td.e-rowcell".to_string(),
        drop_cells: vec![],
        columns: vec![
            "Party Name".to_string(),
            "Cross Party Name".to_string(),
            "Doc Type".to_string(),
            "Record Date".to_string(),
            "Book/Page".to_string(),
            "Instrument #".to_string(),
            "Legal".to_string(),
        ],
        next_control: ProfileLocator::css(".e-pager .e-next"),
    }
}
