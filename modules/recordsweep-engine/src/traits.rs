//! The site adapter contract.

use async_trait::async_trait;
use recordsweep_common::{PageSnapshot, RowSchema, SearchTarget, SweepError};

/// One target portal, driven through a live browser session.
///
/// The engine owns sequencing and guardrails; the adapter owns everything
/// site-specific: how to reach the search surface, what "results are ready"
/// looks like, how rows are laid out, and which control advances the page.
#[async_trait]
pub trait SiteAdapter: Send {
    /// Stable identifier for logs and stats.
    fn name(&self) -> &str;

    /// Fixed column layout for every row this adapter extracts.
    fn schema(&self) -> &RowSchema;

    /// Reach the search surface, complete any precondition steps (disclaimer,
    /// search-mode selection, stale-state reset), enter the target and
    /// trigger the search. Each precondition wait is bounded; exceeding one
    /// is a `Navigation` error, and nothing has been collected yet when it
    /// happens.
    async fn submit_search(&mut self, target: &SearchTarget) -> Result<(), SweepError>;

    /// Wait for the page to commit to "results" or "no results", whichever
    /// renders first. A page that shows neither within the wait budget reads
    /// as `false` — a hung render must never look like data.
    async fn has_results(&self) -> Result<bool, SweepError>;

    /// Read every currently rendered row into the schema. Owns its own
    /// readiness wait: a pager click resolves before the new page paints, so
    /// after `advance_page` this must not hand back the old rows until a
    /// bounded wait for the page to change has expired. Must not mutate page
    /// state. Unreadable fields degrade to the null marker; the row count
    /// always reflects what is actually rendered.
    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError>;

    /// Advance to the next result page. `Ok(false)` when the pager control
    /// is absent, disabled, or otherwise done — exhaustion is an expected
    /// outcome, not an error.
    async fn advance_page(&mut self) -> Result<bool, SweepError>;

    /// Release whatever the adapter holds (typically a browser session).
    /// The batch driver calls this for every target, whatever the outcome.
    async fn teardown(&mut self) {}
}
