//! The collection loop.

use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use recordsweep_common::{AggregatedResult, Outcome, PageSnapshot, SearchTarget};

use crate::traits::SiteAdapter;

/// Guardrails for one target's collection.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    /// Hard cap on extracted pages, independent of the duplicate-snapshot
    /// check. Stops runaway pagination even when every page looks new.
    pub max_pages: u32,
    /// Wall-clock budget for the whole target: submission, the readiness
    /// wait, and every pagination step all draw from it.
    pub target_budget: Duration,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_pages: 50,
            target_budget: Duration::from_secs(300),
        }
    }
}

/// Drives a [`SiteAdapter`] through one target's full search:
/// submit → readiness → extract/advance until a stop condition.
///
/// `collect` never fails. Every failure mode maps to an [`Outcome`] so one
/// bad target cannot take the batch down, and rows collected before a
/// mid-pagination failure are kept rather than discarded.
pub struct Engine {
    limits: EngineLimits,
}

impl Engine {
    pub fn new(limits: EngineLimits) -> Self {
        Self { limits }
    }

    pub async fn collect(
        &self,
        adapter: &mut dyn SiteAdapter,
        target: &SearchTarget,
    ) -> AggregatedResult {
        let deadline = Instant::now() + self.limits.target_budget;
        let site = adapter.name().to_string();

        info!(site = site.as_str(), target = %target, "Starting lookup");

        // 1. Submit the search.
        match timeout(remaining(deadline), adapter.submit_search(target)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(site = site.as_str(), target = %target, error = %err, "Search submission failed");
                return AggregatedResult::empty(target.clone(), Outcome::NavigationError);
            }
            Err(_) => {
                warn!(site = site.as_str(), target = %target, "Budget elapsed before the search was submitted");
                return AggregatedResult::empty(target.clone(), Outcome::Timeout);
            }
        }

        // 2. Wait for the page to commit to results or no-results.
        match timeout(remaining(deadline), adapter.has_results()).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                info!(site = site.as_str(), target = %target, "No results");
                return AggregatedResult::empty(target.clone(), Outcome::NoResults);
            }
            Ok(Err(err)) => {
                warn!(site = site.as_str(), target = %target, error = %err, "Readiness check failed");
                return AggregatedResult::empty(target.clone(), Outcome::NavigationError);
            }
            Err(_) => {
                warn!(site = site.as_str(), target = %target, "Budget elapsed waiting for results");
                return AggregatedResult::empty(target.clone(), Outcome::Timeout);
            }
        }

        // 3. Extract and advance until a stop condition fires.
        let mut rows = Vec::new();
        let mut pages: u32 = 0;
        let mut previous: Option<PageSnapshot> = None;
        let mut outcome = Outcome::Success;

        loop {
            if pages >= self.limits.max_pages {
                warn!(
                    site = site.as_str(),
                    target = %target,
                    pages,
                    "Page cap reached with pager still active; stopping"
                );
                outcome = Outcome::PaginationLimitExceeded;
                break;
            }

            let snapshot = match timeout(remaining(deadline), adapter.extract_page()).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(err)) => {
                    if rows.is_empty() {
                        warn!(site = site.as_str(), target = %target, error = %err, "First extraction failed");
                        return AggregatedResult::empty(target.clone(), Outcome::NavigationError);
                    }
                    // Partial data plus a warning beats discarding collected pages.
                    warn!(
                        site = site.as_str(),
                        target = %target,
                        error = %err,
                        pages,
                        "Extraction failed mid-pagination; keeping collected rows"
                    );
                    break;
                }
                Err(_) => {
                    warn!(site = site.as_str(), target = %target, pages, "Budget elapsed during extraction");
                    outcome = Outcome::Timeout;
                    break;
                }
            };

            // A snapshot identical to the previous page means the "next"
            // control reported success without changing anything.
            if previous.as_ref() == Some(&snapshot) {
                debug!(site = site.as_str(), target = %target, pages, "Page unchanged after advance; pagination exhausted");
                break;
            }

            pages += 1;
            rows.extend(snapshot.rows().iter().cloned());
            previous = Some(snapshot);

            match timeout(remaining(deadline), adapter.advance_page()).await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => break,
                Ok(Err(err)) => {
                    warn!(
                        site = site.as_str(),
                        target = %target,
                        error = %err,
                        pages,
                        "Pager failed mid-pagination; keeping collected rows"
                    );
                    break;
                }
                Err(_) => {
                    warn!(site = site.as_str(), target = %target, pages, "Budget elapsed advancing pages");
                    outcome = Outcome::Timeout;
                    break;
                }
            }
        }

        if outcome == Outcome::Success && rows.is_empty() {
            // Results signal fired but nothing parsed; a selector drift tell.
            warn!(site = site.as_str(), target = %target, "Results were reported present but no rows extracted");
        }

        info!(
            site = site.as_str(),
            target = %target,
            pages,
            rows = rows.len(),
            outcome = %outcome,
            "Lookup complete"
        );

        AggregatedResult {
            target: target.clone(),
            outcome,
            rows,
            pages_visited: pages,
            retrieved_at: Utc::now(),
        }
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
