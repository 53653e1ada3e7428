//! Integration tests for the batch driver, using a scripted provider in
//! place of the WebDriver-backed one. No browser, no network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recordsweep_common::{
    Outcome, PageSnapshot, ResultRow, RowSchema, SearchTarget, SweepError,
};
use recordsweep_engine::{Engine, EngineLimits, SiteAdapter};
use recordsweep_runner::batch::Sweeper;
use recordsweep_runner::portal::AdapterProvider;

// ---------------------------------------------------------------------------
// Tracked adapter: fixed pages, records whether teardown ran
// ---------------------------------------------------------------------------

struct TrackedAdapter {
    schema: RowSchema,
    pages: Vec<PageSnapshot>,
    current: usize,
    fail_submit: bool,
    torn_down: Arc<AtomicBool>,
}

#[async_trait]
impl SiteAdapter for TrackedAdapter {
    fn name(&self) -> &str {
        "tracked"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, _target: &SearchTarget) -> Result<(), SweepError> {
        if self.fail_submit {
            return Err(SweepError::Navigation(
                "portal refused the search form".to_string(),
            ));
        }
        Ok(())
    }

    async fn has_results(&self) -> Result<bool, SweepError> {
        Ok(!self.pages.is_empty())
    }

    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        Ok(self.pages[self.current].clone())
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn teardown(&mut self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scripted provider: hands out pre-built adapters in order
// ---------------------------------------------------------------------------

type ProvisionOutcome = Result<Box<dyn SiteAdapter>, SweepError>;

struct ScriptedProvider {
    queue: Mutex<VecDeque<ProvisionOutcome>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<ProvisionOutcome>) -> Self {
        Self {
            queue: Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl AdapterProvider for ScriptedProvider {
    async fn provision(&self) -> Result<Box<dyn SiteAdapter>, SweepError> {
        self.queue
            .lock()
            .expect("provider lock")
            .pop_front()
            .unwrap_or_else(|| Err(SweepError::Session("provider queue empty".to_string())))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn schema() -> RowSchema {
    RowSchema::new(["Owner Name", "Address", "Parcel ID"])
}

fn page(schema: &RowSchema, start: u32, count: u32) -> PageSnapshot {
    let rows = (start..start + count)
        .map(|i| {
            ResultRow::from_cells(
                schema,
                vec![
                    Some(format!("OWNER {i}")),
                    Some(format!("{i} Main St")),
                    Some(format!("{i:04}")),
                ],
            )
        })
        .collect();
    PageSnapshot::new(rows)
}

fn tracked(pages: Vec<PageSnapshot>, fail_submit: bool) -> (ProvisionOutcome, Arc<AtomicBool>) {
    let torn_down = Arc::new(AtomicBool::new(false));
    let adapter = TrackedAdapter {
        schema: schema(),
        pages,
        current: 0,
        fail_submit,
        torn_down: torn_down.clone(),
    };
    (Ok(Box::new(adapter)), torn_down)
}

fn targets(names: &[&str]) -> Vec<SearchTarget> {
    names
        .iter()
        .map(|name| SearchTarget::parse(name).expect("valid name"))
        .collect()
}

fn sweeper(outcomes: Vec<ProvisionOutcome>) -> Sweeper {
    Sweeper::new(
        Engine::new(EngineLimits::default()),
        Box::new(ScriptedProvider::new(outcomes)),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn provision_failure_records_the_target_and_the_batch_continues() {
    let s = schema();
    let (good, _) = tracked(vec![page(&s, 0, 5)], false);
    let sweeper = sweeper(vec![
        Err(SweepError::Session("driver refused the session".to_string())),
        good,
    ]);

    let (results, stats) = sweeper.run(&targets(&["John Smith", "Jane Doe"])).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].target.as_str(), "John Smith");
    assert_eq!(results[0].outcome, Outcome::NavigationError);
    assert!(results[0].rows.is_empty());
    assert_eq!(results[1].target.as_str(), "Jane Doe");
    assert_eq!(results[1].outcome, Outcome::Success);
    assert_eq!(results[1].rows.len(), 5);
    assert_eq!(stats.targets, 2);
    assert_eq!(stats.navigation_errors, 1);
    assert_eq!(stats.success, 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_runs_for_every_provisioned_adapter() {
    let s = schema();
    let (good, good_flag) = tracked(vec![page(&s, 0, 5)], false);
    let (bad, bad_flag) = tracked(vec![], true);
    let sweeper = sweeper(vec![good, bad]);

    let (results, _) = sweeper.run(&targets(&["John Smith", "Jane Doe"])).await;

    assert_eq!(results[0].outcome, Outcome::Success);
    assert_eq!(results[1].outcome, Outcome::NavigationError);
    assert!(good_flag.load(Ordering::SeqCst));
    assert!(bad_flag.load(Ordering::SeqCst), "failed lookups must still release their session");
}

#[tokio::test(start_paused = true)]
async fn stats_tally_rows_pages_and_outcomes() {
    let s = schema();
    let (two_pages, _) = tracked(vec![page(&s, 0, 10), page(&s, 10, 10)], false);
    let (empty, _) = tracked(vec![], false);
    let sweeper = sweeper(vec![two_pages, empty]);

    let (results, stats) = sweeper.run(&targets(&["John Smith", "Jane Doe"])).await;

    assert_eq!(results[0].pages_visited, 2);
    assert_eq!(results[1].outcome, Outcome::NoResults);
    assert_eq!(stats.rows, 20);
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.no_results, 1);

    let summary = stats.to_string();
    assert!(summary.contains("=== Sweep Complete ==="));
    assert!(summary.contains("Rows collected:    20"));
}

#[tokio::test(start_paused = true)]
async fn consecutive_targets_are_separated_by_a_pause() {
    let s = schema();
    let (a, _) = tracked(vec![page(&s, 0, 1)], false);
    let (b, _) = tracked(vec![page(&s, 0, 1)], false);
    let (c, _) = tracked(vec![page(&s, 0, 1)], false);
    let sweeper = sweeper(vec![a, b, c]);

    let started = tokio::time::Instant::now();
    let (results, _) = sweeper
        .run(&targets(&["John Smith", "Jane Doe", "Sam Jones"]))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 3);
    // Two gaps, each 1-3s of simulated time.
    assert!(elapsed >= Duration::from_secs(2), "elapsed: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(6), "elapsed: {elapsed:?}");
}
