//! Integration tests for the collection engine, driven by scripted in-memory
//! adapters. No browser, no network.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recordsweep_common::{
    Outcome, PageSnapshot, ResultRow, RowSchema, SearchTarget, SweepError,
};
use recordsweep_engine::{Engine, EngineLimits, SiteAdapter};

// ---------------------------------------------------------------------------
// Scripted adapter: plays back a fixed page sequence, counts every call
// ---------------------------------------------------------------------------

struct ScriptedAdapter {
    schema: RowSchema,
    pages: Vec<PageSnapshot>,
    has_results: bool,
    /// Pager keeps reporting success after the last page (the stuck-pager
    /// case: advancing "works" but the page never changes).
    pager_sticks: bool,
    /// Fail every extraction after this many successful ones.
    fail_extract_after: Option<u32>,
    current: usize,
    submit_calls: AtomicU32,
    has_results_calls: AtomicU32,
    extract_calls: AtomicU32,
    advance_calls: AtomicU32,
}

impl ScriptedAdapter {
    fn new(pages: Vec<PageSnapshot>) -> Self {
        Self {
            schema: schema(),
            pages,
            has_results: true,
            pager_sticks: false,
            fail_extract_after: None,
            current: 0,
            submit_calls: AtomicU32::new(0),
            has_results_calls: AtomicU32::new(0),
            extract_calls: AtomicU32::new(0),
            advance_calls: AtomicU32::new(0),
        }
    }

    fn no_results() -> Self {
        let mut adapter = Self::new(vec![]);
        adapter.has_results = false;
        adapter
    }
}

#[async_trait]
impl SiteAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, _target: &SearchTarget) -> Result<(), SweepError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn has_results(&self) -> Result<bool, SweepError> {
        self.has_results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.has_results)
    }

    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        let done = self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(after) = self.fail_extract_after {
            if done >= after {
                return Err(SweepError::Extraction(
                    "scripted extraction failure".to_string(),
                ));
            }
        }
        Ok(self.pages[self.current].clone())
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        self.advance_calls.fetch_add(1, Ordering::SeqCst);
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            Ok(true)
        } else {
            Ok(self.pager_sticks)
        }
    }
}

// ---------------------------------------------------------------------------
// Failing / hanging adapters
// ---------------------------------------------------------------------------

struct FailingSubmitAdapter {
    schema: RowSchema,
    has_results_calls: AtomicU32,
}

#[async_trait]
impl SiteAdapter for FailingSubmitAdapter {
    fn name(&self) -> &str {
        "failing-submit"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, _target: &SearchTarget) -> Result<(), SweepError> {
        Err(SweepError::Navigation(
            "disclaimer button never became clickable".to_string(),
        ))
    }

    async fn has_results(&self) -> Result<bool, SweepError> {
        self.has_results_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        Ok(PageSnapshot::default())
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        Ok(false)
    }
}

/// Never returns from submission — a portal that hangs before rendering
/// anything.
struct HungSubmitAdapter {
    schema: RowSchema,
}

#[async_trait]
impl SiteAdapter for HungSubmitAdapter {
    fn name(&self) -> &str {
        "hung-submit"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, _target: &SearchTarget) -> Result<(), SweepError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    async fn has_results(&self) -> Result<bool, SweepError> {
        Ok(true)
    }

    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        Ok(PageSnapshot::default())
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        Ok(false)
    }
}

/// Serves one good page, then hangs on the pager click.
struct HungPagerAdapter {
    schema: RowSchema,
    page: PageSnapshot,
}

#[async_trait]
impl SiteAdapter for HungPagerAdapter {
    fn name(&self) -> &str {
        "hung-pager"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    async fn submit_search(&mut self, _target: &SearchTarget) -> Result<(), SweepError> {
        Ok(())
    }

    async fn has_results(&self) -> Result<bool, SweepError> {
        Ok(true)
    }

    async fn extract_page(&mut self) -> Result<PageSnapshot, SweepError> {
        Ok(self.page.clone())
    }

    async fn advance_page(&mut self) -> Result<bool, SweepError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Test helpers
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
                    Some(format!("Owner {i}")),
                    Some(format!("{i} Main St")),
                    Some(format!("P{i:05}")),
                ],
            )
        })
        .collect();
    PageSnapshot::new(rows)
}

fn target() -> SearchTarget {
    SearchTarget::parse("John Smith").unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn no_results_short_circuits_without_extraction() {
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::no_results();

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::NoResults);
    assert!(result.rows.is_empty());
    assert_eq!(result.pages_visited, 0);
    assert_eq!(adapter.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.extract_calls.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.advance_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clean_pager_exhaustion_collects_every_page() {
    let s = schema();
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::new(vec![page(&s, 0, 10), page(&s, 10, 10)]);

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.rows.len(), 20);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(adapter.extract_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stuck_pager_stops_on_duplicate_snapshot() {
    let s = schema();
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::new(vec![page(&s, 0, 10), page(&s, 10, 10)]);
    adapter.pager_sticks = true;

    let result = engine.collect(&mut adapter, &target()).await;

    // Two real pages, then the repeat is detected; no fourth extraction.
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.rows.len(), 20);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(adapter.extract_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn page_cap_stops_runaway_pagination() {
    let s = schema();
    let engine = Engine::new(EngineLimits {
        max_pages: 3,
        ..EngineLimits::default()
    });
    let pages: Vec<PageSnapshot> = (0..10).map(|p| page(&s, p * 10, 10)).collect();
    let mut adapter = ScriptedAdapter::new(pages);
    adapter.pager_sticks = true;

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::PaginationLimitExceeded);
    assert_eq!(result.rows.len(), 30);
    assert_eq!(result.pages_visited, 3);
    assert_eq!(adapter.extract_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn repeated_runs_over_a_static_portal_are_row_identical() {
    let s = schema();
    let engine = Engine::new(EngineLimits::default());

    let mut first = ScriptedAdapter::new(vec![page(&s, 0, 10), page(&s, 10, 5)]);
    let mut second = ScriptedAdapter::new(vec![page(&s, 0, 10), page(&s, 10, 5)]);

    let a = engine.collect(&mut first, &target()).await;
    let b = engine.collect(&mut second, &target()).await;

    assert_eq!(a.rows, b.rows);
    assert_eq!(a.pages_visited, b.pages_visited);
    assert_eq!(a.outcome, Outcome::Success);
    assert_eq!(a.rows.len(), 15);
}

#[tokio::test]
async fn submit_failure_maps_to_navigation_error() {
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = FailingSubmitAdapter {
        schema: schema(),
        has_results_calls: AtomicU32::new(0),
    };

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::NavigationError);
    assert!(result.rows.is_empty());
    assert_eq!(adapter.has_results_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_submission_times_out_within_budget() {
    let engine = Engine::new(EngineLimits {
        target_budget: Duration::from_secs(300),
        ..EngineLimits::default()
    });
    let mut adapter = HungSubmitAdapter { schema: schema() };

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::Timeout);
    assert!(result.rows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn hung_pager_times_out_but_keeps_collected_rows() {
    let s = schema();
    let engine = Engine::new(EngineLimits {
        target_budget: Duration::from_secs(300),
        ..EngineLimits::default()
    });
    let mut adapter = HungPagerAdapter {
        schema: s.clone(),
        page: page(&s, 0, 10),
    };

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::Timeout);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.pages_visited, 1);
}

#[tokio::test]
async fn mid_pagination_extraction_failure_keeps_rows() {
    let s = schema();
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::new(vec![page(&s, 0, 10), page(&s, 10, 10)]);
    adapter.fail_extract_after = Some(1);

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.pages_visited, 1);
}

#[tokio::test]
async fn first_extraction_failure_is_a_navigation_error() {
    let s = schema();
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::new(vec![page(&s, 0, 10)]);
    adapter.fail_extract_after = Some(0);

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::NavigationError);
    assert!(result.rows.is_empty());
}

#[tokio::test]
async fn results_present_but_empty_page_is_success() {
    let engine = Engine::new(EngineLimits::default());
    let mut adapter = ScriptedAdapter::new(vec![PageSnapshot::default()]);

    let result = engine.collect(&mut adapter, &target()).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert!(result.rows.is_empty());
    assert_eq!(result.pages_visited, 1);
}
