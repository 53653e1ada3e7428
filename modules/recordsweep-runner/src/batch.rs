//! The batch driver: one fresh browser session per target, stats at the end.

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use recordsweep_common::{AggregatedResult, Outcome, SearchTarget};
use recordsweep_engine::Engine;

use crate::portal::AdapterProvider;

/// Bounds for the randomized pause between targets. County portals throttle
/// aggressive clients; a human-ish cadence stays under that.
const POLITE_DELAY_MIN_MS: u64 = 1000;
const POLITE_DELAY_MAX_MS: u64 = 3000;

/// Stats from a sweep run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub targets: u32,
    pub invalid_skipped: u32,
    pub rows: u32,
    pub pages: u32,
    pub success: u32,
    pub no_results: u32,
    pub navigation_errors: u32,
    pub timeouts: u32,
    pub pagination_limited: u32,
}

impl RunStats {
    pub fn record(&mut self, result: &AggregatedResult) {
        self.targets += 1;
        self.rows += result.rows.len() as u32;
        self.pages += result.pages_visited;
        match result.outcome {
            Outcome::Success => self.success += 1,
            Outcome::NoResults => self.no_results += 1,
            Outcome::NavigationError => self.navigation_errors += 1,
            Outcome::Timeout => self.timeouts += 1,
            Outcome::PaginationLimitExceeded => self.pagination_limited += 1,
        }
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Sweep Complete ===")?;
        writeln!(f, "Targets processed: {}", self.targets)?;
        writeln!(f, "Invalid skipped:   {}", self.invalid_skipped)?;
        writeln!(f, "Rows collected:    {}", self.rows)?;
        writeln!(f, "Pages visited:     {}", self.pages)?;
        writeln!(f, "\nOutcomes:")?;
        writeln!(f, "  Success:          {}", self.success)?;
        writeln!(f, "  No results:       {}", self.no_results)?;
        writeln!(f, "  Navigation error: {}", self.navigation_errors)?;
        writeln!(f, "  Timeout:          {}", self.timeouts)?;
        writeln!(f, "  Page cap hit:     {}", self.pagination_limited)?;
        Ok(())
    }
}

/// Runs each target through a freshly provisioned adapter, in order.
pub struct Sweeper {
    engine: Engine,
    provider: Box<dyn AdapterProvider>,
}

impl Sweeper {
    pub fn new(engine: Engine, provider: Box<dyn AdapterProvider>) -> Self {
        Self { engine, provider }
    }

    /// Process every target. Per-target failures are recorded in the results,
    /// never propagated, so the batch always runs to the end.
    pub async fn run(&self, targets: &[SearchTarget]) -> (Vec<AggregatedResult>, RunStats) {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, targets = targets.len(), "Starting sweep");

        let mut results = Vec::with_capacity(targets.len());
        let mut stats = RunStats::default();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                let pause = Duration::from_millis(
                    rand::rng().random_range(POLITE_DELAY_MIN_MS..POLITE_DELAY_MAX_MS),
                );
                tokio::time::sleep(pause).await;
            }

            info!(
                run_id = %run_id,
                target = %target,
                index = index + 1,
                total = targets.len(),
                "Looking up target"
            );

            let mut adapter = match self.provider.provision().await {
                Ok(adapter) => adapter,
                Err(err) => {
                    warn!(
                        run_id = %run_id,
                        target = %target,
                        error = %err,
                        "Session provisioning failed, recording navigation error"
                    );
                    let result = AggregatedResult::empty(target.clone(), Outcome::NavigationError);
                    stats.record(&result);
                    results.push(result);
                    continue;
                }
            };

            let result = self.engine.collect(adapter.as_mut(), target).await;
            adapter.teardown().await;

            stats.record(&result);
            results.push(result);
        }

        (results, stats)
    }
}
