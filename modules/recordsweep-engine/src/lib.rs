//! Paginated collection engine.
//!
//! Drives a `SiteAdapter` through one target's search: submit → wait for the
//! results render → extract/advance until the pager is exhausted, the page
//! stops changing, the page cap is hit, or the target's wall-clock budget
//! runs out. Every failure mode maps to an `Outcome`; `collect` never fails.
//!
//! Consumers define their portal by implementing `SiteAdapter`. No WebDriver
//! or HTML knowledge lives here.

pub mod engine;
pub mod poll;
pub mod traits;

pub use engine::{Engine, EngineLimits};
pub use poll::poll_until;
pub use traits::SiteAdapter;
