//! Stateless computations over the store: streaks, the Forja Index,
//! experience/levels and the weekly trend report.

pub mod index;
pub mod progression;
pub mod streak;
pub mod trend;

/// Number of most recent daily logs the index and weekly report look at
pub const HISTORY_WINDOW: usize = 14;

/// Round half away from zero and clamp into `[0, 100]`
pub(crate) fn percent(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}
