//! Progress sink trait for bulk churn runs.
//!
//! The recompute engine reports per-shipper progress through a
//! [`ProgressSink`]; the scoring functions themselves never report anything.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`: shippers are processed on a rayon
//! pool and updates arrive from several threads at once.
//!
//! # Example
//!
//! ```rust
//! use churnmap::progress::traits::ProgressSink;
//!
//! struct LoggingProgressSink;
//!
//! impl ProgressSink for LoggingProgressSink {
//!     fn report(&self, stage: &str, current: usize, total: usize) {
//!         log::info!("{}: {}/{}", stage, current, total);
//!     }
//!
//!     fn start_stage(&self, name: &str) {
//!         log::info!("Starting: {}", name);
//!     }
//!
//!     fn complete_stage(&self, name: &str) {
//!         log::info!("Complete: {}", name);
//!     }
//!
//!     fn warn(&self, message: &str) {
//!         log::warn!("{}", message);
//!     }
//! }
//! ```

/// Receives progress updates from bulk operations.
///
/// Methods should be cheap and must not panic on odd input such as
/// `current > total`.
pub trait ProgressSink: Send + Sync + 'static {
    /// `current` items of `total` are done for `stage`
    fn report(&self, stage: &str, current: usize, total: usize);

    fn start_stage(&self, name: &str);

    /// Called once per started stage, including cancelled runs
    fn complete_stage(&self, name: &str);

    /// A per-shipper problem that does not stop the run
    fn warn(&self, message: &str);
}
