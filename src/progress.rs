//! Progress reporting for bulk runs.
//!
//! See [`traits::ProgressSink`] for the abstraction and
//! [`implementations`] for the available sinks.

pub mod implementations;
pub mod traits;

pub use implementations::{BarProgressSink, ProgressEvent, RecordingProgressSink, SilentProgressSink};
pub use traits::ProgressSink;
