pub mod dataset;
pub mod memory;
pub mod output;
pub mod traits;

// Re-export storage traits for convenient access
pub use dataset::Dataset;
pub use memory::MemoryStore;
pub use output::{emit, OutputFormat, OutreachView, Render};
pub use traits::{ChurnStore, DailyChurnKpis, EventSource, KpiStore, ShipperStore};
