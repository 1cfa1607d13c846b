// Sub-modules
mod core;
mod loader;
mod parallel;
mod scoring;
mod thresholds;

// Re-export core types
pub use core::{CadenceConfig, ChurnmapConfig};

// Re-export scoring types
pub use scoring::{
    default_days_overdue_weight, default_high_risk_score, default_no_history_score,
    default_pattern_deviation_weight, default_tenure_weight, default_unknown_last_event_score,
    default_volume_decline_weight, RiskWeights, ScoringConfig,
};

// Re-export threshold types
pub use thresholds::ThresholdsConfig;

// Re-export batch config types
pub use parallel::BatchConfig;

// Re-export loader functions
pub use loader::{
    default_config_toml, directory_ancestors, discover_config, load_config,
    load_config_from_path, parse_and_validate_config, CONFIG_FILE_NAME,
};
