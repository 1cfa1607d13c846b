//! JSON dataset file used by the command-line tool.
//!
//! ```json
//! {
//!   "shippers": [{ "id": 1, "name": "Acme", "venture_id": 3, "created_at": "2024-01-01T00:00:00Z" }],
//!   "events": [{ "shipper_id": 1, "occurred_at": "2024-02-01T09:30:00Z" }],
//!   "daily_kpis": []
//! }
//! ```

use crate::core::{ShipperRecord, TransactionEvent};
use crate::errors::{ChurnError, Result};
use crate::io::memory::MemoryStore;
use crate::io::traits::{DailyChurnKpis, KpiStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub shippers: Vec<ShipperRecord>,
    #[serde(default)]
    pub events: Vec<TransactionEvent>,
    #[serde(default)]
    pub daily_kpis: Vec<DailyChurnKpis>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let dataset = serde_json::from_str(&contents)?;
        log::debug!("Loaded dataset from {}", path.display());
        Ok(dataset)
    }

    /// Write the dataset atomically: a sibling temp file is renamed over
    /// `path`, so a crash mid-write leaves the previous file intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let temp_path = temp_path_for(path);
        if let Err(e) = fs::write(&temp_path, json).and_then(|_| fs::rename(&temp_path, path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        log::debug!("Saved dataset to {}", path.display());
        Ok(())
    }

    /// Validate and load into a fresh store.
    ///
    /// # Errors
    ///
    /// Returns `ChurnError::InvalidInput` for duplicate shipper ids or events
    /// that reference an unknown shipper.
    pub fn into_store(self) -> Result<MemoryStore> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.shippers.iter().find(|s| !seen.insert(s.id)) {
            return Err(ChurnError::invalid_input(format!(
                "duplicate shipper id {}",
                dup.id
            )));
        }

        let store = MemoryStore::new();
        for record in self.shippers {
            store.insert_shipper(record);
        }
        for event in self.events {
            if !seen.contains(&event.shipper_id) {
                return Err(ChurnError::invalid_input(format!(
                    "event at {} references unknown shipper {}",
                    event.occurred_at, event.shipper_id
                )));
            }
            store.add_event(event.shipper_id, event.occurred_at)?;
        }
        for kpis in &self.daily_kpis {
            store.upsert_daily_kpis(kpis)?;
        }
        Ok(store)
    }

    pub fn from_store(store: &MemoryStore) -> Self {
        Self {
            shippers: store.shippers(),
            events: store.all_events(),
            daily_kpis: store.all_kpis(),
        }
    }
}

/// Temp file beside `path`, unique per process and call
fn temp_path_for(path: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset");
    path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ))
}
