//! Persistence layer.
//!
//! Each agent owns one JSON document on disk. [`JsonStateStore`] is the
//! repository over that file: `load` never fails (missing or corrupt files
//! yield a fresh state), `save` reports I/O errors to the caller.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};

// ---------------------------------------------------------------------------
// State documents
// ---------------------------------------------------------------------------

/// Spread agent state: last order time (Unix seconds) per contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadState {
    #[serde(default)]
    pub last_order_times: BTreeMap<String, f64>,
}

impl SpreadState {
    /// Seconds since the last order on this contract, or `None` if never.
    pub fn seconds_since_order(&self, contract_id: &str, now: f64) -> Option<f64> {
        self.last_order_times.get(contract_id).map(|t| now - t)
    }

    /// Whether an order at `now` would fall inside the cooldown window.
    pub fn in_cooldown(&self, contract_id: &str, now: f64, cooldown_secs: f64) -> bool {
        let last = self.last_order_times.get(contract_id).copied().unwrap_or(0.0);
        now - last < cooldown_secs
    }

    pub fn record_order(&mut self, contract_id: &str, now: f64) {
        self.last_order_times.insert(contract_id.to_string(), now);
    }

    /// Drop entries older than `max_age_secs`. Returns how many were removed.
    pub fn prune_older_than(&mut self, now: f64, max_age_secs: f64) -> usize {
        let before = self.last_order_times.len();
        self.last_order_times.retain(|_, t| now - *t < max_age_secs);
        before - self.last_order_times.len()
    }
}

/// Reply agent state: every comment id already handled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyState {
    #[serde(default)]
    pub processed_comment_ids: BTreeSet<String>,
}

impl ReplyState {
    pub fn is_processed(&self, comment_id: &str) -> bool {
        self.processed_comment_ids.contains(comment_id)
    }

    /// Returns `false` if the id was already present.
    pub fn mark_processed(&mut self, comment_id: &str) -> bool {
        self.processed_comment_ids.insert(comment_id.to_string())
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Load/save abstraction over an agent's durable state.
pub trait StateStore<S>: Send + Sync {
    /// Read the persisted state, or a fresh one if there is none or it is
    /// unreadable.
    fn load(&self) -> S;

    fn save(&self, state: &S) -> Result<()>;
}

/// State kept as pretty-printed JSON in a single file.
///
/// Writes are not atomic; a crash mid-write leaves a corrupt file, which
/// the next `load` reports and replaces with a fresh state.
pub struct JsonStateStore<S> {
    path: PathBuf,
    _state: PhantomData<fn() -> S>,
}

impl<S> JsonStateStore<S> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _state: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the state file (for testing or reset).
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl<S> JsonStateStore<S>
where
    S: DeserializeOwned,
{
    /// Strict read: `Ok(None)` for a missing file, `StateCorruption` for an
    /// unreadable one.
    pub fn read(&self) -> Result<Option<S>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let corrupt = |reason: String| AgentError::StateCorruption {
            path: self.path.display().to_string(),
            reason,
        };
        let file = File::open(&self.path).map_err(|e| corrupt(e.to_string()))?;
        let state = serde_json::from_reader(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(state))
    }
}

impl<S> StateStore<S> for JsonStateStore<S>
where
    S: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> S {
        match self.read() {
            Ok(Some(state)) => {
                info!(path = %self.path.display(), "State loaded from disk");
                state
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No saved state found, starting fresh");
                S::default()
            }
            Err(e) => {
                warn!(error = %e, "State file unreadable, starting fresh");
                S::default()
            }
        }
    }

    fn save(&self, state: &S) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
