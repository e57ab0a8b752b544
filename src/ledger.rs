//! Durable ledger of delivered article ids.
//!
//! The ledger is the single source of truth for "already delivered". It is
//! loaded at the start of every pipeline invocation and rewritten after any
//! invocation that delivers at least one article. Every rewrite is
//! crash-safe: the prior file is kept as a backup, the new content is staged
//! to a temp file and made visible with an atomic rename.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Entries older than this are pruned on load.
const RETENTION_DAYS: i64 = 30;

const LEDGER_FILE: &str = "delivered.json";
const BACKUP_FILE: &str = "delivered.backup.json";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One delivered article. `delivered_at` exists only to drive pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    id: String,
    delivered_at: DateTime<Utc>,
}

/// Handle to the persisted ledger file. Cheap to construct; all state lives
/// on disk so nothing in memory survives across invocations.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    backup_path: PathBuf,
}

impl Ledger {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(LEDGER_FILE),
            backup_path: data_dir.join(BACKUP_FILE),
        }
    }

    /// Loads the set of delivered ids, pruning entries older than 30 days
    /// and persisting the pruned result before returning.
    ///
    /// Fails soft: a missing file initializes an empty persisted ledger, and
    /// a corrupt or unreadable file yields an empty set with a logged
    /// warning. Duplicate delivery is the accepted degraded behavior there;
    /// crashing the pipeline is not.
    pub fn load(&self) -> HashSet<String> {
        if let Err(e) = self.ensure_dir() {
            tracing::warn!(path = %self.path.display(), error = %e, "Cannot create ledger directory");
            return HashSet::new();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No ledger file found, creating empty one");
                if let Err(e) = self.write_entries(&[]) {
                    tracing::warn!(error = %e, "Failed to initialize empty ledger");
                }
                return HashSet::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read ledger, proceeding with empty set");
                return HashSet::new();
            }
        };

        let entries: Vec<LedgerEntry> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt ledger file, proceeding with empty set");
                return HashSet::new();
            }
        };

        let cutoff = Utc::now() - Duration::days(RETENTION_DAYS);
        let total = entries.len();
        let retained: Vec<LedgerEntry> = entries
            .into_iter()
            .filter(|e| e.delivered_at > cutoff)
            .collect();

        if retained.len() < total {
            tracing::info!(
                pruned = total - retained.len(),
                retained = retained.len(),
                "Pruned expired ledger entries"
            );
            if let Err(e) = self.write_entries(&retained) {
                tracing::warn!(error = %e, "Failed to persist pruned ledger");
            }
        }

        retained.into_iter().map(|e| e.id).collect()
    }

    /// Records newly delivered ids, merged with whatever the file currently
    /// holds, all stamped with the current time (last-write-wins per id).
    ///
    /// Ids already persisted are never lost by a commit; failed deliveries
    /// are simply absent and stay eligible for the next invocation.
    pub fn commit(&self, newly_delivered: &HashSet<String>) -> Result<usize, LedgerError> {
        self.ensure_dir()?;

        let mut ids = self.current_ids();
        ids.extend(newly_delivered.iter().cloned());

        let now = Utc::now();
        let entries: Vec<LedgerEntry> = ids
            .into_iter()
            .map(|id| LedgerEntry {
                id,
                delivered_at: now,
            })
            .collect();

        self.write_entries(&entries)?;
        tracing::info!(total = entries.len(), added = newly_delivered.len(), "Ledger committed");
        Ok(entries.len())
    }

    /// Best-effort read of the currently persisted ids, without pruning.
    fn current_ids(&self) -> HashSet<String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return HashSet::new(),
        };
        match serde_json::from_str::<Vec<LedgerEntry>>(&content) {
            Ok(entries) => entries.into_iter().map(|e| e.id).collect(),
            Err(_) => HashSet::new(),
        }
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Backup the prior file, then stage-and-rename the new content.
    fn write_entries(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        if self.path.exists() {
            std::fs::copy(&self.path, &self.backup_path)?;
        }

        let json = serde_json::to_string_pretty(entries)?;

        // Randomized temp name so a stale temp file from a crashed run
        // cannot collide with this write.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", nanos));

        let mut temp_file = std::fs::File::create(&temp_path)?;
        if let Err(e) = temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.sync_all())
        {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        drop(temp_file);

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }
}
