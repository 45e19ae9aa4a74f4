//! Run state
//!
//! Manages the `.seedflow/state.json` file which remembers the identity pool
//! name queried during the last run and which phases completed, so the
//! export report can be printed again without touching the control plane.

use crate::error::{CloudError, Result};
use crate::sequencer::{BootstrapOutcome, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".seedflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// State recorded after a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Shared project the state belongs to
    pub shared_project: String,

    /// Canonical identity pool name, if it was queried
    pub pool_name: Option<String>,

    /// Phases that finished without failures
    pub completed_phases: Vec<Phase>,
}

impl RunState {
    pub fn new(shared_project: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            shared_project: shared_project.into(),
            pool_name: None,
            completed_phases: Vec::new(),
        }
    }

    pub fn set_pool_name(&mut self, pool_name: impl Into<String>) {
        self.pool_name = Some(pool_name.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, phase: Phase) {
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
            self.updated_at = Utc::now();
        }
    }

    /// Fold in what a run got done, including a halted one
    pub fn record_outcome(&mut self, outcome: &BootstrapOutcome) {
        if let Some(pool_name) = &outcome.pool_name {
            self.set_pool_name(pool_name);
        }
        for phase in &outcome.completed_phases {
            self.mark_completed(*phase);
        }
    }

    /// The pool name, only if this state belongs to `shared_project`
    pub fn pool_name_for(&self, shared_project: &str) -> Option<&str> {
        if self.shared_project == shared_project {
            self.pool_name.as_deref()
        } else {
            None
        }
    }
}

/// State manager for reading/writing state files
pub struct StateManager {
    /// Directory containing `.seedflow/`
    root: PathBuf,
}

impl StateManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the state directory path
    fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Get the state file path
    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    /// Get the backup file path
    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    /// Get the lock file path
    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    /// Ensure the state directory exists
    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the state, `None` if no run has been recorded
    pub async fn load(&self) -> Result<Option<RunState>> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let state: RunState = serde_json::from_str(&content)?;

        // Version check
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(
            "Loaded state for {} ({} completed phases)",
            state.shared_project,
            state.completed_phases.len()
        );
        Ok(Some(state))
    }

    /// Save the state
    /// Load the state for `shared_project`, or start a fresh one
    pub async fn load_for(&self, shared_project: &str) -> Result<RunState> {
        match self.load().await? {
            Some(state) if state.shared_project == shared_project => Ok(state),
            _ => Ok(RunState::new(shared_project)),
        }
    }

    pub async fn save(&self, state: &RunState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        // Create backup if state file exists
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state for {}", state.shared_project);
        Ok(())
    }

    /// Acquire a lock so two bootstrap runs never mutate the same organization
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        // Check for existing lock
        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // Check if lock is stale (older than 1 hour)
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::LockError(format!(
                    "Bootstrap is already running on {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = RunState::new("acme-shared");
        state.set_pool_name("projects/1/locations/global/workloadIdentityPools/github-pool");
        state.mark_completed(Phase::CreateProjects);
        state.mark_completed(Phase::CreateProjects);

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.completed_phases, vec![Phase::CreateProjects]);
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        assert!(manager.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&RunState::new("acme-shared")).await.unwrap();
        manager.save(&RunState::new("acme-shared")).await.unwrap();

        assert!(temp_dir.path().join(".seedflow/state.json.backup").exists());
    }

    #[test]
    fn test_pool_name_for_other_project() {
        let mut state = RunState::new("acme-shared");
        state.set_pool_name("pool");
        assert_eq!(state.pool_name_for("acme-shared"), Some("pool"));
        assert_eq!(state.pool_name_for("other-shared"), None);
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".seedflow/lock.json").exists());
    }
}
