use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::trace;

use crate::error::{AppError, AppResult};

/// One reader/writer lock per account; accounts never block each other.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, account_id: &str) -> AppResult<Arc<RwLock<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::other("account lock registry poisoned"))?;
        Ok(locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone())
    }

    /// Runs `f` as the only writer for `account_id`.
    pub fn with_write<T>(&self, account_id: &str, f: impl FnOnce() -> AppResult<T>) -> AppResult<T> {
        let lock = self.lock_for(account_id)?;
        let _guard = lock
            .write()
            .map_err(|_| AppError::other("account lock poisoned"))?;
        trace!(target: "app::planning", account_id, "account write lock acquired");
        f()
    }

    /// Runs `f` concurrently with other readers but never alongside a writer.
    pub fn with_read<T>(&self, account_id: &str, f: impl FnOnce() -> AppResult<T>) -> AppResult<T> {
        let lock = self.lock_for(account_id)?;
        let _guard = lock
            .read()
            .map_err(|_| AppError::other("account lock poisoned"))?;
        f()
    }
}

/// Shared flag that abandons a running replan before anything is committed.
#[derive(Debug, Clone, Default)]
pub struct PlanCancellation {
    flag: Arc<AtomicBool>,
}

impl PlanCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> AppResult<()> {
        if self.is_cancelled() {
            Err(AppError::cancelled())
        } else {
            Ok(())
        }
    }
}
