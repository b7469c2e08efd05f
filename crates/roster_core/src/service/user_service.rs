//! User use-case service.
//!
//! # Responsibility
//! - Provide the create/update/get/list/delete surface consumed by the
//!   RPC layer.
//! - Stamp the update timestamp when the caller does not supply one.
//! - Schedule storage compaction independently of delete success.
//!
//! # Invariants
//! - Empty update payloads are rejected before reaching storage and
//!   before any timestamp stamping.
//! - Delete success is reported on the delete alone; a failed
//!   compaction is logged, never propagated from the delete path.

use crate::cancel::CancelToken;
use crate::model::user::{NewUser, UpdateUser, User, UserFilter, UserId};
use crate::repo::user_repo::{StoreError, StoreResult, UserRepository};
use log::warn;
use std::cell::Cell;
use std::num::NonZeroU32;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_COMPACT_EVERY_DELETES: u32 = 32;

/// Threshold-triggered compaction schedule applied after deletes.
#[derive(Debug, Clone, Copy)]
pub struct CompactionPolicy {
    /// Compact once this many deletes have accumulated; `None` leaves
    /// compaction entirely to external schedulers via `compact_now`.
    pub every_deletes: Option<NonZeroU32>,
}

impl CompactionPolicy {
    pub fn disabled() -> Self {
        Self {
            every_deletes: None,
        }
    }
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            every_deletes: NonZeroU32::new(DEFAULT_COMPACT_EVERY_DELETES),
        }
    }
}

/// Use-case facade over a user repository implementation.
pub struct UserService<R: UserRepository> {
    repo: R,
    policy: CompactionPolicy,
    deletes_since_compact: Cell<u32>,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service with the default compaction policy.
    pub fn new(repo: R) -> Self {
        Self::with_policy(repo, CompactionPolicy::default())
    }

    /// Creates a service with an explicit compaction policy.
    pub fn with_policy(repo: R, policy: CompactionPolicy) -> Self {
        Self {
            repo,
            policy,
            deletes_since_compact: Cell::new(0),
        }
    }

    /// Creates one user and returns the storage-authoritative record.
    pub fn create_user(&self, cancel: &CancelToken, create: NewUser) -> StoreResult<User> {
        self.repo.create_user(cancel, create)
    }

    /// Applies a partial update and returns the post-update record.
    ///
    /// Stamps `updated_ts` with the current time when the caller did
    /// not provide one. Payloads with zero fields are rejected with an
    /// invalid-request error before any stamping or storage access.
    pub fn update_user(&self, cancel: &CancelToken, update: UpdateUser) -> StoreResult<User> {
        if update.is_empty() {
            return Err(StoreError::InvalidRequest("no fields to update"));
        }

        let mut update = update;
        if update.updated_ts.is_none() {
            update.updated_ts = Some(now_epoch_seconds());
        }
        self.repo.update_user(cancel, &update)
    }

    /// Returns the first record matching the filter, if any.
    pub fn get_user(&self, cancel: &CancelToken, filter: &UserFilter) -> StoreResult<Option<User>> {
        let mut users = self.repo.list_users(cancel, filter)?;
        if users.is_empty() {
            Ok(None)
        } else {
            Ok(Some(users.remove(0)))
        }
    }

    /// Lists records matching every provided equality filter.
    pub fn list_users(&self, cancel: &CancelToken, filter: &UserFilter) -> StoreResult<Vec<User>> {
        self.repo.list_users(cancel, filter)
    }

    /// Deletes one user by key and applies the compaction policy.
    ///
    /// Deleting a non-existent key is a successful no-op; the returned
    /// count reports rows actually removed.
    pub fn delete_user(&self, cancel: &CancelToken, id: UserId) -> StoreResult<u64> {
        let affected = self.repo.delete_user(cancel, id)?;
        self.apply_compaction_policy(cancel);
        Ok(affected)
    }

    /// Runs storage compaction immediately, for external schedulers.
    pub fn compact_now(&self, cancel: &CancelToken) -> StoreResult<()> {
        self.repo.compact(cancel)?;
        self.deletes_since_compact.set(0);
        Ok(())
    }

    fn apply_compaction_policy(&self, cancel: &CancelToken) {
        let Some(threshold) = self.policy.every_deletes else {
            return;
        };

        let tally = self.deletes_since_compact.get().saturating_add(1);
        self.deletes_since_compact.set(tally);
        if tally < threshold.get() || cancel.is_cancelled() {
            return;
        }

        // Counter is kept on failure so the next delete retries.
        match self.repo.compact(cancel) {
            Ok(()) => self.deletes_since_compact.set(0),
            Err(err) => warn!("event=compact module=service status=error error={err}"),
        }
    }
}

fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}
