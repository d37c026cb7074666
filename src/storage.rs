//! Storage traits for the account directory.
//!
//! Implement [`DirectoryStore`] to read account, delegation, and settings
//! documents from your document store, and [`SubscriptionAdminStore`] if the
//! admin utilities should be able to write. An in-memory implementation is
//! provided for tests and local development.
//!
//! Lookups return `Ok(None)` for missing documents. [`StoreError`] covers
//! real failures only, and implementations must not retry internally: the
//! engine maps every failure to a defined fallback state and logs it.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::records::{AccountRecord, DelegatedAdminRecord, SubscriptionSettings};

/// Read-side access to the account directory.
///
/// Implement this trait to resolve access against your document store.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Fetch an account record by key (email or internal user id).
    async fn account(&self, key: &str) -> Result<Option<AccountRecord>, StoreError>;

    /// Fetch the delegated-admin records registered under an email.
    ///
    /// Zero or one record is the expected shape. Implementations whose
    /// underlying query can return several should return them all in query
    /// order and leave flagging the anomaly to the caller.
    async fn delegated_admins_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<DelegatedAdminRecord>, StoreError>;

    /// Fetch the subscription section of the system settings document.
    async fn subscription_settings(&self) -> Result<Option<SubscriptionSettings>, StoreError>;
}

/// Write-side access for the subscription admin utilities.
///
/// Kept separate from [`DirectoryStore`] so nothing on the gating path can
/// reach a mutation.
#[async_trait]
pub trait SubscriptionAdminStore: DirectoryStore {
    /// Create or overwrite an account record.
    async fn upsert_account(&self, key: &str, record: &AccountRecord) -> Result<(), StoreError>;
}

/// Live-read capability for stores that can push account changes.
pub trait WatchStore: DirectoryStore {
    /// Subscribe to an account record.
    ///
    /// The stream yields the current state of the record immediately, then
    /// again after every change; `None` means the record does not exist.
    /// Dropping the stream tears the subscription down.
    fn watch_account(&self, key: &str) -> BoxStream<'static, Option<AccountRecord>>;
}

/// In-memory directory store for tests and local development.
pub mod memory {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, RwLock};

    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use tokio::sync::watch;

    use super::{DirectoryStore, SubscriptionAdminStore, WatchStore};
    use crate::error::StoreError;
    use crate::records::{AccountRecord, DelegatedAdminRecord, SubscriptionSettings};

    /// In-memory directory store.
    ///
    /// Wraps its data in `Arc` so clones share state. Reads can be made to
    /// fail on demand for exercising the outage and malformed-document
    /// fallbacks.
    #[derive(Default, Clone)]
    pub struct InMemoryDirectory {
        inner: Arc<InMemoryDirectoryInner>,
    }

    #[derive(Default)]
    struct InMemoryDirectoryInner {
        accounts: RwLock<HashMap<String, AccountRecord>>,
        delegated_admins: RwLock<Vec<DelegatedAdminRecord>>,
        settings: RwLock<Option<SubscriptionSettings>>,
        malformed: RwLock<HashSet<String>>,
        unavailable: AtomicBool,
        watchers: Mutex<HashMap<String, watch::Sender<Option<AccountRecord>>>>,
    }

    impl InMemoryDirectory {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Insert or replace an account record.
        pub fn insert_account(&self, key: &str, record: AccountRecord) {
            self.inner
                .accounts
                .write()
                .unwrap()
                .insert(key.to_string(), record.clone());
            self.notify(key, Some(record));
        }

        /// Remove an account record.
        pub fn remove_account(&self, key: &str) {
            self.inner.accounts.write().unwrap().remove(key);
            self.notify(key, None);
        }

        /// Register a delegated-admin record. Duplicates are kept as-is so
        /// the duplicate-delegation anomaly can be exercised.
        pub fn insert_delegated_admin(&self, record: DelegatedAdminRecord) {
            self.inner.delegated_admins.write().unwrap().push(record);
        }

        /// Set the subscription settings document.
        pub fn put_settings(&self, settings: SubscriptionSettings) {
            *self.inner.settings.write().unwrap() = Some(settings);
        }

        /// Make every read fail with [`StoreError::Unavailable`].
        pub fn set_unavailable(&self, unavailable: bool) {
            self.inner.unavailable.store(unavailable, Ordering::Relaxed);
        }

        /// Make reads of one account key fail with [`StoreError::Malformed`].
        pub fn mark_account_malformed(&self, key: &str) {
            self.inner
                .malformed
                .write()
                .unwrap()
                .insert(key.to_string());
        }

        fn check_available(&self) -> Result<(), StoreError> {
            if self.inner.unavailable.load(Ordering::Relaxed) {
                Err(StoreError::unavailable("simulated outage"))
            } else {
                Ok(())
            }
        }

        fn notify(&self, key: &str, record: Option<AccountRecord>) {
            let watchers = self.inner.watchers.lock().unwrap();
            if let Some(sender) = watchers.get(key) {
                // send_replace updates the stored value even when no
                // receiver is currently subscribed.
                sender.send_replace(record);
            }
        }
    }

    #[async_trait]
    impl DirectoryStore for InMemoryDirectory {
        async fn account(&self, key: &str) -> Result<Option<AccountRecord>, StoreError> {
            self.check_available()?;
            if self.inner.malformed.read().unwrap().contains(key) {
                return Err(StoreError::malformed(key, "undecodable document"));
            }
            Ok(self.inner.accounts.read().unwrap().get(key).cloned())
        }

        async fn delegated_admins_by_email(
            &self,
            email: &str,
        ) -> Result<Vec<DelegatedAdminRecord>, StoreError> {
            self.check_available()?;
            Ok(self
                .inner
                .delegated_admins
                .read()
                .unwrap()
                .iter()
                .filter(|record| record.email == email)
                .cloned()
                .collect())
        }

        async fn subscription_settings(&self) -> Result<Option<SubscriptionSettings>, StoreError> {
            self.check_available()?;
            Ok(*self.inner.settings.read().unwrap())
        }
    }

    #[async_trait]
    impl SubscriptionAdminStore for InMemoryDirectory {
        async fn upsert_account(
            &self,
            key: &str,
            record: &AccountRecord,
        ) -> Result<(), StoreError> {
            self.check_available()?;
            self.inner
                .accounts
                .write()
                .unwrap()
                .insert(key.to_string(), record.clone());
            self.notify(key, Some(record.clone()));
            Ok(())
        }
    }

    impl WatchStore for InMemoryDirectory {
        fn watch_account(&self, key: &str) -> BoxStream<'static, Option<AccountRecord>> {
            let rx = {
                let mut watchers = self.inner.watchers.lock().unwrap();
                let sender = watchers.entry(key.to_string()).or_insert_with(|| {
                    let current = self.inner.accounts.read().unwrap().get(key).cloned();
                    watch::channel(current).0
                });
                sender.subscribe()
            };
            Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
                if first {
                    let current = rx.borrow_and_update().clone();
                    return Some((current, (rx, false)));
                }
                match rx.changed().await {
                    Ok(()) => {
                        let current = rx.borrow_and_update().clone();
                        Some((current, (rx, false)))
                    }
                    Err(_) => None,
                }
            }))
        }
    }
}
