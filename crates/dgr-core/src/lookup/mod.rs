//! Data Lookup Client
//!
//! Read-only access to the hosted `dgr_un_list` and `dgr_classes` tables.

mod client;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{LookupError, LookupResult};
use crate::models::{DgrClass, HazmatRecord};

pub use client::SupabaseClient;

/// Table holding one row per UN number
pub const UN_LIST_TABLE: &str = "dgr_un_list";

/// Table holding one row per regulatory class
pub const CLASSES_TABLE: &str = "dgr_classes";

/// Queries against the dangerous-goods data store
///
/// Implementations do not retry; a failure is reported once as a
/// [`LookupError`].
#[async_trait]
pub trait HazmatLookup: Send + Sync {
    /// Exact-match lookup by UN number.
    ///
    /// Returns an empty list when nothing matches. Callers use the first
    /// element only.
    async fn find_by_un_number(&self, key: &str) -> LookupResult<Vec<HazmatRecord>>;

    /// Every class record, unfiltered and unpaginated, in store order
    async fn list_classes(&self) -> LookupResult<Vec<DgrClass>>;
}

/// Run a lookup, failing with [`LookupError::Timeout`] once `limit` elapses
pub async fn bounded<T, F>(limit: Duration, lookup: F) -> LookupResult<T>
where
    F: Future<Output = LookupResult<T>>,
{
    tokio::time::timeout(limit, lookup)
        .await
        .map_err(|_| LookupError::Timeout(limit))?
}
