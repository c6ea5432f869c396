//! Bookings feature built on the local collection store.
//!
//! `add` stamps `id` (`bk_<epoch millis>`) and `createdAt` (ISO-8601, UTC),
//! listings come back newest first, and stats count the trailing seven days.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::storage::collection_store::{LocalCollectionStore, Record};

pub const BOOKINGS: &str = "bookings";

const RECENT_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub total: usize,
    pub recent: usize,
}

pub struct BookingsManager {
    store: Arc<LocalCollectionStore>,
    last_id_millis: AtomicI64,
    // serializes read-modify-write cycles issued through this manager
    writes: Mutex<()>,
}

impl BookingsManager {
    pub fn new(store: Arc<LocalCollectionStore>) -> Self {
        Self { store, last_id_millis: AtomicI64::new(0), writes: Mutex::new(()) }
    }

    pub fn store(&self) -> &Arc<LocalCollectionStore> {
        &self.store
    }

    /// Time-based id that never repeats within this process, even for two
    /// calls in the same millisecond.
    fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let bump = |last: i64| if now > last { now } else { last + 1 };
        let prev = self
            .last_id_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(bump(last)))
            .unwrap_or_else(|last| last);
        format!("bk_{}", bump(prev))
    }

    /// Store a new booking. Any caller-provided `id`/`createdAt` is overwritten.
    #[instrument(skip(self, fields))]
    pub async fn add(&self, mut fields: Record) -> Result<Record, ServiceError> {
        let id = self.next_id();
        fields.insert("id".into(), Value::String(id.clone()));
        fields.insert(
            "createdAt".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        let _guard = self.writes.lock().await;
        let saved = self.store.save(BOOKINGS, fields).await?;
        info!(%id, "booking added");
        Ok(saved)
    }

    /// All bookings, newest `createdAt` first. Records without a parseable
    /// `createdAt` go last, in storage order.
    pub async fn get_all(&self) -> Result<Vec<Record>, ServiceError> {
        let mut list = self.store.get_all(BOOKINGS).await?;
        list.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
        Ok(list)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ServiceError> {
        let _guard = self.writes.lock().await;
        let removed = self.store.delete(BOOKINGS, id).await?;
        if removed {
            info!(%id, "booking deleted");
        }
        Ok(removed)
    }

    /// Totals as of the wall clock at call time.
    pub async fn get_stats(&self) -> Result<BookingStats, ServiceError> {
        let list = self.store.get_all(BOOKINGS).await?;
        Ok(stats_at(&list, Utc::now()))
    }
}

fn created_at(record: &Record) -> Option<DateTime<Utc>> {
    record
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// `recent` counts records created less than seven days before `now`.
pub fn stats_at(records: &[Record], now: DateTime<Utc>) -> BookingStats {
    let window = Duration::seconds(RECENT_WINDOW_SECS);
    let recent = records
        .iter()
        .filter_map(created_at)
        .filter(|created| now.signed_duration_since(*created) < window)
        .count();
    BookingStats { total: records.len(), recent }
}
