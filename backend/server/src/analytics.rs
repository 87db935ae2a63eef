//! # Analytics
//!
//! RAM registry of generated QR codes and their scan counts.
//!
//! ## Requirements
//!
//! - One record per identity key, never duplicated by repeated generation
//! - Scan increments must not be lost under concurrent requests
//! - Lives as long as the process, no eviction and no persistence
//!
//! ## Implementation
//!
//! - `HashMap` keyed by identity key behind a single `tokio` `RwLock`
//! - Creates and increments take the write lock, so every mutation is
//!   serialized; contention is expected to be low
//! - Reads take the read lock and hand out clones
//! - Time comes from an injected [`Clock`] so tests can pin it
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::render::RenderOptions;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("No analytics recorded for {0}")]
    NotFound(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    pub qr_id: String,
    pub text: String,
    pub scans: u64,
    pub created: DateTime<Utc>,
    pub last_scanned: Option<DateTime<Utc>>,
    pub options: RenderOptions,
}

impl AnalyticsRecord {
    fn new(qr_id: &str, text: &str, options: RenderOptions, created: DateTime<Utc>) -> Self {
        Self {
            qr_id: qr_id.to_string(),
            text: text.to_string(),
            scans: 0,
            created,
            last_scanned: None,
            options,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsSummary {
    pub total_qr_codes: usize,
    pub total_scans: u64,
    pub qr_codes: Vec<AnalyticsRecord>,
}

pub struct AnalyticsRegistry {
    records: RwLock<HashMap<String, AnalyticsRecord>>,
    clock: Arc<dyn Clock>,
}

impl Default for AnalyticsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the record for `key`, creating a zero-scan one if absent.
    ///
    /// An existing record is returned untouched, even when `text` or
    /// `options` differ from what it was created with.
    pub async fn get_or_create(
        &self,
        key: &str,
        text: &str,
        options: &RenderOptions,
    ) -> AnalyticsRecord {
        let mut records = self.records.write().await;

        match records.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!(qr_id = key, "New analytics record");

                entry
                    .insert(AnalyticsRecord::new(
                        key,
                        text,
                        options.clone(),
                        self.clock.now(),
                    ))
                    .clone()
            }
        }
    }

    /// Counts one scan of `key`.
    ///
    /// With `fallback_text`, an absent key is first created with default
    /// options inside the same critical section.
    pub async fn record_scan(
        &self,
        key: &str,
        fallback_text: Option<&str>,
    ) -> Result<AnalyticsRecord, AnalyticsError> {
        let mut records = self.records.write().await;
        let now = self.clock.now();

        let record = match records.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => match fallback_text {
                Some(text) => {
                    debug!(qr_id = key, "Scan of unknown key, creating record from text");

                    entry.insert(AnalyticsRecord::new(
                        key,
                        text,
                        RenderOptions::default(),
                        now,
                    ))
                }
                None => return Err(AnalyticsError::NotFound(key.to_string())),
            },
        };

        record.scans += 1;
        record.last_scanned = Some(now.max(record.created));

        Ok(record.clone())
    }

    pub async fn get(&self, key: &str) -> Result<AnalyticsRecord, AnalyticsError> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AnalyticsError::NotFound(key.to_string()))
    }

    /// Every record, oldest first, with totals.
    pub async fn list_all(&self) -> AnalyticsSummary {
        let mut qr_codes: Vec<AnalyticsRecord> =
            self.records.read().await.values().cloned().collect();

        qr_codes.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.qr_id.cmp(&b.qr_id)));

        AnalyticsSummary {
            total_qr_codes: qr_codes.len(),
            total_scans: qr_codes.iter().map(|record| record.scans).sum(),
            qr_codes,
        }
    }
}
