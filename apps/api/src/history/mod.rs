//! Analysis history. The pipeline never sees this; handlers save each report after analysis.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::report::ScoreReport;

/// A stored analysis. Identity and timestamp live here, never inside the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub analyzed_at: DateTime<Utc>,
    pub report: ScoreReport,
}

impl AnalysisRecord {
    pub fn new(user_id: Option<Uuid>, report: ScoreReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            analyzed_at: Utc::now(),
            report,
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, record: AnalysisRecord) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>, AppError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AnalysisRecord>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, AnalysisRecord>,
    /// Insertion order, oldest at the front.
    order: VecDeque<Uuid>,
}

/// Bounded store; the oldest record is evicted once `capacity` is reached.
pub struct InMemoryHistory {
    capacity: usize,
    inner: RwLock<Inner>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn save(&self, record: AnalysisRecord) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let id = record.id;
        if inner.records.insert(id, record).is_none() {
            inner.order.push_back(id);
        }
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.records.remove(&evicted);
                debug!("History full, evicted analysis {evicted}");
            }
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AnalysisRecord>, AppError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AnalysisRecord>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect())
    }
}
