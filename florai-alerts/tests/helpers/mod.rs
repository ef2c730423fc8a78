//! Shared test doubles for florai-alerts integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use florai_alerts::classifier::Classifier;
use florai_alerts::error::ClassifierError;
use florai_alerts::notify::{
    AlertComposer, AlertTemplates, NotificationPipeline, PipelineSettings, SeverityThresholds,
};
use florai_common::db::{
    init_memory_database, DocumentStore, SqliteDocumentStore, PREFERENCES_COLLECTION,
};
use florai_common::{ClassOutcome, GeoPoint, WeatherFeatures};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MODEL_ID: &str = "XGBoost_ML-1.0.0";

/// Classifier returning canned outcomes in order, cycling when exhausted
pub struct StubClassifier {
    outcomes: Vec<ClassOutcome>,
    calls: AtomicUsize,
    unavailable: bool,
}

impl StubClassifier {
    pub fn returning(outcomes: Vec<ClassOutcome>) -> Self {
        Self {
            outcomes,
            calls: AtomicUsize::new(0),
            unavailable: false,
        }
    }

    /// Always the Manila reference outcome: High at 0.89
    pub fn high() -> Self {
        Self::returning(vec![ClassOutcome::from_probabilities(0.05, 0.06, 0.89)])
    }

    pub fn unavailable() -> Self {
        Self {
            outcomes: Vec::new(),
            calls: AtomicUsize::new(0),
            unavailable: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    async fn predict(
        &self,
        _location: GeoPoint,
        _features: &WeatherFeatures,
    ) -> Result<ClassOutcome, ClassifierError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ClassifierError::Unavailable("connection refused".to_string()));
        }
        Ok(self.outcomes[n % self.outcomes.len()].clone())
    }
}

/// SQLite store that fails reads or writes for chosen collections
pub struct FaultyStore {
    inner: SqliteDocumentStore,
    failing_reads: HashSet<&'static str>,
    failing_writes: HashSet<&'static str>,
}

impl FaultyStore {
    pub fn new(inner: SqliteDocumentStore) -> Self {
        Self {
            inner,
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
        }
    }

    pub fn fail_reads_from(mut self, collection: &'static str) -> Self {
        self.failing_reads.insert(collection);
        self
    }

    pub fn fail_writes_to(mut self, collection: &'static str) -> Self {
        self.failing_writes.insert(collection);
        self
    }

    fn check(set: &HashSet<&'static str>, collection: &str) -> florai_common::Result<()> {
        if set.contains(collection) {
            Err(florai_common::Error::Internal(format!("{} unreachable", collection)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn get(&self, collection: &str, id: &str) -> florai_common::Result<Option<Value>> {
        Self::check(&self.failing_reads, collection)?;
        self.inner.get(collection, id).await
    }

    async fn insert(&self, collection: &str, id: &str, fields: Value) -> florai_common::Result<()> {
        Self::check(&self.failing_writes, collection)?;
        self.inner.insert(collection, id, fields).await
    }

    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> florai_common::Result<()> {
        Self::check(&self.failing_writes, collection)?;
        self.inner.upsert(collection, id, fields).await
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> florai_common::Result<Vec<Value>> {
        Self::check(&self.failing_reads, collection)?;
        self.inner.query(collection, field, value).await
    }
}

pub async fn memory_store() -> SqliteDocumentStore {
    SqliteDocumentStore::new(init_memory_database().await.unwrap())
}

/// Store with `u1` opted in and `u2` opted out
pub async fn seeded_store() -> SqliteDocumentStore {
    let store = memory_store().await;
    set_preference(&store, "u1", json!({"enableAiAlerts": true})).await;
    set_preference(&store, "u2", json!({"enableAiAlerts": false})).await;
    store
}

pub async fn set_preference(store: &dyn DocumentStore, user_id: &str, doc: Value) {
    store.upsert(PREFERENCES_COLLECTION, user_id, doc).await.unwrap();
}

pub fn settings(notifications_enabled: bool, fail_closed_on_store_error: bool) -> PipelineSettings {
    PipelineSettings {
        notifications_enabled,
        fail_closed_on_store_error,
    }
}

pub fn pipeline(
    store: Arc<dyn DocumentStore>,
    classifier: Arc<dyn Classifier>,
    settings: PipelineSettings,
) -> NotificationPipeline {
    NotificationPipeline::new(
        store,
        classifier,
        AlertComposer::new(SeverityThresholds::default(), AlertTemplates::default()),
        settings,
    )
}

pub fn manila_weather() -> WeatherFeatures {
    WeatherFeatures {
        temperature_max: 32.0,
        temperature_min: 24.0,
        precipitation: 15.0,
        wind_speed: 12.0,
        sunshine_duration: 36_000.0,
        rain_hours: 8.0,
    }
}

pub fn manila() -> GeoPoint {
    GeoPoint::new(14.5547, 121.0244)
}
